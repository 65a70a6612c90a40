//! District website staff-directory scrape: walk the leadership and contact
//! pages linked from a district's homepage and pull out name/title/email
//! tuples. Loose page-text extraction, so everything here lands with
//! heuristic-grade provenance.

use std::collections::HashSet;

use async_trait::async_trait;
use dscout_core::{Contact, District, Provenance};
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::{DistrictContactSource, SourceError, Throttle};

/// Link href/text keywords that suggest a staff or leadership page.
const PAGE_KEYWORDS: &[&str] = &[
    "staff", "directory", "leadership", "administration", "cabinet", "team", "about", "contact",
    "superintendent", "board",
];

/// Paths worth probing even when the homepage never links them.
const COMMON_PATHS: &[&str] = &[
    "/staff",
    "/directory",
    "/administration",
    "/leadership",
    "/about/leadership",
    "/about/administration",
    "/contact",
];

/// Role labels worth keeping, checked in order against container text.
const TARGET_TITLES: &[&str] = &[
    "superintendent",
    "assistant superintendent",
    "deputy superintendent",
    "chief technology officer",
    "cto",
    "chief information officer",
    "cio",
    "technology director",
    "director of technology",
    "it director",
    "director of information",
    "instructional technology",
    "digital learning",
    "curriculum director",
    "director of curriculum",
    "academic officer",
    "chief academic",
    "purchasing director",
    "procurement",
    "business manager",
    "chief financial",
    "cfo",
    "chief operating",
    "coo",
];

/// Mailbox prefixes that never belong to a person.
const GENERIC_PREFIXES: &[&str] = &[
    "info@",
    "contact@",
    "support@",
    "admin@",
    "webmaster@",
    "noreply@",
    "help@",
    "office@",
    "communications@",
    "hr@",
];

/// Words that disqualify a text fragment from being a person's name.
const NON_NAME_WORDS: &[&str] = &[
    "the", "our", "meet", "contact", "about", "office", "department", "district", "school",
    "public", "services", "board", "click", "view", "read", "more", "home", "page", "menu",
    "search", "phone", "email", "fax", "address", "location",
];

const DISCOVERY_CAP: usize = 10;
const PAGE_CAP: usize = 8;

pub struct StaffDirectorySource {
    client: reqwest::Client,
    page_throttle: Throttle,
    email_re: Regex,
    phone_re: Regex,
    name_re: Regex,
}

impl StaffDirectorySource {
    pub fn new(client: reqwest::Client) -> Result<Self, SourceError> {
        let compile =
            |pattern: &str| Regex::new(pattern).map_err(|e| SourceError::Malformed(e.to_string()));
        Ok(Self {
            client,
            page_throttle: Throttle::from_millis(500),
            email_re: compile(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")?,
            phone_re: compile(r"\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}")?,
            name_re: compile(r"^[A-Z][a-z]+(?:\s+[A-Z]\.?)?\s+[A-Z][a-zA-Z\-]+(?:\s+[A-Z][a-zA-Z\-]+)?$")?,
        })
    }

    /// Same-domain links that look like staff or leadership pages, plus the
    /// common paths districts use for them, capped at [`DISCOVERY_CAP`].
    pub fn discover_pages(&self, homepage_html: &str, base: &Url) -> Vec<Url> {
        let document = Html::parse_document(homepage_html);
        let mut pages = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        if let Ok(link_sel) = Selector::parse("a[href]") {
            for link in document.select(&link_sel) {
                let Some(href) = link.value().attr("href") else {
                    continue;
                };
                let text = link.text().collect::<String>().to_lowercase();
                let href_lower = href.to_lowercase();
                if !PAGE_KEYWORDS
                    .iter()
                    .any(|kw| href_lower.contains(kw) || text.contains(kw))
                {
                    continue;
                }
                let Ok(url) = base.join(href) else { continue };
                if url.host_str() != base.host_str() {
                    continue;
                }
                if seen.insert(url.as_str().to_string()) {
                    pages.push(url);
                }
            }
        }

        for path in COMMON_PATHS {
            if let Ok(url) = base.join(path) {
                if seen.insert(url.as_str().to_string()) {
                    pages.push(url);
                }
            }
        }

        pages.truncate(DISCOVERY_CAP);
        pages
    }

    /// Extract person contacts from one page. A candidate needs an email that
    /// is not a generic mailbox and a nearby text fragment that looks like a
    /// name; title and phone are taken from the same container when present.
    pub fn extract_contacts(&self, html: &str) -> Vec<Contact> {
        let document = Html::parse_document(html);
        let Ok(container_sel) = Selector::parse("div, li, tr, td, article, section, p") else {
            return Vec::new();
        };

        // (email, context size, contact): tighter containers win, so a card
        // beats the page-level wrapper that also contains the email
        let mut best: Vec<(String, usize, Contact)> = Vec::new();
        for container in document.select(&container_sel) {
            let text = container.text().collect::<String>();
            for found in self.email_re.find_iter(&text) {
                let email = found.as_str().to_lowercase();
                if GENERIC_PREFIXES.iter().any(|g| email.starts_with(g)) {
                    continue;
                }
                let Some(name) = self.name_in(container, &text) else {
                    continue;
                };
                let contact = Contact {
                    name,
                    title: find_title(&text),
                    email: Some(email.clone()),
                    email_guessed: false,
                    phone: self.phone_re.find(&text).map(|m| m.as_str().to_string()),
                    source: Some("District website".into()),
                    provenance: Provenance::Guessed,
                };
                match best.iter().position(|(e, _, _)| *e == email) {
                    Some(idx) if text.len() < best[idx].1 => {
                        best[idx].1 = text.len();
                        best[idx].2 = contact;
                    }
                    Some(_) => {}
                    None => best.push((email, text.len(), contact)),
                }
            }
        }
        best.into_iter().map(|(_, _, contact)| contact).collect()
    }

    fn name_in(&self, container: ElementRef<'_>, text: &str) -> Option<String> {
        if let Ok(heading_sel) = Selector::parse("h1, h2, h3, h4, h5, strong, b") {
            for tag in container.select(&heading_sel) {
                let candidate = tag.text().collect::<String>().trim().to_string();
                if self.looks_like_name(&candidate) {
                    return Some(candidate);
                }
            }
        }
        text.lines()
            .map(str::trim)
            .find(|line| self.looks_like_name(line))
            .map(str::to_string)
    }

    fn looks_like_name(&self, text: &str) -> bool {
        if text.len() < 4 || text.len() > 50 {
            return false;
        }
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() < 2 || words.len() > 5 {
            return false;
        }
        if words
            .iter()
            .any(|w| NON_NAME_WORDS.contains(&w.to_lowercase().as_str()))
        {
            return false;
        }
        self.name_re.is_match(text)
    }
}

/// First target role label found in the container text, display-cased.
/// Bare acronyms only count as whole words; "director" contains "cto".
fn find_title(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let words: Vec<String> = lower
        .split_whitespace()
        .map(|w| w.chars().filter(|c| c.is_ascii_alphanumeric()).collect())
        .collect();
    TARGET_TITLES
        .iter()
        .find(|title| {
            if title.len() <= 3 {
                words.iter().any(|w| w == *title)
            } else {
                lower.contains(*title)
            }
        })
        .map(|title| title_case(title))
}

fn title_case(phrase: &str) -> String {
    phrase
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl DistrictContactSource for StaffDirectorySource {
    fn source_id(&self) -> &'static str {
        "district-website"
    }

    /// No website on record means nothing to crawl.
    fn wants(&self, district: &District) -> bool {
        district.website.is_some()
    }

    async fn contacts_for(&self, district: &District) -> Result<Vec<Contact>, SourceError> {
        let Some(website) = district.website.as_deref() else {
            return Ok(Vec::new());
        };
        let website = if website.starts_with("http") {
            website.to_string()
        } else {
            format!("https://{website}")
        };
        let base = Url::parse(&website)
            .map_err(|e| SourceError::Malformed(format!("bad website url {website}: {e}")))?;

        let mut pages = vec![base.clone()];
        match self.fetch_text(base.as_str()).await {
            Ok(homepage) => pages.extend(self.discover_pages(&homepage, &base)),
            Err(err) => {
                debug!(url = %base, error = %err, "homepage fetch failed, probing common paths");
                pages.extend(COMMON_PATHS.iter().filter_map(|path| base.join(path).ok()));
            }
        }

        let mut contacts = Vec::new();
        let mut seen_emails: HashSet<String> = HashSet::new();
        for page in pages.into_iter().take(PAGE_CAP) {
            self.page_throttle.wait().await;
            let body = match self.fetch_text(page.as_str()).await {
                Ok(body) => body,
                Err(err) => {
                    debug!(url = %page, error = %err, "staff page fetch failed, skipping");
                    continue;
                }
            };
            for contact in self.extract_contacts(&body) {
                let Some(email) = contact.email.clone() else {
                    continue;
                };
                if seen_emails.insert(email) {
                    contacts.push(contact);
                }
            }
        }
        debug!(district = %district.name, found = contacts.len(), "scraped staff pages");
        Ok(contacts)
    }
}

impl StaffDirectorySource {
    async fn fetch_text(&self, url: &str) -> Result<String, SourceError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> StaffDirectorySource {
        StaffDirectorySource::new(reqwest::Client::new()).expect("patterns")
    }

    const STAFF_PAGE: &str = r#"
        <html><body>
        <div class="staff-card">
          <h3>Krista Lundquist</h3>
          <p>Chief Technology Officer</p>
          <p>klundquist@seattleschools.org</p>
          <p>(206) 555-0142</p>
        </div>
        <div class="staff-card">
          <h3>Caleb Perkins</h3>
          <p>Chief Academic Officer</p>
          <p>cperkins@seattleschools.org</p>
        </div>
        <div class="footer">
          <p>Questions? info@seattleschools.org</p>
        </div>
        </body></html>"#;

    #[test]
    fn staff_cards_become_contacts_with_title_and_phone() {
        let contacts = source().extract_contacts(STAFF_PAGE);
        assert_eq!(contacts.len(), 2);

        let krista = contacts
            .iter()
            .find(|c| c.email.as_deref() == Some("klundquist@seattleschools.org"))
            .expect("krista");
        assert_eq!(krista.name, "Krista Lundquist");
        assert_eq!(krista.title.as_deref(), Some("Chief Technology Officer"));
        assert_eq!(krista.phone.as_deref(), Some("(206) 555-0142"));
        assert_eq!(krista.provenance, Provenance::Guessed);
        assert!(!krista.email_guessed);
    }

    #[test]
    fn generic_mailboxes_are_not_contacts() {
        let contacts = source().extract_contacts(STAFF_PAGE);
        assert!(contacts
            .iter()
            .all(|c| c.email.as_deref() != Some("info@seattleschools.org")));
    }

    #[test]
    fn containers_without_a_plausible_name_yield_nothing() {
        let html = r#"<div><p>Email the helpdesk at jdoe@district.org today</p></div>"#;
        assert!(source().extract_contacts(html).is_empty());
    }

    #[test]
    fn director_titles_do_not_trip_the_acronym_labels() {
        assert_eq!(
            find_title("Pat Smith, Curriculum Director, psmith@x.org"),
            Some("Curriculum Director".to_string())
        );
        assert_eq!(
            find_title("Jo Lee, CTO, jlee@x.org"),
            Some("Cto".to_string())
        );
        assert_eq!(find_title("Head Coach"), None);
    }

    #[test]
    fn name_heuristic_rejects_navigation_text() {
        let source = source();
        assert!(source.looks_like_name("Israel Vela"));
        assert!(source.looks_like_name("Kurt M. Buttleman"));
        assert!(!source.looks_like_name("Contact Us"));
        assert!(!source.looks_like_name("Meet The Team"));
        assert!(!source.looks_like_name("lowercase name"));
        assert!(!source.looks_like_name("X"));
    }

    #[test]
    fn page_discovery_stays_on_the_district_domain() {
        let base = Url::parse("https://www.kent.k12.wa.us/").expect("url");
        let homepage = r#"
            <html><body>
            <a href="/our-district/leadership">Leadership</a>
            <a href="/athletics">Athletics</a>
            <a href="https://twitter.com/kentsd">Contact us on Twitter</a>
            </body></html>"#;
        let pages = source().discover_pages(homepage, &base);

        assert_eq!(pages[0].as_str(), "https://www.kent.k12.wa.us/our-district/leadership");
        assert!(pages.iter().all(|p| p.host_str() == base.host_str()));
        // common paths are probed even when unlinked
        assert!(pages
            .iter()
            .any(|p| p.as_str() == "https://www.kent.k12.wa.us/staff"));
        assert!(pages.len() <= 10);
    }

    #[test]
    fn districts_without_a_website_are_not_wanted() {
        let source = source();
        let mut district = District::new("Kent School District", "WA");
        assert!(!source.wants(&district));
        district.website = Some("https://www.kent.k12.wa.us".into());
        assert!(source.wants(&district));
    }
}
