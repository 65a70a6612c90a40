//! Ballotpedia superintendent lookup: fetch the district's page, read the
//! infobox, and guess an email from the district's web domain. Everything
//! found here is heuristic-grade provenance.

use async_trait::async_trait;
use dscout_core::{Contact, District, Provenance, TitleCategory};
use scraper::{Html, Selector};
use tracing::debug;

use crate::email::{best_guess, extract_domain};
use crate::{DistrictContactSource, SourceError};

const BASE_URL: &str = "https://ballotpedia.org";

fn state_full_name(code: &str) -> Option<&'static str> {
    match code {
        "WA" => Some("Washington"),
        "OR" => Some("Oregon"),
        "CA" => Some("California"),
        "TX" => Some("Texas"),
        "FL" => Some("Florida"),
        "NY" => Some("New_York"),
        _ => None,
    }
}

pub struct BallotpediaSource {
    client: reqwest::Client,
    base_url: String,
}

impl BallotpediaSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn candidate_urls(&self, district: &District) -> Vec<String> {
        let page = district.name.replace(' ', "_");
        let mut urls = Vec::new();
        if let Some(state) = state_full_name(&district.state) {
            urls.push(format!("{}/{page},_{state}", self.base_url));
        }
        urls.push(format!("{}/{page}", self.base_url));
        urls
    }
}

fn strip_bracketed(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// Pull the superintendent's name out of a Ballotpedia infobox, if the page
/// has one.
pub fn superintendent_from_html(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let row_sel = Selector::parse("table.infobox tr").ok()?;
    let cell_sel = Selector::parse("th, td").ok()?;

    for row in document.select(&row_sel) {
        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|c| c.text().collect::<String>().trim().to_string())
            .collect();
        if cells.len() < 2 {
            continue;
        }
        if cells[0].to_lowercase().contains("superintendent") {
            let name = strip_bracketed(&cells[1]);
            if name.len() > 2 {
                return Some(name);
            }
        }
    }
    None
}

#[async_trait]
impl DistrictContactSource for BallotpediaSource {
    fn source_id(&self) -> &'static str {
        "ballotpedia"
    }

    /// Skip districts that already hold a superintendent; the merge engine
    /// would refuse to downgrade them anyway, so the fetch is wasted work.
    fn wants(&self, district: &District) -> bool {
        !district.has_category(TitleCategory::Superintendent)
    }

    async fn contacts_for(&self, district: &District) -> Result<Vec<Contact>, SourceError> {
        for url in self.candidate_urls(district) {
            let resp = match self.client.get(&url).send().await {
                Ok(resp) => resp,
                Err(err) => {
                    debug!(%url, error = %err, "ballotpedia fetch failed, trying next url");
                    continue;
                }
            };
            if !resp.status().is_success() {
                continue;
            }
            let body = resp.text().await?;
            // Ballotpedia serves a stub page for unknown districts
            if body.contains("does not have") {
                continue;
            }
            if let Some(name) = superintendent_from_html(&body) {
                let email = district
                    .website
                    .as_deref()
                    .and_then(extract_domain)
                    .and_then(|domain| best_guess(&name, &domain));
                let email_guessed = email.is_some();
                return Ok(vec![Contact {
                    name,
                    title: Some("Superintendent".into()),
                    email,
                    email_guessed,
                    phone: None,
                    source: Some("Ballotpedia".into()),
                    provenance: Provenance::Guessed,
                }]);
            }
        }
        Ok(Vec::new())
    }
}
