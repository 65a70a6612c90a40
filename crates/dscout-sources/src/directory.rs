//! Florida DOE superintendent directory: one page listing every district's
//! superintendent with a mailto link. Authoritative-directory provenance.

use async_trait::async_trait;
use dscout_core::{Contact, Provenance};
use scraper::{Html, Selector};
use tracing::debug;

use crate::{ContactFeed, NamedContact, SourceError};

const DIRECTORY_URL: &str =
    "https://www.fldoe.org/accountability/data-sys/school-dis-data/superintendents.stml";

pub struct FloridaDoeDirectory {
    client: reqwest::Client,
    url: String,
}

impl FloridaDoeDirectory {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: DIRECTORY_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// Rows of the first table: district, superintendent, optional mailto cell.
pub fn parse_directory(html: &str) -> Result<Vec<NamedContact>, SourceError> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;
    let link_sel = selector("a[href]")?;

    let Some(table) = document.select(&table_sel).next() else {
        return Err(SourceError::Malformed("directory page has no table".into()));
    };

    let mut contacts = Vec::new();
    for row in table.select(&row_sel).skip(1) {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        if cells.len() < 2 {
            continue;
        }
        let district = cells[0].text().collect::<String>().trim().to_string();
        let name = cells[1].text().collect::<String>().trim().to_string();
        if district.is_empty() || name.is_empty() {
            continue;
        }

        let email = cells.get(2).and_then(|cell| {
            cell.select(&link_sel)
                .filter_map(|a| a.value().attr("href"))
                .find_map(|href| href.strip_prefix("mailto:"))
                .map(str::to_string)
        });

        contacts.push(NamedContact {
            org_name: district,
            contact: Contact {
                name,
                title: Some("Superintendent".into()),
                email,
                email_guessed: false,
                phone: None,
                source: Some("Florida DOE".into()),
                provenance: Provenance::Directory,
            },
        });
    }
    Ok(contacts)
}

fn selector(raw: &str) -> Result<Selector, SourceError> {
    Selector::parse(raw).map_err(|e| SourceError::Malformed(e.to_string()))
}

#[async_trait]
impl ContactFeed for FloridaDoeDirectory {
    fn source_id(&self) -> &'static str {
        "fldoe-directory"
    }

    async fn fetch(&self) -> Result<Vec<NamedContact>, SourceError> {
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }
        let body = resp.text().await?;
        let contacts = parse_directory(&body)?;
        debug!(count = contacts.len(), "parsed directory rows");
        Ok(contacts)
    }
}
