//! Competitor subdomain lists: a text file of `<org>.vendor.example` lines
//! turned into free-text org names for the flag pass to match.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::{OrgFeed, SourceError};

pub struct SubdomainList {
    path: PathBuf,
    strip_suffix: String,
}

impl SubdomainList {
    pub fn new(path: impl Into<PathBuf>, strip_suffix: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            strip_suffix: strip_suffix.into(),
        }
    }
}

/// One line of the list file to a matchable org name: vendor suffix dropped,
/// dashes back to spaces.
pub fn clean_subdomain(line: &str, strip_suffix: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let stem = trimmed.strip_suffix(strip_suffix).unwrap_or(trimmed);
    let name = stem.replace('-', " ").trim().to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

pub fn parse_list(text: &str, strip_suffix: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| clean_subdomain(line, strip_suffix))
        .collect()
}

#[async_trait]
impl OrgFeed for SubdomainList {
    fn source_id(&self) -> &'static str {
        "subdomain-list"
    }

    async fn fetch(&self) -> Result<Vec<String>, SourceError> {
        let text = std::fs::read_to_string(&self.path)?;
        Ok(parse_list(&text, &self.strip_suffix))
    }
}
