//! Hand-verified contact tables as a regular feed. Manual research carries
//! the top provenance rank, so the merge engine's precedence policy replaces
//! scraped or guessed entries without any special-cased fixup path.

use std::path::Path;

use async_trait::async_trait;
use dscout_core::{Contact, Provenance};

use crate::{ContactFeed, NamedContact, SourceError};

const SOURCE_LABEL: &str = "Manual research";

pub struct ManualContacts {
    entries: Vec<NamedContact>,
}

impl ManualContacts {
    pub fn new(entries: Vec<NamedContact>) -> Self {
        Self { entries }
    }

    /// Load a JSON array of `{org_name, contact}` entries. Provenance is
    /// forced to Verified regardless of what the file says; this source only
    /// holds hand-checked facts.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let text = std::fs::read_to_string(path)?;
        let mut entries: Vec<NamedContact> =
            serde_json::from_str(&text).map_err(|e| SourceError::Malformed(e.to_string()))?;
        for entry in &mut entries {
            entry.contact.provenance = Provenance::Verified;
            entry.contact.email_guessed = false;
            if entry.contact.source.is_none() {
                entry.contact.source = Some(SOURCE_LABEL.into());
            }
        }
        Ok(Self::new(entries))
    }

    /// Built-in research results: superintendent corrections plus technology
    /// and curriculum leadership, verified against district websites.
    pub fn builtin() -> Self {
        let entry = |org: &str, name: &str, title: &str, email: &str| NamedContact {
            org_name: org.to_string(),
            contact: Contact {
                name: name.to_string(),
                title: Some(title.to_string()),
                email: Some(email.to_string()),
                email_guessed: false,
                phone: None,
                source: Some(SOURCE_LABEL.into()),
                provenance: Provenance::Verified,
            },
        };

        Self::new(vec![
            entry(
                "Tacoma Public Schools",
                "Joshua Garcia",
                "Superintendent",
                "jgarcia@tacoma.k12.wa.us",
            ),
            entry(
                "Kent School District",
                "Israel Vela",
                "Superintendent",
                "israel.vela@kent.k12.wa.us",
            ),
            entry(
                "Federal Way Public Schools",
                "Dani Pfeiffer",
                "Superintendent",
                "dpfeiffer@fwps.org",
            ),
            entry(
                "Northshore School District",
                "Michael Tolley",
                "Superintendent",
                "mtolley@nsd.org",
            ),
            entry(
                "Bellevue School District",
                "Kelly Aramaki",
                "Superintendent",
                "aramakik@bsd405.org",
            ),
            entry(
                "Seattle Public Schools",
                "Krista Lundquist",
                "Chief Technology Officer",
                "klundquist@seattleschools.org",
            ),
            entry(
                "Tacoma Public Schools",
                "Kathryn McCarthy",
                "Chief Technology Officer",
                "kmccarthy@tacoma.k12.wa.us",
            ),
            entry(
                "Los Angeles USD",
                "David Brummett",
                "Chief Information Officer",
                "david.brummett@lausd.net",
            ),
            entry(
                "Houston ISD",
                "Mark Bedell",
                "Chief Technology Officer",
                "mark.bedell@houstonisd.org",
            ),
            entry(
                "Seattle Public Schools",
                "Caleb Perkins",
                "Chief Academic Officer",
                "cperkins@seattleschools.org",
            ),
            entry(
                "Los Angeles USD",
                "Alison Yoshimoto-Towery",
                "Chief Academic Officer",
                "alison.towery@lausd.net",
            ),
        ])
    }
}

#[async_trait]
impl ContactFeed for ManualContacts {
    fn source_id(&self) -> &'static str {
        "manual-research"
    }

    async fn fetch(&self) -> Result<Vec<NamedContact>, SourceError> {
        Ok(self.entries.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn builtin_entries_are_all_verified() {
        let feed = ManualContacts::builtin();
        let entries = feed.fetch().await.expect("fetch");
        assert!(!entries.is_empty());
        assert!(entries
            .iter()
            .all(|e| e.contact.provenance == Provenance::Verified && !e.contact.email_guessed));
    }

    #[tokio::test]
    async fn json_files_are_forced_to_verified_provenance() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"[{{"org_name": "Kent School District",
                 "contact": {{"name": "Israel Vela", "title": "Superintendent",
                              "email": "israel.vela@kent.k12.wa.us",
                              "provenance": "guessed"}}}}]"#
        )
        .expect("write");

        let feed = ManualContacts::from_json_file(file.path()).expect("load");
        let entries = feed.fetch().await.expect("fetch");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].contact.provenance, Provenance::Verified);
        assert_eq!(entries[0].contact.source.as_deref(), Some("Manual research"));
    }
}
