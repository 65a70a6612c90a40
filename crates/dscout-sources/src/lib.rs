//! Source collaborator contracts and the concrete data sources that feed the
//! enrichment passes.

use std::time::Duration;

use async_trait::async_trait;
use dscout_core::{AwardBatch, Contact, District};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod award;
pub mod ballotpedia;
pub mod competitors;
pub mod directory;
pub mod email;
pub mod manual;
pub mod seed;
pub mod staff;

pub use award::UsaSpendingClient;
pub use ballotpedia::BallotpediaSource;
pub use competitors::SubdomainList;
pub use directory::FloridaDoeDirectory;
pub use manual::ManualContacts;
pub use staff::StaffDirectorySource;

pub const CRATE_NAME: &str = "dscout-sources";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("reading source input: {0}")]
    Io(#[from] std::io::Error),
}

/// Fixed inter-request politeness delay. Outbound calls to the same host must
/// be spaced out; skipping this is not an optimization, it gets runs blocked.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    delay: Duration,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// A contact candidate keyed by free-text organization name. The enrichment
/// pass resolves the name to a canonical district id before merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedContact {
    pub org_name: String,
    pub contact: Contact,
}

/// A source queried once per canonical district (award lookups, per-district
/// page scrapes).
#[async_trait]
pub trait AwardSource: Send + Sync {
    fn source_id(&self) -> &'static str;

    /// `Ok(None)` means the query succeeded but found nothing; existing award
    /// data on the district is left untouched in that case.
    async fn awards_for(&self, district: &District) -> Result<Option<AwardBatch>, SourceError>;
}

/// A contact source queried once per canonical district.
#[async_trait]
pub trait DistrictContactSource: Send + Sync {
    fn source_id(&self) -> &'static str;

    /// Cheap pre-check so the pass can skip network work for districts this
    /// source has nothing to add to.
    fn wants(&self, _district: &District) -> bool {
        true
    }

    async fn contacts_for(&self, district: &District) -> Result<Vec<Contact>, SourceError>;
}

/// A bulk contact feed keyed by free-text organization names (state directory
/// tables, manual-research tables).
#[async_trait]
pub trait ContactFeed: Send + Sync {
    fn source_id(&self) -> &'static str;

    async fn fetch(&self) -> Result<Vec<NamedContact>, SourceError>;
}

/// A bulk feed of bare organization names (competitor subdomain lists).
#[async_trait]
pub trait OrgFeed: Send + Sync {
    fn source_id(&self) -> &'static str;

    async fn fetch(&self) -> Result<Vec<String>, SourceError>;
}
