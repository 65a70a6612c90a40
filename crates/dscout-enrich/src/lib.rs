//! Record merge policy and the enrichment passes that wire sources into the
//! canonical district collection.

pub mod config;
pub mod merge;
pub mod pipeline;

pub use config::EnrichConfig;
pub use merge::{apply_flag, merge_awards, merge_contact, MergeOutcome};
pub use pipeline::{Enricher, EnrichOptions, PassSummary};

pub const CRATE_NAME: &str = "dscout-enrich";
