//! Run configuration, environment-first with CLI overrides layered on top.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Canonical snapshot document.
    pub data_path: PathBuf,
    /// Publicly-served mirror, kept byte-for-byte in lockstep.
    pub mirror_path: PathBuf,
    /// Checkpoint the snapshot after this many processed districts.
    pub save_every: usize,
    /// Politeness delay between outbound calls to the same host.
    pub delay_ms: u64,
}

impl EnrichConfig {
    pub fn from_env() -> Self {
        Self {
            data_path: std::env::var("DSCOUT_DATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/districts.json")),
            mirror_path: std::env::var("DSCOUT_MIRROR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("docs/data.json")),
            save_every: std::env::var("DSCOUT_SAVE_EVERY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            delay_ms: std::env::var("DSCOUT_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
        }
    }
}
