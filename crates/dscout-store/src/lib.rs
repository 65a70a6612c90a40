//! Snapshot persistence: the canonical district document plus its
//! publicly-served mirror, kept in lockstep on every save.

use std::path::{Path, PathBuf};

use dscout_core::Snapshot;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

pub const CRATE_NAME: &str = "dscout-store";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reading snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("writing snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("mirror diverged from canonical snapshot ({canonical} != {mirror})")]
    MirrorDiverged { canonical: String, mirror: String },
}

/// Load/save of the canonical entity collection. Every save overwrites both
/// the canonical document and the mirror with identical bytes; a save that
/// updates one without the other is a defect, so the write path verifies
/// lockstep before returning.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    data_path: PathBuf,
    mirror_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(data_path: impl Into<PathBuf>, mirror_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            mirror_path: mirror_path.into(),
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn mirror_path(&self) -> &Path {
        &self.mirror_path
    }

    pub fn sha256_hex(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.data_path).await.unwrap_or(false)
    }

    pub async fn load(&self) -> Result<Snapshot, StoreError> {
        let bytes = fs::read(&self.data_path).await.map_err(|source| StoreError::Read {
            path: self.data_path.clone(),
            source,
        })?;
        let snapshot = serde_json::from_slice(&bytes)?;
        debug!(path = %self.data_path.display(), bytes = bytes.len(), "loaded snapshot");
        Ok(snapshot)
    }

    /// Serialize once, write the same bytes to the canonical path and the
    /// mirror, then verify the two files hash identically. Failures here are
    /// fatal for an enrichment run and must be surfaced to the caller.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        write_atomic(&self.data_path, &bytes).await?;
        write_atomic(&self.mirror_path, &bytes).await?;
        self.verify_lockstep().await?;
        info!(
            path = %self.data_path.display(),
            mirror = %self.mirror_path.display(),
            districts = snapshot.districts.len(),
            bytes = bytes.len(),
            "saved snapshot"
        );
        Ok(())
    }

    /// Confirm the canonical snapshot and its mirror are byte-for-byte equal.
    pub async fn verify_lockstep(&self) -> Result<(), StoreError> {
        let canonical = fs::read(&self.data_path).await.map_err(|source| StoreError::Read {
            path: self.data_path.clone(),
            source,
        })?;
        let mirror = fs::read(&self.mirror_path).await.map_err(|source| StoreError::Read {
            path: self.mirror_path.clone(),
            source,
        })?;
        let canonical_hash = Self::sha256_hex(&canonical);
        let mirror_hash = Self::sha256_hex(&mirror);
        if canonical_hash != mirror_hash {
            return Err(StoreError::MirrorDiverged {
                canonical: canonical_hash,
                mirror: mirror_hash,
            });
        }
        Ok(())
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).await.map_err(write_err)?;

    let temp_path = parent.join(format!(".{}.tmp", Uuid::new_v4()));
    let mut file = fs::File::create(&temp_path).await.map_err(write_err)?;
    file.write_all(bytes).await.map_err(write_err)?;
    file.flush().await.map_err(write_err)?;
    drop(file);

    match fs::rename(&temp_path, path).await {
        Ok(()) => Ok(()),
        Err(err) => {
            let _ = fs::remove_file(&temp_path).await;
            Err(write_err(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dscout_core::District;
    use tempfile::tempdir;

    fn sample_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::default();
        let mut d = District::new("Kent School District", "WA");
        d.city = Some("Kent".into());
        d.enrollment = Some(25000);
        snapshot.districts.push(d);
        snapshot.meta.sources = vec!["USASpending.gov".into()];
        snapshot
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempdir().expect("tempdir");
        let store = SnapshotStore::new(dir.path().join("data/districts.json"), dir.path().join("docs/data.json"));
        let snapshot = sample_snapshot();

        store.save(&snapshot).await.expect("save");
        let loaded = store.load().await.expect("load");
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn mirror_is_byte_identical_after_save() {
        let dir = tempdir().expect("tempdir");
        let store = SnapshotStore::new(dir.path().join("districts.json"), dir.path().join("mirror.json"));
        store.save(&sample_snapshot()).await.expect("save");

        let canonical = std::fs::read(store.data_path()).expect("canonical");
        let mirror = std::fs::read(store.mirror_path()).expect("mirror");
        assert_eq!(canonical, mirror);
        store.verify_lockstep().await.expect("lockstep");
    }

    #[tokio::test]
    async fn diverged_mirror_is_detected() {
        let dir = tempdir().expect("tempdir");
        let store = SnapshotStore::new(dir.path().join("districts.json"), dir.path().join("mirror.json"));
        store.save(&sample_snapshot()).await.expect("save");

        std::fs::write(store.mirror_path(), b"{}").expect("tamper");
        let err = store.verify_lockstep().await.expect_err("must diverge");
        assert!(matches!(err, StoreError::MirrorDiverged { .. }));
    }

    #[tokio::test]
    async fn loading_a_missing_snapshot_fails() {
        let dir = tempdir().expect("tempdir");
        let store = SnapshotStore::new(dir.path().join("missing.json"), dir.path().join("mirror.json"));
        assert!(!store.exists().await);
        assert!(store.load().await.is_err());
    }
}
