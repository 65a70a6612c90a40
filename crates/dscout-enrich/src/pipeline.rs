//! The four enrichment pass shapes. Every pass loads the full snapshot,
//! mutates some subset of districts through the merge policy, and writes the
//! snapshot back; a failed save aborts the run.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use dscout_core::Snapshot;
use dscout_match::{MatchConfig, Matcher};
use dscout_sources::{
    AwardSource, ContactFeed, DistrictContactSource, NamedContact, OrgFeed, Throttle,
};
use dscout_store::SnapshotStore;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::merge::{apply_flag, merge_awards, merge_contact, MergeOutcome};

/// Matches at or above this confidence land in the report's high bucket.
const HIGH_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, Copy)]
pub struct EnrichOptions {
    pub save_every: usize,
    pub match_config: MatchConfig,
    /// Skip districts below this enrollment in the award pass; recipient
    /// searches are expensive and small districts rarely show up.
    pub min_enrollment: Option<u32>,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            save_every: 10,
            match_config: MatchConfig::default(),
            min_enrollment: None,
        }
    }
}

/// What a pass did, including every source record that found no canonical
/// district. "Unmatched" is a valid terminal state, not a silent drop.
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub source_id: String,
    pub processed: usize,
    pub merged: usize,
    pub skipped: usize,
    pub errors: usize,
    pub unmatched: Vec<String>,
}

impl PassSummary {
    fn new(source_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            processed: 0,
            merged: 0,
            skipped: 0,
            errors: 0,
            unmatched: Vec::new(),
        }
    }

    fn count(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Inserted | MergeOutcome::Replaced => self.merged += 1,
            MergeOutcome::Skipped => self.skipped += 1,
        }
    }
}

pub struct Enricher {
    store: SnapshotStore,
    options: EnrichOptions,
}

impl Enricher {
    pub fn new(store: SnapshotStore, options: EnrichOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    async fn load(&self) -> Result<Snapshot> {
        self.store
            .load()
            .await
            .context("loading canonical snapshot")
    }

    /// Persisting is the only durability mechanism a run has; failure here is
    /// fatal and must not be swallowed.
    async fn checkpoint(&self, snapshot: &mut Snapshot) -> Result<()> {
        snapshot.touch();
        self.store
            .save(snapshot)
            .await
            .context("persisting snapshot")
    }

    /// Query a per-district contact source, merging whatever it returns.
    /// Progress is checkpointed every `save_every` processed districts so an
    /// interrupted run keeps its accumulated work.
    pub async fn run_contact_pass(
        &self,
        source: &dyn DistrictContactSource,
        throttle: &Throttle,
    ) -> Result<PassSummary> {
        let mut snapshot = self.load().await?;
        let mut summary = PassSummary::new(source.source_id());
        let total = snapshot.districts.len();
        let mut since_save = 0usize;

        for idx in 0..total {
            let district = &snapshot.districts[idx];
            if !source.wants(district) {
                summary.skipped += 1;
                continue;
            }
            info!(
                district = %district.name,
                source = source.source_id(),
                "looking up contacts ({}/{})",
                idx + 1,
                total
            );

            let candidates = match source.contacts_for(district).await {
                Ok(candidates) => candidates,
                Err(err) => {
                    warn!(district = %district.name, error = %err, "contact lookup failed, skipping");
                    summary.errors += 1;
                    throttle.wait().await;
                    continue;
                }
            };
            summary.processed += 1;

            let district = &mut snapshot.districts[idx];
            for contact in candidates {
                summary.count(merge_contact(district, contact));
            }

            since_save += 1;
            if since_save >= self.options.save_every {
                self.checkpoint(&mut snapshot).await?;
                since_save = 0;
            }
            throttle.wait().await;
        }

        self.checkpoint(&mut snapshot).await?;
        Ok(summary)
    }

    /// Pull a bulk name-keyed contact feed, resolve each record through the
    /// matcher, and merge the ones that land.
    pub async fn run_contact_feed_pass(&self, feed: &dyn ContactFeed) -> Result<PassSummary> {
        let mut snapshot = self.load().await?;
        let mut summary = PassSummary::new(feed.source_id());

        let records = match feed.fetch().await {
            Ok(records) => records,
            Err(err) => {
                warn!(source = feed.source_id(), error = %err, "feed fetch failed, nothing to merge");
                summary.errors += 1;
                return Ok(summary);
            }
        };

        let resolved = resolve_records(&snapshot, self.options.match_config, records);
        let mut hits: HashMap<Uuid, u32> = HashMap::new();

        for (record, found) in resolved {
            summary.processed += 1;
            let Some(found) = found else {
                info!(org = %record.org_name, "no district matched");
                summary.unmatched.push(record.org_name);
                continue;
            };
            note_repeat_match(&mut hits, found.id, &found.name, &record.org_name);
            info!(
                org = %record.org_name,
                district = %found.name,
                confidence = found.confidence,
                "matched contact record"
            );
            if let Some(district) = snapshot.district_by_id_mut(found.id) {
                summary.count(merge_contact(district, record.contact));
            }
        }

        self.checkpoint(&mut snapshot).await?;
        Ok(summary)
    }

    /// Re-query award totals per district. A successful fetch fully replaces
    /// the district's award fields; an empty or failed fetch leaves them be.
    pub async fn run_award_pass(
        &self,
        source: &dyn AwardSource,
        throttle: &Throttle,
    ) -> Result<PassSummary> {
        let mut snapshot = self.load().await?;
        let mut summary = PassSummary::new(source.source_id());
        let total = snapshot.districts.len();
        let mut since_save = 0usize;

        for idx in 0..total {
            let district = &snapshot.districts[idx];
            if let Some(floor) = self.options.min_enrollment {
                if district.enrollment.unwrap_or(0) < floor {
                    summary.skipped += 1;
                    continue;
                }
            }
            info!(district = %district.name, "fetching awards ({}/{})", idx + 1, total);

            match source.awards_for(district).await {
                Ok(Some(batch)) => {
                    summary.processed += 1;
                    summary.merged += 1;
                    info!(
                        district = %district.name,
                        total = batch.total,
                        count = batch.count,
                        "replacing award data"
                    );
                    merge_awards(&mut snapshot.districts[idx], batch);
                }
                Ok(None) => {
                    summary.processed += 1;
                    summary.skipped += 1;
                }
                Err(err) => {
                    warn!(district = %district.name, error = %err, "award fetch failed, skipping");
                    summary.errors += 1;
                }
            }

            since_save += 1;
            if since_save >= self.options.save_every {
                self.checkpoint(&mut snapshot).await?;
                since_save = 0;
            }
            throttle.wait().await;
        }

        self.checkpoint(&mut snapshot).await?;
        Ok(summary)
    }

    /// Match a list of free-text org names and recompute a boolean flag over
    /// the whole collection. Match stats land in snapshot meta so the run's
    /// outcome is visible next to the data it produced.
    pub async fn run_flag_pass(&self, feed: &dyn OrgFeed, flag: &str) -> Result<PassSummary> {
        let mut snapshot = self.load().await?;
        let mut summary = PassSummary::new(feed.source_id());

        let names = match feed.fetch().await {
            Ok(names) => names,
            Err(err) => {
                warn!(source = feed.source_id(), error = %err, "feed fetch failed, flags unchanged");
                summary.errors += 1;
                return Ok(summary);
            }
        };

        let mut matched: HashSet<Uuid> = HashSet::new();
        let mut hits: HashMap<Uuid, u32> = HashMap::new();
        let mut high_confidence = 0usize;
        {
            let matcher = Matcher::with_config(&snapshot.districts, self.options.match_config);
            for name in &names {
                summary.processed += 1;
                match matcher.best_match(name) {
                    Some(found) => {
                        note_repeat_match(&mut hits, found.id, &found.name, name);
                        if found.confidence >= HIGH_CONFIDENCE {
                            high_confidence += 1;
                        }
                        matched.insert(found.id);
                        summary.merged += 1;
                    }
                    None => summary.unmatched.push(name.clone()),
                }
            }
        }

        apply_flag(&mut snapshot.districts, flag, &matched);
        snapshot.meta.extra.insert(
            format!("{flag}_enrichment"),
            json!({
                "records": summary.processed,
                "matched": summary.merged,
                "high_confidence": high_confidence,
                "medium_confidence": summary.merged - high_confidence,
                "unmatched": summary.unmatched.len(),
                "districts_flagged": matched.len(),
            }),
        );

        self.checkpoint(&mut snapshot).await?;
        Ok(summary)
    }
}

fn resolve_records(
    snapshot: &Snapshot,
    config: MatchConfig,
    records: Vec<NamedContact>,
) -> Vec<(NamedContact, Option<dscout_match::Match>)> {
    let matcher = Matcher::with_config(&snapshot.districts, config);
    records
        .into_iter()
        .map(|record| {
            let found = matcher.best_match(&record.org_name);
            (record, found)
        })
        .collect()
}

/// Many-to-one matches are permitted (the matcher is greedy per record), but
/// they are worth a warning when they happen.
fn note_repeat_match(hits: &mut HashMap<Uuid, u32>, id: Uuid, district: &str, org: &str) {
    let count = hits.entry(id).or_insert(0);
    *count += 1;
    if *count > 1 {
        warn!(district, org, "district matched by more than one source record");
    }
}
