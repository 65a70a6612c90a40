//! Core domain model and provenance types for dscout.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const CRATE_NAME: &str = "dscout-core";

/// How much we trust a contact record. Ordering matters: a merge may replace a
/// lower-ranked contact with a higher-ranked one, never the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Inferred (pattern-guessed email, loose page-text extraction).
    #[default]
    Guessed,
    /// Scraped from an authoritative state directory.
    Directory,
    /// Hand-verified against the district's own site.
    Verified,
}

/// Controlled vocabulary of staff roles we track per district.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleCategory {
    Superintendent,
    AssistantSuperintendent,
    TechnologyChief,
    TechnologyDirector,
    Curriculum,
    Purchasing,
    Finance,
    Operations,
}

/// Ordered (pattern, category) table. "assistant superintendent" must be
/// checked before "superintendent" so the broader pattern does not shadow it.
const TITLE_PATTERNS: &[(&str, TitleCategory)] = &[
    ("assistant superintendent", TitleCategory::AssistantSuperintendent),
    ("deputy superintendent", TitleCategory::AssistantSuperintendent),
    ("superintendent", TitleCategory::Superintendent),
    ("chief technology", TitleCategory::TechnologyChief),
    ("chief information", TitleCategory::TechnologyChief),
    ("cto", TitleCategory::TechnologyChief),
    ("cio", TitleCategory::TechnologyChief),
    ("technology director", TitleCategory::TechnologyDirector),
    ("director of technology", TitleCategory::TechnologyDirector),
    ("it director", TitleCategory::TechnologyDirector),
    ("director of information", TitleCategory::TechnologyDirector),
    ("instructional technology", TitleCategory::TechnologyDirector),
    ("digital learning", TitleCategory::TechnologyDirector),
    ("curriculum", TitleCategory::Curriculum),
    ("chief academic", TitleCategory::Curriculum),
    ("academic officer", TitleCategory::Curriculum),
    ("purchasing", TitleCategory::Purchasing),
    ("procurement", TitleCategory::Purchasing),
    ("chief financial", TitleCategory::Finance),
    ("cfo", TitleCategory::Finance),
    ("business manager", TitleCategory::Finance),
    ("finance", TitleCategory::Finance),
    ("chief operating", TitleCategory::Operations),
    ("coo", TitleCategory::Operations),
    ("operations", TitleCategory::Operations),
];

impl TitleCategory {
    /// Case-insensitive match against the controlled vocabulary. Phrase
    /// patterns match as substrings; bare acronyms match whole words only,
    /// since "cto" is a substring of "director". A title that matches nothing
    /// yields `None`; such contacts are still stored but do not participate
    /// in "already has X" checks.
    pub fn classify(title: &str) -> Option<Self> {
        let lower = title.to_lowercase();
        let words: Vec<String> = lower
            .split_whitespace()
            .map(|w| w.chars().filter(|c| c.is_ascii_alphanumeric()).collect())
            .collect();
        TITLE_PATTERNS
            .iter()
            .find(|(pattern, _)| {
                if is_acronym(pattern) {
                    words.iter().any(|w| w == pattern)
                } else {
                    lower.contains(pattern)
                }
            })
            .map(|(_, category)| *category)
    }
}

fn is_acronym(pattern: &str) -> bool {
    pattern.len() <= 3 && !pattern.contains(' ')
}

/// One person attached to a district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_guessed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub provenance: Provenance,
}

impl Contact {
    pub fn category(&self) -> Option<TitleCategory> {
        self.title.as_deref().and_then(TitleCategory::classify)
    }

    pub fn email_matches(&self, other: &Contact) -> bool {
        match (&self.email, &other.email) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}

/// One federal grant award as stored on a district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardRecord {
    pub amount: f64,
    pub description: String,
    pub program: String,
    pub start_date: String,
    pub year: String,
}

/// CFDA program number for Title I grants.
pub const TITLE_I_PROGRAM: &str = "84.010";

/// A complete fetch result for one district. Totals cover every matched
/// award, including those cut from the capped detail list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardBatch {
    pub total: f64,
    pub count: u32,
    #[serde(default)]
    pub title_i: f64,
    pub details: Vec<AwardRecord>,
}

impl AwardBatch {
    pub fn from_awards(mut awards: Vec<AwardRecord>, detail_cap: usize) -> Self {
        let total = awards.iter().map(|a| a.amount).sum();
        let count = awards.len() as u32;
        let title_i = awards
            .iter()
            .filter(|a| a.program == TITLE_I_PROGRAM)
            .map(|a| a.amount)
            .sum();
        awards.truncate(detail_cap);
        Self {
            total,
            count,
            title_i,
            details: awards,
        }
    }
}

/// Canonical district record. `id` is assigned once at bootstrap and is the
/// only runtime key; name similarity links external records to an id, nothing
/// else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct District {
    pub id: Uuid,
    pub name: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment: Option<u32>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub federal_awards: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_i_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_awards: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub award_details: Vec<AwardRecord>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flags: BTreeMap<String, bool>,
}

impl District {
    pub fn new(name: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            state: state.into(),
            city: None,
            enrollment: None,
            kind: None,
            website: None,
            contacts: Vec::new(),
            federal_awards: 0.0,
            title_i_amount: None,
            recent_awards: None,
            award_details: Vec::new(),
            flags: BTreeMap::new(),
        }
    }

    /// Index of the current holder of a title category, if any.
    pub fn contact_in_category(&self, category: TitleCategory) -> Option<usize> {
        self.contacts
            .iter()
            .position(|c| c.category() == Some(category))
    }

    pub fn has_category(&self, category: TitleCategory) -> bool {
        self.contact_in_category(category).is_some()
    }
}

/// Free-form bookkeeping carried alongside the district list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The full canonical document: meta plus the ordered district list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub meta: SnapshotMeta,
    #[serde(default)]
    pub districts: Vec<District>,
}

impl Snapshot {
    pub fn district_by_id(&self, id: Uuid) -> Option<&District> {
        self.districts.iter().find(|d| d.id == id)
    }

    pub fn district_by_id_mut(&mut self, id: Uuid) -> Option<&mut District> {
        self.districts.iter_mut().find(|d| d.id == id)
    }

    pub fn touch(&mut self) {
        self.meta.updated = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_superintendent_is_not_superintendent() {
        assert_eq!(
            TitleCategory::classify("Assistant Superintendent of Technology"),
            Some(TitleCategory::AssistantSuperintendent)
        );
        assert_eq!(
            TitleCategory::classify("Superintendent"),
            Some(TitleCategory::Superintendent)
        );
        assert_eq!(
            TitleCategory::classify("Deputy Superintendent"),
            Some(TitleCategory::AssistantSuperintendent)
        );
    }

    #[test]
    fn technology_roles_split_chief_from_director() {
        assert_eq!(
            TitleCategory::classify("Chief Technology Officer"),
            Some(TitleCategory::TechnologyChief)
        );
        assert_eq!(
            TitleCategory::classify("CIO"),
            Some(TitleCategory::TechnologyChief)
        );
        assert_eq!(
            TitleCategory::classify("Director of Technology"),
            Some(TitleCategory::TechnologyDirector)
        );
    }

    #[test]
    fn acronyms_never_match_inside_longer_words() {
        // "director" contains "cto"; the acronym must not capture it
        assert_eq!(
            TitleCategory::classify("Curriculum Director"),
            Some(TitleCategory::Curriculum)
        );
        assert_eq!(
            TitleCategory::classify("Purchasing Director"),
            Some(TitleCategory::Purchasing)
        );
        assert_eq!(
            TitleCategory::classify("IT Director"),
            Some(TitleCategory::TechnologyDirector)
        );
        assert_eq!(
            TitleCategory::classify("C.T.O."),
            Some(TitleCategory::TechnologyChief)
        );
    }

    #[test]
    fn unknown_titles_classify_to_none() {
        assert_eq!(TitleCategory::classify("Head Coach"), None);
        assert_eq!(TitleCategory::classify(""), None);
    }

    #[test]
    fn provenance_ordering_ranks_verified_highest() {
        assert!(Provenance::Verified > Provenance::Directory);
        assert!(Provenance::Directory > Provenance::Guessed);
    }

    #[test]
    fn award_batch_totals_all_but_caps_details() {
        let mk = |amount: f64, program: &str| AwardRecord {
            amount,
            description: "grant".into(),
            program: program.into(),
            start_date: "2024-07-01".into(),
            year: "2024-2025".into(),
        };
        let batch = AwardBatch::from_awards(
            vec![mk(100.0, TITLE_I_PROGRAM), mk(200.0, "84.027"), mk(50.0, "84.425")],
            2,
        );
        assert_eq!(batch.total, 350.0);
        assert_eq!(batch.count, 3);
        assert_eq!(batch.details.len(), 2);
        assert_eq!(batch.title_i, 100.0);
    }

    #[test]
    fn title_i_sum_includes_awards_cut_from_the_detail_list() {
        let mk = |amount: f64, program: &str| AwardRecord {
            amount,
            description: "grant".into(),
            program: program.into(),
            start_date: "2024-07-01".into(),
            year: "2024-2025".into(),
        };
        // the API sorts by amount, so a small Title I award lands past the cap
        let batch = AwardBatch::from_awards(
            vec![mk(1000.0, "84.027"), mk(700.0, "84.425"), mk(100.0, TITLE_I_PROGRAM)],
            2,
        );
        assert_eq!(batch.total, 1800.0);
        assert_eq!(batch.title_i, 100.0);
        assert_eq!(batch.details.len(), 2);
    }

    #[test]
    fn email_match_is_case_insensitive() {
        let a = Contact {
            name: "Jane Roe".into(),
            title: Some("Superintendent".into()),
            email: Some("JRoe@district.org".into()),
            email_guessed: false,
            phone: None,
            source: None,
            provenance: Provenance::Verified,
        };
        let mut b = a.clone();
        b.name = "Dr. Jane Roe".into();
        b.email = Some("jroe@district.org".into());
        assert!(a.email_matches(&b));
    }

    #[test]
    fn snapshot_round_trips_unknown_meta_keys() {
        let raw = serde_json::json!({
            "meta": {"updated": null, "edclub_enrichment": true},
            "districts": []
        });
        let snap: Snapshot = serde_json::from_value(raw).unwrap();
        assert_eq!(snap.meta.extra.get("edclub_enrichment"), Some(&Value::Bool(true)));
    }
}
