//! Name normalization, similarity scoring, and the candidate matcher that
//! links free-text organization names to canonical district records.

use dscout_core::District;
use uuid::Uuid;

pub const CRATE_NAME: &str = "dscout-match";

/// Organizational boilerplate stripped before comparison, in removal order.
/// Matched as whole words so "academy" never eats part of another word.
const BOILERPLATE: &[&str] = &[
    "school district",
    "unified school district",
    "public schools",
    "city schools",
    "county schools",
    "independent school district",
    "isd",
    "usd",
    "sd",
    "ps",
    "unified",
    "schools",
    "school",
    "district",
    "elementary",
    "middle",
    "high",
    "academy",
    "k-12",
    "k12",
];

/// Substring containment is a stronger signal than edit similarity; it floors
/// the score here.
const SUBSTRING_FLOOR: f64 = 0.9;

/// Added when the candidate's city appears inside the source name. Applied on
/// top of the base score, so a raw score can exceed 1.0; ranking uses the raw
/// value and only the reported confidence is clamped.
const CITY_BOOST: f64 = 0.2;

fn canon_word(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn remove_phrase(words: &mut Vec<String>, needle: &[String]) {
    if needle.is_empty() {
        return;
    }
    let mut i = 0;
    while i + needle.len() <= words.len() {
        if words[i..i + needle.len()] == *needle {
            words.drain(i..i + needle.len());
        } else {
            i += 1;
        }
    }
}

/// Canonicalize a free-text organization name into a comparable token form.
/// Lower-cases, strips boilerplate tokens as whole words, drops everything
/// outside `[a-z0-9 ]`, and collapses whitespace. Idempotent.
pub fn normalize(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let mut words: Vec<String> = lower
        .split_whitespace()
        .map(canon_word)
        .filter(|w| !w.is_empty())
        .collect();
    for phrase in BOILERPLATE {
        let needle: Vec<String> = phrase.split_whitespace().map(canon_word).collect();
        remove_phrase(&mut words, &needle);
    }
    words.join(" ")
}

/// Similarity between two pre-normalized names. Symmetric, 1.0 for identical
/// strings, 0.0 for disjoint ones, with exact substring containment forcing
/// the score to at least [`SUBSTRING_FLOOR`].
pub fn score(a: &str, b: &str) -> f64 {
    let base = strsim::normalized_levenshtein(a, b);
    if !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a)) {
        base.max(SUBSTRING_FLOOR)
    } else {
        base
    }
}

/// [`score`] plus the city co-occurrence boost. Returns the raw, unclamped
/// ranking score.
pub fn score_against(source: &str, candidate: &str, city: Option<&str>) -> f64 {
    let mut value = score(source, candidate);
    if let Some(city) = city {
        let city = city.to_lowercase();
        if !city.is_empty() && source.contains(&city) {
            value += CITY_BOOST;
        }
    }
    value
}

#[derive(Debug, Clone, Copy)]
pub struct MatchConfig {
    /// Best candidate must score strictly above this to count as a match.
    pub accept_threshold: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.5,
        }
    }
}

/// A resolved link from a free-text source name to a canonical district.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub id: Uuid,
    pub name: String,
    pub state: String,
    pub enrollment: Option<u32>,
    /// Clamped to 1.0 and rounded to 2 decimals for display; the unclamped
    /// score only orders candidates internally.
    pub confidence: f64,
}

/// Greedy per-record matcher over a fixed district slice. Candidate names are
/// normalized once up front. It does not solve a global assignment problem:
/// two source records may legitimately resolve to the same district, and
/// callers that care should count and log that.
pub struct Matcher<'a> {
    districts: &'a [District],
    normalized: Vec<String>,
    config: MatchConfig,
}

impl<'a> Matcher<'a> {
    pub fn new(districts: &'a [District]) -> Self {
        Self::with_config(districts, MatchConfig::default())
    }

    pub fn with_config(districts: &'a [District], config: MatchConfig) -> Self {
        let normalized = districts.iter().map(|d| normalize(&d.name)).collect();
        Self {
            districts,
            normalized,
            config,
        }
    }

    /// Best-scoring district for a free-text name, or `None` when nothing
    /// clears the acceptance threshold. Ties keep the first-seen candidate
    /// (strict `>` comparison).
    pub fn best_match(&self, source_name: &str) -> Option<Match> {
        let source = normalize(source_name);
        let mut best: Option<(f64, usize)> = None;
        for (idx, district) in self.districts.iter().enumerate() {
            let value = score_against(&source, &self.normalized[idx], district.city.as_deref());
            if best.map_or(true, |(b, _)| value > b) {
                best = Some((value, idx));
            }
        }
        let (raw, idx) = best?;
        if raw <= self.config.accept_threshold {
            return None;
        }
        let district = &self.districts[idx];
        Some(Match {
            id: district.id,
            name: district.name.clone(),
            state: district.state.clone(),
            enrollment: district.enrollment,
            confidence: round2(raw.min(1.0)),
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
