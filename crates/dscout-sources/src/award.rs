//! USASpending award search client: recipient-name queries filtered by state,
//! time window, grant type codes, and optional CFDA program numbers.

use async_trait::async_trait;
use dscout_core::{AwardBatch, AwardRecord, District};
use serde_json::{json, Value};
use tracing::debug;

use crate::{AwardSource, SourceError};

const ENDPOINT: &str = "https://api.usaspending.gov/api/v2/search/spending_by_award/";

/// Grant award type codes on the USASpending API.
const GRANT_TYPE_CODES: [&str; 4] = ["02", "03", "04", "05"];

/// Education grant CFDA program numbers: Title I, IDEA, Supporting Effective
/// Instruction, ESSER, Safe Schools, 21st Century, GEER.
pub const EDUCATION_PROGRAMS: [&str; 7] = [
    "84.010", "84.027", "84.367", "84.425", "84.184", "84.287", "84.424",
];

const DESCRIPTION_CAP: usize = 200;

#[derive(Debug, Clone)]
pub struct AwardQuery {
    pub start_date: String,
    pub end_date: String,
    pub program_numbers: Vec<String>,
    pub result_limit: u32,
    pub detail_cap: usize,
}

impl Default for AwardQuery {
    fn default() -> Self {
        Self {
            start_date: "2023-01-01".into(),
            end_date: "2026-12-31".into(),
            program_numbers: Vec::new(),
            result_limit: 50,
            detail_cap: 10,
        }
    }
}

impl AwardQuery {
    pub fn education_programs(mut self) -> Self {
        self.program_numbers = EDUCATION_PROGRAMS.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Display label for the queried window, stored on each award record.
    fn year_label(&self) -> String {
        let start = self.start_date.get(..4).unwrap_or("");
        let end = self.end_date.get(..4).unwrap_or("");
        if start == end {
            start.to_string()
        } else {
            format!("{start}-{end}")
        }
    }
}

pub struct UsaSpendingClient {
    client: reqwest::Client,
    endpoint: String,
    query: AwardQuery,
}

impl UsaSpendingClient {
    pub fn new(client: reqwest::Client, query: AwardQuery) -> Self {
        Self {
            client,
            endpoint: ENDPOINT.to_string(),
            query,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn payload(&self, search_term: &str, state: &str) -> Value {
        let mut filters = json!({
            "recipient_search_text": [search_term],
            "recipient_locations": [{"country": "USA", "state": state}],
            "time_period": [{
                "start_date": self.query.start_date,
                "end_date": self.query.end_date,
            }],
            "award_type_codes": GRANT_TYPE_CODES,
        });
        if !self.query.program_numbers.is_empty() {
            filters["program_numbers"] = json!(self.query.program_numbers);
        }
        json!({
            "filters": filters,
            "fields": [
                "Award ID", "Recipient Name", "Award Amount",
                "Description", "Start Date", "CFDA Number",
            ],
            "page": 1,
            "limit": self.query.result_limit,
            "sort": "Award Amount",
            "order": "desc",
        })
    }
}

/// Drop organizational suffixes so the recipient search is not over-specific.
pub fn simplified_search_term(name: &str) -> String {
    let mut term = name.to_string();
    for suffix in [" School District", " Public Schools", " County"] {
        term = term.replace(suffix, "");
    }
    term.trim().to_string()
}

/// Parse the `results` array of a spending_by_award response. Missing amounts
/// and descriptions are defaults, not errors; enrichment is best-effort.
pub fn parse_results(body: &Value, year_label: &str) -> Result<Vec<(String, AwardRecord)>, SourceError> {
    let results = body
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::Malformed("missing results array".into()))?;

    let mut awards = Vec::with_capacity(results.len());
    for entry in results {
        let recipient = entry
            .get("Recipient Name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut description = entry
            .get("Description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        truncate_at_boundary(&mut description, DESCRIPTION_CAP);
        awards.push((
            recipient,
            AwardRecord {
                amount: entry.get("Award Amount").and_then(Value::as_f64).unwrap_or(0.0),
                description,
                program: entry
                    .get("CFDA Number")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                start_date: entry
                    .get("Start Date")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                year: year_label.to_string(),
            },
        ));
    }
    Ok(awards)
}

fn truncate_at_boundary(text: &mut String, max_bytes: usize) {
    if text.len() <= max_bytes {
        return;
    }
    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}

/// Keep only results whose recipient mentions the leading word of the search
/// term; recipient search is loose and returns neighboring organizations.
pub fn filter_matching(awards: Vec<(String, AwardRecord)>, search_term: &str) -> Vec<AwardRecord> {
    let Some(first_word) = search_term.to_lowercase().split_whitespace().next().map(str::to_string)
    else {
        return Vec::new();
    };
    awards
        .into_iter()
        .filter(|(recipient, _)| recipient.to_lowercase().contains(&first_word))
        .map(|(_, award)| award)
        .collect()
}

#[async_trait]
impl AwardSource for UsaSpendingClient {
    fn source_id(&self) -> &'static str {
        "usaspending"
    }

    async fn awards_for(&self, district: &District) -> Result<Option<AwardBatch>, SourceError> {
        let search_term = simplified_search_term(&district.name);
        debug!(district = %district.name, %search_term, "querying awards");

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&self.payload(&search_term, &district.state))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }

        let body: Value = resp.json().await?;
        let awards = parse_results(&body, &self.query.year_label())?;
        let matching = filter_matching(awards, &search_term);
        if matching.is_empty() {
            return Ok(None);
        }
        Ok(Some(AwardBatch::from_awards(matching, self.query.detail_cap)))
    }
}
