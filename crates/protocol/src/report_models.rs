//! Research report models.
//!
//! The core treats a report as opaque beyond its `id`. The sections are
//! typed for rendering, but every field other than `id` falls back to its
//! default when it is absent, null, or of an unexpected type, so structural
//! delivery never depends on report contents.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Server-assigned identifier of a generated report.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ReportId(pub String);

impl ReportId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReportId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ReportId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A research paper or trial cited by the report.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Source {
    /// 1-based citation index used by `[n]` markers in the analysis.
    #[serde(deserialize_with = "lenient")]
    pub index: u32,
    #[serde(deserialize_with = "lenient")]
    pub title: String,
    #[serde(deserialize_with = "lenient")]
    pub journal: String,
    #[serde(deserialize_with = "lenient")]
    pub year: i32,
    #[serde(deserialize_with = "lenient")]
    pub pmid: String,
    #[serde(rename = "abstract", deserialize_with = "lenient")]
    pub abstract_text: String,
    #[serde(deserialize_with = "lenient")]
    pub url: String,
    #[serde(deserialize_with = "lenient")]
    pub citation_count: u64,
    #[serde(deserialize_with = "lenient")]
    pub relevance_reason: Option<String>,
}

/// A key finding with the sources supporting it.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Finding {
    #[serde(deserialize_with = "lenient")]
    pub statement: String,
    #[serde(deserialize_with = "lenient_list")]
    pub source_indices: Vec<u32>,
    /// "low", "medium" or "high".
    #[serde(deserialize_with = "lenient")]
    pub confidence: String,
}

/// An intervention protocol extracted from one source.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Protocol {
    #[serde(deserialize_with = "lenient")]
    pub name: String,
    #[serde(deserialize_with = "lenient")]
    pub species: String,
    #[serde(deserialize_with = "lenient")]
    pub dosage: String,
    #[serde(deserialize_with = "lenient")]
    pub frequency: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub duration: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub result: String,
    #[serde(deserialize_with = "lenient")]
    pub source_index: u32,
}

/// A complete research report as delivered by the `report` event.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResearchReport {
    pub id: ReportId,

    #[serde(default, deserialize_with = "lenient")]
    pub question: String,

    /// Generation timestamp as sent by the server (ISO 8601).
    #[serde(default, deserialize_with = "lenient")]
    pub generated_at: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub executive_summary: String,

    #[serde(default, deserialize_with = "lenient_list")]
    pub key_findings: Vec<Finding>,

    #[serde(default, deserialize_with = "lenient")]
    pub detailed_analysis: String,

    #[serde(default, deserialize_with = "lenient_list")]
    pub protocols: Vec<Protocol>,

    #[serde(default, deserialize_with = "lenient")]
    pub limitations: String,

    #[serde(default, deserialize_with = "lenient_list")]
    pub sources: Vec<Source>,

    #[serde(default, deserialize_with = "lenient")]
    pub total_papers_searched: u64,

    #[serde(default, deserialize_with = "lenient")]
    pub papers_used: u64,
}

impl ResearchReport {
    /// A report carrying only its id.
    pub fn with_id(id: impl Into<ReportId>) -> Self {
        Self {
            id: id.into(),
            question: String::new(),
            generated_at: None,
            executive_summary: String::new(),
            key_findings: Vec::new(),
            detailed_analysis: String::new(),
            protocols: Vec::new(),
            limitations: String::new(),
            sources: Vec::new(),
            total_papers_searched: 0,
            papers_used: 0,
        }
    }
}

/// Body of `POST /api/reports/{id}/followup`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FollowUpRequest {
    pub report_id: ReportId,
    pub question: String,
}

/// Answer to a follow-up question.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FollowUpResponse {
    pub question: String,
    pub answer: String,
    pub report_id: ReportId,
}

/// One entry of the stored report listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub id: ReportId,
    #[serde(default, deserialize_with = "lenient")]
    pub question: String,
    #[serde(default, deserialize_with = "lenient")]
    pub generated_at: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub papers_used: u64,
}

/// Deserialize `T`, falling back to its default on null or a type mismatch.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Deserialize a list, skipping entries that do not fit `T`.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}
