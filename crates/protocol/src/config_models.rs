//! Research pipeline parameters sent with a generation request.
//!
//! The same settings structure is read from the `[research]` table of
//! `.research-kit/config.toml` and flattened into the request body.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A literature source the backend can search.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Pubmed,
    Openalex,
    EuropePmc,
    Crossref,
    ClinicalTrials,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Pubmed,
        SourceKind::Openalex,
        SourceKind::EuropePmc,
        SourceKind::Crossref,
        SourceKind::ClinicalTrials,
    ];

    /// Prefix of the `<source>_enabled` / `<source>_max_results` fields.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Pubmed => "pubmed",
            SourceKind::Openalex => "openalex",
            SourceKind::EuropePmc => "europe_pmc",
            SourceKind::Crossref => "crossref",
            SourceKind::ClinicalTrials => "clinical_trials",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown source '{0}' (expected one of: pubmed, openalex, europe_pmc, crossref, clinical_trials)")]
pub struct UnknownSource(pub String);

impl FromStr for SourceKind {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownSource(s.to_string()))
    }
}

/// Per-source search settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSettings {
    pub enabled: bool,
    pub max_results: u32,
}

/// Tunable parameters of the research pipeline.
///
/// Every field is optional on the wire and in `config.toml`; missing fields
/// take the backend's documented defaults.
///
/// # Example
///
/// ```toml
/// [research]
/// max_sources = 20
/// crossref_enabled = false
/// include_fulltext = false
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ResearchSettings {
    /// Number of sources kept in the final report.
    pub max_sources: u32,
    pub min_clinical_trials: u32,
    pub min_papers: u32,

    pub pubmed_enabled: bool,
    pub pubmed_max_results: u32,
    pub openalex_enabled: bool,
    pub openalex_max_results: u32,
    pub europe_pmc_enabled: bool,
    pub europe_pmc_max_results: u32,
    pub crossref_enabled: bool,
    pub crossref_max_results: u32,
    pub clinical_trials_enabled: bool,
    pub clinical_trials_max_results: u32,

    /// Ranking score bonus applied to clinical trials.
    pub clinical_trial_boost: f64,

    /// Enrich the final sources with open-access full text.
    pub include_fulltext: bool,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            max_sources: 15,
            min_clinical_trials: 3,
            min_papers: 5,
            pubmed_enabled: true,
            pubmed_max_results: 50,
            openalex_enabled: true,
            openalex_max_results: 50,
            europe_pmc_enabled: true,
            europe_pmc_max_results: 50,
            crossref_enabled: true,
            crossref_max_results: 25,
            clinical_trials_enabled: true,
            clinical_trials_max_results: 25,
            clinical_trial_boost: 0.15,
            include_fulltext: true,
        }
    }
}

impl ResearchSettings {
    /// Settings of one source.
    pub fn source(&self, kind: SourceKind) -> SourceSettings {
        let (enabled, max_results) = match kind {
            SourceKind::Pubmed => (self.pubmed_enabled, self.pubmed_max_results),
            SourceKind::Openalex => (self.openalex_enabled, self.openalex_max_results),
            SourceKind::EuropePmc => (self.europe_pmc_enabled, self.europe_pmc_max_results),
            SourceKind::Crossref => (self.crossref_enabled, self.crossref_max_results),
            SourceKind::ClinicalTrials => {
                (self.clinical_trials_enabled, self.clinical_trials_max_results)
            }
        };
        SourceSettings {
            enabled,
            max_results,
        }
    }

    /// Enable or disable one source.
    pub fn set_enabled(&mut self, kind: SourceKind, enabled: bool) {
        match kind {
            SourceKind::Pubmed => self.pubmed_enabled = enabled,
            SourceKind::Openalex => self.openalex_enabled = enabled,
            SourceKind::EuropePmc => self.europe_pmc_enabled = enabled,
            SourceKind::Crossref => self.crossref_enabled = enabled,
            SourceKind::ClinicalTrials => self.clinical_trials_enabled = enabled,
        }
    }

    /// Sources that will be searched.
    pub fn enabled_sources(&self) -> Vec<SourceKind> {
        SourceKind::ALL
            .into_iter()
            .filter(|kind| self.source(*kind).enabled)
            .collect()
    }
}

/// JSON body of `POST /api/reports/generate/stream`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub question: String,

    #[serde(flatten)]
    pub settings: ResearchSettings,
}

impl GenerateRequest {
    /// A request for `question` with default pipeline settings.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            settings: ResearchSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ResearchSettings) -> Self {
        self.settings = settings;
        self
    }
}
