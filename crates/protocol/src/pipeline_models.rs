//! Research pipeline step models.
//!
//! This module defines the fixed, ordered list of backend pipeline stages and
//! the renderable progress model derived from the server's progress events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One stage of the backend research pipeline.
///
/// The declaration order is the pipeline order and is the sole ordering
/// authority for step status derivation. `Ord` follows that order.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStepId {
    /// Rewriting the question into source-specific search queries.
    Optimizing,
    SearchingPubmed,
    SearchingOpenalex,
    SearchingEuropepmc,
    SearchingCrossref,
    /// Secondary searches built from the key concepts of the question.
    ConceptSearch,
    Deduplicating,
    Ranking,
    /// LLM relevance filtering of the ranked candidates.
    Filtering,
    GeneratingFindings,
    ExtractingProtocols,
}

impl PipelineStepId {
    /// Every step, in pipeline order.
    pub const ALL: [PipelineStepId; 11] = [
        PipelineStepId::Optimizing,
        PipelineStepId::SearchingPubmed,
        PipelineStepId::SearchingOpenalex,
        PipelineStepId::SearchingEuropepmc,
        PipelineStepId::SearchingCrossref,
        PipelineStepId::ConceptSearch,
        PipelineStepId::Deduplicating,
        PipelineStepId::Ranking,
        PipelineStepId::Filtering,
        PipelineStepId::GeneratingFindings,
        PipelineStepId::ExtractingProtocols,
    ];

    /// Zero-based position of this step in the pipeline.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire name used by the server (`"searching_pubmed"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStepId::Optimizing => "optimizing",
            PipelineStepId::SearchingPubmed => "searching_pubmed",
            PipelineStepId::SearchingOpenalex => "searching_openalex",
            PipelineStepId::SearchingEuropepmc => "searching_europepmc",
            PipelineStepId::SearchingCrossref => "searching_crossref",
            PipelineStepId::ConceptSearch => "concept_search",
            PipelineStepId::Deduplicating => "deduplicating",
            PipelineStepId::Ranking => "ranking",
            PipelineStepId::Filtering => "filtering",
            PipelineStepId::GeneratingFindings => "generating_findings",
            PipelineStepId::ExtractingProtocols => "extracting_protocols",
        }
    }

    /// Human-readable label shown next to the step.
    pub fn label(self) -> &'static str {
        match self {
            PipelineStepId::Optimizing => "Optimizing search queries",
            PipelineStepId::SearchingPubmed => "Searching PubMed",
            PipelineStepId::SearchingOpenalex => "Searching OpenAlex",
            PipelineStepId::SearchingEuropepmc => "Searching Europe PMC",
            PipelineStepId::SearchingCrossref => "Searching CrossRef",
            PipelineStepId::ConceptSearch => "Running concept searches",
            PipelineStepId::Deduplicating => "Removing duplicates",
            PipelineStepId::Ranking => "Ranking by relevance",
            PipelineStepId::Filtering => "Filtering with AI",
            PipelineStepId::GeneratingFindings => "Generating findings",
            PipelineStepId::ExtractingProtocols => "Extracting protocols",
        }
    }

    /// Percentage the server nominally reports when this step starts.
    ///
    /// Informational only: the state machine always trusts the percentage
    /// carried by the event itself.
    pub fn nominal_percent(self) -> u8 {
        match self {
            PipelineStepId::Optimizing => 5,
            PipelineStepId::SearchingPubmed => 15,
            PipelineStepId::SearchingOpenalex => 25,
            PipelineStepId::SearchingEuropepmc => 35,
            PipelineStepId::SearchingCrossref => 45,
            PipelineStepId::ConceptSearch => 55,
            PipelineStepId::Deduplicating => 60,
            PipelineStepId::Ranking => 70,
            PipelineStepId::Filtering => 80,
            PipelineStepId::GeneratingFindings => 90,
            PipelineStepId::ExtractingProtocols => 95,
        }
    }
}

impl fmt::Display for PipelineStepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a wire step name is not a known pipeline step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown pipeline step: {0}")]
pub struct UnknownStep(pub String);

impl FromStr for PipelineStepId {
    type Err = UnknownStep;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PipelineStepId::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| UnknownStep(s.to_string()))
    }
}

/// Display status of a single pipeline step.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Active,
    Complete,
    Error,
}

/// A pipeline step as shown to the user.
///
/// Only the progress state machine mutates these after initialization.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProgressStep {
    pub id: PipelineStepId,
    pub label: String,
    pub status: StepStatus,
    /// Latest detail line reported for this step (e.g. "Found 25 papers").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProgressStep {
    /// Create a pending step with its fixed label.
    pub fn pending(id: PipelineStepId) -> Self {
        Self {
            id,
            label: id.label().to_string(),
            status: StepStatus::Pending,
            detail: None,
        }
    }
}

/// Lifecycle phase of one generation run, derived from [`ResearchProgress`].
///
/// Idle -> Running -> Succeeded | Failed. Every phase returns to Idle on reset.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunPhase {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Aggregate, renderable progress of one generation run.
///
/// `steps` always holds every [`PipelineStepId`] in pipeline order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResearchProgress {
    pub steps: Vec<ProgressStep>,
    pub current_step_id: Option<PipelineStepId>,
    pub progress_percent: u8,
    pub is_complete: bool,
    pub has_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ResearchProgress {
    /// The state before any event of a run has been observed.
    pub fn initial() -> Self {
        Self {
            steps: PipelineStepId::ALL
                .into_iter()
                .map(ProgressStep::pending)
                .collect(),
            current_step_id: None,
            progress_percent: 0,
            is_complete: false,
            has_error: false,
            error_message: None,
        }
    }

    /// Derive the lifecycle phase.
    pub fn phase(&self) -> RunPhase {
        if self.has_error {
            RunPhase::Failed
        } else if self.is_complete {
            RunPhase::Succeeded
        } else if self.current_step_id.is_some() {
            RunPhase::Running
        } else {
            RunPhase::Idle
        }
    }

    /// Whether the run has reached `Succeeded` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        self.is_complete || self.has_error
    }

    /// The step currently marked active, if any.
    pub fn active_step(&self) -> Option<&ProgressStep> {
        self.steps
            .iter()
            .find(|step| step.status == StepStatus::Active)
    }

    /// Look up a step by id.
    pub fn step(&self, id: PipelineStepId) -> Option<&ProgressStep> {
        self.steps.get(id.index()).filter(|step| step.id == id)
    }
}

impl Default for ResearchProgress {
    fn default() -> Self {
        Self::initial()
    }
}
