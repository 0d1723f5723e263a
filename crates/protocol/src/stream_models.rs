//! Wire models for the report generation stream.
//!
//! The server answers a generation request with `event: <name>\ndata: <json>`
//! frames. This module defines the payload of each event name and the
//! [`StreamEvent`] union the transport delivers to consumers.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::pipeline_models::PipelineStepId;
use crate::report_models::ResearchReport;

/// Progress update for one pipeline step.
///
/// `step` is kept as the raw wire name so that identifiers unknown to this
/// client still decode; see [`ProgressEvent::step_id`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub step: String,

    /// Human-readable status message.
    #[serde(default)]
    pub message: String,

    /// Additional detail like "Found 25 papers".
    #[serde(default)]
    pub detail: Option<String>,

    /// Server-declared overall percentage, 0-100.
    #[serde(alias = "progress_percent")]
    pub progress: f64,
}

impl ProgressEvent {
    /// The pipeline step this event refers to, if it is a known one.
    pub fn step_id(&self) -> Option<PipelineStepId> {
        self.step.parse().ok()
    }

    /// The declared percentage clamped into `0..=100`.
    pub fn percent(&self) -> u8 {
        if self.progress.is_nan() {
            return 0;
        }
        self.progress.round().clamp(0.0, 100.0) as u8
    }
}

/// Payload of an `error` event.
///
/// The server has used both `{"message": ...}` and `{"error": ...}`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Step that was running when the server failed, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
}

impl ErrorPayload {
    /// Build a payload carrying a single message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            error: None,
            step: None,
        }
    }

    /// The human-readable message, whichever field carried it.
    pub fn text(&self) -> &str {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or("Unknown error")
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Payload of the terminal `complete` marker. No field is required.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
}

/// One decoded application event from the generation stream.
///
/// Serialized as `{"type": "progress", "data": {...}}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum StreamEvent {
    Progress(ProgressEvent),
    Report(Box<ResearchReport>),
    Complete(CompletePayload),
    Error(ErrorPayload),
}

/// Reasons a raw frame cannot become a [`StreamEvent`].
#[derive(Error, Debug)]
pub enum StreamDecodeError {
    /// The event name is not one this client understands.
    #[error("unknown stream event: {0}")]
    UnknownEvent(String),
    /// The data line is not valid JSON for the named event.
    #[error("invalid payload for '{event}' event: {source}")]
    InvalidPayload {
        event: String,
        source: serde_json::Error,
    },
}

impl StreamEvent {
    /// Decode an event from its frame name and JSON data.
    ///
    /// A `complete` marker whose data is not JSON still decodes, with an
    /// empty payload.
    pub fn decode(event: &str, data: &str) -> Result<Self, StreamDecodeError> {
        let invalid = |source| StreamDecodeError::InvalidPayload {
            event: event.to_string(),
            source,
        };

        match event {
            "progress" => serde_json::from_str(data)
                .map(StreamEvent::Progress)
                .map_err(invalid),
            "report" => serde_json::from_str(data)
                .map(|report| StreamEvent::Report(Box::new(report)))
                .map_err(invalid),
            "error" => serde_json::from_str(data)
                .map(StreamEvent::Error)
                .map_err(invalid),
            "complete" => Ok(StreamEvent::Complete(
                serde_json::from_str(data).unwrap_or_default(),
            )),
            other => Err(StreamDecodeError::UnknownEvent(other.to_string())),
        }
    }

    /// Whether this event ends a run (`report` or `error`).
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Report(_) | StreamEvent::Error(_))
    }
}
