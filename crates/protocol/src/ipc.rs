//! Events published by the generation engine to a user interface.
//!
//! The engine folds the raw [`StreamEvent`](crate::stream_models::StreamEvent)
//! sequence into [`ResearchProgress`] snapshots and reports each change on a
//! channel, so the UI never touches the state machine directly.
//!
//! Uses tagged enum serialization:
//! ```json
//! {
//!   "type": "progressUpdated",
//!   "payload": {
//!     "run_id": "uuid-here",
//!     "progress": { "steps": [...], "progress_percent": 20, ... }
//!   }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline_models::ResearchProgress;
use crate::report_models::ResearchReport;

/// Status updates sent from the engine to the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    /// A new generation run has started; any previous run is invalidated.
    RunStarted {
        run_id: Uuid,
        question: String,
        started_at: DateTime<Utc>,
    },

    /// The progress model changed.
    ProgressUpdated {
        run_id: Uuid,
        progress: ResearchProgress,
    },

    /// The report arrived; the session now addresses it.
    ReportReady {
        run_id: Uuid,
        report: Box<ResearchReport>,
    },

    /// The run failed. Follow-up actions should not assume a report exists.
    RunFailed { run_id: Uuid, message: String },

    /// The stream is closed; no further events for this run follow.
    RunFinished { run_id: Uuid },
}

impl Event {
    /// The run this event belongs to.
    pub fn run_id(&self) -> Uuid {
        match self {
            Event::RunStarted { run_id, .. }
            | Event::ProgressUpdated { run_id, .. }
            | Event::ReportReady { run_id, .. }
            | Event::RunFailed { run_id, .. }
            | Event::RunFinished { run_id } => *run_id,
        }
    }
}
