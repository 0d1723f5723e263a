//! State owned by the client during and between generation runs.
//!
//! This module provides:
//! - The progress state machine folding stream events into `ResearchProgress`
//! - The session context tracking the active report

pub mod progress;
pub mod session;

pub use session::{NoActiveReport, RunId, SessionContext};
