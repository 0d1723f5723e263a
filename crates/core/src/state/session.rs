//! Session context: the report that follow-up and export calls address.
//!
//! A `SessionContext` is a cheap, cloneable handle. Each generation run
//! registers itself with [`SessionContext::begin_run`]; only the current run
//! may publish a report id, so a superseded stream cannot overwrite the
//! session after a newer generation has started. Superseding a run also
//! cancels its token, so a stream waiting on a quiet connection stops at once.

use rk_protocol::report_models::ReportId;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Identifier of one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Returned when an operation needs a report but the session has none.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no active report: generate a report before asking follow-up questions or exporting")]
pub struct NoActiveReport;

#[derive(Debug, Default)]
struct SessionState {
    current_run: Option<RunId>,
    run_token: CancellationToken,
    active_report: Option<ReportId>,
}

impl SessionState {
    fn end_run(&mut self) {
        self.current_run = None;
        self.run_token.cancel();
    }
}

/// Shared handle to the session state.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<SessionState>>,
}

impl SessionContext {
    /// Create an empty session with no active report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation run.
    ///
    /// Clears the active report and invalidates any previous run.
    pub fn begin_run(&self) -> RunId {
        let run = RunId::new();
        let mut state = self.write();
        state.end_run();
        state.current_run = Some(run);
        state.run_token = CancellationToken::new();
        state.active_report = None;
        run
    }

    /// Whether `run` is still the run allowed to write this session.
    pub fn is_current(&self, run: RunId) -> bool {
        self.read().current_run == Some(run)
    }

    /// Token cancelled once `run` is superseded, cleared, or replaced.
    ///
    /// A run that is already stale gets a cancelled token.
    pub fn run_token(&self, run: RunId) -> CancellationToken {
        let state = self.read();
        if state.current_run == Some(run) {
            state.run_token.clone()
        } else {
            let token = CancellationToken::new();
            token.cancel();
            token
        }
    }

    /// Publish the report produced by `run`.
    ///
    /// Returns `false`, leaving the session untouched, when `run` has been
    /// superseded or the session was cleared.
    pub fn set_report(&self, run: RunId, report_id: ReportId) -> bool {
        let mut state = self.write();
        if state.current_run != Some(run) {
            return false;
        }
        state.active_report = Some(report_id);
        true
    }

    /// Make an existing report the active one, outside of any run.
    ///
    /// Invalidates the current run like [`SessionContext::clear`] does.
    pub fn set(&self, report_id: ReportId) {
        let mut state = self.write();
        state.end_run();
        state.active_report = Some(report_id);
    }

    /// Forget the active report and invalidate the current run.
    pub fn clear(&self) {
        let mut state = self.write();
        state.end_run();
        state.active_report = None;
    }

    /// The active report, if any.
    pub fn get(&self) -> Option<ReportId> {
        self.read().active_report.clone()
    }

    /// The active report, or [`NoActiveReport`].
    pub fn require(&self) -> Result<ReportId, NoActiveReport> {
        self.get().ok_or(NoActiveReport)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
