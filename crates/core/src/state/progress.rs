//! Progress state machine.
//!
//! Pure transitions that fold stream events into a [`ResearchProgress`].
//! Every function takes the current state by reference and returns the next
//! one; nothing here performs I/O or touches the session.

use rk_protocol::pipeline_models::{ResearchProgress, StepStatus};
use rk_protocol::stream_models::ProgressEvent;
use tracing::debug;

/// Apply a progress event.
///
/// Steps before the event's step are forced to `Complete`, the step itself
/// becomes `Active`, and later steps go back to `Pending`. The percentage is
/// taken from the event as declared by the server.
///
/// # Arguments
///
/// * `current` - The state before the event
/// * `event` - The progress event received from the stream
///
/// # Returns
///
/// The next state. Events naming an unknown step, and any event received
/// after a terminal state, leave the state unchanged.
pub fn apply(current: &ResearchProgress, event: &ProgressEvent) -> ResearchProgress {
    if current.is_terminal() {
        debug!(step = %event.step, "ignoring progress after terminal state");
        return current.clone();
    }

    let Some(step_id) = event.step_id() else {
        debug!(step = %event.step, "ignoring progress for unknown step");
        return current.clone();
    };

    let mut next = current.clone();
    let active = step_id.index();

    for (index, step) in next.steps.iter_mut().enumerate() {
        step.status = match index.cmp(&active) {
            std::cmp::Ordering::Less => StepStatus::Complete,
            std::cmp::Ordering::Equal => StepStatus::Active,
            std::cmp::Ordering::Greater => StepStatus::Pending,
        };
        if index == active && event.detail.is_some() {
            step.detail.clone_from(&event.detail);
        }
    }

    next.current_step_id = Some(step_id);
    next.progress_percent = event.percent();
    next
}

/// Mark the run as successfully finished because the report arrived.
///
/// All steps become `Complete` and the percentage jumps to 100. Has no effect
/// on a run that already failed.
pub fn apply_report_received(current: &ResearchProgress) -> ResearchProgress {
    if current.is_terminal() {
        return current.clone();
    }

    let mut next = current.clone();
    for step in &mut next.steps {
        step.status = StepStatus::Complete;
    }
    next.progress_percent = 100;
    next.is_complete = true;
    next
}

/// Mark the run as failed.
///
/// Only the currently active step is demoted to `Error`; every other step
/// keeps its status. Has no effect on a run that already reached a terminal
/// state, so the first failure message wins.
///
/// # Arguments
///
/// * `current` - The state before the failure
/// * `message` - Human-readable failure message
pub fn apply_error(current: &ResearchProgress, message: &str) -> ResearchProgress {
    if current.is_terminal() {
        return current.clone();
    }

    let mut next = current.clone();
    if let Some(step) = next
        .steps
        .iter_mut()
        .find(|step| step.status == StepStatus::Active)
    {
        step.status = StepStatus::Error;
    }
    next.has_error = true;
    next.error_message = Some(message.to_string());
    next
}

/// Discard all progress and return the initial state.
pub fn apply_reset() -> ResearchProgress {
    ResearchProgress::initial()
}
