//! Report generation engine.
//!
//! The ReportEngine drives one generation run: it resets the progress model,
//! opens the stream, folds every stream event into the state machine, and
//! publishes each change to the UI as an [`Event`].

use crate::state::progress::{apply, apply_error, apply_report_received, apply_reset};
use crate::state::session::{RunId, SessionContext};
use crate::stream::transport::StreamTransport;
use anyhow::{bail, Result};
use chrono::Utc;
use rk_protocol::config_models::GenerateRequest;
use rk_protocol::ipc::Event;
use rk_protocol::pipeline_models::{ResearchProgress, RunPhase};
use rk_protocol::report_models::ResearchReport;
use rk_protocol::stream_models::StreamEvent;
use tokio::sync::mpsc::Sender;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// Failure message used when the server closes the stream mid-run.
pub const STREAM_CLOSED_EARLY: &str = "Stream closed before a report was received";

/// Final state of a generation run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub progress: ResearchProgress,
    /// The report, when the run succeeded.
    pub report: Option<ResearchReport>,
}

impl RunOutcome {
    pub fn phase(&self) -> RunPhase {
        self.progress.phase()
    }

    pub fn succeeded(&self) -> bool {
        self.phase() == RunPhase::Succeeded
    }
}

/// Runs report generations against one server and one session.
#[derive(Debug, Clone)]
pub struct ReportEngine {
    transport: StreamTransport,
    session: SessionContext,
}

impl ReportEngine {
    /// Create a new ReportEngine.
    ///
    /// # Arguments
    ///
    /// * `transport` - Opens the generation streams
    /// * `session` - Receives the id of each generated report
    pub fn new(transport: StreamTransport, session: SessionContext) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Generate a report and return the final state of the run.
    ///
    /// This is the main entry point. It:
    /// 1. Starts a new session run, invalidating any run still in flight
    /// 2. Emits RunStarted and the reset progress
    /// 3. Applies every stream event to the progress state machine
    /// 4. Fails the run if the stream ends before a terminal state
    /// 5. Emits RunFinished
    ///
    /// # Arguments
    ///
    /// * `request` - Question and pipeline settings
    /// * `events_tx` - Channel for sending events to the UI
    ///
    /// # Returns
    ///
    /// The outcome of the run. A failed run is still `Ok`; its progress
    /// carries the error message.
    ///
    /// # Errors
    ///
    /// Returns an error if a newer run on the same session superseded this
    /// one before it reached a terminal state.
    pub async fn run(&self, request: GenerateRequest, events_tx: Sender<Event>) -> Result<RunOutcome> {
        let run = self.session.begin_run();
        let run_id = run.as_uuid();
        let mut progress = apply_reset();
        let mut report = None;

        info!(%run, question = %request.question, "generation run started");
        let _ = events_tx
            .send(Event::RunStarted {
                run_id,
                question: request.question.clone(),
                started_at: Utc::now(),
            })
            .await;
        publish_progress(&events_tx, run, &progress).await;

        let mut stream = self.transport.start(request, &self.session, run).into_stream();

        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::Progress(event) => {
                    let next = apply(&progress, &event);
                    if next != progress {
                        progress = next;
                        publish_progress(&events_tx, run, &progress).await;
                    }
                }
                StreamEvent::Report(received) => {
                    if progress.is_terminal() {
                        warn!(%run, report_id = %received.id, "report arrived after the run failed");
                        continue;
                    }
                    progress = apply_report_received(&progress);
                    publish_progress(&events_tx, run, &progress).await;
                    let _ = events_tx
                        .send(Event::ReportReady {
                            run_id,
                            report: received.clone(),
                        })
                        .await;
                    report = Some(*received);
                }
                StreamEvent::Error(payload) => {
                    if progress.is_terminal() {
                        debug!(%run, error = payload.text(), "ignoring error after terminal state");
                        continue;
                    }
                    fail_run(&mut progress, &events_tx, run, payload.text()).await;
                }
                StreamEvent::Complete(payload) => {
                    debug!(%run, report_id = ?payload.report_id, "server marked the stream complete");
                }
            }
        }

        if !progress.is_terminal() {
            if !self.session.is_current(run) {
                info!(%run, "generation run superseded");
                let _ = events_tx.send(Event::RunFinished { run_id }).await;
                bail!("generation run {run} was superseded by a newer run");
            }
            fail_run(&mut progress, &events_tx, run, STREAM_CLOSED_EARLY).await;
        }

        info!(%run, phase = ?progress.phase(), "generation run finished");
        let _ = events_tx.send(Event::RunFinished { run_id }).await;

        Ok(RunOutcome {
            run_id: run,
            progress,
            report,
        })
    }
}

async fn publish_progress(events_tx: &Sender<Event>, run: RunId, progress: &ResearchProgress) {
    let _ = events_tx
        .send(Event::ProgressUpdated {
            run_id: run.as_uuid(),
            progress: progress.clone(),
        })
        .await;
}

async fn fail_run(
    progress: &mut ResearchProgress,
    events_tx: &Sender<Event>,
    run: RunId,
    message: &str,
) {
    warn!(%run, error = message, "generation run failed");
    *progress = apply_error(progress, message);
    publish_progress(events_tx, run, progress).await;
    let _ = events_tx
        .send(Event::RunFailed {
            run_id: run.as_uuid(),
            message: message.to_string(),
        })
        .await;
}
