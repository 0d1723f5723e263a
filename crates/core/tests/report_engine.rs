//! Integration tests for ReportEngine.
//!
//! These tests verify that the ReportEngine correctly:
//! - Folds stream events into the progress state machine
//! - Emits UI events in order through the channel
//! - Records the report in the session
//! - Ends every run in exactly one terminal state

mod common;

use common::*;
use rk_core::client::ResearchClient;
use rk_core::engine::STREAM_CLOSED_EARLY;
use rk_core::state::session::SessionContext;
use rk_protocol::config_models::GenerateRequest;
use rk_protocol::ipc::Event;
use rk_protocol::pipeline_models::{PipelineStepId, RunPhase, StepStatus};
use rk_protocol::report_models::ReportId;
use std::time::Duration;
use tokio::sync::mpsc;

const GENERATE: &str = "POST /api/reports/generate/stream";

async fn server_streaming(chunks: Vec<String>) -> MockServer {
    MockServer::start(vec![(
        GENERATE,
        Reply::Stream {
            chunks,
            delay: Duration::from_millis(2),
        },
    )])
    .await
}

#[tokio::test]
async fn test_successful_run() {
    let server = server_streaming(vec![
        progress_frame("optimizing", 5),
        progress_frame("searching_pubmed", 20),
        report_frame("r1"),
        complete_frame(),
    ])
    .await;
    let session = SessionContext::new();
    let engine = ResearchClient::new(server.base_url()).engine(session.clone());
    let (tx, rx) = mpsc::channel(256);

    let outcome = engine
        .run(GenerateRequest::new("Does rapamycin extend lifespan in mice?"), tx)
        .await
        .expect("Run should complete");
    let events = drain(rx).await;

    assert_eq!(outcome.phase(), RunPhase::Succeeded);
    assert!(outcome.succeeded());
    assert!(outcome
        .progress
        .steps
        .iter()
        .all(|step| step.status == StepStatus::Complete));
    assert_eq!(outcome.progress.progress_percent, 100);
    assert!(outcome.progress.is_complete);
    assert!(!outcome.progress.has_error);
    assert_eq!(outcome.report.map(|r| r.id), Some(ReportId::from("r1")));
    assert_eq!(session.get(), Some(ReportId::from("r1")));

    assert_eq!(
        event_kinds(&events),
        vec!["started", "progress", "progress", "progress", "progress", "report", "finished"]
    );
    assert!(events
        .iter()
        .all(|event| event.run_id() == outcome.run_id.as_uuid()));
}

#[tokio::test]
async fn test_progress_updates_follow_the_stream() {
    let server = server_streaming(vec![
        progress_frame("optimizing", 5),
        progress_frame_with_detail("searching_pubmed", 15, "Found 25 papers"),
        progress_frame("ranking", 70),
        report_frame("r2"),
    ])
    .await;
    let engine = ResearchClient::new(server.base_url()).engine(SessionContext::new());
    let (tx, rx) = mpsc::channel(256);

    engine
        .run(GenerateRequest::new("q"), tx)
        .await
        .expect("Run should complete");
    let events = drain(rx).await;

    let snapshots: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            Event::ProgressUpdated { progress, .. } => Some(progress.clone()),
            _ => None,
        })
        .collect();

    // Reset, three steps, report
    assert_eq!(snapshots.len(), 5);
    assert_eq!(snapshots[0].phase(), RunPhase::Idle);

    let pubmed = &snapshots[2];
    assert_eq!(pubmed.current_step_id, Some(PipelineStepId::SearchingPubmed));
    assert_eq!(pubmed.progress_percent, 15);
    assert_eq!(
        pubmed
            .step(PipelineStepId::SearchingPubmed)
            .and_then(|s| s.detail.as_deref()),
        Some("Found 25 papers")
    );

    let ranking = &snapshots[3];
    assert_eq!(ranking.active_step().map(|s| s.id), Some(PipelineStepId::Ranking));
    assert_eq!(
        ranking.step(PipelineStepId::Deduplicating).map(|s| s.status),
        Some(StepStatus::Complete)
    );
    assert_eq!(
        ranking.step(PipelineStepId::Filtering).map(|s| s.status),
        Some(StepStatus::Pending)
    );
}

#[tokio::test]
async fn test_server_error_fails_the_run() {
    let server = server_streaming(vec![
        progress_frame("optimizing", 5),
        progress_frame("generating_findings", 90),
        error_frame("LLM quota exceeded"),
        report_frame("too-late"),
    ])
    .await;
    let session = SessionContext::new();
    let engine = ResearchClient::new(server.base_url()).engine(session.clone());
    let (tx, rx) = mpsc::channel(256);

    let outcome = engine
        .run(GenerateRequest::new("q"), tx)
        .await
        .expect("A failed run is still an outcome");
    let events = drain(rx).await;

    assert_eq!(outcome.phase(), RunPhase::Failed);
    assert!(!outcome.progress.is_complete);
    assert_eq!(outcome.progress.error_message.as_deref(), Some("LLM quota exceeded"));
    assert_eq!(
        outcome
            .progress
            .step(PipelineStepId::GeneratingFindings)
            .map(|s| s.status),
        Some(StepStatus::Error)
    );
    assert!(outcome.report.is_none());
    // Follow-up and export must not address a report the run never delivered
    assert_eq!(session.get(), None);
    assert_eq!(event_kinds(&events).iter().filter(|k| **k == "failed").count(), 1);
    assert!(!event_kinds(&events).contains(&"report"));
}

#[tokio::test]
async fn test_loosely_typed_report_still_completes_the_run() {
    let server = server_streaming(vec![
        progress_frame("generating_findings", 90),
        loosely_typed_report_frame("r1"),
        complete_frame(),
    ])
    .await;
    let session = SessionContext::new();
    let engine = ResearchClient::new(server.base_url()).engine(session.clone());
    let (tx, rx) = mpsc::channel(256);

    let outcome = engine
        .run(GenerateRequest::new("q"), tx)
        .await
        .expect("Run should complete");
    drain(rx).await;

    assert_eq!(outcome.phase(), RunPhase::Succeeded);
    assert_eq!(session.get(), Some(ReportId::from("r1")));

    let report = outcome.report.expect("Report should be delivered");
    assert_eq!(report.id, ReportId::from("r1"));
    assert_eq!(report.generated_at, None);
    assert_eq!(report.executive_summary, "");
    assert_eq!(report.key_findings.len(), 1);
    assert_eq!(report.key_findings[0].source_indices, vec![1]);
    assert_eq!(report.protocols[0].dosage, "");
    assert_eq!(report.protocols[0].source_index, 0);
    assert_eq!(report.sources[0].year, 0);
    assert_eq!(report.sources[0].journal, "Nature");
    assert_eq!(report.papers_used, 0);
}

#[tokio::test]
async fn test_stream_closing_early_fails_the_run() {
    let server = server_streaming(vec![progress_frame("ranking", 70)]).await;
    let session = SessionContext::new();
    let engine = ResearchClient::new(server.base_url()).engine(session.clone());
    let (tx, rx) = mpsc::channel(256);

    let outcome = engine
        .run(GenerateRequest::new("q"), tx)
        .await
        .expect("A failed run is still an outcome");
    let events = drain(rx).await;

    assert_eq!(outcome.phase(), RunPhase::Failed);
    assert_eq!(outcome.progress.error_message.as_deref(), Some(STREAM_CLOSED_EARLY));
    assert_eq!(session.get(), None);
    assert_eq!(
        event_kinds(&events),
        vec!["started", "progress", "progress", "progress", "failed", "finished"]
    );
}

#[tokio::test]
async fn test_empty_body_fails_the_run() {
    let server = MockServer::start(vec![(GENERATE, Reply::Empty { status: 200 })]).await;
    let session = SessionContext::new();
    let engine = ResearchClient::new(server.base_url()).engine(session.clone());
    let (tx, rx) = mpsc::channel(256);

    let outcome = engine
        .run(GenerateRequest::new("q"), tx)
        .await
        .expect("A failed run is still an outcome");
    let events = drain(rx).await;

    assert_eq!(outcome.progress.error_message.as_deref(), Some("No response body"));
    assert!(outcome
        .progress
        .steps
        .iter()
        .all(|s| s.status == StepStatus::Pending));
    assert!(events.iter().any(
        |event| matches!(event, Event::RunFailed { message, .. } if message == "No response body")
    ));
}

#[tokio::test]
async fn test_new_run_clears_previous_report() {
    let server = MockServer::start(vec![(GENERATE, Reply::Empty { status: 200 })]).await;
    let session = SessionContext::new();
    session.set(ReportId::from("previous"));
    let engine = ResearchClient::new(server.base_url()).engine(session.clone());
    let (tx, _rx) = mpsc::channel(256);

    engine
        .run(GenerateRequest::new("q"), tx)
        .await
        .expect("A failed run is still an outcome");

    // Dependent actions must not operate on the earlier report
    assert_eq!(session.get(), None);
}

#[tokio::test]
async fn test_superseded_run_returns_error() {
    let server = MockServer::start(vec![(
        GENERATE,
        Reply::Stream {
            chunks: vec![
                progress_frame("optimizing", 5),
                progress_frame("searching_pubmed", 15),
                report_frame("stale"),
            ],
            delay: Duration::from_millis(150),
        },
    )])
    .await;
    let session = SessionContext::new();
    let engine = ResearchClient::new(server.base_url()).engine(session.clone());
    let (tx, mut rx) = mpsc::channel(256);

    let running = tokio::spawn({
        let engine = engine.clone();
        async move { engine.run(GenerateRequest::new("q"), tx).await }
    });

    // Reset snapshot, then the first step from the stream
    let mut progress_updates = 0;
    while let Some(event) = rx.recv().await {
        if matches!(event, Event::ProgressUpdated { .. }) {
            progress_updates += 1;
            if progress_updates == 2 {
                break;
            }
        }
    }

    let newer = session.begin_run();

    let result = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("Superseded run did not stop")
        .expect("Engine task panicked");

    assert!(result.is_err());
    assert!(session.is_current(newer));
    assert_eq!(session.get(), None);
    let rest = drain(rx).await;
    assert!(!event_kinds(&rest).contains(&"report"));
    assert_eq!(event_kinds(&rest).last(), Some(&"finished"));
}
