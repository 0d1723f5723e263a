//! Helpers for collecting and checking what the client delivered.

#![allow(dead_code)]

use rk_core::stream::GenerationStream;
use rk_protocol::ipc::Event;
use rk_protocol::stream_models::StreamEvent;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;

const COLLECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Receive every event until the stream closes.
pub async fn collect_stream(mut stream: GenerationStream) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    let collect = async {
        while let Some(event) = stream.next().await {
            events.push(event);
        }
    };
    tokio::time::timeout(COLLECT_TIMEOUT, collect)
        .await
        .expect("Stream did not close in time");
    events
}

/// Receive every engine event until the sender is dropped.
pub async fn drain(mut rx: Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(COLLECT_TIMEOUT, rx.recv()).await {
        events.push(event);
    }
    events
}

/// Short names of engine events, for order assertions.
pub fn event_kinds(events: &[Event]) -> Vec<&'static str> {
    events
        .iter()
        .map(|event| match event {
            Event::RunStarted { .. } => "started",
            Event::ProgressUpdated { .. } => "progress",
            Event::ReportReady { .. } => "report",
            Event::RunFailed { .. } => "failed",
            Event::RunFinished { .. } => "finished",
        })
        .collect()
}

/// Assert that `events` is exactly one `StreamEvent::Error` with `message`.
pub fn assert_single_error(events: &[StreamEvent], message: &str) {
    assert_eq!(events.len(), 1, "expected a single error event, got {events:?}");
    match &events[0] {
        StreamEvent::Error(payload) => assert_eq!(payload.text(), message),
        other => panic!("expected an error event, got {other:?}"),
    }
}
