//! Stream transport for report generation.
//!
//! Issues a single POST whose response body is an unbounded stream of
//! `event:`/`data:` frames, and forwards each decoded [`StreamEvent`] on a
//! channel. The channel closes exactly once, after the last event.

use crate::state::session::{RunId, SessionContext};
use crate::stream::codec::FrameCodec;
use bytes::Buf;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use rk_protocol::config_models::GenerateRequest;
use rk_protocol::stream_models::{ErrorPayload, StreamEvent};
use std::fmt::Display;
use std::io;
use std::ops::ControlFlow;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

/// Path of the streaming generation endpoint, relative to the base URL.
pub const GENERATE_STREAM_PATH: &str = "/api/reports/generate/stream";

const CHANNEL_CAPACITY: usize = 64;

/// Failures that end a generation stream.
///
/// Each one reaches the consumer as a single [`StreamEvent::Error`] whose
/// message is the `Display` text.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    #[error("No response body")]
    EmptyBody,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Read(String),
}

/// Starts generation streams against one server.
#[derive(Debug, Clone)]
pub struct StreamTransport {
    client: reqwest::Client,
    base_url: String,
}

impl StreamTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn generate_url(&self) -> String {
        format!("{}{GENERATE_STREAM_PATH}", self.base_url)
    }

    /// Open a generation stream for `run`.
    ///
    /// The request runs on a spawned task. It stops when the server closes
    /// the connection, after a `complete` event, on the first transport
    /// failure, when the returned stream is cancelled or dropped, or when
    /// `run` stops being the session's current run.
    pub fn start(
        &self,
        request: GenerateRequest,
        session: &SessionContext,
        run: RunId,
    ) -> GenerationStream {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let superseded = session.run_token(run);
        let sink = EventSink::new(tx, session.clone(), run);

        let client = self.client.clone();
        let url = self.generate_url();
        let task_cancel = cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = task_cancel.cancelled() => {
                    debug!(%run, "generation stream cancelled");
                }
                _ = superseded.cancelled() => {
                    debug!(%run, "run superseded, generation stream stopped");
                }
                _ = run_stream(client, url, request, sink) => {
                    debug!(%run, "generation stream closed");
                }
            }
        });

        GenerationStream {
            run,
            rx,
            cancel: cancel.clone(),
            _guard: cancel.drop_guard(),
        }
    }
}

/// Receiving end of one generation run.
///
/// Dropping it cancels the underlying request.
#[derive(Debug)]
pub struct GenerationStream {
    run: RunId,
    rx: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl GenerationStream {
    pub fn run_id(&self) -> RunId {
        self.run
    }

    /// Next event, or `None` once the stream has closed.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Abort the request. Events already buffered can still be received.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Consume the handle as an async stream of events.
    pub fn into_stream(self) -> Pin<Box<dyn Stream<Item = StreamEvent> + Send>> {
        let mut events = self;
        Box::pin(async_stream::stream! {
            while let Some(event) = events.next().await {
                yield event;
            }
        })
    }
}

async fn run_stream(
    client: reqwest::Client,
    url: String,
    request: GenerateRequest,
    mut sink: EventSink,
) {
    info!(%url, question = %request.question, "starting report generation");

    match open(&client, &url, &request).await {
        Ok(response) => relay(response.bytes_stream(), sink).await,
        Err(err) => sink.fail(err).await,
    }
}

/// Send the request and check that a readable body came back.
async fn open(
    client: &reqwest::Client,
    url: &str,
    request: &GenerateRequest,
) -> Result<reqwest::Response, TransportError> {
    let response = client
        .post(url)
        .header(ACCEPT, "text/event-stream")
        .json(request)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransportError::Status {
            status: status.as_u16(),
            body,
        });
    }

    if status == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
        return Err(TransportError::EmptyBody);
    }

    Ok(response)
}

/// Pump `chunks` into `sink`, turning a read failure into one error event.
pub(crate) async fn relay<S, B, E>(chunks: S, mut sink: EventSink)
where
    S: Stream<Item = Result<B, E>>,
    B: Buf,
    E: Display,
{
    if let Err(err) = pump(chunks, &mut sink).await {
        sink.fail(err).await;
    }
}

async fn pump<S, B, E>(chunks: S, sink: &mut EventSink) -> Result<(), TransportError>
where
    S: Stream<Item = Result<B, E>>,
    B: Buf,
    E: Display,
{
    let chunks = chunks.map(|chunk| chunk.map_err(|err| io::Error::other(err.to_string())));
    let frames = FramedRead::new(StreamReader::new(chunks), FrameCodec::new());
    tokio::pin!(frames);

    while let Some(frame) = frames.next().await {
        let frame = frame.map_err(|err| TransportError::Read(err.to_string()))?;
        debug!(event = %frame.event, bytes = frame.data.len(), "received frame");

        match StreamEvent::decode(&frame.event, &frame.data) {
            Ok(event) => {
                if sink.forward(event).await.is_break() {
                    return Ok(());
                }
            }
            Err(err) => warn!(event = %frame.event, error = %err, "skipping undecodable frame"),
        }
    }

    Ok(())
}

/// Producer side of the event channel for one run.
pub(crate) struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
    session: SessionContext,
    run: RunId,
    // A report or error has been forwarded
    settled: bool,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::Sender<StreamEvent>, session: SessionContext, run: RunId) -> Self {
        Self {
            tx,
            session,
            run,
            settled: false,
        }
    }

    /// Forward one event; `Break` means the loop must stop.
    ///
    /// A `report` updates the session before it is sent, so a consumer that
    /// reacts to it already sees the new report id. Reports arriving after
    /// an earlier `report` or `error` are dropped and never reach the session.
    async fn forward(&mut self, event: StreamEvent) -> ControlFlow<()> {
        if !self.session.is_current(self.run) {
            debug!(run = %self.run, "run superseded, stopping stream");
            return ControlFlow::Break(());
        }

        if let StreamEvent::Report(report) = &event {
            if self.settled {
                debug!(run = %self.run, report_id = %report.id, "ignoring report after the run settled");
                return ControlFlow::Continue(());
            }
            if !self.session.set_report(self.run, report.id.clone()) {
                return ControlFlow::Break(());
            }
            info!(report_id = %report.id, "report received");
        }

        let last = matches!(event, StreamEvent::Complete(_));
        self.settled |= event.is_terminal();
        if self.tx.send(event).await.is_err() {
            debug!(run = %self.run, "receiver dropped, stopping stream");
            return ControlFlow::Break(());
        }

        if last {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    /// Emit the single error event that ends the stream.
    async fn fail(&mut self, err: TransportError) {
        warn!(run = %self.run, error = %err, "generation stream failed");
        if !self.session.is_current(self.run) {
            return;
        }
        let event = StreamEvent::Error(ErrorPayload::new(err.to_string()));
        let _ = self.tx.send(event).await;
    }
}
