//! Error types for the plain request/response endpoints.

use crate::state::session::NoActiveReport;
use thiserror::Error;

/// Errors returned by [`ResearchClient`](crate::client::ResearchClient).
#[derive(Error, Debug)]
pub enum ClientError {
    /// The call needs an active report and the session has none.
    #[error(transparent)]
    NoActiveReport(#[from] NoActiveReport),

    /// The request could not be sent or the body could not be read.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The body was not the expected JSON document.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Type alias for Result with ClientError.
pub type ClientResult<T> = Result<T, ClientError>;
