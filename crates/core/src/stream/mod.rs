//! Streaming ingestion of report generation.
//!
//! - [`frame`]: splitting text into `event`/`data` frames
//! - [`codec`]: cutting the response bytes into frames
//! - [`transport`]: the HTTP request and the event channel

pub mod codec;
pub mod frame;
pub mod transport;

pub use transport::{GenerationStream, StreamTransport, TransportError};
