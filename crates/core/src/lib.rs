//! # rk-core
//!
//! Streaming report client for research-kit.
//!
//! This crate provides:
//! - Incremental decoding and framing of the generation stream
//! - The stream transport delivering events over a cancellable channel
//! - The progress state machine and the session context
//! - The generation engine that ties them together
//! - A client for the plain report endpoints
//! - Configuration loading from the `.research-kit/` directory
//!
//! ## Modules
//!
//! - [`stream`]: Stream decoding, frame parsing, and transport
//! - [`state`]: Progress state machine and session context
//! - [`engine`]: Report generation engine
//! - [`client`]: Report, follow-up, and export endpoints
//! - [`config`]: Configuration loading and management

pub mod client;
pub mod config;
pub mod engine;
pub mod state;
pub mod stream;
