//! # rk-protocol
//!
//! Shared data models for research-kit.
//!
//! This crate defines the structures exchanged between:
//! - The research backend and the stream transport (wire events, reports)
//! - The generation engine and its user interface (progress snapshots)
//! - The configuration file and the generation request (pipeline settings)
//!
//! ## Modules
//!
//! - [`config_models`]: Pipeline settings and the generation request body
//! - [`pipeline_models`]: Pipeline steps and the renderable progress model
//! - [`report_models`]: Research reports and follow-up questions
//! - [`stream_models`]: Events decoded from the generation stream
//! - [`ipc`]: Events sent from the engine to the UI
//!
//! ## Design Principles
//!
//! - No I/O: models and pure conversions only
//! - Independent compilation: No dependencies on other research-kit crates

pub mod config_models;
pub mod ipc;
pub mod pipeline_models;
pub mod report_models;
pub mod stream_models;

// Re-export all public types for convenience
pub use config_models::*;
pub use ipc::*;
pub use pipeline_models::*;
pub use report_models::*;
pub use stream_models::*;
