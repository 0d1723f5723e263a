//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality across all integration tests:
//! - A loopback HTTP server with scripted replies
//! - Stream frame fixtures
//! - Collection helpers and custom assertions

pub mod assertions;
pub mod fixtures;
pub mod server;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use server::*;
