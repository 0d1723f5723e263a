//! Configuration loading and management.
//!
//! Client settings live in `.research-kit/config.toml` under a root
//! directory. Every field is optional.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_settings};
pub use models::ClientSettings;
