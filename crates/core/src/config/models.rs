//! Client settings loaded from `.research-kit/config.toml`.

use crate::config::error::{ConfigError, ConfigResult};
use rk_protocol::config_models::ResearchSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable that overrides [`ClientSettings::base_url`].
pub const BASE_URL_ENV: &str = "RESEARCH_KIT_BASE_URL";

/// Settings for talking to the research server.
///
/// # Example
///
/// ```rust,no_run
/// use rk_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = load_config(Path::new(".")).await?;
/// println!("Using {} with up to {} sources",
///          settings.base_url,
///          settings.research.max_sources);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Server root, without the `/api` prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Log level used when `RUST_LOG` is not set: "trace" to "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Timeout for establishing connections. Streams have no read timeout.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Defaults for every generation request.
    #[serde(default)]
    pub research: ResearchSettings,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            log_level: default_log_level(),
            connect_timeout_secs: default_connect_timeout_secs(),
            research: ResearchSettings::default(),
        }
    }
}

impl ClientSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Apply a base URL override, ignoring blank values.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|url| !url.trim().is_empty()) {
            self.base_url = url.trim().trim_end_matches('/').to_string();
        }
        self
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_base_url(std::env::var(BASE_URL_ENV).ok())
    }

    /// Check the settings after every override has been applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSetting`] naming the first unusable value.
    pub fn validate(&self) -> ConfigResult<()> {
        self.check().map_err(ConfigError::InvalidSetting)
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!(
                "base_url must start with http:// or https://, got {:?}",
                self.base_url
            ));
        }
        if self.research.max_sources == 0 {
            return Err("research.max_sources must be at least 1".to_string());
        }
        if self.research.enabled_sources().is_empty() {
            return Err("at least one research source must be enabled".to_string());
        }
        Ok(())
    }
}
