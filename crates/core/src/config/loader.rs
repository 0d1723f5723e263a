//! Configuration loader for the `.research-kit/` directory.

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::ClientSettings;
use std::path::Path;
use tracing::debug;

/// Name of the configuration directory under the project root.
pub const CONFIG_DIR: &str = ".research-kit";

/// Name of the settings file inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Loads client settings from `.research-kit/config.toml`.
///
/// # Arguments
///
/// * `root` - Root directory containing the `.research-kit/` folder
///
/// # Returns
///
/// The parsed settings. A missing directory or file yields the defaults
/// rather than an error. Environment overrides are not applied here; see
/// [`ClientSettings::with_env_overrides`].
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read, is not valid
/// TOML, or holds values the client cannot use.
///
/// # Example
///
/// ```rust,no_run
/// use rk_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = load_config(Path::new(".")).await?;
/// println!("Server: {}", settings.base_url);
/// # Ok(())
/// # }
/// ```
pub async fn load_config(root: &Path) -> ConfigResult<ClientSettings> {
    let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

    if !config_path.exists() {
        debug!(path = %config_path.display(), "no config file, using defaults");
        return Ok(ClientSettings::default());
    }

    let content = tokio::fs::read_to_string(&config_path)
        .await
        .map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    let settings: ClientSettings =
        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: config_path.clone(),
            source,
        })?;

    settings
        .check()
        .map_err(|reason| ConfigError::InvalidConfig {
            path: config_path.clone(),
            reason,
        })?;
    debug!(path = %config_path.display(), base_url = %settings.base_url, "loaded config");

    Ok(settings)
}

/// Load the settings file, then layer the environment and `base_url` on top.
///
/// The precedence is `base_url`, then
/// [`BASE_URL_ENV`](crate::config::models::BASE_URL_ENV), then the file. The
/// final result is validated again, so an override cannot bypass the checks
/// [`load_config`] applies to the file.
///
/// # Errors
///
/// Returns the errors of [`load_config`], or [`ConfigError::InvalidSetting`]
/// when an override is not usable.
pub async fn load_settings(root: &Path, base_url: Option<String>) -> ConfigResult<ClientSettings> {
    let settings = load_config(root)
        .await?
        .with_env_overrides()
        .with_base_url(base_url);
    settings.validate()?;
    Ok(settings)
}
