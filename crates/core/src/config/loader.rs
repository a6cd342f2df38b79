//! Configuration file loader for the `.stagewatch/` directory.
//!
//! Only `config.toml` is read. A missing directory or file yields the default
//! settings.

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::ClientConfig;
use std::path::Path;
use sw_protocol::WatchSettings;

/// Loads client configuration from `.stagewatch/config.toml`.
///
/// # Arguments
///
/// * `root` - Directory containing the `.stagewatch/` folder
///
/// # Returns
///
/// A validated `ClientConfig`. If the folder or file is missing, returns the
/// default configuration rather than an error.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - The file exists but cannot be read
/// - The file is not valid TOML or has fields of the wrong type
/// - A setting is out of range (see [`ClientConfig::validate`])
///
/// # Example
///
/// ```rust,no_run
/// use sw_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Reconnecting after {:?}", config.reconnect_delay());
/// # Ok(())
/// # }
/// ```
pub async fn load_config(root: &Path) -> ConfigResult<ClientConfig> {
    let config_path = root.join(".stagewatch").join("config.toml");

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "no config file, using defaults");
        return Ok(ClientConfig::default());
    }

    let content = tokio::fs::read_to_string(&config_path)
        .await
        .map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    let settings: WatchSettings =
        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: config_path,
            source,
        })?;

    let config = ClientConfig::new(settings);
    config.validate()?;
    Ok(config)
}
