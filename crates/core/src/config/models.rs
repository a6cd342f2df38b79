//! Validated client configuration.

use crate::config::error::{ConfigError, ConfigResult};
use crate::connection::ConnectionSettings;
use std::time::Duration;
use sw_protocol::WatchSettings;

/// Client configuration loaded from `.stagewatch/config.toml`.
///
/// Wraps the raw [`WatchSettings`] and exposes them as typed durations.
///
/// # Example
///
/// ```rust,no_run
/// use sw_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Streaming from {}", config.settings.ws_base_url);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    pub settings: WatchSettings,
}

impl ClientConfig {
    pub fn new(settings: WatchSettings) -> Self {
        Self { settings }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.settings.reconnect_delay_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.settings.ping_interval_ms)
    }

    pub fn ping_ack_timeout(&self) -> Option<Duration> {
        self.settings.ping_ack_timeout_ms.map(Duration::from_millis)
    }

    pub fn terminal_stage(&self) -> Option<&str> {
        self.settings.terminal_stage.as_deref()
    }

    /// Timing for the connection manager.
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            reconnect_delay: self.reconnect_delay(),
            ping_interval: self.ping_interval(),
            ping_ack_timeout: self.ping_ack_timeout(),
        }
    }

    /// Reject settings the client cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidSetting` for empty URLs, an empty terminal
    /// stage name, or zero intervals.
    pub fn validate(&self) -> ConfigResult<()> {
        let s = &self.settings;

        if s.ws_base_url.trim().is_empty() {
            return Err(invalid("ws_base_url", "must not be empty"));
        }
        if s.api_base_url.trim().is_empty() {
            return Err(invalid("api_base_url", "must not be empty"));
        }
        if s.terminal_stage.as_deref().is_some_and(str::is_empty) {
            return Err(invalid("terminal_stage", "must not be empty when set"));
        }
        if s.reconnect_delay_ms == 0 {
            return Err(invalid("reconnect_delay_ms", "must be greater than zero"));
        }
        if s.ping_interval_ms == 0 {
            return Err(invalid("ping_interval_ms", "must be greater than zero"));
        }
        if s.ping_ack_timeout_ms == Some(0) {
            return Err(invalid("ping_ack_timeout_ms", "must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidSetting {
        field,
        reason: reason.to_string(),
    }
}
