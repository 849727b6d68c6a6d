//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Homeserver connection section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HomeserverConfig {
    /// The deployment's domain; every managed user must carry it
    /// (e.g. `example.org`).
    pub domain: String,

    /// Base URL of the homeserver's client/admin API
    /// (e.g. `http://localhost:8008`).
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,

    /// Per-request timeout against the homeserver, in milliseconds.
    #[serde(default = "default_homeserver_timeout")]
    pub timeout_ms: u64,
}

impl Default for HomeserverConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            api_endpoint: default_api_endpoint(),
            timeout_ms: default_homeserver_timeout(),
        }
    }
}

fn default_api_endpoint() -> String {
    "http://localhost:8008".to_string()
}

fn default_homeserver_timeout() -> u64 {
    45_000
}

/// Reconciliation section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReconciliationConfig {
    /// How long after a partially-failed pass the next attempt runs, in
    /// milliseconds.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_ms: u64,

    /// The account a connector implementation acts as when performing
    /// administrative operations. Interpreted by the connector, not by the
    /// control loop.
    #[serde(default)]
    pub reconciler_user_id: Option<String>,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: default_retry_interval(),
            reconciler_user_id: None,
        }
    }
}

impl ReconciliationConfig {
    /// The retry interval as a [`Duration`].
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

fn default_retry_interval() -> u64 {
    30_000
}

/// User-authentication section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UserAuthConfig {
    /// Capacity of the credential-outcome cache backing
    /// `rest-with-cache-fallback`. Zero disables caching.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Timeout for remote verification calls, in milliseconds.
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout_ms: u64,
}

impl Default for UserAuthConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            remote_timeout_ms: default_remote_timeout(),
        }
    }
}

impl UserAuthConfig {
    /// The remote verification timeout as a [`Duration`].
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_remote_timeout() -> u64 {
    10_000
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Structured JSON lines.
    Json,
    /// Human-readable output.
    Pretty,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (e.g. "info", "debug").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Whether ANSI colors are emitted (pretty format only).
    #[serde(default = "default_true")]
    pub ansi_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            ansi_enabled: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

fn default_true() -> bool {
    true
}

/// Complete Provost configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProvostConfig {
    /// Homeserver connection settings.
    #[serde(default)]
    pub homeserver: HomeserverConfig,

    /// Reconciliation control-loop settings.
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,

    /// User-authentication settings.
    #[serde(default)]
    pub userauth: UserAuthConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ProvostConfig {
    /// Validate the assembled configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.homeserver.domain.is_empty() {
            return Err(ConfigError::validation("homeserver.domain must be set"));
        }
        if !self.homeserver.api_endpoint.starts_with("http://")
            && !self.homeserver.api_endpoint.starts_with("https://")
        {
            return Err(ConfigError::validation(
                "homeserver.api_endpoint must be an http(s) URL",
            ));
        }
        if self.reconciliation.retry_interval_ms == 0 {
            return Err(ConfigError::validation(
                "reconciliation.retry_interval_ms must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ProvostConfig {
        ProvostConfig {
            homeserver: HomeserverConfig {
                domain: "example.org".to_string(),
                ..HomeserverConfig::default()
            },
            ..ProvostConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = ProvostConfig::default();
        assert_eq!(config.homeserver.api_endpoint, "http://localhost:8008");
        assert_eq!(config.reconciliation.retry_interval_ms, 30_000);
        assert_eq!(config.userauth.cache_capacity, 1000);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_validate_requires_domain() {
        let err = ProvostConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("homeserver.domain"));

        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_retry_interval() {
        let mut config = valid();
        config.reconciliation.retry_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let mut config = valid();
        config.homeserver.api_endpoint = "unix:///tmp/homeserver.sock".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_accessors() {
        let config = valid();
        assert_eq!(config.reconciliation.retry_interval(), Duration::from_secs(30));
        assert_eq!(config.userauth.remote_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let toml = r#"
            [homeserver]
            domain = "example.org"
            port = 8008
        "#;
        let result: Result<ProvostConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
