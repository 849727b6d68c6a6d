//! Configuration loader with layered approach.
//!
//! The loader applies configuration in layers, with later layers
//! overriding earlier ones:
//! 1. Default values (built into the code)
//! 2. Configuration file (TOML or JSON)
//! 3. Environment variables (`PROVOST__SECTION__KEY`)

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{LogFormat, ProvostConfig};

/// Layered configuration loader.
///
/// # Example
///
/// ```no_run
/// use provost_config::ConfigLoader;
///
/// # fn main() -> Result<(), provost_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_file("provost.toml")?
///     .with_env_prefix("PROVOST")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: ProvostConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader holding default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ProvostConfig::default(),
            env_prefix: None,
        }
    }

    /// Load configuration from a TOML or JSON file, determined by
    /// extension.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> ConfigResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        self.config = Self::parse_file(&content, path)?;
        Ok(self)
    }

    /// Load configuration from an optional file; silently keeps the
    /// current layer if the file does not exist.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> ConfigResult<Self> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the given format
    /// (`"toml"` or `"json"`).
    pub fn with_string(mut self, content: &str, format: &str) -> ConfigResult<Self> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::validation(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };
        Ok(self)
    }

    /// Set the environment variable prefix for overrides.
    ///
    /// Variables use the format `PREFIX__SECTION__KEY`, e.g.
    /// `PROVOST__HOMESERVER__DOMAIN=example.org`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file into the process environment, if present.
    pub fn with_dotenv(self) -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        Ok(self)
    }

    /// Finalize: apply environment overrides and validate.
    pub fn load(mut self) -> ConfigResult<ProvostConfig> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Finalize without validation, for callers that want to inspect or
    /// amend the configuration first.
    #[must_use]
    pub fn load_unvalidated(self) -> ProvostConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> ConfigResult<ProvostConfig> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::validation(format!(
                "unsupported configuration file format: {}",
                path.display()
            ))),
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> ConfigResult<()> {
        let env_vars: HashMap<String, String> = env::vars()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();

        for (key, value) in env_vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> ConfigResult<()> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();

        match parts.as_slice() {
            ["HOMESERVER", "DOMAIN"] => {
                self.config.homeserver.domain = value.to_string();
            }
            ["HOMESERVER", "API_ENDPOINT"] => {
                self.config.homeserver.api_endpoint = value.to_string();
            }
            ["HOMESERVER", "TIMEOUT_MS"] => {
                self.config.homeserver.timeout_ms = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse(key, "expected integer"))?;
            }
            ["RECONCILIATION", "RETRY_INTERVAL_MS"] => {
                self.config.reconciliation.retry_interval_ms = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse(key, "expected integer"))?;
            }
            ["RECONCILIATION", "RECONCILER_USER_ID"] => {
                self.config.reconciliation.reconciler_user_id = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            ["USERAUTH", "CACHE_CAPACITY"] => {
                self.config.userauth.cache_capacity = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse(key, "expected integer"))?;
            }
            ["USERAUTH", "REMOTE_TIMEOUT_MS"] => {
                self.config.userauth.remote_timeout_ms = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse(key, "expected integer"))?;
            }
            ["LOGGING", "LEVEL"] => {
                self.config.logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse(key, "expected 'json' or 'pretty'"))
                    }
                };
            }
            ["LOGGING", "ANSI_ENABLED"] => {
                self.config.logging.ansi_enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse(key, "expected boolean"))?;
            }

            // Unknown key - ignore
            _ => {}
        }

        Ok(())
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
