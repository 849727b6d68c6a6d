//! Typed configuration for Provost.
//!
//! Configuration is assembled in layers (code defaults, then an optional
//! TOML/JSON file, then `PROVOST__SECTION__KEY` environment overrides)
//! and validated once at the end, so the rest of the system only ever sees
//! a [`ProvostConfig`] that passed [`ProvostConfig::validate`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod schema;

// Re-exports for convenience
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{
    HomeserverConfig, LogFormat, LoggingConfig, ProvostConfig, ReconciliationConfig,
    UserAuthConfig,
};
