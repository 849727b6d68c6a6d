//! Error types for the user-authentication crate.
//!
//! Denial of a credential is never an error; it is an
//! [`AuthOutcome`](crate::AuthOutcome) value. The variants here cover
//! infrastructure failures (remote endpoint unreachable) and construction
//! problems (an auth method with no registered authenticator), which per
//! the error taxonomy are fatal at setup time and recovered locally at
//! request time.

use thiserror::Error;

/// Result type for user-authentication operations.
pub type UserAuthResult<T> = Result<T, UserAuthError>;

/// Errors that can occur in the authentication subsystem.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UserAuthError {
    /// The remote verification endpoint could not be reached or timed
    /// out. The cache-fallback decorator recovers from this when it holds
    /// a cached outcome.
    #[error("remote verification unavailable: {0}")]
    RemoteUnavailable(String),

    /// The remote endpoint answered with something uninterpretable.
    #[error("unexpected remote verification response: {0}")]
    UnexpectedResponse(String),

    /// The chain was built without an authenticator for a supported
    /// method. Fatal at construction time, never a per-request failure.
    #[error("no authenticator registered for method {method}")]
    Configuration {
        /// The unmapped method's wire name.
        method: String,
    },
}

impl UserAuthError {
    /// Create a configuration error for an unmapped method.
    pub fn configuration(method: impl Into<String>) -> Self {
        Self::Configuration {
            method: method.into(),
        }
    }

    /// Check if this error means the remote dependency was unreachable.
    pub const fn is_remote_unavailable(&self) -> bool {
        matches!(self, Self::RemoteUnavailable(_))
    }
}
