//! Error types for the policy crate.

use thiserror::Error;

/// Result type for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Errors that can occur while validating or installing policy documents.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PolicyError {
    /// A candidate document failed validation. Never installed.
    #[error("invalid policy document: {field}: {reason}")]
    Validation {
        /// Dotted path of the offending field, e.g. `users[2].auth_credential`.
        field: String,
        /// Why the field was rejected.
        reason: String,
    },

    /// The offered document's revision is behind the active one.
    #[error("stale policy revision {offered} (active revision is {active})")]
    StaleRevision {
        /// Revision of the currently-active document.
        active: u64,
        /// Revision of the rejected document.
        offered: u64,
    },

    /// No document has ever been installed into the store.
    ///
    /// Distinct from an installed-but-empty document.
    #[error("policy store is not initialized")]
    NotInitialized,

    /// A document could not be parsed.
    #[error("failed to parse policy document: {0}")]
    Parse(#[from] serde_json::Error),
}

impl PolicyError {
    /// Create a validation error for a specific field.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is a validation error.
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
