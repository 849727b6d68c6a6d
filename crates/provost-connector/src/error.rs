//! Error types for the connector boundary.

use thiserror::Error;

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Errors surfaced by a homeserver connector implementation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConnectorError {
    /// The homeserver rejected the operation.
    #[error("homeserver rejected {operation} for {subject}: {message}")]
    Rejected {
        /// The operation that was attempted, e.g. `create_user`.
        operation: String,
        /// The user or room the operation targeted.
        subject: String,
        /// The homeserver's stated reason.
        message: String,
    },

    /// The homeserver could not be reached or timed out.
    #[error("homeserver unreachable: {0}")]
    Unreachable(String),

    /// The connector received a response it could not interpret.
    #[error("unexpected homeserver response: {0}")]
    UnexpectedResponse(String),
}

impl ConnectorError {
    /// Create a rejection error.
    pub fn rejected(
        operation: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            operation: operation.into(),
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Check if this error indicates the homeserver was unreachable.
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

/// Errors resolving an avatar reference to image bytes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AvatarError {
    /// The reference uses a scheme the reader does not support.
    #[error("unsupported avatar source scheme: {0}")]
    UnsupportedScheme(String),

    /// Fetching the bytes failed.
    #[error("failed to read avatar from {uri}: {message}")]
    Read {
        /// The avatar source reference.
        uri: String,
        /// What went wrong.
        message: String,
    },
}

impl AvatarError {
    /// Create a read error.
    pub fn read(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Read {
            uri: uri.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_display() {
        let err = ConnectorError::rejected("create_user", "@a:example.org", "forbidden");
        assert!(err.to_string().contains("create_user"));
        assert!(err.to_string().contains("@a:example.org"));
        assert!(!err.is_unreachable());
    }

    #[test]
    fn test_unreachable_predicate() {
        let err = ConnectorError::Unreachable("connection refused".to_string());
        assert!(err.is_unreachable());
    }

    #[test]
    fn test_avatar_read_display() {
        let err = AvatarError::read("https://example.org/a.png", "404");
        assert!(err.to_string().contains("https://example.org/a.png"));
    }
}
