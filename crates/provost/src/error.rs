//! Top-level error type for assembling and running Provost.

use thiserror::Error;

/// Result type for runtime assembly operations.
pub type ProvostResult<T> = Result<T, ProvostError>;

/// Errors raised while assembling or running the Provost runtime.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProvostError {
    /// Logging could not be initialized.
    #[error("failed to initialize logging: {0}")]
    Logging(String),

    /// A required component was not supplied to the builder.
    #[error("missing required component: {0}")]
    MissingComponent(&'static str),

    /// The authenticator chain could not be built.
    #[error(transparent)]
    UserAuth(#[from] provost_userauth::UserAuthError),

    /// The reconciliation loop rejected an operation.
    #[error(transparent)]
    Reconcile(#[from] provost_reconcile::ReconcileError),
}

impl ProvostError {
    /// Create a logging initialization error.
    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging(message.into())
    }
}
