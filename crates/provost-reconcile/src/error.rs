//! Error types for the reconciliation crate.
//!
//! Per-action failures are not errors in the `Result` sense: they are
//! recorded as [`ConvergenceActionError`] values inside the pass report so
//! the remaining actions still run. The [`ReconcileError`] variants cover
//! whole-pass and control-loop failures.

use thiserror::Error;

use provost_connector::ConnectorError;

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// A single reconciliation action failed against the connector.
///
/// Recorded in the pass report; never aborts the pass.
#[derive(Debug, Clone, Error)]
#[error("{action} failed: {message}")]
pub struct ConvergenceActionError {
    /// Display form of the failed action.
    pub action: String,
    /// Why it failed.
    pub message: String,
}

impl ConvergenceActionError {
    /// Create an action error.
    pub fn new(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            message: message.into(),
        }
    }
}

/// Errors that abort a pass or reject a control-loop operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReconcileError {
    /// The observed-state snapshot could not be fetched, so there is
    /// nothing safe to diff against.
    #[error("failed to fetch observed state: {0}")]
    Snapshot(#[from] ConnectorError),

    /// The control loop was started twice.
    #[error("reconciliation loop already running")]
    AlreadyRunning,
}
