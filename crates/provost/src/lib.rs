//! # Provost
//!
//! **Policy-driven account governor for chat-server deployments**
//!
//! Provost enforces an administrator-supplied declarative policy over a
//! homeserver's user accounts: which users must exist, whether they are
//! active, how they authenticate, and what display name, avatar and room
//! memberships they carry. A control loop continuously drives the live
//! server toward the declared state, while gateway interceptors query the
//! same policy to gate logins and authenticated calls.
//!
//! ## Architecture
//!
//! ```text
//!  policy provider ──▶ Validator ──▶ Store ──▶ Arc<PolicyDocument>
//!                                      │               │
//!                                watch │               │ snapshot
//!                                      ▼               ▼
//!                        StoreDrivenReconciler   checker / UserAuthChecker
//!                                      │               (gateway read path)
//!                     compute(desired, observed)
//!                                      │
//!                                  Reconciler ──▶ Connector ──▶ homeserver
//! ```
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use provost::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("provost.toml")?
//!         .with_env_prefix("PROVOST")
//!         .load()?;
//!     provost::logging::init_logging(&config.logging)?;
//!
//!     let provost = Provost::builder(config)
//!         .connector(my_homeserver_connector())
//!         .build()?;
//!     provost.start()?;
//!
//!     // Hand provost.store() to the policy provider and the gateway,
//!     // provost.userauth() to the login interceptor.
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

// Re-export component crates
pub use provost_config as config;
pub use provost_connector as connector;
pub use provost_policy as policy;
pub use provost_reconcile as reconcile;
pub use provost_userauth as userauth;

pub mod error;
pub mod logging;
pub mod runtime;

pub use error::{ProvostError, ProvostResult};
pub use runtime::{ConnectorRestVerifier, Provost, ProvostBuilder};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use provost::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ProvostError, ProvostResult};
    pub use crate::runtime::{Provost, ProvostBuilder};

    pub use provost_config::{ConfigLoader, ProvostConfig};
    pub use provost_connector::{
        AvatarReader, Connector, ConnectorError, ObservedState, ObservedUser,
    };
    pub use provost_policy::{
        checker, AuthType, ManagedUserPolicy, PolicyDocument, PolicyError, PolicyFlags, RoomId,
        Store, UnmanagedUserPolicy, UserId, Validator,
    };
    pub use provost_reconcile::{
        compute, ReconciliationAction, ReconciliationReport, Reconciler, StoreDrivenReconciler,
    };
    pub use provost_userauth::{AuthOutcome, Authenticator, CredentialCache, UserAuthChecker};
}
