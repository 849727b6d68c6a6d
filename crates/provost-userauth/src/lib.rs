//! Pluggable credential verification for Provost.
//!
//! Gateway interceptors hand each login attempt to the
//! [`UserAuthChecker`], which selects exactly one [`Authenticator`] based
//! on the user's configured method and returns a plain allow/deny
//! [`AuthOutcome`]. Supported methods: `plain`, `md5`, `sha1`, `sha256`,
//! `sha512`, `bcrypt`, and `rest-with-cache-fallback`, the last being the
//! [`RestAuthenticator`] wrapped in a [`CacheFallbackAuthenticator`] so an
//! outage of the remote endpoint does not lock managed users out.
//!
//! # Architecture
//!
//! ```text
//!   login attempt ──▶ UserAuthChecker ──▶ authenticator for method
//!                          │                     │
//!                          ▼                     ▼
//!                     AuthOutcome ◀── CacheFallback ──▶ RestVerifier
//!                                          │
//!                                    CredentialCache
//!                                (bounded LRU, fingerprint keys)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authenticator;
pub mod cache;
pub mod checker;
pub mod error;
pub mod fallback;
pub mod rest;

// Re-exports for convenience
pub use authenticator::{
    AuthOutcome, Authenticator, BcryptAuthenticator, DigestAlgorithm, DigestAuthenticator,
    PlainAuthenticator,
};
pub use cache::{CacheStats, CredentialCache};
pub use checker::{UserAuthChecker, UserAuthCheckerBuilder};
pub use error::{UserAuthError, UserAuthResult};
pub use fallback::CacheFallbackAuthenticator;
pub use rest::{HttpRestVerifier, RestAuthenticator, RestVerifier};
