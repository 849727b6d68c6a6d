//! Policy document model, validation, storage and authorization queries.
//!
//! This crate is the desired-state half of Provost:
//!
//! - [`document`]: the administrator-supplied [`PolicyDocument`] and its
//!   constituent types;
//! - [`validator`]: structural/semantic validation a document must pass
//!   before it can become active;
//! - [`store`]: the atomically-swapped active document plus a
//!   change-notification channel for the reconciliation control loop;
//! - [`checker`]: pure authorization queries over an explicit document
//!   snapshot, safe to call concurrently from request handlers.
//!
//! # Architecture
//!
//! ```text
//!   candidate document ──▶ Validator ──▶ Store ──▶ Arc<PolicyDocument>
//!                                          │              │
//!                                          │ watch        │ snapshot
//!                                          ▼              ▼
//!                                   control loop    checker queries
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod checker;
pub mod document;
pub mod error;
pub mod store;
pub mod validator;

// Re-exports for convenience
pub use document::{
    AuthType, ManagedUserPolicy, PolicyDocument, PolicyFlags, RoomId, UnmanagedUserPolicy, UserId,
};
pub use error::{PolicyError, PolicyResult};
pub use store::Store;
pub use validator::Validator;
