//! The homeserver connector boundary.
//!
//! All mutations of live server state go through this trait and only
//! through it; the checker and authenticator paths never write. Concrete
//! implementations (wire clients for a particular homeserver) live outside
//! this workspace; the in-crate [`MockConnector`](crate::MockConnector)
//! exists for tests.

use async_trait::async_trait;

use provost_policy::{RoomId, UserId};

use crate::error::ConnectorResult;
use crate::state::ObservedState;

/// Account, profile and room operations against the live homeserver.
///
/// Mutations are idempotent from the caller's perspective: deactivating an
/// already-deactivated user, joining an already-joined room and similar
/// no-op applications must report success, because the reconciler may
/// replay actions after a partially-failed pass.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Fetch a fresh snapshot of what the server knows about the given
    /// users. Users unknown to the server are reported as absent.
    async fn fetch_state(&self, user_ids: &[UserId]) -> ConnectorResult<ObservedState>;

    /// Create the account.
    async fn create_user(&self, user_id: &UserId) -> ConnectorResult<()>;

    /// Activate (`true`) or deactivate (`false`) the account.
    async fn set_user_active(&self, user_id: &UserId, active: bool) -> ConnectorResult<()>;

    /// Set the account's display name.
    async fn set_display_name(&self, user_id: &UserId, display_name: &str) -> ConnectorResult<()>;

    /// Upload avatar bytes and set them as the account's avatar,
    /// recording `source_uri` so future snapshots can report it.
    async fn set_avatar(
        &self,
        user_id: &UserId,
        source_uri: &str,
        bytes: &[u8],
    ) -> ConnectorResult<()>;

    /// Join the user to the room.
    async fn join_room(&self, user_id: &UserId, room_id: &RoomId) -> ConnectorResult<()>;

    /// Remove the user from the room.
    async fn leave_room(&self, user_id: &UserId, room_id: &RoomId) -> ConnectorResult<()>;

    /// Verify a credential against the live server itself. Used when a
    /// `rest-with-cache-fallback` policy delegates authentication to the
    /// homeserver rather than a third-party endpoint.
    async fn verify_credentials(&self, user_id: &UserId, password: &str) -> ConnectorResult<bool>;
}
