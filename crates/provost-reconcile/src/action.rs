//! Reconciliation actions.
//!
//! An action is one idempotent step toward convergence. Lists of actions
//! are pass-scoped: computed fresh at the start of a pass, applied in
//! order, discarded at the end, never reused.

use std::fmt;

use provost_policy::{RoomId, UserId};

/// One convergence step against the homeserver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationAction {
    /// Create the account.
    CreateUser {
        /// The account to create.
        user_id: UserId,
    },
    /// Deactivate an active account.
    DeactivateUser {
        /// The account to deactivate.
        user_id: UserId,
    },
    /// Reactivate a deactivated account.
    ReactivateUser {
        /// The account to reactivate.
        user_id: UserId,
    },
    /// Set the account's display name.
    SetDisplayName {
        /// The account to update.
        user_id: UserId,
        /// The display name to set.
        display_name: String,
    },
    /// Resolve the avatar reference and upload it as the account's avatar.
    SetAvatar {
        /// The account to update.
        user_id: UserId,
        /// The avatar source reference; bytes are fetched at apply time.
        avatar_uri: String,
    },
    /// Join the account to a room.
    JoinRoom {
        /// The account to join.
        user_id: UserId,
        /// The room to join.
        room_id: RoomId,
    },
    /// Remove the account from a room.
    LeaveRoom {
        /// The account to remove.
        user_id: UserId,
        /// The room to leave.
        room_id: RoomId,
    },
}

impl ReconciliationAction {
    /// The user this action targets.
    pub fn user_id(&self) -> &UserId {
        match self {
            Self::CreateUser { user_id }
            | Self::DeactivateUser { user_id }
            | Self::ReactivateUser { user_id }
            | Self::SetDisplayName { user_id, .. }
            | Self::SetAvatar { user_id, .. }
            | Self::JoinRoom { user_id, .. }
            | Self::LeaveRoom { user_id, .. } => user_id,
        }
    }

    /// Short operation name for logs and reports.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CreateUser { .. } => "create_user",
            Self::DeactivateUser { .. } => "deactivate_user",
            Self::ReactivateUser { .. } => "reactivate_user",
            Self::SetDisplayName { .. } => "set_display_name",
            Self::SetAvatar { .. } => "set_avatar",
            Self::JoinRoom { .. } => "join_room",
            Self::LeaveRoom { .. } => "leave_room",
        }
    }
}

impl fmt::Display for ReconciliationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateUser { user_id } => write!(f, "create_user({user_id})"),
            Self::DeactivateUser { user_id } => write!(f, "deactivate_user({user_id})"),
            Self::ReactivateUser { user_id } => write!(f, "reactivate_user({user_id})"),
            Self::SetDisplayName { user_id, display_name } => {
                write!(f, "set_display_name({user_id}, {display_name:?})")
            }
            Self::SetAvatar { user_id, avatar_uri } => {
                write!(f, "set_avatar({user_id}, {avatar_uri})")
            }
            Self::JoinRoom { user_id, room_id } => write!(f, "join_room({user_id}, {room_id})"),
            Self::LeaveRoom { user_id, room_id } => write!(f, "leave_room({user_id}, {room_id})"),
        }
    }
}
