//! Observed server state snapshots.
//!
//! An [`ObservedState`] is a pass-scoped snapshot of what the live
//! homeserver knows about a set of users. It is fetched fresh at the start
//! of every reconciliation pass and discarded at the end, never cached,
//! since a convergence loop acting on stale observations would fight the
//! server.

use std::collections::HashMap;

use provost_policy::{RoomId, UserId};

/// What the homeserver reports about one user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservedUser {
    /// Whether the account exists at all.
    pub exists: bool,
    /// Whether the account is active (not deactivated). Meaningless when
    /// `exists` is false.
    pub active: bool,
    /// The live display name, if any.
    pub display_name: Option<String>,
    /// The avatar source reference recorded by the last successful
    /// `SetAvatar`, if any. Lets the computator diff avatars without
    /// fetching bytes.
    pub avatar_source_uri: Option<String>,
    /// Rooms the user is currently joined to.
    pub joined_room_ids: Vec<RoomId>,
}

impl ObservedUser {
    /// An account that does not exist on the server.
    pub fn absent() -> Self {
        Self::default()
    }

    /// An existing, active account with no profile state.
    pub fn active() -> Self {
        Self {
            exists: true,
            active: true,
            ..Self::default()
        }
    }

    /// An existing, deactivated account.
    pub fn deactivated() -> Self {
        Self {
            exists: true,
            active: false,
            ..Self::default()
        }
    }

    /// Builder-style display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Builder-style avatar source reference.
    pub fn with_avatar_source(mut self, uri: impl Into<String>) -> Self {
        self.avatar_source_uri = Some(uri.into());
        self
    }

    /// Builder-style room memberships.
    pub fn with_rooms(mut self, rooms: impl IntoIterator<Item = RoomId>) -> Self {
        self.joined_room_ids = rooms.into_iter().collect();
        self
    }
}

/// A snapshot of the homeserver's knowledge of a set of users.
#[derive(Debug, Clone, Default)]
pub struct ObservedState {
    users: HashMap<UserId, ObservedUser>,
}

impl ObservedState {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record what the server reports for a user.
    pub fn insert(&mut self, user_id: UserId, user: ObservedUser) {
        self.users.insert(user_id, user);
    }

    /// What the server reports for a user. Users the snapshot holds no
    /// entry for are treated as absent.
    pub fn user(&self, user_id: &UserId) -> ObservedUser {
        self.users.get(user_id).cloned().unwrap_or_default()
    }

    /// Number of users covered by the snapshot.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the snapshot covers no users.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
