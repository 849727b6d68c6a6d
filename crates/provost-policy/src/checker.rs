//! Pure authorization queries over a policy document snapshot.
//!
//! Every function takes the document explicitly so callers control which
//! revision they evaluate against; a gateway interceptor grabs one
//! snapshot from the [`Store`](crate::Store) and uses it for the whole
//! request. There is no hidden state and nothing here ever mutates the
//! document.

use crate::document::{PolicyDocument, RoomId, UnmanagedUserPolicy, UserId};

/// Whether the user may authenticate through the gateway right now.
///
/// Managed users may authenticate while active; unmanaged users are
/// governed by the document's `unmanaged_users` flag (`deny` blocks them,
/// `ignore` defers to the homeserver).
pub fn can_authenticate(document: &PolicyDocument, user_id: &UserId) -> bool {
    match document.user(user_id) {
        Some(user) => user.active,
        None => matches!(
            document.flags.unmanaged_users,
            UnmanagedUserPolicy::Ignore
        ),
    }
}

/// Whether the user is considered active.
///
/// For unmanaged users this follows the `unmanaged_users` flag, so a
/// deny-unmanaged deployment reports `false` for anyone not listed.
pub fn is_user_active(document: &PolicyDocument, user_id: &UserId) -> bool {
    match document.user(user_id) {
        Some(user) => user.active,
        None => matches!(
            document.flags.unmanaged_users,
            UnmanagedUserPolicy::Ignore
        ),
    }
}

/// Whether the user may change their own display name through the gateway.
///
/// A display name governed by policy is read-only for its owner unless the
/// document globally allows custom display names.
pub fn can_change_display_name(document: &PolicyDocument, user_id: &UserId) -> bool {
    if document.flags.allow_custom_display_names {
        return true;
    }
    match document.user(user_id) {
        Some(user) => user.display_name.is_none(),
        None => true,
    }
}

/// Whether the user may change their own avatar through the gateway.
pub fn can_change_avatar(document: &PolicyDocument, user_id: &UserId) -> bool {
    if document.flags.allow_custom_avatars {
        return true;
    }
    match document.user(user_id) {
        Some(user) => user.avatar_uri.is_none(),
        None => true,
    }
}

/// Whether the room is in the document's managed-room allow-list.
pub fn is_room_managed(document: &PolicyDocument, room_id: &RoomId) -> bool {
    document.is_room_managed(room_id)
}
