//! The reconciliation computator.
//!
//! A pure function from (desired policy, observed state) to the minimal
//! ordered action list that converges the server. It never talks to the
//! connector (both inputs are supplied by the caller) and given the same
//! two inputs it always produces the same list, which is what makes the
//! control loop testable and its passes idempotent.

use provost_policy::{ManagedUserPolicy, PolicyDocument};
use provost_connector::{ObservedState, ObservedUser};

use crate::action::ReconciliationAction;

/// Compute the ordered action list converging `observed` toward `desired`.
///
/// Ordering: users by identifier; within a user, existence/activation
/// actions first, then display name, then avatar, then room joins, then
/// room leaves (rooms sorted). Users present on the server but absent from
/// the policy are never touched.
pub fn compute(desired: &PolicyDocument, observed: &ObservedState) -> Vec<ReconciliationAction> {
    let mut users: Vec<&ManagedUserPolicy> = desired.users.iter().collect();
    users.sort_by(|a, b| a.id.cmp(&b.id));

    let mut actions = Vec::new();
    for user in users {
        compute_user(user, desired, &observed.user(&user.id), &mut actions);
    }
    actions
}

fn compute_user(
    desired: &ManagedUserPolicy,
    document: &PolicyDocument,
    observed: &ObservedUser,
    actions: &mut Vec<ReconciliationAction>,
) {
    if !desired.active {
        // Profile and room state on a deactivated account is meaningless;
        // only the deactivation itself is emitted. An account that does
        // not exist is not created just to be deactivated.
        if observed.exists && observed.active {
            actions.push(ReconciliationAction::DeactivateUser {
                user_id: desired.id.clone(),
            });
        }
        return;
    }

    if !observed.exists {
        actions.push(ReconciliationAction::CreateUser {
            user_id: desired.id.clone(),
        });
    } else if !observed.active {
        actions.push(ReconciliationAction::ReactivateUser {
            user_id: desired.id.clone(),
        });
    }

    // From here on the account exists and is active (possibly by virtue of
    // the action just emitted, applied earlier in this same pass).

    if let Some(display_name) = &desired.display_name {
        let converged = observed.exists && observed.display_name.as_deref() == Some(display_name);
        if !converged {
            actions.push(ReconciliationAction::SetDisplayName {
                user_id: desired.id.clone(),
                display_name: display_name.clone(),
            });
        }
    }

    if let Some(avatar_uri) = &desired.avatar_uri {
        let converged =
            observed.exists && observed.avatar_source_uri.as_deref() == Some(avatar_uri);
        if !converged {
            actions.push(ReconciliationAction::SetAvatar {
                user_id: desired.id.clone(),
                avatar_uri: avatar_uri.clone(),
            });
        }
    }

    let mut joins: Vec<_> = desired
        .joined_room_ids
        .iter()
        .filter(|room| !observed.exists || !observed.joined_room_ids.contains(room))
        .cloned()
        .collect();
    joins.sort();
    for room_id in joins {
        actions.push(ReconciliationAction::JoinRoom {
            user_id: desired.id.clone(),
            room_id,
        });
    }

    // Only managed rooms are ever left: memberships outside the allow-list
    // are not Provost's to disturb.
    let mut leaves: Vec<_> = observed
        .joined_room_ids
        .iter()
        .filter(|room| document.is_room_managed(room))
        .filter(|room| !desired.joined_room_ids.contains(room))
        .cloned()
        .collect();
    leaves.sort();
    for room_id in leaves {
        actions.push(ReconciliationAction::LeaveRoom {
            user_id: desired.id.clone(),
            room_id,
        });
    }
}
