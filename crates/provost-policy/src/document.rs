//! Policy document model.
//!
//! A [`PolicyDocument`] is the administrator-supplied declaration of every
//! account Provost manages on the homeserver: whether it exists and is
//! active, how it authenticates, and what profile/membership state it
//! should carry. Documents are immutable values once installed into the
//! [`Store`](crate::Store); readers always operate on an explicit
//! `Arc<PolicyDocument>` snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fully-qualified user identifier, e.g. `@alice:example.org`.
///
/// The wrapper performs no validation on construction; shape and domain
/// checks belong to the [`Validator`](crate::Validator) so that a candidate
/// document can be deserialized first and rejected with a field-level error
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a raw identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The full identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The localpart, i.e. `alice` for `@alice:example.org`.
    ///
    /// Returns `None` when the identifier is not of the `@local:domain`
    /// shape.
    pub fn localpart(&self) -> Option<&str> {
        self.0
            .strip_prefix('@')
            .and_then(|rest| rest.split_once(':'))
            .map(|(local, _)| local)
    }

    /// The domain, i.e. `example.org` for `@alice:example.org`.
    pub fn domain(&self) -> Option<&str> {
        self.0
            .strip_prefix('@')
            .and_then(|rest| rest.split_once(':'))
            .map(|(_, domain)| domain)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A room identifier, e.g. `!lobby:example.org`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wrap a raw identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The full identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Supported credential-verification methods.
///
/// The set is closed: a document naming any other method fails
/// deserialization, and the user-auth checker maps every variant to
/// exactly one authenticator at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthType {
    /// Exact string comparison against the stored password.
    Plain,
    /// MD5 digest comparison against a stored lowercase hex digest.
    Md5,
    /// SHA-1 digest comparison.
    Sha1,
    /// SHA-256 digest comparison.
    Sha256,
    /// SHA-512 digest comparison.
    Sha512,
    /// Adaptive-cost bcrypt hash comparison.
    Bcrypt,
    /// Remote REST verification with an LRU cache consulted when the
    /// remote endpoint is unreachable.
    RestWithCacheFallback,
}

impl AuthType {
    /// Every supported method, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Plain,
        Self::Md5,
        Self::Sha1,
        Self::Sha256,
        Self::Sha512,
        Self::Bcrypt,
        Self::RestWithCacheFallback,
    ];

    /// The wire name of the method, as written in policy documents.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Bcrypt => "bcrypt",
            Self::RestWithCacheFallback => "rest-with-cache-fallback",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the gateway treats users that are not listed in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnmanagedUserPolicy {
    /// Unmanaged users may not authenticate through the gateway.
    Deny,
    /// Provost expresses no opinion; the homeserver decides.
    Ignore,
}

impl Default for UnmanagedUserPolicy {
    fn default() -> Self {
        Self::Deny
    }
}

/// Global defaults applied across the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyFlags {
    /// Behavior for users absent from the document. Governs the
    /// authentication path only; reconciliation never touches unmanaged
    /// users under either setting.
    #[serde(default)]
    pub unmanaged_users: UnmanagedUserPolicy,

    /// Whether managed users whose display name is governed by policy may
    /// still change it themselves through the gateway.
    #[serde(default)]
    pub allow_custom_display_names: bool,

    /// Whether managed users whose avatar is governed by policy may still
    /// change it themselves through the gateway.
    #[serde(default)]
    pub allow_custom_avatars: bool,
}

impl Default for PolicyFlags {
    fn default() -> Self {
        Self {
            unmanaged_users: UnmanagedUserPolicy::Deny,
            allow_custom_display_names: false,
            allow_custom_avatars: false,
        }
    }
}

/// The desired state of one managed user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagedUserPolicy {
    /// Fully-qualified user identifier.
    pub id: UserId,

    /// Whether the account should be usable. Inactive users are
    /// deactivated on the server and denied authentication.
    pub active: bool,

    /// Credential-verification method for gateway logins.
    pub auth_type: AuthType,

    /// Method-specific parameter: the password (`plain`), a lowercase hex
    /// digest (`md5`/`sha1`/`sha256`/`sha512`), a bcrypt hash (`bcrypt`),
    /// or an `http(s)` verification endpoint
    /// (`rest-with-cache-fallback`).
    pub auth_credential: String,

    /// Desired display name. `None` leaves the dimension unmanaged.
    #[serde(default)]
    pub display_name: Option<String>,

    /// Desired avatar source reference (`http(s)://` or `file://`).
    /// Resolved to image bytes at apply time, never at compute time.
    /// `None` leaves the dimension unmanaged.
    #[serde(default)]
    pub avatar_uri: Option<String>,

    /// Rooms the user must be joined to. Rooms listed in the document's
    /// managed-room allow-list but absent here are left.
    #[serde(default)]
    pub joined_room_ids: Vec<RoomId>,
}

/// The administrator-supplied declarative policy.
///
/// Exactly one document is active at any instant (see
/// [`Store`](crate::Store)); validation happens strictly before a document
/// can become active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDocument {
    /// Monotonically-increasing revision marker. The store rejects
    /// installs that would move the revision backwards.
    pub revision: u64,

    /// Global defaults.
    #[serde(default)]
    pub flags: PolicyFlags,

    /// The allow-list of rooms Provost manages. Membership in any room
    /// outside this list is never disturbed.
    #[serde(default)]
    pub managed_room_ids: Vec<RoomId>,

    /// Managed users. The validator rejects duplicate identifiers.
    #[serde(default)]
    pub users: Vec<ManagedUserPolicy>,
}

impl PolicyDocument {
    /// Look up the policy for a user, if managed.
    pub fn user(&self, user_id: &UserId) -> Option<&ManagedUserPolicy> {
        self.users.iter().find(|u| &u.id == user_id)
    }

    /// Whether the user is listed in the document.
    pub fn is_managed(&self, user_id: &UserId) -> bool {
        self.user(user_id).is_some()
    }

    /// Whether the room is in the managed-room allow-list.
    pub fn is_room_managed(&self, room_id: &RoomId) -> bool {
        self.managed_room_ids.iter().any(|r| r == room_id)
    }

    /// Identifiers of every managed user, in document order.
    pub fn managed_user_ids(&self) -> impl Iterator<Item = &UserId> {
        self.users.iter().map(|u| &u.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(id: &str) -> ManagedUserPolicy {
        ManagedUserPolicy {
            id: UserId::new(id),
            active: true,
            auth_type: AuthType::Plain,
            auth_credential: "secret".to_string(),
            display_name: None,
            avatar_uri: None,
            joined_room_ids: Vec::new(),
        }
    }

    #[test]
    fn test_user_id_parts() {
        let id = UserId::new("@alice:example.org");
        assert_eq!(id.localpart(), Some("alice"));
        assert_eq!(id.domain(), Some("example.org"));
    }

    #[test]
    fn test_user_id_malformed_parts() {
        let id = UserId::new("alice");
        assert_eq!(id.localpart(), None);
        assert_eq!(id.domain(), None);
    }

    #[test]
    fn test_auth_type_wire_names() {
        assert_eq!(AuthType::Sha256.as_str(), "sha256");
        assert_eq!(
            AuthType::RestWithCacheFallback.as_str(),
            "rest-with-cache-fallback"
        );
    }

    #[test]
    fn test_auth_type_deserializes_kebab_case() {
        let method: AuthType = serde_json::from_str("\"rest-with-cache-fallback\"").unwrap();
        assert_eq!(method, AuthType::RestWithCacheFallback);
    }

    #[test]
    fn test_auth_type_rejects_unknown_method() {
        let result: Result<AuthType, _> = serde_json::from_str("\"scrypt\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_document_user_lookup() {
        let doc = PolicyDocument {
            revision: 1,
            flags: PolicyFlags::default(),
            managed_room_ids: vec![RoomId::new("!lobby:example.org")],
            users: vec![sample_user("@alice:example.org")],
        };

        assert!(doc.is_managed(&UserId::new("@alice:example.org")));
        assert!(!doc.is_managed(&UserId::new("@bob:example.org")));
        assert!(doc.is_room_managed(&RoomId::new("!lobby:example.org")));
        assert!(!doc.is_room_managed(&RoomId::new("!other:example.org")));
    }

    #[test]
    fn test_document_deserializes_with_defaults() {
        let json = r#"{
            "revision": 7,
            "users": [{
                "id": "@alice:example.org",
                "active": true,
                "auth_type": "sha256",
                "auth_credential": "aa"
            }]
        }"#;

        let doc: PolicyDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.revision, 7);
        assert_eq!(doc.flags.unmanaged_users, UnmanagedUserPolicy::Deny);
        assert!(doc.managed_room_ids.is_empty());
        assert_eq!(doc.users[0].auth_type, AuthType::Sha256);
        assert_eq!(doc.users[0].display_name, None);
    }

    #[test]
    fn test_document_rejects_unknown_fields() {
        let json = r#"{"revision": 1, "surprise": true}"#;
        let result: Result<PolicyDocument, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
