//! Structural and semantic validation of candidate policy documents.
//!
//! Validation is side-effect free and happens strictly before a document
//! can become active: the [`Store`](crate::Store) refuses to install a
//! document the validator rejects, so every reader can rely on the
//! invariants checked here (well-formed identifiers, unique users,
//! per-method credential shapes, managed-room containment).

use regex::Regex;

use crate::document::{AuthType, ManagedUserPolicy, PolicyDocument, RoomId};
use crate::error::{PolicyError, PolicyResult};
use std::collections::HashSet;

/// Validates candidate policy documents against a deployment.
#[derive(Debug, Clone)]
pub struct Validator {
    homeserver_domain: String,
    localpart: Regex,
}

impl Validator {
    /// Create a validator for the given homeserver domain.
    ///
    /// Every managed user's identifier must carry this domain; documents
    /// naming users of other deployments are rejected.
    pub fn new(homeserver_domain: impl Into<String>) -> Self {
        Self {
            homeserver_domain: homeserver_domain.into(),
            // Localpart grammar for user identifiers on the deployment.
            localpart: Regex::new(r"^[a-z0-9._=/-]+$").expect("static localpart pattern"),
        }
    }

    /// The homeserver domain this validator enforces.
    pub fn homeserver_domain(&self) -> &str {
        &self.homeserver_domain
    }

    /// Validate a candidate document.
    ///
    /// Returns the first violation found, identified by a dotted field
    /// path. A failing validation never mutates anything.
    pub fn validate(&self, document: &PolicyDocument) -> PolicyResult<()> {
        for (i, room_id) in document.managed_room_ids.iter().enumerate() {
            self.validate_room_id(room_id, &format!("managed_room_ids[{i}]"))?;
        }

        let mut seen = HashSet::new();
        for (i, user) in document.users.iter().enumerate() {
            let field = format!("users[{i}]");
            self.validate_user(user, document, &field)?;

            if !seen.insert(&user.id) {
                return Err(PolicyError::validation(
                    format!("{field}.id"),
                    format!("duplicate user identifier {}", user.id),
                ));
            }
        }

        Ok(())
    }

    fn validate_user(
        &self,
        user: &ManagedUserPolicy,
        document: &PolicyDocument,
        field: &str,
    ) -> PolicyResult<()> {
        let id = user.id.as_str();
        if !id.starts_with('@') {
            return Err(PolicyError::validation(
                format!("{field}.id"),
                format!("user identifier {id} must start with '@'"),
            ));
        }

        let localpart = user.id.localpart().unwrap_or_default();
        if localpart.is_empty() || !self.localpart.is_match(localpart) {
            return Err(PolicyError::validation(
                format!("{field}.id"),
                format!("user identifier {id} has a malformed localpart"),
            ));
        }

        match user.id.domain() {
            Some(domain) if domain == self.homeserver_domain => {}
            Some(domain) => {
                return Err(PolicyError::validation(
                    format!("{field}.id"),
                    format!(
                        "user identifier {id} belongs to {domain}, expected {}",
                        self.homeserver_domain
                    ),
                ));
            }
            None => {
                return Err(PolicyError::validation(
                    format!("{field}.id"),
                    format!("user identifier {id} is missing a domain"),
                ));
            }
        }

        self.validate_credential(user, field)?;

        if let Some(display_name) = &user.display_name {
            if display_name.trim().is_empty() {
                return Err(PolicyError::validation(
                    format!("{field}.display_name"),
                    "display name must not be blank when present",
                ));
            }
        }

        if let Some(avatar_uri) = &user.avatar_uri {
            if !has_supported_scheme(avatar_uri, &["http://", "https://", "file://"]) {
                return Err(PolicyError::validation(
                    format!("{field}.avatar_uri"),
                    format!("unsupported avatar source {avatar_uri}"),
                ));
            }
        }

        for (j, room_id) in user.joined_room_ids.iter().enumerate() {
            let room_field = format!("{field}.joined_room_ids[{j}]");
            self.validate_room_id(room_id, &room_field)?;

            if !document.is_room_managed(room_id) {
                return Err(PolicyError::validation(
                    room_field,
                    format!("room {room_id} is not in managed_room_ids"),
                ));
            }
        }

        Ok(())
    }

    fn validate_credential(&self, user: &ManagedUserPolicy, field: &str) -> PolicyResult<()> {
        let field = format!("{field}.auth_credential");
        let credential = &user.auth_credential;

        match user.auth_type {
            AuthType::Plain => {
                if credential.is_empty() {
                    return Err(PolicyError::validation(field, "plain password must not be empty"));
                }
            }
            AuthType::Md5 => require_hex_digest(credential, 32, "md5", &field)?,
            AuthType::Sha1 => require_hex_digest(credential, 40, "sha1", &field)?,
            AuthType::Sha256 => require_hex_digest(credential, 64, "sha256", &field)?,
            AuthType::Sha512 => require_hex_digest(credential, 128, "sha512", &field)?,
            AuthType::Bcrypt => {
                if !credential.starts_with("$2") {
                    return Err(PolicyError::validation(
                        field,
                        "bcrypt credential must be a $2… hash",
                    ));
                }
            }
            AuthType::RestWithCacheFallback => {
                if !has_supported_scheme(credential, &["http://", "https://"]) {
                    return Err(PolicyError::validation(
                        field,
                        "rest-with-cache-fallback credential must be an http(s) endpoint",
                    ));
                }
            }
        }

        Ok(())
    }

    fn validate_room_id(&self, room_id: &RoomId, field: &str) -> PolicyResult<()> {
        let id = room_id.as_str();
        let well_formed = id
            .strip_prefix('!')
            .and_then(|rest| rest.split_once(':'))
            .is_some_and(|(opaque, domain)| !opaque.is_empty() && !domain.is_empty());

        if well_formed {
            Ok(())
        } else {
            Err(PolicyError::validation(
                field,
                format!("room identifier {id} must be of the form !opaque:domain"),
            ))
        }
    }
}

fn has_supported_scheme(uri: &str, schemes: &[&str]) -> bool {
    schemes.iter().any(|scheme| uri.starts_with(scheme))
}

fn require_hex_digest(
    credential: &str,
    expected_len: usize,
    method: &str,
    field: &str,
) -> PolicyResult<()> {
    let hex = credential.len() == expected_len
        && credential.chars().all(|c| c.is_ascii_hexdigit());

    if hex {
        Ok(())
    } else {
        Err(PolicyError::validation(
            field,
            format!("{method} credential must be a {expected_len}-character hex digest"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{PolicyFlags, UserId};

    fn user(id: &str, auth_type: AuthType, credential: &str) -> ManagedUserPolicy {
        ManagedUserPolicy {
            id: UserId::new(id),
            active: true,
            auth_type,
            auth_credential: credential.to_string(),
            display_name: None,
            avatar_uri: None,
            joined_room_ids: Vec::new(),
        }
    }

    fn document(users: Vec<ManagedUserPolicy>) -> PolicyDocument {
        PolicyDocument {
            revision: 1,
            flags: PolicyFlags::default(),
            managed_room_ids: vec![RoomId::new("!lobby:example.org")],
            users,
        }
    }

    #[test]
    fn test_accepts_well_formed_document() {
        let validator = Validator::new("example.org");
        let mut alice = user("@alice:example.org", AuthType::Sha256, &"a".repeat(64));
        alice.display_name = Some("Alice".to_string());
        alice.joined_room_ids = vec![RoomId::new("!lobby:example.org")];

        assert!(validator.validate(&document(vec![alice])).is_ok());
    }

    #[test]
    fn test_rejects_foreign_domain() {
        let validator = Validator::new("example.org");
        let doc = document(vec![user("@alice:elsewhere.org", AuthType::Plain, "pw")]);

        let err = validator.validate(&doc).unwrap_err();
        assert!(err.to_string().contains("users[0].id"));
        assert!(err.to_string().contains("elsewhere.org"));
    }

    #[test]
    fn test_rejects_malformed_localpart() {
        let validator = Validator::new("example.org");
        let doc = document(vec![user("@Al ice:example.org", AuthType::Plain, "pw")]);

        assert!(validator.validate(&doc).is_err());
    }

    #[test]
    fn test_rejects_duplicate_users() {
        let validator = Validator::new("example.org");
        let doc = document(vec![
            user("@alice:example.org", AuthType::Plain, "pw"),
            user("@alice:example.org", AuthType::Plain, "pw"),
        ]);

        let err = validator.validate(&doc).unwrap_err();
        assert!(err.to_string().contains("duplicate user identifier"));
    }

    #[test]
    fn test_rejects_wrong_digest_length() {
        let validator = Validator::new("example.org");
        let doc = document(vec![user("@alice:example.org", AuthType::Sha256, "abcd")]);

        let err = validator.validate(&doc).unwrap_err();
        assert!(err.to_string().contains("64-character hex digest"));
    }

    #[test]
    fn test_rejects_non_hash_bcrypt_credential() {
        let validator = Validator::new("example.org");
        let doc = document(vec![user("@alice:example.org", AuthType::Bcrypt, "plaintext")]);

        assert!(validator.validate(&doc).is_err());
    }

    #[test]
    fn test_rejects_non_http_rest_endpoint() {
        let validator = Validator::new("example.org");
        let doc = document(vec![user(
            "@alice:example.org",
            AuthType::RestWithCacheFallback,
            "ldap://auth.example.org",
        )]);

        assert!(validator.validate(&doc).is_err());
    }

    #[test]
    fn test_accepts_rest_endpoint() {
        let validator = Validator::new("example.org");
        let doc = document(vec![user(
            "@alice:example.org",
            AuthType::RestWithCacheFallback,
            "https://auth.example.org/check",
        )]);

        assert!(validator.validate(&doc).is_ok());
    }

    #[test]
    fn test_rejects_unmanaged_joined_room() {
        let validator = Validator::new("example.org");
        let mut alice = user("@alice:example.org", AuthType::Plain, "pw");
        alice.joined_room_ids = vec![RoomId::new("!other:example.org")];

        let err = validator.validate(&document(vec![alice])).unwrap_err();
        assert!(err.to_string().contains("not in managed_room_ids"));
    }

    #[test]
    fn test_rejects_malformed_room_id() {
        let validator = Validator::new("example.org");
        let mut doc = document(Vec::new());
        doc.managed_room_ids.push(RoomId::new("lobby"));

        let err = validator.validate(&doc).unwrap_err();
        assert!(err.to_string().contains("!opaque:domain"));
    }

    #[test]
    fn test_rejects_blank_display_name() {
        let validator = Validator::new("example.org");
        let mut alice = user("@alice:example.org", AuthType::Plain, "pw");
        alice.display_name = Some("   ".to_string());

        assert!(validator.validate(&document(vec![alice])).is_err());
    }

    #[test]
    fn test_rejects_unsupported_avatar_scheme() {
        let validator = Validator::new("example.org");
        let mut alice = user("@alice:example.org", AuthType::Plain, "pw");
        alice.avatar_uri = Some("ftp://example.org/a.png".to_string());

        assert!(validator.validate(&document(vec![alice])).is_err());
    }

    #[test]
    fn test_validation_is_side_effect_free() {
        let validator = Validator::new("example.org");
        let doc = document(vec![user("@alice:example.org", AuthType::Plain, "pw")]);
        let before = doc.clone();

        let _ = validator.validate(&doc);
        assert_eq!(doc, before);
    }
}
