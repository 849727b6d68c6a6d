//! The authenticator chain.
//!
//! Maps every supported [`AuthType`] to exactly one [`Authenticator`] at
//! construction time; an unmapped method is a configuration error
//! surfaced by [`UserAuthCheckerBuilder::build`], never a per-request
//! failure. At request time the chain selects the authenticator named by
//! the user's policy entry and collapses every failure mode into a plain
//! denial, so a caller cannot distinguish a wrong password from a cache
//! miss or an unreachable remote.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use provost_policy::{AuthType, PolicyDocument, UserId};

use crate::authenticator::{
    AuthOutcome, Authenticator, BcryptAuthenticator, DigestAlgorithm, DigestAuthenticator,
    PlainAuthenticator,
};
use crate::cache::CredentialCache;
use crate::error::{UserAuthError, UserAuthResult};
use crate::fallback::CacheFallbackAuthenticator;
use crate::rest::{RestAuthenticator, RestVerifier};

/// Builder for a [`UserAuthChecker`].
#[derive(Default)]
pub struct UserAuthCheckerBuilder {
    authenticators: HashMap<AuthType, Arc<dyn Authenticator>>,
}

impl UserAuthCheckerBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the authenticator for a method.
    #[must_use]
    pub fn register(mut self, method: AuthType, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticators.insert(method, authenticator);
        self
    }

    /// Build the chain, verifying that every supported method is mapped.
    pub fn build(self) -> UserAuthResult<UserAuthChecker> {
        for method in AuthType::ALL {
            if !self.authenticators.contains_key(&method) {
                return Err(UserAuthError::configuration(method.as_str()));
            }
        }
        Ok(UserAuthChecker {
            authenticators: self.authenticators,
        })
    }
}

/// The credential-verification chain used by gateway interceptors.
///
/// Safe to share across concurrent requests: selection is read-only and
/// individual authenticators hold no per-call mutable state.
pub struct UserAuthChecker {
    authenticators: HashMap<AuthType, Arc<dyn Authenticator>>,
}

impl UserAuthChecker {
    /// Start building a chain with explicit registrations.
    pub fn builder() -> UserAuthCheckerBuilder {
        UserAuthCheckerBuilder::new()
    }

    /// The standard chain: plain, the four digest methods, bcrypt, and
    /// REST wrapped in the cache-fallback decorator.
    pub fn standard(
        rest_verifier: Arc<dyn RestVerifier>,
        cache: Arc<CredentialCache>,
    ) -> UserAuthResult<Self> {
        let rest: Arc<dyn Authenticator> = Arc::new(RestAuthenticator::new(rest_verifier));

        Self::builder()
            .register(AuthType::Plain, Arc::new(PlainAuthenticator::new()))
            .register(
                AuthType::Md5,
                Arc::new(DigestAuthenticator::new(DigestAlgorithm::Md5)),
            )
            .register(
                AuthType::Sha1,
                Arc::new(DigestAuthenticator::new(DigestAlgorithm::Sha1)),
            )
            .register(
                AuthType::Sha256,
                Arc::new(DigestAuthenticator::new(DigestAlgorithm::Sha256)),
            )
            .register(
                AuthType::Sha512,
                Arc::new(DigestAuthenticator::new(DigestAlgorithm::Sha512)),
            )
            .register(AuthType::Bcrypt, Arc::new(BcryptAuthenticator::new()))
            .register(
                AuthType::RestWithCacheFallback,
                Arc::new(CacheFallbackAuthenticator::new(rest, cache)),
            )
            .build()
    }

    /// Authenticate a login attempt against a policy document snapshot.
    ///
    /// Denials from every cause (unmanaged user, inactive user, wrong
    /// credential, unreachable remote with no cached outcome) are
    /// indistinguishable to the caller.
    pub async fn check(
        &self,
        document: &PolicyDocument,
        user_id: &UserId,
        password: &str,
    ) -> AuthOutcome {
        let Some(user) = document.user(user_id) else {
            debug!(user_id = %user_id, "authentication attempt by unmanaged user");
            return AuthOutcome::denied();
        };

        if !user.active {
            debug!(user_id = %user_id, "authentication attempt by inactive user");
            return AuthOutcome::denied();
        }

        let Some(authenticator) = self.authenticators.get(&user.auth_type) else {
            // Unreachable for chains produced by the builder; deny rather
            // than panic if an impossible state is ever observed.
            warn!(user_id = %user_id, method = %user.auth_type, "no authenticator for method");
            return AuthOutcome::denied();
        };

        match authenticator
            .authenticate(user_id, password, &user.auth_credential)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(user_id = %user_id, method = %user.auth_type, error = %err,
                    "authentication infrastructure failure, denying");
                AuthOutcome::denied()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use provost_policy::{ManagedUserPolicy, PolicyFlags};

    struct AlwaysYes;

    #[async_trait]
    impl RestVerifier for AlwaysYes {
        async fn verify(&self, _: &str, _: &UserId, _: &str) -> UserAuthResult<bool> {
            Ok(true)
        }
    }

    fn checker() -> UserAuthChecker {
        UserAuthChecker::standard(Arc::new(AlwaysYes), Arc::new(CredentialCache::new(10)))
            .unwrap()
    }

    fn document(users: Vec<ManagedUserPolicy>) -> PolicyDocument {
        PolicyDocument {
            revision: 1,
            flags: PolicyFlags::default(),
            managed_room_ids: Vec::new(),
            users,
        }
    }

    fn user(id: &str, auth_type: AuthType, credential: &str, active: bool) -> ManagedUserPolicy {
        ManagedUserPolicy {
            id: UserId::new(id),
            active,
            auth_type,
            auth_credential: credential.to_string(),
            display_name: None,
            avatar_uri: None,
            joined_room_ids: Vec::new(),
        }
    }

    #[test]
    fn test_builder_rejects_incomplete_chain() {
        let result = UserAuthChecker::builder()
            .register(AuthType::Plain, Arc::new(PlainAuthenticator::new()))
            .build();

        assert!(matches!(result, Err(UserAuthError::Configuration { .. })));
    }

    #[test]
    fn test_standard_chain_is_complete() {
        assert!(
            UserAuthChecker::standard(Arc::new(AlwaysYes), Arc::new(CredentialCache::new(10)))
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_check_plain_credential() {
        let doc = document(vec![user("@alice:example.org", AuthType::Plain, "pw", true)]);
        let checker = checker();

        let ok = checker.check(&doc, &UserId::new("@alice:example.org"), "pw").await;
        assert!(ok.authenticated);

        let bad = checker.check(&doc, &UserId::new("@alice:example.org"), "nope").await;
        assert!(!bad.authenticated);
    }

    #[tokio::test]
    async fn test_check_selects_method_from_policy() {
        // sha256("hunter2")
        let digest = "f52fbd32b2b3b86ff88ef6c490628285f482af15ddcb29541f94bcf526a3f6c7";
        let doc = document(vec![user("@alice:example.org", AuthType::Sha256, digest, true)]);

        let outcome = checker()
            .check(&doc, &UserId::new("@alice:example.org"), "hunter2")
            .await;
        assert!(outcome.authenticated);
    }

    #[tokio::test]
    async fn test_unmanaged_user_is_denied() {
        let doc = document(Vec::new());
        let outcome = checker()
            .check(&doc, &UserId::new("@ghost:example.org"), "pw")
            .await;
        assert!(!outcome.authenticated);
    }

    #[tokio::test]
    async fn test_inactive_user_is_denied_with_correct_credential() {
        let doc = document(vec![user("@alice:example.org", AuthType::Plain, "pw", false)]);
        let outcome = checker()
            .check(&doc, &UserId::new("@alice:example.org"), "pw")
            .await;
        assert!(!outcome.authenticated);
    }

    #[tokio::test]
    async fn test_rest_method_goes_through_decorator() {
        let doc = document(vec![user(
            "@alice:example.org",
            AuthType::RestWithCacheFallback,
            "https://auth.example.org/check",
            true,
        )]);

        let outcome = checker()
            .check(&doc, &UserId::new("@alice:example.org"), "pw")
            .await;
        assert!(outcome.authenticated);
    }
}
