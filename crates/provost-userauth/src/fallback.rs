//! Cache-fallback decorator around a remote authenticator.
//!
//! Explicit composition: the decorator holds the wrapped authenticator and
//! the bounded [`CredentialCache`]. Remote successes are remembered; when
//! the remote becomes unreachable, the cached outcome for the same
//! credential fingerprint is served so managed users can keep logging in
//! through an outage.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use provost_policy::UserId;

use crate::authenticator::{AuthOutcome, Authenticator};
use crate::cache::CredentialCache;
use crate::error::UserAuthResult;

/// Wraps a remote authenticator with a bounded outcome cache.
pub struct CacheFallbackAuthenticator {
    inner: Arc<dyn Authenticator>,
    cache: Arc<CredentialCache>,
}

impl CacheFallbackAuthenticator {
    /// Decorate `inner` with the given cache.
    pub fn new(inner: Arc<dyn Authenticator>, cache: Arc<CredentialCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl Authenticator for CacheFallbackAuthenticator {
    async fn authenticate(
        &self,
        user_id: &UserId,
        supplied: &str,
        stored: &str,
    ) -> UserAuthResult<AuthOutcome> {
        let fingerprint = CredentialCache::fingerprint(supplied);

        match self.inner.authenticate(user_id, supplied, stored).await {
            Ok(outcome) => {
                if outcome.authenticated && outcome.cacheable {
                    self.cache.insert(user_id, &fingerprint, outcome);
                } else if !outcome.authenticated {
                    // An authoritative denial supersedes any remembered
                    // success for the same credential.
                    self.cache.invalidate(user_id, &fingerprint);
                }
                Ok(outcome)
            }
            Err(err) if err.is_remote_unavailable() => {
                if let Some(cached) = self.cache.get(user_id, &fingerprint) {
                    debug!(user_id = %user_id, "remote unavailable, serving cached outcome");
                    Ok(cached)
                } else {
                    warn!(user_id = %user_id, error = %err, "remote unavailable and no cached outcome");
                    Err(err)
                }
            }
            Err(err) => Err(err),
        }
    }
}
