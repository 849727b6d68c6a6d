//! Remote REST credential verification.
//!
//! The `rest-with-cache-fallback` policy method stores an http(s) endpoint
//! as its parameter. The [`RestAuthenticator`] posts the attempted
//! credential there and maps wire failures to
//! [`UserAuthError::RemoteUnavailable`], which is what the cache-fallback
//! decorator keys its recovery on.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use provost_policy::UserId;

use crate::authenticator::{AuthOutcome, Authenticator};
use crate::error::{UserAuthError, UserAuthResult};

/// The remote half of REST verification, behind a trait so tests can
/// substitute a scripted verifier and so the runtime can delegate to the
/// homeserver connector instead of a third-party endpoint.
#[async_trait]
pub trait RestVerifier: Send + Sync {
    /// Ask the remote whether the credential is valid.
    ///
    /// `Ok(false)` is an authoritative denial; `Err(RemoteUnavailable)`
    /// means no answer could be obtained.
    async fn verify(
        &self,
        endpoint: &str,
        user_id: &UserId,
        password: &str,
    ) -> UserAuthResult<bool>;
}

#[derive(Serialize)]
struct VerificationRequest<'a> {
    user: VerificationUser<'a>,
}

#[derive(Serialize)]
struct VerificationUser<'a> {
    id: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct VerificationResponse {
    auth: VerificationResult,
}

#[derive(Deserialize)]
struct VerificationResult {
    success: bool,
}

/// Posts `{"user": {"id", "password"}}` to the endpoint and expects
/// `{"auth": {"success": bool}}` back.
#[derive(Debug)]
pub struct HttpRestVerifier {
    client: reqwest::Client,
}

impl HttpRestVerifier {
    /// Create a verifier with the given per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl RestVerifier for HttpRestVerifier {
    async fn verify(
        &self,
        endpoint: &str,
        user_id: &UserId,
        password: &str,
    ) -> UserAuthResult<bool> {
        let request = VerificationRequest {
            user: VerificationUser {
                id: user_id.as_str(),
                password,
            },
        };

        let response = self
            .client
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| UserAuthError::RemoteUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(UserAuthError::UnexpectedResponse(format!(
                "endpoint returned {}",
                response.status()
            )));
        }

        let body: VerificationResponse = response
            .json()
            .await
            .map_err(|e| UserAuthError::UnexpectedResponse(e.to_string()))?;

        debug!(user_id = %user_id, success = body.auth.success, "remote verification answered");
        Ok(body.auth.success)
    }
}

/// Delegates credential checks to a remote verifier.
pub struct RestAuthenticator {
    verifier: std::sync::Arc<dyn RestVerifier>,
}

impl RestAuthenticator {
    /// Create a REST authenticator over the given verifier.
    pub fn new(verifier: std::sync::Arc<dyn RestVerifier>) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl Authenticator for RestAuthenticator {
    async fn authenticate(
        &self,
        user_id: &UserId,
        supplied: &str,
        stored: &str,
    ) -> UserAuthResult<AuthOutcome> {
        // `stored` carries the verification endpoint for this method.
        let success = self.verifier.verify(stored, user_id, supplied).await?;
        if success {
            Ok(AuthOutcome::accepted_cacheable())
        } else {
            Ok(AuthOutcome::denied())
        }
    }
}
