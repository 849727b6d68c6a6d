//! The authenticator capability and its local implementations.
//!
//! Each authenticator verifies one credential scheme. Denial is expressed
//! as a value; `Err` is reserved for infrastructure failures so that the
//! cache-fallback decorator can tell "the remote said no" apart from "the
//! remote is down". Callers outside this crate go through the
//! [`UserAuthChecker`](crate::UserAuthChecker), which collapses both into
//! a plain denial.

use async_trait::async_trait;
use sha2::Digest;

use provost_policy::UserId;

use crate::error::UserAuthResult;

/// The outcome of one authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthOutcome {
    /// Whether the credential was accepted.
    pub authenticated: bool,
    /// Whether the cache-fallback decorator may remember this outcome.
    /// Only remote verifications are worth caching; local compares are
    /// cheap and always available.
    pub cacheable: bool,
}

impl AuthOutcome {
    /// An accepted credential, not worth caching.
    pub const fn accepted() -> Self {
        Self {
            authenticated: true,
            cacheable: false,
        }
    }

    /// An accepted credential the decorator may cache.
    pub const fn accepted_cacheable() -> Self {
        Self {
            authenticated: true,
            cacheable: true,
        }
    }

    /// A rejected credential.
    pub const fn denied() -> Self {
        Self {
            authenticated: false,
            cacheable: false,
        }
    }
}

/// A single credential-verification strategy.
///
/// `stored` is the method-specific parameter from the user's policy entry
/// (password, hex digest, bcrypt hash or endpoint); `supplied` is what the
/// login attempt presented. Implementations hold no per-call mutable
/// state and are safe to share across concurrent requests.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Verify a supplied credential against the stored parameter.
    async fn authenticate(
        &self,
        user_id: &UserId,
        supplied: &str,
        stored: &str,
    ) -> UserAuthResult<AuthOutcome>;
}

/// Exact string comparison against the stored password.
#[derive(Debug, Default)]
pub struct PlainAuthenticator;

impl PlainAuthenticator {
    /// Create a plain authenticator.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Authenticator for PlainAuthenticator {
    async fn authenticate(
        &self,
        _user_id: &UserId,
        supplied: &str,
        stored: &str,
    ) -> UserAuthResult<AuthOutcome> {
        if constant_time_eq(supplied.as_bytes(), stored.as_bytes()) {
            Ok(AuthOutcome::accepted())
        } else {
            Ok(AuthOutcome::denied())
        }
    }
}

/// The digest algorithms usable for hash-and-compare verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// MD5 (legacy deployments only).
    Md5,
    /// SHA-1.
    Sha1,
    /// SHA-256.
    Sha256,
    /// SHA-512.
    Sha512,
}

impl DigestAlgorithm {
    /// Lowercase hex digest of the input under this algorithm.
    pub fn hex_digest(&self, input: &str) -> String {
        match self {
            Self::Md5 => hex::encode(md5::Md5::digest(input.as_bytes())),
            Self::Sha1 => hex::encode(sha1::Sha1::digest(input.as_bytes())),
            Self::Sha256 => hex::encode(sha2::Sha256::digest(input.as_bytes())),
            Self::Sha512 => hex::encode(sha2::Sha512::digest(input.as_bytes())),
        }
    }
}

/// Hash-and-compare against a stored lowercase hex digest.
#[derive(Debug)]
pub struct DigestAuthenticator {
    algorithm: DigestAlgorithm,
}

impl DigestAuthenticator {
    /// Create an authenticator for the given digest algorithm.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }
}

#[async_trait]
impl Authenticator for DigestAuthenticator {
    async fn authenticate(
        &self,
        _user_id: &UserId,
        supplied: &str,
        stored: &str,
    ) -> UserAuthResult<AuthOutcome> {
        let digest = self.algorithm.hex_digest(supplied);
        // Stored digests are validated to be hex; compare case-insensitively.
        if constant_time_eq(digest.as_bytes(), stored.to_lowercase().as_bytes()) {
            Ok(AuthOutcome::accepted())
        } else {
            Ok(AuthOutcome::denied())
        }
    }
}

/// Adaptive-cost bcrypt hash comparison.
#[derive(Debug, Default)]
pub struct BcryptAuthenticator;

impl BcryptAuthenticator {
    /// Create a bcrypt authenticator.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Authenticator for BcryptAuthenticator {
    async fn authenticate(
        &self,
        _user_id: &UserId,
        supplied: &str,
        stored: &str,
    ) -> UserAuthResult<AuthOutcome> {
        // A malformed stored hash verifies as a denial; the validator
        // rejects such documents before they become active.
        let accepted = bcrypt::verify(supplied, stored).unwrap_or(false);
        if accepted {
            Ok(AuthOutcome::accepted())
        } else {
            Ok(AuthOutcome::denied())
        }
    }
}

/// Length-then-fold byte comparison that does not short-circuit on the
/// first mismatching byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
