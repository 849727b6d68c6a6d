//! Bounded credential-outcome cache.
//!
//! Remembers successful remote verifications so logins keep working while
//! the remote endpoint is unreachable. Entries are keyed by the user and a
//! SHA-256 fingerprint of the credential; the raw secret never enters the
//! map. Capacity is fixed; the least-recently-used entry is evicted. There
//! is no time-based expiry: eviction and explicit invalidation are the
//! only ways out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::RwLock;
use sha2::Digest;

use provost_policy::UserId;

use crate::authenticator::AuthOutcome;

/// Cache key: user plus credential fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    user_id: UserId,
    fingerprint: String,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    outcome: AuthOutcome,
    last_used: Instant,
}

/// Cache statistics.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub size: usize,
    /// Number of evictions due to capacity.
    pub evictions: u64,
}

/// Concurrency-safe, bounded, LRU-evicting credential-outcome cache.
#[derive(Debug)]
pub struct CredentialCache {
    capacity: usize,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CredentialCache {
    /// Create a cache holding at most `capacity` outcomes. A capacity of
    /// zero disables caching entirely.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// SHA-256 fingerprint of a credential, as lowercase hex.
    pub fn fingerprint(credential: &str) -> String {
        hex::encode(sha2::Sha256::digest(credential.as_bytes()))
    }

    /// Look up a cached outcome, refreshing its recency.
    pub fn get(&self, user_id: &UserId, fingerprint: &str) -> Option<AuthOutcome> {
        if self.capacity == 0 {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let key = CacheKey {
            user_id: user_id.clone(),
            fingerprint: fingerprint.to_string(),
        };

        let mut entries = self.entries.write();
        if let Some(entry) = entries.get_mut(&key) {
            entry.last_used = Instant::now();
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(entry.outcome);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert an outcome, evicting the least-recently-used entry if the
    /// cache is full.
    pub fn insert(&self, user_id: &UserId, fingerprint: &str, outcome: AuthOutcome) {
        if self.capacity == 0 {
            return;
        }

        let key = CacheKey {
            user_id: user_id.clone(),
            fingerprint: fingerprint.to_string(),
        };

        let mut entries = self.entries.write();
        while entries.len() >= self.capacity && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(oldest) => {
                    entries.remove(&oldest);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                None => break,
            }
        }

        entries.insert(
            key,
            CacheEntry {
                outcome,
                last_used: Instant::now(),
            },
        );
    }

    /// Drop any cached outcome for the given user/fingerprint pair.
    pub fn invalidate(&self, user_id: &UserId, fingerprint: &str) {
        let key = CacheKey {
            user_id: user_id.clone(),
            fingerprint: fingerprint.to_string(),
        };
        self.entries.write().remove(&key);
    }

    /// Clear all cached entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Current statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.entries.read().len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
