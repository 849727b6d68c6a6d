//! An in-memory connector for tests.
//!
//! Behaves like a small, well-behaved homeserver: mutations are idempotent,
//! profile operations on non-existent accounts are rejected (which makes
//! ordering bugs in the reconciler visible), and every call is logged.
//! Failures can be scripted per operation and an artificial fetch latency
//! can be configured to hold a reconciliation pass open.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use provost_policy::{RoomId, UserId};

use crate::connector::Connector;
use crate::error::{ConnectorError, ConnectorResult};
use crate::state::{ObservedState, ObservedUser};

/// Scriptable in-memory [`Connector`].
#[derive(Debug, Default)]
pub struct MockConnector {
    accounts: RwLock<HashMap<UserId, ObservedUser>>,
    credentials: RwLock<HashMap<UserId, String>>,
    failing: RwLock<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    fetch_delay: RwLock<Option<Duration>>,
    fetch_calls: AtomicUsize,
    remote_available: AtomicBool,
}

impl MockConnector {
    /// Create an empty mock server.
    pub fn new() -> Self {
        Self {
            remote_available: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// Seed an account into the server.
    pub fn seed_user(&self, user_id: UserId, user: ObservedUser) {
        self.accounts.write().insert(user_id, user);
    }

    /// Seed a credential accepted by [`Connector::verify_credentials`].
    pub fn seed_credential(&self, user_id: UserId, password: impl Into<String>) {
        self.credentials.write().insert(user_id, password.into());
    }

    /// Make the named operation (e.g. `"join_room"`) fail until
    /// [`heal`](Self::heal) is called.
    pub fn fail_operation(&self, operation: impl Into<String>) {
        self.failing.write().insert(operation.into());
    }

    /// Clear all scripted failures.
    pub fn heal(&self) {
        self.failing.write().clear();
    }

    /// Delay every `fetch_state` call, holding passes open.
    pub fn set_fetch_delay(&self, delay: Option<Duration>) {
        *self.fetch_delay.write() = delay;
    }

    /// Make `verify_credentials` report the remote as unreachable.
    pub fn set_remote_available(&self, available: bool) {
        self.remote_available.store(available, Ordering::SeqCst);
    }

    /// Number of `fetch_state` calls so far, one per reconciliation pass.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Every call made so far, in order, formatted as
    /// `operation(args...)`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// What the mock server currently stores for a user.
    pub fn account(&self, user_id: &UserId) -> ObservedUser {
        self.accounts.read().get(user_id).cloned().unwrap_or_default()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    fn check_scripted_failure(&self, operation: &str, subject: &str) -> ConnectorResult<()> {
        if self.failing.read().contains(operation) {
            Err(ConnectorError::rejected(operation, subject, "scripted failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn fetch_state(&self, user_ids: &[UserId]) -> ConnectorResult<ObservedState> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.record(format!("fetch_state({} users)", user_ids.len()));
        self.check_scripted_failure("fetch_state", "-")?;

        let delay = *self.fetch_delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let accounts = self.accounts.read();
        let mut state = ObservedState::new();
        for user_id in user_ids {
            if let Some(user) = accounts.get(user_id) {
                state.insert(user_id.clone(), user.clone());
            }
        }
        Ok(state)
    }

    async fn create_user(&self, user_id: &UserId) -> ConnectorResult<()> {
        self.record(format!("create_user({user_id})"));
        self.check_scripted_failure("create_user", user_id.as_str())?;

        let mut accounts = self.accounts.write();
        // Creating an existing account is a no-op success.
        accounts
            .entry(user_id.clone())
            .or_insert_with(ObservedUser::active);
        Ok(())
    }

    async fn set_user_active(&self, user_id: &UserId, active: bool) -> ConnectorResult<()> {
        self.record(format!("set_user_active({user_id}, {active})"));
        self.check_scripted_failure("set_user_active", user_id.as_str())?;

        match self.accounts.write().get_mut(user_id) {
            Some(user) => {
                user.active = active;
                Ok(())
            }
            None => Err(ConnectorError::rejected(
                "set_user_active",
                user_id.as_str(),
                "no such user",
            )),
        }
    }

    async fn set_display_name(&self, user_id: &UserId, display_name: &str) -> ConnectorResult<()> {
        self.record(format!("set_display_name({user_id}, {display_name:?})"));
        self.check_scripted_failure("set_display_name", user_id.as_str())?;

        match self.accounts.write().get_mut(user_id) {
            Some(user) if user.exists => {
                user.display_name = Some(display_name.to_string());
                Ok(())
            }
            _ => Err(ConnectorError::rejected(
                "set_display_name",
                user_id.as_str(),
                "no such user",
            )),
        }
    }

    async fn set_avatar(
        &self,
        user_id: &UserId,
        source_uri: &str,
        bytes: &[u8],
    ) -> ConnectorResult<()> {
        self.record(format!("set_avatar({user_id}, {source_uri}, {} bytes)", bytes.len()));
        self.check_scripted_failure("set_avatar", user_id.as_str())?;

        match self.accounts.write().get_mut(user_id) {
            Some(user) if user.exists => {
                user.avatar_source_uri = Some(source_uri.to_string());
                Ok(())
            }
            _ => Err(ConnectorError::rejected(
                "set_avatar",
                user_id.as_str(),
                "no such user",
            )),
        }
    }

    async fn join_room(&self, user_id: &UserId, room_id: &RoomId) -> ConnectorResult<()> {
        self.record(format!("join_room({user_id}, {room_id})"));
        self.check_scripted_failure("join_room", user_id.as_str())?;

        match self.accounts.write().get_mut(user_id) {
            Some(user) if user.exists => {
                if !user.joined_room_ids.contains(room_id) {
                    user.joined_room_ids.push(room_id.clone());
                }
                Ok(())
            }
            _ => Err(ConnectorError::rejected(
                "join_room",
                user_id.as_str(),
                "no such user",
            )),
        }
    }

    async fn leave_room(&self, user_id: &UserId, room_id: &RoomId) -> ConnectorResult<()> {
        self.record(format!("leave_room({user_id}, {room_id})"));
        self.check_scripted_failure("leave_room", user_id.as_str())?;

        if let Some(user) = self.accounts.write().get_mut(user_id) {
            user.joined_room_ids.retain(|r| r != room_id);
        }
        // Leaving a room one is not in (or never existed in) is a no-op.
        Ok(())
    }

    async fn verify_credentials(&self, user_id: &UserId, password: &str) -> ConnectorResult<bool> {
        self.record(format!("verify_credentials({user_id})"));
        if !self.remote_available.load(Ordering::SeqCst) {
            return Err(ConnectorError::Unreachable("scripted outage".to_string()));
        }

        Ok(self
            .credentials
            .read()
            .get(user_id)
            .is_some_and(|stored| stored == password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> UserId {
        UserId::new("@alice:example.org")
    }

    #[tokio::test]
    async fn test_create_then_fetch() {
        let mock = MockConnector::new();
        mock.create_user(&alice()).await.unwrap();

        let state = mock.fetch_state(&[alice()]).await.unwrap();
        let observed = state.user(&alice());
        assert!(observed.exists && observed.active);
        assert_eq!(mock.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let mock = MockConnector::new();
        mock.seed_user(alice(), ObservedUser::active().with_display_name("Alice"));

        mock.create_user(&alice()).await.unwrap();
        // The existing profile survives the replayed create.
        assert_eq!(mock.account(&alice()).display_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_profile_ops_require_existence() {
        let mock = MockConnector::new();
        let result = mock.set_display_name(&alice(), "Alice").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_scripted_failure_and_heal() {
        let mock = MockConnector::new();
        mock.create_user(&alice()).await.unwrap();

        mock.fail_operation("set_display_name");
        assert!(mock.set_display_name(&alice(), "Alice").await.is_err());

        mock.heal();
        assert!(mock.set_display_name(&alice(), "Alice").await.is_ok());
    }

    #[tokio::test]
    async fn test_room_membership_round_trip() {
        let mock = MockConnector::new();
        let room = RoomId::new("!lobby:example.org");
        mock.create_user(&alice()).await.unwrap();

        mock.join_room(&alice(), &room).await.unwrap();
        mock.join_room(&alice(), &room).await.unwrap();
        assert_eq!(mock.account(&alice()).joined_room_ids.len(), 1);

        mock.leave_room(&alice(), &room).await.unwrap();
        assert!(mock.account(&alice()).joined_room_ids.is_empty());
    }

    #[tokio::test]
    async fn test_verify_credentials_and_outage() {
        let mock = MockConnector::new();
        mock.seed_credential(alice(), "hunter2");

        assert!(mock.verify_credentials(&alice(), "hunter2").await.unwrap());
        assert!(!mock.verify_credentials(&alice(), "wrong").await.unwrap());

        mock.set_remote_available(false);
        let err = mock.verify_credentials(&alice(), "hunter2").await.unwrap_err();
        assert!(err.is_unreachable());
    }
}
