//! Applies computed action lists against the connector.
//!
//! Actions run strictly in computed order; the create-before-configure
//! dependency makes reordering or parallelizing incorrect. Each action is
//! best-effort: a connector failure is recorded in the report and the pass
//! moves on, so one broken room invite cannot block every other user's
//! convergence.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use provost_connector::{AvatarReader, Connector};
use provost_policy::{PolicyDocument, UserId};

use crate::action::ReconciliationAction;
use crate::computator;
use crate::error::{ConvergenceActionError, ReconcileResult};

/// The outcome of applying one action.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    /// The action that was applied.
    pub action: ReconciliationAction,
    /// `None` on success, the recorded failure otherwise.
    pub error: Option<ConvergenceActionError>,
}

impl ActionOutcome {
    /// Whether the action succeeded.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated result of one convergence pass.
#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    /// Unique identifier of the pass, for log correlation.
    pub pass_id: Uuid,
    /// Revision of the policy document the pass converged toward.
    pub revision: u64,
    /// Per-action outcomes, in application order.
    pub outcomes: Vec<ActionOutcome>,
}

impl ReconciliationReport {
    /// Number of actions that failed.
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded()).count()
    }

    /// Whether every action succeeded (an empty pass is converged).
    pub fn is_fully_converged(&self) -> bool {
        self.failed_count() == 0
    }

    /// The recorded failures, in application order.
    pub fn failures(&self) -> impl Iterator<Item = &ConvergenceActionError> {
        self.outcomes.iter().filter_map(|o| o.error.as_ref())
    }
}

/// Drives the homeserver toward a policy document, one action at a time.
pub struct Reconciler {
    connector: Arc<dyn Connector>,
    avatar_reader: Arc<dyn AvatarReader>,
}

impl Reconciler {
    /// Create a reconciler over the given connector and avatar reader.
    pub fn new(connector: Arc<dyn Connector>, avatar_reader: Arc<dyn AvatarReader>) -> Self {
        Self {
            connector,
            avatar_reader,
        }
    }

    /// Run one full convergence pass: fetch a fresh observed snapshot,
    /// compute the action list, apply it.
    ///
    /// Fails only when the snapshot itself cannot be fetched; per-action
    /// failures are recorded in the returned report.
    pub async fn run_pass(&self, document: &PolicyDocument) -> ReconcileResult<ReconciliationReport> {
        let user_ids: Vec<UserId> = document.managed_user_ids().cloned().collect();
        let observed = self.connector.fetch_state(&user_ids).await?;
        let actions = computator::compute(document, &observed);
        Ok(self.apply(document.revision, actions).await)
    }

    /// Apply an already-computed action list in order.
    pub async fn apply(
        &self,
        revision: u64,
        actions: Vec<ReconciliationAction>,
    ) -> ReconciliationReport {
        let pass_id = Uuid::now_v7();
        info!(%pass_id, revision, actions = actions.len(), "applying reconciliation pass");

        let mut outcomes = Vec::with_capacity(actions.len());
        for action in actions {
            let error = match self.apply_action(&action).await {
                Ok(()) => {
                    debug!(%pass_id, %action, "action applied");
                    None
                }
                Err(err) => {
                    warn!(%pass_id, %action, error = %err, "action failed, continuing pass");
                    Some(err)
                }
            };
            outcomes.push(ActionOutcome { action, error });
        }

        let report = ReconciliationReport {
            pass_id,
            revision,
            outcomes,
        };
        info!(
            %pass_id,
            revision,
            failed = report.failed_count(),
            total = report.outcomes.len(),
            "reconciliation pass finished"
        );
        report
    }

    async fn apply_action(
        &self,
        action: &ReconciliationAction,
    ) -> Result<(), ConvergenceActionError> {
        let result = match action {
            ReconciliationAction::CreateUser { user_id } => {
                self.connector.create_user(user_id).await
            }
            ReconciliationAction::DeactivateUser { user_id } => {
                self.connector.set_user_active(user_id, false).await
            }
            ReconciliationAction::ReactivateUser { user_id } => {
                self.connector.set_user_active(user_id, true).await
            }
            ReconciliationAction::SetDisplayName {
                user_id,
                display_name,
            } => self.connector.set_display_name(user_id, display_name).await,
            ReconciliationAction::SetAvatar { user_id, avatar_uri } => {
                // Avatar references resolve to bytes at apply time, not at
                // compute time; a failed read fails only this action.
                let bytes = self
                    .avatar_reader
                    .read(avatar_uri)
                    .await
                    .map_err(|e| ConvergenceActionError::new(action.to_string(), e.to_string()))?;
                self.connector.set_avatar(user_id, avatar_uri, &bytes).await
            }
            ReconciliationAction::JoinRoom { user_id, room_id } => {
                self.connector.join_room(user_id, room_id).await
            }
            ReconciliationAction::LeaveRoom { user_id, room_id } => {
                self.connector.leave_room(user_id, room_id).await
            }
        };

        result.map_err(|e| ConvergenceActionError::new(action.to_string(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconcileError;
    use async_trait::async_trait;
    use provost_connector::{AvatarError, MockConnector, ObservedUser};
    use provost_policy::{AuthType, ManagedUserPolicy, PolicyFlags, RoomId};

    struct StaticAvatarReader;

    #[async_trait]
    impl AvatarReader for StaticAvatarReader {
        async fn read(&self, uri: &str) -> Result<Vec<u8>, AvatarError> {
            if uri.ends_with("missing.png") {
                Err(AvatarError::read(uri, "not found"))
            } else {
                Ok(b"png".to_vec())
            }
        }
    }

    fn reconciler(connector: Arc<MockConnector>) -> Reconciler {
        Reconciler::new(connector, Arc::new(StaticAvatarReader))
    }

    fn document(users: Vec<ManagedUserPolicy>, managed_rooms: Vec<&str>) -> PolicyDocument {
        PolicyDocument {
            revision: 1,
            flags: PolicyFlags::default(),
            managed_room_ids: managed_rooms.into_iter().map(RoomId::new).collect(),
            users,
        }
    }

    fn user(id: &str) -> ManagedUserPolicy {
        ManagedUserPolicy {
            id: UserId::new(id),
            active: true,
            auth_type: AuthType::Plain,
            auth_credential: "pw".to_string(),
            display_name: None,
            avatar_uri: None,
            joined_room_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_pass_creates_and_configures_user() {
        let connector = Arc::new(MockConnector::new());
        let mut alice = user("@a:example.org");
        alice.display_name = Some("Alice".to_string());
        alice.joined_room_ids = vec![RoomId::new("!r1:example.org")];
        let doc = document(vec![alice], vec!["!r1:example.org"]);

        let report = reconciler(Arc::clone(&connector)).run_pass(&doc).await.unwrap();

        assert!(report.is_fully_converged());
        let account = connector.account(&UserId::new("@a:example.org"));
        assert!(account.exists && account.active);
        assert_eq!(account.display_name.as_deref(), Some("Alice"));
        assert_eq!(account.joined_room_ids, vec![RoomId::new("!r1:example.org")]);
    }

    #[tokio::test]
    async fn test_failed_action_does_not_abort_pass() {
        let connector = Arc::new(MockConnector::new());
        connector.fail_operation("set_display_name");

        let mut alice = user("@a:example.org");
        alice.display_name = Some("Alice".to_string());
        alice.joined_room_ids = vec![RoomId::new("!r1:example.org")];
        let doc = document(vec![alice], vec!["!r1:example.org"]);

        let report = reconciler(Arc::clone(&connector)).run_pass(&doc).await.unwrap();

        assert_eq!(report.failed_count(), 1);
        // The later room join still ran.
        let account = connector.account(&UserId::new("@a:example.org"));
        assert_eq!(account.joined_room_ids, vec![RoomId::new("!r1:example.org")]);
    }

    #[tokio::test]
    async fn test_avatar_read_failure_fails_only_that_action() {
        let connector = Arc::new(MockConnector::new());
        let mut alice = user("@a:example.org");
        alice.avatar_uri = Some("https://example.org/missing.png".to_string());
        alice.display_name = Some("Alice".to_string());
        let doc = document(vec![alice], vec![]);

        let report = reconciler(Arc::clone(&connector)).run_pass(&doc).await.unwrap();

        assert_eq!(report.failed_count(), 1);
        let failure = report.failures().next().unwrap();
        assert!(failure.action.starts_with("set_avatar"));
        // Display name converged despite the avatar failure.
        let account = connector.account(&UserId::new("@a:example.org"));
        assert_eq!(account.display_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_snapshot_failure_aborts_pass() {
        let connector = Arc::new(MockConnector::new());
        connector.fail_operation("fetch_state");
        let doc = document(vec![user("@a:example.org")], vec![]);

        let result = reconciler(connector).run_pass(&doc).await;
        assert!(matches!(result, Err(ReconcileError::Snapshot(_))));
    }

    #[tokio::test]
    async fn test_second_pass_reaches_fixed_point() {
        let connector = Arc::new(MockConnector::new());
        let mut alice = user("@a:example.org");
        alice.display_name = Some("Alice".to_string());
        alice.avatar_uri = Some("https://example.org/a.png".to_string());
        alice.joined_room_ids = vec![RoomId::new("!r1:example.org")];
        let doc = document(vec![alice], vec!["!r1:example.org"]);

        let reconciler = reconciler(Arc::clone(&connector));
        let first = reconciler.run_pass(&doc).await.unwrap();
        assert!(first.is_fully_converged());
        assert!(!first.outcomes.is_empty());

        // Recomputing against the post-apply state yields an empty list.
        let second = reconciler.run_pass(&doc).await.unwrap();
        assert!(second.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_deactivation_pass() {
        let connector = Arc::new(MockConnector::new());
        connector.seed_user(UserId::new("@b:example.org"), ObservedUser::active());

        let mut bob = user("@b:example.org");
        bob.active = false;
        bob.display_name = Some("Bob".to_string());
        let doc = document(vec![bob], vec![]);

        let report = reconciler(Arc::clone(&connector)).run_pass(&doc).await.unwrap();

        assert!(report.is_fully_converged());
        assert_eq!(report.outcomes.len(), 1);
        assert!(!connector.account(&UserId::new("@b:example.org")).active);
        // No display name was set on the deactivated account.
        assert_eq!(connector.account(&UserId::new("@b:example.org")).display_name, None);
    }
}
