//! The store-driven reconciliation control loop.
//!
//! One worker task owns all reconciliation: it wakes on policy-store
//! change notifications (and, after a partially-failed pass, on a
//! fixed-interval retry timer), runs a pass, and goes back to waiting.
//! Because there is a single worker and the store's watch channel only
//! ever holds the latest revision, triggers that arrive while a pass is
//! running coalesce into at most one follow-up pass; overlapping passes
//! cannot happen by construction.
//!
//! State machine: `Idle -> Running -> {Idle, Retrying}`. `Running` is
//! implicit (the worker is inside a pass); `Retrying` arms the retry
//! timer, and a store change during `Retrying` simply triggers the pass
//! early instead of stacking timers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use provost_policy::Store;

use crate::error::{ReconcileError, ReconcileResult};
use crate::reconciler::Reconciler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Idle,
    Retrying,
}

#[derive(Debug, Clone, Copy)]
enum PassResult {
    Skipped,
    Converged,
    Failed,
}

/// Watches the policy store and keeps the homeserver converged.
pub struct StoreDrivenReconciler {
    store: Arc<Store>,
    reconciler: Arc<Reconciler>,
    retry_interval: Duration,
    running: AtomicBool,
    shutdown_tx: RwLock<Option<mpsc::Sender<()>>>,
    loop_handle: RwLock<Option<JoinHandle<()>>>,
    completed_passes: Arc<AtomicU64>,
}

impl StoreDrivenReconciler {
    /// Create a control loop over the given store and reconciler.
    ///
    /// `retry_interval` is how long after a partially-failed pass the next
    /// attempt is scheduled, absent an earlier store change.
    pub fn new(store: Arc<Store>, reconciler: Arc<Reconciler>, retry_interval: Duration) -> Self {
        Self {
            store,
            reconciler,
            retry_interval,
            running: AtomicBool::new(false),
            shutdown_tx: RwLock::new(None),
            loop_handle: RwLock::new(None),
            completed_passes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether the loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Number of passes that have run to completion (converged or not).
    pub fn completed_passes(&self) -> u64 {
        self.completed_passes.load(Ordering::Acquire)
    }

    /// Start the worker task.
    ///
    /// If a document is already installed, an initial pass runs
    /// immediately; otherwise the worker waits for the first install.
    pub fn start(&self) -> ReconcileResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(ReconcileError::AlreadyRunning);
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown_tx.write() = Some(shutdown_tx);

        let store = Arc::clone(&self.store);
        let reconciler = Arc::clone(&self.reconciler);
        let retry_interval = self.retry_interval;
        let completed_passes = Arc::clone(&self.completed_passes);

        let handle = tokio::spawn(async move {
            let mut changes = store.subscribe();
            // Treat whatever is installed right now as unseen so startup
            // gets its initial pass.
            changes.mark_changed();

            let mut state = LoopState::Idle;
            loop {
                let triggered = match state {
                    LoopState::Idle => {
                        tokio::select! {
                            changed = changes.changed() => changed.is_ok(),
                            _ = shutdown_rx.recv() => break,
                        }
                    }
                    LoopState::Retrying => {
                        tokio::select! {
                            changed = changes.changed() => changed.is_ok(),
                            () = tokio::time::sleep(retry_interval) => {
                                debug!("retry interval elapsed");
                                true
                            }
                            _ = shutdown_rx.recv() => break,
                        }
                    }
                };

                if !triggered {
                    // The store was dropped; nothing left to watch.
                    break;
                }

                state = match run_once(&store, &reconciler, &completed_passes).await {
                    PassResult::Converged | PassResult::Skipped => LoopState::Idle,
                    PassResult::Failed => {
                        debug!(retry_ms = retry_interval.as_millis() as u64, "pass failed, scheduling retry");
                        LoopState::Retrying
                    }
                };
            }

            info!("reconciliation loop stopped");
        });

        *self.loop_handle.write() = Some(handle);
        info!("reconciliation loop started");

        Ok(())
    }

    /// Stop the loop cooperatively.
    ///
    /// A pass that is in flight finishes its current action list; no new
    /// pass starts afterwards. Any pending retry timer is cancelled.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }

        let tx = self.shutdown_tx.write().take();
        if let Some(tx) = tx {
            let _ = tx.send(()).await;
        }

        let handle = self.loop_handle.write().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for StoreDrivenReconciler {
    fn drop(&mut self) {
        if self.running.load(Ordering::Acquire) {
            if let Some(tx) = self.shutdown_tx.write().take() {
                // Best effort; the worker also exits when the store goes away.
                let _ = tx.try_send(());
            }
        }
    }
}

async fn run_once(
    store: &Arc<Store>,
    reconciler: &Arc<Reconciler>,
    completed_passes: &Arc<AtomicU64>,
) -> PassResult {
    let Some(document) = store.current() else {
        debug!("store not initialized yet, skipping pass");
        return PassResult::Skipped;
    };

    match reconciler.run_pass(&document).await {
        Ok(report) => {
            completed_passes.fetch_add(1, Ordering::AcqRel);
            if report.is_fully_converged() {
                PassResult::Converged
            } else {
                warn!(
                    pass_id = %report.pass_id,
                    failed = report.failed_count(),
                    "pass left unconverged actions"
                );
                PassResult::Failed
            }
        }
        Err(err) => {
            completed_passes.fetch_add(1, Ordering::AcqRel);
            warn!(error = %err, "pass aborted");
            PassResult::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use provost_connector::{AvatarError, AvatarReader, MockConnector};
    use provost_policy::{
        AuthType, ManagedUserPolicy, PolicyDocument, PolicyFlags, UserId, Validator,
    };

    struct NoAvatars;

    #[async_trait]
    impl AvatarReader for NoAvatars {
        async fn read(&self, uri: &str) -> Result<Vec<u8>, AvatarError> {
            Err(AvatarError::read(uri, "not in this test"))
        }
    }

    fn document(revision: u64, user_ids: &[&str]) -> PolicyDocument {
        PolicyDocument {
            revision,
            flags: PolicyFlags::default(),
            managed_room_ids: Vec::new(),
            users: user_ids
                .iter()
                .map(|id| ManagedUserPolicy {
                    id: UserId::new(*id),
                    active: true,
                    auth_type: AuthType::Plain,
                    auth_credential: "pw".to_string(),
                    display_name: None,
                    avatar_uri: None,
                    joined_room_ids: Vec::new(),
                })
                .collect(),
        }
    }

    fn fixture(connector: Arc<MockConnector>, retry: Duration) -> (Arc<Store>, StoreDrivenReconciler) {
        let store = Arc::new(Store::new(Validator::new("example.org")));
        let reconciler = Arc::new(Reconciler::new(connector, Arc::new(NoAvatars)));
        let loop_ = StoreDrivenReconciler::new(Arc::clone(&store), reconciler, retry);
        (store, loop_)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_start_stop() {
        let (_store, loop_) = fixture(Arc::new(MockConnector::new()), Duration::from_secs(30));
        loop_.start().unwrap();
        assert!(loop_.is_running());

        loop_.stop().await;
        assert!(!loop_.is_running());
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let (_store, loop_) = fixture(Arc::new(MockConnector::new()), Duration::from_secs(30));
        loop_.start().unwrap();
        assert!(matches!(loop_.start(), Err(ReconcileError::AlreadyRunning)));
        loop_.stop().await;
    }

    #[tokio::test]
    async fn test_install_triggers_pass() {
        let connector = Arc::new(MockConnector::new());
        let (store, loop_) = fixture(Arc::clone(&connector), Duration::from_secs(30));
        loop_.start().unwrap();

        store.install(document(1, &["@a:example.org"])).unwrap();
        settle().await;

        assert_eq!(connector.fetch_calls(), 1);
        assert!(connector.account(&UserId::new("@a:example.org")).exists);
        loop_.stop().await;
    }

    #[tokio::test]
    async fn test_preinstalled_document_gets_initial_pass() {
        let connector = Arc::new(MockConnector::new());
        let (store, loop_) = fixture(Arc::clone(&connector), Duration::from_secs(30));

        store.install(document(1, &["@a:example.org"])).unwrap();
        loop_.start().unwrap();
        settle().await;

        assert_eq!(connector.fetch_calls(), 1);
        loop_.stop().await;
    }

    #[tokio::test]
    async fn test_rapid_installs_coalesce_into_one_follow_up_pass() {
        let connector = Arc::new(MockConnector::new());
        // Hold every pass open long enough to land installs inside it.
        connector.set_fetch_delay(Some(Duration::from_millis(150)));
        let (store, loop_) = fixture(Arc::clone(&connector), Duration::from_secs(30));
        loop_.start().unwrap();

        store.install(document(1, &["@a:example.org"])).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(connector.fetch_calls(), 1);

        // Two installs while the first pass is still inside fetch_state.
        store.install(document(2, &["@a:example.org", "@b:example.org"])).unwrap();
        store
            .install(document(3, &["@a:example.org", "@b:example.org", "@c:example.org"]))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;

        // Exactly one follow-up pass, not two.
        assert_eq!(connector.fetch_calls(), 2);
        assert_eq!(loop_.completed_passes(), 2);
        // And it converged toward the newest revision.
        assert!(connector.account(&UserId::new("@c:example.org")).exists);
        loop_.stop().await;
    }

    #[tokio::test]
    async fn test_failed_pass_retries_until_healed() {
        let connector = Arc::new(MockConnector::new());
        connector.fail_operation("create_user");
        let (store, loop_) = fixture(Arc::clone(&connector), Duration::from_millis(100));
        loop_.start().unwrap();

        store.install(document(1, &["@a:example.org"])).unwrap();
        settle().await;

        assert!(!connector.account(&UserId::new("@a:example.org")).exists);
        let passes_before = loop_.completed_passes();
        assert!(passes_before >= 1);

        connector.heal();
        tokio::time::sleep(Duration::from_millis(300)).await;

        // A retry ran and converged.
        assert!(connector.account(&UserId::new("@a:example.org")).exists);
        assert!(loop_.completed_passes() > passes_before);
        loop_.stop().await;
    }

    #[tokio::test]
    async fn test_store_change_during_retry_triggers_early_pass() {
        let connector = Arc::new(MockConnector::new());
        connector.fail_operation("create_user");
        let (store, loop_) = fixture(Arc::clone(&connector), Duration::from_secs(60));
        loop_.start().unwrap();

        store.install(document(1, &["@a:example.org"])).unwrap();
        settle().await;
        let passes_after_failure = loop_.completed_passes();
        assert!(passes_after_failure >= 1);

        // The retry timer is a minute away; a store change must not wait for it.
        connector.heal();
        store.install(document(2, &["@a:example.org"])).unwrap();
        settle().await;

        assert!(connector.account(&UserId::new("@a:example.org")).exists);
        loop_.stop().await;
    }

    #[tokio::test]
    async fn test_no_pass_starts_after_stop() {
        let connector = Arc::new(MockConnector::new());
        let (store, loop_) = fixture(Arc::clone(&connector), Duration::from_secs(30));
        loop_.start().unwrap();

        store.install(document(1, &["@a:example.org"])).unwrap();
        settle().await;
        loop_.stop().await;

        let passes = loop_.completed_passes();
        store.install(document(2, &["@b:example.org"])).unwrap();
        settle().await;

        assert_eq!(loop_.completed_passes(), passes);
        assert!(!connector.account(&UserId::new("@b:example.org")).exists);
    }

    #[tokio::test]
    async fn test_uninitialized_store_runs_no_pass() {
        let connector = Arc::new(MockConnector::new());
        let (_store, loop_) = fixture(Arc::clone(&connector), Duration::from_secs(30));
        loop_.start().unwrap();
        settle().await;

        assert_eq!(connector.fetch_calls(), 0);
        loop_.stop().await;
    }
}
