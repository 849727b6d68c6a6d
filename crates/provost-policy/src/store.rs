//! The policy store: single source of truth for desired state.
//!
//! The store holds the one currently-active, validated [`PolicyDocument`]
//! as an atomically-swapped `Arc` snapshot. Readers never observe a
//! half-updated document; installs are totally ordered; subscribers get a
//! latest-value change signal through a watch channel, so triggers that
//! arrive while a reconciliation pass is running coalesce naturally.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::document::PolicyDocument;
use crate::error::{PolicyError, PolicyResult};
use crate::validator::Validator;

/// Holds the currently-active policy document.
///
/// Many concurrent readers, single-writer-at-a-time installs. A document
/// only becomes active after the validator accepts it.
#[derive(Debug)]
pub struct Store {
    validator: Validator,
    active: RwLock<Option<Arc<PolicyDocument>>>,
    changes_tx: watch::Sender<u64>,
}

impl Store {
    /// Create an empty store.
    ///
    /// The store is "not initialized" until the first successful
    /// [`install`](Self::install); that state is distinct from holding an
    /// empty document.
    pub fn new(validator: Validator) -> Self {
        let (changes_tx, _) = watch::channel(0);
        Self {
            validator,
            active: RwLock::new(None),
            changes_tx,
        }
    }

    /// Validate and atomically install a candidate document.
    ///
    /// On success the new document becomes visible to all subsequent
    /// readers at once and subscribers are notified. Documents whose
    /// revision is behind the active one are rejected; re-installing the
    /// active revision is accepted (idempotent re-delivery) and still
    /// notifies subscribers.
    pub fn install(&self, document: PolicyDocument) -> PolicyResult<Arc<PolicyDocument>> {
        self.validator.validate(&document)?;

        let mut active = self.active.write();
        if let Some(current) = active.as_ref() {
            if document.revision < current.revision {
                return Err(PolicyError::StaleRevision {
                    active: current.revision,
                    offered: document.revision,
                });
            }
            if document.revision == current.revision {
                debug!(revision = document.revision, "re-installing active policy revision");
            }
        }

        let document = Arc::new(document);
        *active = Some(Arc::clone(&document));
        // Notify while still holding the write lock so subscribers observe
        // installs in the same total order as readers.
        self.changes_tx.send_replace(document.revision);
        drop(active);

        info!(
            revision = document.revision,
            users = document.users.len(),
            managed_rooms = document.managed_room_ids.len(),
            "policy document installed"
        );

        Ok(document)
    }

    /// The active document, or `None` if nothing was ever installed.
    pub fn current(&self) -> Option<Arc<PolicyDocument>> {
        self.active.read().clone()
    }

    /// The active document, or [`PolicyError::NotInitialized`].
    pub fn current_required(&self) -> PolicyResult<Arc<PolicyDocument>> {
        self.current().ok_or(PolicyError::NotInitialized)
    }

    /// Whether a document has ever been installed.
    pub fn is_initialized(&self) -> bool {
        self.active.read().is_some()
    }

    /// Subscribe to install notifications.
    ///
    /// The channel carries the latest installed revision. Receivers that
    /// fall behind only ever see the newest value, which is exactly the
    /// coalescing the control loop needs.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes_tx.subscribe()
    }
}
