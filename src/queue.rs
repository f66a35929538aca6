//! Observable store for the transaction queue.
//!
//! Holds the single current [`TransactionBatch`] and whether the queue is
//! shown. Every mutation replaces the state atomically under the channel's
//! lock, so readers and subscribers only ever see whole snapshots.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{StepId, StepPatch, TransactionBatch, TransactionStep};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueState {
    pub visible: bool,
    pub batch: TransactionBatch,
}

impl QueueState {
    /// All steps finished without rejection; drives the success view.
    pub fn is_success(&self) -> bool {
        self.batch.is_success()
    }

    pub fn has_failed(&self) -> bool {
        self.batch.has_failed()
    }
}

/// Cheap to clone; clones share the same state.
#[derive(Debug, Clone)]
pub struct TransactionQueueStore {
    state: Arc<watch::Sender<QueueState>>,
}

impl Default for TransactionQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionQueueStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(QueueState::default());
        Self {
            state: Arc::new(tx),
        }
    }

    /// Replace the current batch and show the queue.
    pub fn start_batch(
        &self,
        title: &str,
        purpose: &str,
        steps: Vec<TransactionStep>,
    ) -> Result<()> {
        if steps.is_empty() {
            return Err(Error::NothingToDo {
                action: title.to_string(),
            });
        }
        debug!("[queue] start batch '{}' with {} step(s)", title, steps.len());
        self.state.send_modify(|state| {
            state.batch = TransactionBatch {
                title: title.to_string(),
                purpose: purpose.to_string(),
                steps,
            };
            state.visible = true;
        });
        Ok(())
    }

    /// Patch the step with `id`. Ids from a replaced batch are ignored.
    pub fn update_step(&self, id: StepId, patch: StepPatch) {
        self.state.send_if_modified(|state| {
            let Some(step) = state.batch.steps.iter_mut().find(|s| s.id == id) else {
                debug!("[queue] ignoring update for orphaned step {}", id);
                return false;
            };
            let before = step.clone();
            if !step.apply(&patch) {
                warn!(
                    "[queue] refused transition {} -> {:?} for step '{}'",
                    before.status, patch.status, step.description
                );
            }
            *step != before
        });
    }

    pub fn open(&self) {
        self.set_visible(true);
    }

    /// Hide the queue, keeping its steps for later inspection.
    pub fn close(&self) {
        self.set_visible(false);
    }

    pub fn clear(&self) {
        self.state.send_modify(|state| state.batch.steps.clear());
    }

    pub fn snapshot(&self) -> QueueState {
        self.state.borrow().clone()
    }

    pub fn step(&self, id: StepId) -> Option<TransactionStep> {
        self.state.borrow().batch.step(id).cloned()
    }

    /// Observe every state change.
    pub fn subscribe(&self) -> watch::Receiver<QueueState> {
        self.state.subscribe()
    }

    fn set_visible(&self, visible: bool) {
        self.state.send_if_modified(|state| {
            let changed = state.visible != visible;
            state.visible = visible;
            changed
        });
    }
}
