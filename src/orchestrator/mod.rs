//! Multi-step transaction orchestration.
//!
//! An [`Action`] turns one user intent into a plan of steps. The
//! [`Orchestrator`] validates the account, asks the action for its plan,
//! publishes the plan to the [`TransactionQueueStore`], runs it through the
//! [`StepRunner`] and finally invalidates the cached data the action touched.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::chain::{ChainReader, ChainWriter, Receipt};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{Address, TransactionStep};
use crate::queue::TransactionQueueStore;

pub mod plan;
pub mod runner;
pub mod writer;

pub use plan::{Allowance, Plan, PlannedStep, Resolvable, Resolve, ResolveContext, StepAction};
pub use runner::{RunOutcome, StepRunner, MAX_UINT256};
pub use writer::{WriteOutcome, WriteWrapper};

/// Cached data a successful action makes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKey {
    Balances,
    Allowances,
    Pairs,
    Gauges,
    VestPositions,
    Votes,
    Rewards,
}

/// Told which data to refetch after a batch succeeds.
pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, keys: &[DataKey]);
}

#[derive(Debug, Default)]
pub struct NoopInvalidator;

impl CacheInvalidator for NoopInvalidator {
    fn invalidate(&self, _keys: &[DataKey]) {}
}

/// Fans invalidations out to any number of data-fetch tasks.
#[derive(Debug, Clone)]
pub struct BroadcastInvalidator {
    tx: broadcast::Sender<DataKey>,
}

impl BroadcastInvalidator {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DataKey> {
        self.tx.subscribe()
    }
}

impl CacheInvalidator for BroadcastInvalidator {
    fn invalidate(&self, keys: &[DataKey]) {
        for key in keys {
            // no subscribers is fine
            let _ = self.tx.send(*key);
        }
    }
}

/// Inputs an action may read while planning.
pub struct PlanContext<'a> {
    pub reader: &'a dyn ChainReader,
    pub account: &'a Address,
    pub config: &'a Config,
}

/// One user-facing mutation.
#[async_trait]
pub trait Action: Send + Sync {
    fn title(&self) -> String;

    fn purpose(&self) -> String;

    fn invalidates(&self) -> Vec<DataKey>;

    /// Validate inputs and build the step plan. Must not write.
    async fn plan(&self, ctx: &PlanContext<'_>) -> Result<Vec<PlannedStep>>;
}

/// Final state of a successful batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub title: String,
    pub steps: Vec<TransactionStep>,
    pub receipts: Vec<Receipt>,
}

pub struct Orchestrator {
    store: TransactionQueueStore,
    reader: Arc<dyn ChainReader>,
    wrapper: WriteWrapper,
    invalidator: Arc<dyn CacheInvalidator>,
    config: Arc<Config>,
}

impl Orchestrator {
    pub fn new(
        store: TransactionQueueStore,
        reader: Arc<dyn ChainReader>,
        writer: Arc<dyn ChainWriter>,
        invalidator: Arc<dyn CacheInvalidator>,
        config: Arc<Config>,
    ) -> Self {
        let wrapper = WriteWrapper::new(
            store.clone(),
            writer,
            config.write.ignore_unsupported_method,
        );
        Self {
            store,
            reader,
            wrapper,
            invalidator,
            config,
        }
    }

    pub fn store(&self) -> &TransactionQueueStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Plan and run `action` for `account`.
    ///
    /// Validation failures return before the queue opens. A rejected step
    /// returns `WriteRejected` and leaves the rest of the batch waiting.
    pub async fn execute(&self, account: Option<&Address>, action: &dyn Action) -> Result<BatchReport> {
        let account = account.ok_or(Error::NoAccount)?;
        let title = action.title();

        let ctx = PlanContext {
            reader: self.reader.as_ref(),
            account,
            config: &self.config,
        };
        let planned = action.plan(&ctx).await?;
        if planned.is_empty() {
            return Err(Error::NothingToDo { action: title });
        }

        let steps: Vec<TransactionStep> = planned.iter().map(|p| p.step.clone()).collect();
        let ids: Vec<_> = steps.iter().map(|s| s.id).collect();
        self.store.start_batch(&title, &action.purpose(), steps)?;
        info!("[orchestrator] '{}' planned {} step(s)", title, ids.len());

        let mut runner = StepRunner::new(
            &self.store,
            &self.wrapper,
            self.reader.as_ref(),
            account,
            &self.config,
            planned,
        );

        let receipts = match runner.run().await {
            Ok(RunOutcome::Completed { receipts }) => receipts,
            Ok(RunOutcome::Halted { step }) => {
                warn!("[orchestrator] '{}' halted at step {}", title, step);
                let description = self
                    .store
                    .step(step)
                    .map(|s| s.description)
                    .unwrap_or_default();
                return Err(Error::Unsupported { step: description });
            }
            Err(e) => {
                warn!("[orchestrator] '{}' failed: {}", title, e);
                return Err(e);
            }
        };

        let keys = action.invalidates();
        debug!("[orchestrator] invalidating {:?}", keys);
        self.invalidator.invalidate(&keys);

        let snapshot = self.store.snapshot();
        let steps = ids
            .iter()
            .filter_map(|id| snapshot.batch.step(*id).cloned())
            .collect();
        Ok(BatchReport {
            title,
            steps,
            receipts,
        })
    }
}
