//! Write wrapper: submits one on-chain write and drives its step to a
//! terminal status.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chain::{ChainError, ChainWriter, ContractCall, Receipt, ReceiptStatus, TxHandle};
use crate::models::{StepId, StepPatch, StepStatus};
use crate::queue::TransactionQueueStore;

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Confirmed(Receipt),
    /// The step was marked rejected with this message.
    Rejected(String),
    /// The provider does not support the request; the step was left as is.
    Unsupported,
}

pub struct WriteWrapper {
    store: TransactionQueueStore,
    writer: Arc<dyn ChainWriter>,
    ignore_unsupported_method: bool,
}

impl WriteWrapper {
    pub fn new(
        store: TransactionQueueStore,
        writer: Arc<dyn ChainWriter>,
        ignore_unsupported_method: bool,
    ) -> Self {
        Self {
            store,
            writer,
            ignore_unsupported_method,
        }
    }

    /// Simulate and submit `call`, then wait for its receipt.
    pub async fn write(&self, id: StepId, call: &ContractCall) -> WriteOutcome {
        debug!("[write] step {} -> {} on {}", id, call.function, call.to);
        let writer = Arc::clone(&self.writer);
        self.write_with(id, || async move { writer.simulate_and_submit(call).await })
            .await
    }

    /// Run `submit` for step `id`. Every path ends with the step confirmed or
    /// rejected, except an unsupported-method error when that is configured
    /// to be ignored.
    pub async fn write_with<F, Fut>(&self, id: StepId, submit: F) -> WriteOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TxHandle, ChainError>>,
    {
        self.store.update_step(id, StepPatch::status(StepStatus::Pending));

        let handle = match submit().await {
            Ok(handle) => handle,
            Err(e) => return self.fail(id, e),
        };
        self.store.update_step(
            id,
            StepPatch::status(StepStatus::Submitted).with_tx_hash(&handle.hash),
        );

        let receipt = match self.writer.wait_for_confirmation(&handle).await {
            Ok(receipt) => receipt,
            Err(e) => return self.fail(id, e),
        };

        match receipt.status {
            ReceiptStatus::Success => {
                info!("[write] step {} confirmed in {}", id, receipt.transaction_hash);
                self.store.update_step(
                    id,
                    StepPatch::status(StepStatus::Confirmed)
                        .with_tx_hash(&receipt.transaction_hash),
                );
                WriteOutcome::Confirmed(receipt)
            }
            ReceiptStatus::Reverted => {
                let message = format!("Transaction {} reverted", receipt.transaction_hash);
                warn!("[write] step {}: {}", id, message);
                self.store.update_step(id, StepPatch::rejected(&message));
                WriteOutcome::Rejected(message)
            }
        }
    }

    fn fail(&self, id: StepId, error: ChainError) -> WriteOutcome {
        if self.ignore_unsupported_method && error.is_unsupported_method() {
            warn!("[write] step {}: provider does not support the request, ignoring", id);
            return WriteOutcome::Unsupported;
        }
        let message = error.user_message();
        warn!("[write] step {} rejected: {}", id, error);
        self.store.update_step(id, StepPatch::rejected(&message));
        WriteOutcome::Rejected(message)
    }
}
