//! Step runner: interprets a plan one step at a time.

use alloy_primitives::U256;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::chain::{ChainReader, ContractCall, Receipt};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{Address, StepId, StepPatch, StepStatus};
use crate::orchestrator::plan::{Allowance, PlannedStep, ResolveContext, StepAction};
use crate::orchestrator::writer::{WriteOutcome, WriteWrapper};
use crate::queue::TransactionQueueStore;
use crate::utils::format_units;

pub const MAX_UINT256: U256 = U256::MAX;

/// How far a run got.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Every step is done or confirmed.
    Completed { receipts: Vec<Receipt> },
    /// The wallet could not handle a step's request; later steps were not run.
    Halted { step: StepId },
}

pub struct StepRunner<'a> {
    store: &'a TransactionQueueStore,
    wrapper: &'a WriteWrapper,
    reader: &'a dyn ChainReader,
    account: &'a Address,
    config: &'a Config,
    steps: Vec<PlannedStep>,
    cursor: usize,
    receipts: Vec<Receipt>,
}

impl<'a> StepRunner<'a> {
    pub fn new(
        store: &'a TransactionQueueStore,
        wrapper: &'a WriteWrapper,
        reader: &'a dyn ChainReader,
        account: &'a Address,
        config: &'a Config,
        steps: Vec<PlannedStep>,
    ) -> Self {
        Self {
            store,
            wrapper,
            reader,
            account,
            config,
            steps,
            cursor: 0,
            receipts: Vec::new(),
        }
    }

    /// Run from the current position until the plan completes, a step is
    /// rejected, or the wallet cannot handle a request.
    pub async fn run(&mut self) -> Result<RunOutcome> {
        while self.cursor < self.steps.len() {
            let id = self.steps[self.cursor].id();
            let status = self.execute(self.cursor).await?;
            match status {
                StepStatus::Confirmed | StepStatus::Done => self.cursor += 1,
                StepStatus::Pending => return Ok(RunOutcome::Halted { step: id }),
                other => {
                    return Err(Error::Internal(format!(
                        "step {} finished in unexpected state {}",
                        id, other
                    )))
                }
            }
        }
        Ok(RunOutcome::Completed {
            receipts: self.receipts.clone(),
        })
    }

    async fn execute(&mut self, index: usize) -> Result<StepStatus> {
        let ctx = ResolveContext {
            reader: self.reader,
            account: self.account,
            config: self.config,
        };
        let planned = &self.steps[index];
        let id = planned.id();
        let description = planned.step.description.clone();
        debug!("[runner] step {} '{}'", index, description);

        let call = match &planned.action {
            StepAction::EnsureAllowance(allowance) => {
                let resolved = allowance.resolve(&ctx).await;
                match self.reject_on_error(id, &description, resolved)? {
                    Some(allowance) => self.approval_call(id, &allowance).await?,
                    None => None,
                }
            }
            StepAction::Call(call) => {
                let resolved = call.resolve(&ctx).await;
                self.reject_on_error(id, &description, resolved)?
            }
        };

        let Some(call) = call else {
            self.store.update_step(id, StepPatch::status(StepStatus::Done));
            return Ok(StepStatus::Done);
        };

        match self.wrapper.write(id, &call).await {
            WriteOutcome::Confirmed(receipt) => {
                self.receipts.push(receipt);
                Ok(StepStatus::Confirmed)
            }
            WriteOutcome::Rejected(message) => Err(Error::WriteRejected {
                step: description,
                message,
            }),
            WriteOutcome::Unsupported => Ok(StepStatus::Pending),
        }
    }

    /// Read the allowance fresh. Returns the approval call when it falls
    /// short, otherwise marks the step done in place.
    async fn approval_call(
        &self,
        id: StepId,
        allowance: &Allowance,
    ) -> Result<Option<ContractCall>> {
        let symbol = &allowance.token.symbol;
        let current = self
            .reader
            .allowance(&allowance.token, self.account, &allowance.spender)
            .await;
        let current = self.reject_on_error(id, symbol, current.map_err(Error::from))?;

        if current >= allowance.amount {
            let decimals = allowance.token.decimals;
            info!(
                "[runner] {} allowance {} covers {}, skipping approval",
                symbol,
                format_units(current, decimals),
                format_units(allowance.amount, decimals)
            );
            self.store.update_step(
                id,
                StepPatch::description(format!("Allowance on {} sufficient", symbol)),
            );
            return Ok(None);
        }

        self.store.update_step(
            id,
            StepPatch::description(format!(
                "Allow the {} to spend your {}",
                allowance.spender_label, symbol
            )),
        );
        let amount = if self.config.write.unlimited_approvals {
            MAX_UINT256
        } else {
            allowance.amount
        };
        Ok(Some(ContractCall::new(
            &allowance.token.address,
            "approve(address,uint256)",
            vec![json!(allowance.spender), json!(amount.to_string())],
        )))
    }

    /// A failure while preparing a step rejects it before anything is
    /// submitted.
    fn reject_on_error<T>(&self, id: StepId, label: &str, result: Result<T>) -> Result<T> {
        result.map_err(|e| {
            let message = match &e {
                Error::Chain(chain) => chain.user_message(),
                other => other.to_string(),
            };
            warn!("[runner] preparing '{}' failed: {}", label, message);
            self.store.update_step(id, StepPatch::rejected(&message));
            Error::WriteRejected {
                step: label.to_string(),
                message,
            }
        })
    }
}
