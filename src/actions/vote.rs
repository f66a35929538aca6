use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use super::addr;
use crate::chain::ContractCall;
use crate::error::{Error, Result};
use crate::models::Address;
use crate::orchestrator::{Action, DataKey, Plan, PlanContext, PlannedStep};
use crate::utils::{to_raw_units, unix_now};

/// Cast the vest NFT's voting power across gauged pools. Weights are
/// percentages and must not add up to more than 100.
#[derive(Debug, Clone)]
pub struct CastVote {
    pub nft_id: u64,
    /// (pool address, weight in percent)
    pub votes: Vec<(Address, Decimal)>,
}

impl CastVote {
    fn weighted(&self) -> Result<Vec<(Address, Decimal)>> {
        if let Some((pool, _)) = self.votes.iter().find(|(_, w)| *w < Decimal::ZERO) {
            return Err(Error::invalid_amount(format!(
                "negative vote weight for {}",
                pool.short()
            )));
        }
        let votes: Vec<_> = self
            .votes
            .iter()
            .filter(|(_, w)| *w > Decimal::ZERO)
            .cloned()
            .collect();
        let total: Decimal = votes.iter().map(|(_, w)| *w).sum();
        if total > Decimal::ONE_HUNDRED {
            return Err(Error::invalid_amount(format!(
                "vote weights add up to {}%",
                total
            )));
        }
        Ok(votes)
    }
}

#[async_trait]
impl Action for CastVote {
    fn title(&self) -> String {
        format!("Vote with vest #{}", self.nft_id)
    }

    fn purpose(&self) -> String {
        "Direct emissions to the selected pools".to_string()
    }

    fn invalidates(&self) -> Vec<DataKey> {
        vec![DataKey::Votes, DataKey::VestPositions]
    }

    async fn plan(&self, ctx: &PlanContext<'_>) -> Result<Vec<PlannedStep>> {
        let position = ctx
            .reader
            .vest_position(ctx.account, self.nft_id)
            .await?
            .ok_or_else(|| Error::missing("vest NFT", format!("#{}", self.nft_id)))?;
        if position.is_expired(unix_now()) {
            return Err(Error::not_allowed(format!(
                "vest #{} has expired",
                self.nft_id
            )));
        }
        let votes = self.weighted()?;
        if votes.is_empty() {
            return Err(Error::NothingToDo {
                action: self.title(),
            });
        }

        let pools: Vec<Value> = votes.iter().map(|(pool, _)| addr(pool)).collect();
        let weights = votes
            .iter()
            .map(|(_, w)| to_raw_units(*w, 2).map(|bps| Value::from(bps.to_string())))
            .collect::<Result<Vec<_>>>()?;

        let mut plan = Plan::new();
        plan.call(
            format!("Cast votes for {} pools", votes.len()),
            ContractCall::new(
                &ctx.config.contracts.voter,
                "vote(uint256,address[],uint256[])",
                vec![
                    json!(self.nft_id.to_string()),
                    Value::Array(pools),
                    Value::Array(weights),
                ],
            ),
        );
        Ok(plan.into_steps())
    }
}

/// Clear the NFT's current votes.
#[derive(Debug, Clone)]
pub struct ResetVotes {
    pub nft_id: u64,
}

#[async_trait]
impl Action for ResetVotes {
    fn title(&self) -> String {
        format!("Reset votes of vest #{}", self.nft_id)
    }

    fn purpose(&self) -> String {
        "Release the vest's voting power".to_string()
    }

    fn invalidates(&self) -> Vec<DataKey> {
        vec![DataKey::Votes, DataKey::VestPositions]
    }

    async fn plan(&self, ctx: &PlanContext<'_>) -> Result<Vec<PlannedStep>> {
        let position = ctx
            .reader
            .vest_position(ctx.account, self.nft_id)
            .await?
            .ok_or_else(|| Error::missing("vest NFT", format!("#{}", self.nft_id)))?;
        if !position.voted {
            return Err(Error::NothingToDo {
                action: self.title(),
            });
        }

        let mut plan = Plan::new();
        plan.call(
            self.title(),
            ContractCall::new(
                &ctx.config.contracts.voter,
                "reset(uint256)",
                vec![json!(self.nft_id.to_string())],
            ),
        );
        Ok(plan.into_steps())
    }
}
