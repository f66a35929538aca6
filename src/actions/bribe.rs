use async_trait::async_trait;

use super::{addr, raw, require_amount, PairKey};
use crate::chain::ContractCall;
use crate::error::{Error, Result};
use crate::models::Token;
use crate::orchestrator::{Action, Allowance, DataKey, Plan, PlanContext, PlannedStep};
use crate::utils::format_units;

/// Deposit an incentive on a pool's bribe contract for the current epoch.
#[derive(Debug, Clone)]
pub struct CreateBribe {
    pub token_a: Token,
    pub token_b: Token,
    pub stable: bool,
    pub reward: Token,
    pub amount: String,
}

#[async_trait]
impl Action for CreateBribe {
    fn title(&self) -> String {
        format!(
            "Bribe {}",
            PairKey::new(&self.token_a, &self.token_b, self.stable).label()
        )
    }

    fn purpose(&self) -> String {
        format!(
            "Offer {} {} to voters of this pool",
            self.amount.trim(),
            self.reward.symbol
        )
    }

    fn invalidates(&self) -> Vec<DataKey> {
        vec![DataKey::Balances, DataKey::Allowances, DataKey::Gauges]
    }

    async fn plan(&self, ctx: &PlanContext<'_>) -> Result<Vec<PlannedStep>> {
        let key = PairKey::new(&self.token_a, &self.token_b, self.stable);
        let pair = key.require(ctx).await?;
        let gauge = pair
            .gauge
            .as_ref()
            .ok_or_else(|| Error::missing("gauge", key.label()))?;
        let bribe = gauge
            .bribe
            .clone()
            .ok_or_else(|| Error::missing("bribe", key.label()))?;
        let amount = require_amount(ctx, &self.amount, &self.reward).await?;

        let mut plan = Plan::new();
        plan.approve(Allowance::new(&self.reward, &bribe, "bribe contract", amount))
            .call(
                format!(
                    "Bribe {} with {} {}",
                    pair.symbol(),
                    format_units(amount, self.reward.decimals),
                    self.reward.symbol
                ),
                ContractCall::new(
                    &bribe,
                    "notifyRewardAmount(address,uint256)",
                    vec![addr(&self.reward.address), raw(amount)],
                ),
            );
        Ok(plan.into_steps())
    }
}
