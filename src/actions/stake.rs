use async_trait::async_trait;

use super::{raw, require_amount, require_positive, PairKey};
use crate::chain::ContractCall;
use crate::error::{Error, Result};
use crate::models::{Address, Pair, Token};
use crate::orchestrator::{Action, Allowance, DataKey, Plan, PlanContext, PlannedStep};
use crate::utils::{ensure_balance, format_units, parse_amount};

async fn pair_with_gauge(key: &PairKey, ctx: &PlanContext<'_>) -> Result<(Pair, Address)> {
    let pair = key.require(ctx).await?;
    let gauge = pair
        .gauge_address()
        .cloned()
        .ok_or_else(|| Error::missing("gauge", key.label()))?;
    Ok((pair, gauge))
}

/// Stake LP tokens in the pair's gauge. `amount: None` stakes the whole
/// wallet balance.
#[derive(Debug, Clone)]
pub struct StakeLp {
    pub token_a: Token,
    pub token_b: Token,
    pub stable: bool,
    pub amount: Option<String>,
}

#[async_trait]
impl Action for StakeLp {
    fn title(&self) -> String {
        format!(
            "Stake {} LP",
            PairKey::new(&self.token_a, &self.token_b, self.stable).label()
        )
    }

    fn purpose(&self) -> String {
        "Deposit LP tokens into the gauge to earn emissions".to_string()
    }

    fn invalidates(&self) -> Vec<DataKey> {
        vec![DataKey::Balances, DataKey::Allowances, DataKey::Gauges]
    }

    async fn plan(&self, ctx: &PlanContext<'_>) -> Result<Vec<PlannedStep>> {
        let key = PairKey::new(&self.token_a, &self.token_b, self.stable);
        let (pair, gauge) = pair_with_gauge(&key, ctx).await?;
        let lp = pair.lp_token();
        let amount = match &self.amount {
            Some(input) => require_amount(ctx, input, &lp).await?,
            None => require_positive(ctx.reader.balance(&lp, ctx.account).await?, &lp)?,
        };

        let mut plan = Plan::new();
        plan.approve(Allowance::new(&lp, &gauge, "gauge", amount)).call(
            format!("Stake {} {}", format_units(amount, lp.decimals), lp.symbol),
            ContractCall::new(&gauge, "deposit(uint256)", vec![raw(amount)]),
        );
        Ok(plan.into_steps())
    }
}

/// Withdraw staked LP tokens from the gauge. `amount: None` withdraws
/// everything staked.
#[derive(Debug, Clone)]
pub struct UnstakeLp {
    pub token_a: Token,
    pub token_b: Token,
    pub stable: bool,
    pub amount: Option<String>,
}

#[async_trait]
impl Action for UnstakeLp {
    fn title(&self) -> String {
        format!(
            "Unstake {} LP",
            PairKey::new(&self.token_a, &self.token_b, self.stable).label()
        )
    }

    fn purpose(&self) -> String {
        "Withdraw LP tokens from the gauge".to_string()
    }

    fn invalidates(&self) -> Vec<DataKey> {
        vec![DataKey::Balances, DataKey::Gauges, DataKey::Rewards]
    }

    async fn plan(&self, ctx: &PlanContext<'_>) -> Result<Vec<PlannedStep>> {
        let key = PairKey::new(&self.token_a, &self.token_b, self.stable);
        let (pair, gauge) = pair_with_gauge(&key, ctx).await?;
        let lp = pair.lp_token();
        let staked = ctx.reader.staked_balance(&gauge, ctx.account).await?;
        let amount = match &self.amount {
            Some(input) => {
                let amount = parse_amount(input, &lp)?;
                ensure_balance(amount, staked, &lp)?;
                amount
            }
            None => require_positive(staked, &lp)?,
        };

        let mut plan = Plan::new();
        plan.call(
            format!("Unstake {} {}", format_units(amount, lp.decimals), lp.symbol),
            ContractCall::new(&gauge, "withdraw(uint256)", vec![raw(amount)]),
        );
        Ok(plan.into_steps())
    }
}
