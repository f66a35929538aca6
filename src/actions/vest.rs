//! Vote-escrow locks: create, extend, top up, withdraw and merge.

use async_trait::async_trait;
use serde_json::json;

use super::{raw, require_amount};
use crate::chain::ContractCall;
use crate::error::{Error, Result};
use crate::models::{Token, VestPosition};
use crate::orchestrator::{Action, Allowance, DataKey, Plan, PlanContext, PlannedStep};
use crate::utils::{format_units, unix_now};

async fn require_position(ctx: &PlanContext<'_>, nft_id: u64) -> Result<VestPosition> {
    ctx.reader
        .vest_position(ctx.account, nft_id)
        .await?
        .ok_or_else(|| Error::missing("vest NFT", format!("#{}", nft_id)))
}

fn require_governance_token(ctx: &PlanContext<'_>, token: &Token) -> Result<()> {
    if token.address != ctx.config.contracts.governance_token {
        return Err(Error::missing("governance token", &token.address));
    }
    Ok(())
}

fn check_duration(ctx: &PlanContext<'_>, duration_secs: u64) -> Result<()> {
    let max = ctx.config.trading.max_lock_duration_secs;
    if duration_secs == 0 || duration_secs > max {
        return Err(Error::invalid_amount(format!(
            "lock duration must be between 1 second and {} seconds",
            max
        )));
    }
    Ok(())
}

fn reset_call(ctx: &PlanContext<'_>, nft_id: u64) -> ContractCall {
    ContractCall::new(
        &ctx.config.contracts.voter,
        "reset(uint256)",
        vec![json!(nft_id.to_string())],
    )
}

/// Lock governance tokens into a new vest NFT.
#[derive(Debug, Clone)]
pub struct CreateLock {
    pub token: Token,
    pub amount: String,
    pub duration_secs: u64,
}

#[async_trait]
impl Action for CreateLock {
    fn title(&self) -> String {
        format!("Lock {}", self.token.symbol)
    }

    fn purpose(&self) -> String {
        format!(
            "Lock {} {} into a new vest position",
            self.amount.trim(),
            self.token.symbol
        )
    }

    fn invalidates(&self) -> Vec<DataKey> {
        vec![
            DataKey::Balances,
            DataKey::Allowances,
            DataKey::VestPositions,
        ]
    }

    async fn plan(&self, ctx: &PlanContext<'_>) -> Result<Vec<PlannedStep>> {
        require_governance_token(ctx, &self.token)?;
        check_duration(ctx, self.duration_secs)?;
        let amount = require_amount(ctx, &self.amount, &self.token).await?;
        let ve = &ctx.config.contracts.vote_escrow;

        let mut plan = Plan::new();
        plan.approve(Allowance::new(&self.token, ve, "vote-escrow", amount))
            .call(
                format!(
                    "Lock {} {}",
                    format_units(amount, self.token.decimals),
                    self.token.symbol
                ),
                ContractCall::new(
                    ve,
                    "create_lock(uint256,uint256)",
                    vec![
                        raw(amount),
                        json!(self.duration_secs.to_string()),
                    ],
                ),
            );
        Ok(plan.into_steps())
    }
}

/// Add governance tokens to an existing, unexpired lock.
#[derive(Debug, Clone)]
pub struct IncreaseAmount {
    pub token: Token,
    pub nft_id: u64,
    pub amount: String,
}

#[async_trait]
impl Action for IncreaseAmount {
    fn title(&self) -> String {
        format!("Increase vest #{}", self.nft_id)
    }

    fn purpose(&self) -> String {
        format!(
            "Add {} {} to vest #{}",
            self.amount.trim(),
            self.token.symbol,
            self.nft_id
        )
    }

    fn invalidates(&self) -> Vec<DataKey> {
        vec![
            DataKey::Balances,
            DataKey::Allowances,
            DataKey::VestPositions,
        ]
    }

    async fn plan(&self, ctx: &PlanContext<'_>) -> Result<Vec<PlannedStep>> {
        require_governance_token(ctx, &self.token)?;
        let position = require_position(ctx, self.nft_id).await?;
        if position.is_expired(unix_now()) {
            return Err(Error::not_allowed(format!(
                "vest #{} has expired",
                self.nft_id
            )));
        }
        let amount = require_amount(ctx, &self.amount, &self.token).await?;
        let ve = &ctx.config.contracts.vote_escrow;

        let mut plan = Plan::new();
        plan.approve(Allowance::new(&self.token, ve, "vote-escrow", amount))
            .call(
                format!(
                    "Add {} {} to vest #{}",
                    format_units(amount, self.token.decimals),
                    self.token.symbol,
                    self.nft_id
                ),
                ContractCall::new(
                    ve,
                    "increase_amount(uint256,uint256)",
                    vec![json!(self.nft_id.to_string()), raw(amount)],
                ),
            );
        Ok(plan.into_steps())
    }
}

/// Extend a lock so it ends `duration_secs` from now.
#[derive(Debug, Clone)]
pub struct IncreaseDuration {
    pub nft_id: u64,
    pub duration_secs: u64,
}

#[async_trait]
impl Action for IncreaseDuration {
    fn title(&self) -> String {
        format!("Extend vest #{}", self.nft_id)
    }

    fn purpose(&self) -> String {
        format!("Extend the lock time of vest #{}", self.nft_id)
    }

    fn invalidates(&self) -> Vec<DataKey> {
        vec![DataKey::VestPositions]
    }

    async fn plan(&self, ctx: &PlanContext<'_>) -> Result<Vec<PlannedStep>> {
        check_duration(ctx, self.duration_secs)?;
        let position = require_position(ctx, self.nft_id).await?;
        let now = unix_now();
        if position.is_expired(now) {
            return Err(Error::not_allowed(format!(
                "vest #{} has expired",
                self.nft_id
            )));
        }
        if now + self.duration_secs <= position.lock_end {
            return Err(Error::invalid_amount(
                "new lock end must be later than the current one",
            ));
        }

        let mut plan = Plan::new();
        plan.call(
            format!("Extend vest #{}", self.nft_id),
            ContractCall::new(
                &ctx.config.contracts.vote_escrow,
                "increase_unlock_time(uint256,uint256)",
                vec![
                    json!(self.nft_id.to_string()),
                    json!(self.duration_secs.to_string()),
                ],
            ),
        );
        Ok(plan.into_steps())
    }
}

/// Withdraw an expired lock, resetting its votes first when needed.
#[derive(Debug, Clone)]
pub struct WithdrawLock {
    pub nft_id: u64,
}

#[async_trait]
impl Action for WithdrawLock {
    fn title(&self) -> String {
        format!("Withdraw vest #{}", self.nft_id)
    }

    fn purpose(&self) -> String {
        format!("Withdraw the tokens locked in vest #{}", self.nft_id)
    }

    fn invalidates(&self) -> Vec<DataKey> {
        vec![DataKey::Balances, DataKey::VestPositions, DataKey::Votes]
    }

    async fn plan(&self, ctx: &PlanContext<'_>) -> Result<Vec<PlannedStep>> {
        let position = require_position(ctx, self.nft_id).await?;
        if !position.is_expired(unix_now()) {
            return Err(Error::not_allowed(format!(
                "vest #{} is still locked",
                self.nft_id
            )));
        }

        let mut plan = Plan::new();
        if position.voted {
            plan.call(
                format!("Reset votes of vest #{}", self.nft_id),
                reset_call(ctx, self.nft_id),
            );
        }
        plan.call(
            format!("Withdraw vest #{}", self.nft_id),
            ContractCall::new(
                &ctx.config.contracts.vote_escrow,
                "withdraw(uint256)",
                vec![json!(self.nft_id.to_string())],
            ),
        );
        Ok(plan.into_steps())
    }
}

/// Merge lock `from` into lock `to`.
#[derive(Debug, Clone)]
pub struct MergeLocks {
    pub from: u64,
    pub to: u64,
}

#[async_trait]
impl Action for MergeLocks {
    fn title(&self) -> String {
        format!("Merge vest #{} into #{}", self.from, self.to)
    }

    fn purpose(&self) -> String {
        format!(
            "Combine vest #{} into vest #{}; the longer lock end is kept",
            self.from, self.to
        )
    }

    fn invalidates(&self) -> Vec<DataKey> {
        vec![DataKey::VestPositions, DataKey::Votes]
    }

    async fn plan(&self, ctx: &PlanContext<'_>) -> Result<Vec<PlannedStep>> {
        if self.from == self.to {
            return Err(Error::not_allowed("cannot merge a vest into itself"));
        }
        let from = require_position(ctx, self.from).await?;
        let to = require_position(ctx, self.to).await?;
        let now = unix_now();
        if from.is_expired(now) || to.is_expired(now) {
            return Err(Error::not_allowed("expired vests cannot be merged"));
        }

        let mut plan = Plan::new();
        if from.voted {
            plan.call(
                format!("Reset votes of vest #{}", self.from),
                reset_call(ctx, self.from),
            );
        }
        plan.call(
            format!("Merge vest #{} into #{}", self.from, self.to),
            ContractCall::new(
                &ctx.config.contracts.vote_escrow,
                "merge(uint256,uint256)",
                vec![json!(self.from.to_string()), json!(self.to.to_string())],
            ),
        );
        Ok(plan.into_steps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::fixtures::*;
    use rust_decimal::Decimal;

    fn gov(config: &crate::config::Config) -> Token {
        Token::new(config.contracts.governance_token.clone(), "VELO", 18)
    }

    fn position(id: u64, lock_end: u64, voted: bool) -> VestPosition {
        VestPosition {
            id,
            amount: Decimal::TEN,
            lock_end,
            voted,
        }
    }

    #[tokio::test]
    async fn test_create_lock_plans_allowance_then_lock() {
        let config = config();
        let reader = FakeReader::default().with_balance(&gov(&config), "100");
        let ctx = PlanContext {
            reader: &reader,
            account: &account(),
            config: &config,
        };
        let action = CreateLock {
            token: gov(&config),
            amount: "25".into(),
            duration_secs: 7 * 24 * 3600,
        };
        let steps = action.plan(&ctx).await.unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step.description, "Checking your VELO allowance");
        assert_eq!(steps[1].step.description, "Lock 25 VELO");
    }

    #[tokio::test]
    async fn test_create_lock_rejects_long_duration_and_wrong_token() {
        let config = config();
        let reader = FakeReader::default().with_balance(&gov(&config), "100");
        let ctx = PlanContext {
            reader: &reader,
            account: &account(),
            config: &config,
        };
        let too_long = CreateLock {
            token: gov(&config),
            amount: "1".into(),
            duration_secs: config.trading.max_lock_duration_secs + 1,
        };
        assert!(matches!(
            too_long.plan(&ctx).await.unwrap_err(),
            Error::InvalidAmount { .. }
        ));
        let wrong = CreateLock {
            token: token(7, "USDC", 6),
            amount: "1".into(),
            duration_secs: 3600,
        };
        assert!(matches!(
            wrong.plan(&ctx).await.unwrap_err(),
            Error::MissingEntity { .. }
        ));
    }

    #[tokio::test]
    async fn test_withdraw_resets_votes_first() {
        let config = config();
        let reader = FakeReader::default().with_position(position(3, 1, true));
        let ctx = PlanContext {
            reader: &reader,
            account: &account(),
            config: &config,
        };
        let steps = WithdrawLock { nft_id: 3 }.plan(&ctx).await.unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step.description, "Reset votes of vest #3");
        assert_eq!(steps[1].step.description, "Withdraw vest #3");
    }

    #[tokio::test]
    async fn test_withdraw_unexpired_is_not_allowed() {
        let config = config();
        let reader = FakeReader::default().with_position(position(3, u64::MAX, false));
        let ctx = PlanContext {
            reader: &reader,
            account: &account(),
            config: &config,
        };
        assert!(matches!(
            WithdrawLock { nft_id: 3 }.plan(&ctx).await.unwrap_err(),
            Error::NotAllowed { .. }
        ));
        assert!(matches!(
            WithdrawLock { nft_id: 4 }.plan(&ctx).await.unwrap_err(),
            Error::MissingEntity { .. }
        ));
    }

    #[tokio::test]
    async fn test_increase_duration_must_extend() {
        let config = config();
        let far = unix_now() + config.trading.max_lock_duration_secs;
        let reader = FakeReader::default().with_position(position(5, far, false));
        let ctx = PlanContext {
            reader: &reader,
            account: &account(),
            config: &config,
        };
        let action = IncreaseDuration {
            nft_id: 5,
            duration_secs: 3600,
        };
        assert!(matches!(
            action.plan(&ctx).await.unwrap_err(),
            Error::InvalidAmount { .. }
        ));
    }

    #[tokio::test]
    async fn test_merge_into_self_is_not_allowed() {
        let config = config();
        let reader = FakeReader::default();
        let ctx = PlanContext {
            reader: &reader,
            account: &account(),
            config: &config,
        };
        assert!(matches!(
            MergeLocks { from: 1, to: 1 }.plan(&ctx).await.unwrap_err(),
            Error::NotAllowed { .. }
        ));
    }
}
