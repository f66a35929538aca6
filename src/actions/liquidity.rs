use alloy_primitives::U256;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;

use super::{addr, raw, require_amount, require_positive, slippage, PairKey};
use crate::chain::ContractCall;
use crate::error::{Error, Result};
use crate::models::{Address, Token};
use crate::orchestrator::{
    Action, Allowance, DataKey, Plan, PlanContext, PlannedStep, Resolvable, Resolve,
    ResolveContext,
};
use crate::utils::{apply_slippage, deadline, ensure_balance, floor_raw_units, parse_amount};

/// Which optional follow-ups a deposit includes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiquidityFlags {
    /// Stake the minted LP tokens in the pair's gauge.
    pub include_stake: bool,
    /// Create the gauge when the pair has none.
    pub include_gauge_creation: bool,
}

/// Deposit two tokens into a pair, optionally creating the pair, its gauge,
/// and staking the result.
#[derive(Debug, Clone)]
pub struct AddLiquidity {
    pub token_a: Token,
    pub token_b: Token,
    pub stable: bool,
    pub amount_a: String,
    pub amount_b: String,
    pub slippage: Option<Decimal>,
    /// The pool must not exist yet.
    pub create_pool: bool,
    pub flags: LiquidityFlags,
}

impl AddLiquidity {
    fn key(&self) -> PairKey {
        PairKey::new(&self.token_a, &self.token_b, self.stable)
    }
}

#[async_trait]
impl Action for AddLiquidity {
    fn title(&self) -> String {
        if self.create_pool {
            format!("Create {} pool", self.key().label())
        } else {
            format!("Add liquidity to {}", self.key().label())
        }
    }

    fn purpose(&self) -> String {
        let mut purpose = format!(
            "Deposit {} {} and {} {}",
            self.amount_a.trim(),
            self.token_a.symbol,
            self.amount_b.trim(),
            self.token_b.symbol
        );
        if self.flags.include_stake {
            purpose.push_str(" and stake the LP tokens");
        }
        purpose
    }

    fn invalidates(&self) -> Vec<DataKey> {
        vec![
            DataKey::Balances,
            DataKey::Allowances,
            DataKey::Pairs,
            DataKey::Gauges,
        ]
    }

    async fn plan(&self, ctx: &PlanContext<'_>) -> Result<Vec<PlannedStep>> {
        let key = self.key();
        if self.token_a.address == self.token_b.address {
            return Err(Error::invalid_amount("a pool needs two different tokens"));
        }
        if self.token_a.is_native() && self.token_b.is_native() {
            return Err(Error::invalid_amount("a pool needs at most one native token"));
        }

        let amount_a = require_amount(ctx, &self.amount_a, &self.token_a).await?;
        let amount_b = require_amount(ctx, &self.amount_b, &self.token_b).await?;

        let existing = key.find(ctx).await?;
        match (&existing, self.create_pool) {
            (Some(pair), true) => {
                return Err(Error::AlreadyExists {
                    kind: "pool",
                    id: pair.address.to_string(),
                })
            }
            (None, false) => return Err(Error::missing("pair", key.label())),
            _ => {}
        }
        let has_gauge = existing
            .as_ref()
            .map(|p| p.gauge.is_some())
            .unwrap_or(false);
        if self.flags.include_stake && !has_gauge && !self.flags.include_gauge_creation {
            return Err(Error::missing("gauge", key.label()));
        }

        let slippage = slippage(ctx, self.slippage)?;
        let router = &ctx.config.contracts.router;
        let min_a = apply_slippage(amount_a, slippage)?;
        let min_b = apply_slippage(amount_b, slippage)?;
        let deadline = json!(deadline(ctx.config.trading.deadline_minutes).to_string());

        let deposit = match (self.token_a.is_native(), self.token_b.is_native()) {
            (false, false) => ContractCall::new(
                router,
                "addLiquidity(address,address,bool,uint256,uint256,uint256,uint256,address,uint256)",
                vec![
                    addr(&self.token_a.address),
                    addr(&self.token_b.address),
                    json!(self.stable),
                    raw(amount_a),
                    raw(amount_b),
                    raw(min_a),
                    raw(min_b),
                    addr(ctx.account),
                    deadline,
                ],
            ),
            (native_a, _) => {
                let (token, amount, min, eth_amount, eth_min) = if native_a {
                    (&self.token_b, amount_b, min_b, amount_a, min_a)
                } else {
                    (&self.token_a, amount_a, min_a, amount_b, min_b)
                };
                ContractCall::new(
                    router,
                    "addLiquidityETH(address,bool,uint256,uint256,uint256,address,uint256)",
                    vec![
                        addr(&token.address),
                        json!(self.stable),
                        raw(amount),
                        raw(min),
                        raw(eth_min),
                        addr(ctx.account),
                        deadline,
                    ],
                )
                .with_value(eth_amount.to_string())
            }
        };

        let mut plan = Plan::new();
        plan.approve(Allowance::new(&self.token_a, router, "router", amount_a))
            .approve(Allowance::new(&self.token_b, router, "router", amount_b));

        let deposit_description = if self.create_pool {
            format!("Create {} pool and deposit", key.label())
        } else {
            format!("Deposit tokens into {}", key.label())
        };
        plan.call(deposit_description, deposit);

        if self.flags.include_gauge_creation && !has_gauge {
            plan.push(PlannedStep::deferred(
                format!("Create gauge for {}", key.label()),
                CreateGauge { key: key.clone() },
            ));
        }
        if self.flags.include_stake {
            plan.push(PlannedStep::allowance_with(
                &format!("{} LP", key.label()),
                Resolvable::Deferred(Arc::new(StakeAllowance { key: key.clone() })),
            ));
            plan.push(PlannedStep::deferred(
                format!("Stake {} LP tokens", key.label()),
                StakeDeposit { key },
            ));
        }
        Ok(plan.into_steps())
    }
}

/// Remove liquidity, unstaking first when the LP tokens sit in the gauge.
#[derive(Debug, Clone)]
pub struct RemoveLiquidity {
    pub token_a: Token,
    pub token_b: Token,
    pub stable: bool,
    /// LP amount, in whole LP units.
    pub amount: String,
    pub slippage: Option<Decimal>,
    pub unstake_first: bool,
}

impl RemoveLiquidity {
    fn key(&self) -> PairKey {
        PairKey::new(&self.token_a, &self.token_b, self.stable)
    }
}

#[async_trait]
impl Action for RemoveLiquidity {
    fn title(&self) -> String {
        format!("Remove liquidity from {}", self.key().label())
    }

    fn purpose(&self) -> String {
        format!(
            "Withdraw {} LP tokens back into {} and {}",
            self.amount.trim(),
            self.token_a.symbol,
            self.token_b.symbol
        )
    }

    fn invalidates(&self) -> Vec<DataKey> {
        vec![
            DataKey::Balances,
            DataKey::Allowances,
            DataKey::Pairs,
            DataKey::Gauges,
        ]
    }

    async fn plan(&self, ctx: &PlanContext<'_>) -> Result<Vec<PlannedStep>> {
        let key = self.key();
        let pair = key.require(ctx).await?;
        let lp = pair.lp_token();
        let amount = parse_amount(&self.amount, &lp)?;

        let mut plan = Plan::new();
        if self.unstake_first {
            let gauge = pair
                .gauge_address()
                .ok_or_else(|| Error::missing("gauge", key.label()))?;
            let staked = ctx.reader.staked_balance(gauge, ctx.account).await?;
            ensure_balance(amount, staked, &lp)?;
            plan.call(
                format!("Unstake {} LP tokens", key.label()),
                ContractCall::new(gauge, "withdraw(uint256)", vec![raw(amount)]),
            );
        } else {
            let balance = ctx.reader.balance(&lp, ctx.account).await?;
            ensure_balance(amount, balance, &lp)?;
        }

        let total_supply = floor_raw_units(pair.total_supply, lp.decimals)?;
        if total_supply.is_zero() {
            return Err(Error::invalid_amount(format!("{} has no liquidity", key.label())));
        }
        // pair tokens may be ordered differently from the action's
        let (reserve_a, reserve_b) = if pair.token0.address == self.token_a.address {
            (pair.reserve0, pair.reserve1)
        } else {
            (pair.reserve1, pair.reserve0)
        };
        let reserve_a = floor_raw_units(reserve_a, self.token_a.decimals)?;
        let reserve_b = floor_raw_units(reserve_b, self.token_b.decimals)?;
        let slippage = slippage(ctx, self.slippage)?;
        let min_a = apply_slippage(pro_rata(reserve_a, amount, total_supply)?, slippage)?;
        let min_b = apply_slippage(pro_rata(reserve_b, amount, total_supply)?, slippage)?;
        let router = &ctx.config.contracts.router;
        let deadline = json!(deadline(ctx.config.trading.deadline_minutes).to_string());

        let call = match (self.token_a.is_native(), self.token_b.is_native()) {
            (false, false) => ContractCall::new(
                router,
                "removeLiquidity(address,address,bool,uint256,uint256,uint256,address,uint256)",
                vec![
                    addr(&self.token_a.address),
                    addr(&self.token_b.address),
                    json!(self.stable),
                    raw(amount),
                    raw(min_a),
                    raw(min_b),
                    addr(ctx.account),
                    deadline,
                ],
            ),
            (native_a, _) => {
                let (token, min, eth_min) = if native_a {
                    (&self.token_b, min_b, min_a)
                } else {
                    (&self.token_a, min_a, min_b)
                };
                ContractCall::new(
                    router,
                    "removeLiquidityETH(address,bool,uint256,uint256,uint256,address,uint256)",
                    vec![
                        addr(&token.address),
                        json!(self.stable),
                        raw(amount),
                        raw(min),
                        raw(eth_min),
                        addr(ctx.account),
                        deadline,
                    ],
                )
            }
        };

        plan.approve(Allowance::new(&lp, router, "router", amount))
            .call(format!("Withdraw liquidity from {}", key.label()), call);
        Ok(plan.into_steps())
    }
}

/// `voter.createGauge(pair)` once the pair exists.
struct CreateGauge {
    key: PairKey,
}

#[async_trait]
impl Resolve<ContractCall> for CreateGauge {
    async fn resolve(&self, ctx: &ResolveContext<'_>) -> Result<Option<ContractCall>> {
        let pair = ctx
            .reader
            .pair(&self.key.token_a.address, &self.key.token_b.address, self.key.stable)
            .await?
            .ok_or_else(|| Error::missing("pair", self.key.label()))?;
        if pair.gauge.is_some() {
            return Ok(None);
        }
        Ok(Some(ContractCall::new(
            &ctx.config.contracts.voter,
            "createGauge(address)",
            vec![addr(&pair.address)],
        )))
    }
}

/// Approve the gauge for the full LP balance held after the deposit.
struct StakeAllowance {
    key: PairKey,
}

#[async_trait]
impl Resolve<Allowance> for StakeAllowance {
    async fn resolve(&self, ctx: &ResolveContext<'_>) -> Result<Option<Allowance>> {
        let (lp, gauge, balance) = lp_position(&self.key, ctx).await?;
        Ok(Some(Allowance::new(&lp, &gauge, "gauge", balance)))
    }
}

/// `gauge.deposit(balance)` for the LP balance held after the deposit.
struct StakeDeposit {
    key: PairKey,
}

#[async_trait]
impl Resolve<ContractCall> for StakeDeposit {
    async fn resolve(&self, ctx: &ResolveContext<'_>) -> Result<Option<ContractCall>> {
        let (lp, gauge, balance) = lp_position(&self.key, ctx).await?;
        Ok(Some(ContractCall::new(
            &gauge,
            "deposit(uint256)",
            vec![raw(balance)],
        )))
    }
}

async fn lp_position(
    key: &PairKey,
    ctx: &ResolveContext<'_>,
) -> Result<(Token, Address, U256)> {
    let pair = ctx
        .reader
        .pair(&key.token_a.address, &key.token_b.address, key.stable)
        .await?
        .ok_or_else(|| Error::missing("pair", key.label()))?;
    let gauge = pair
        .gauge_address()
        .cloned()
        .ok_or_else(|| Error::missing("gauge", key.label()))?;
    let lp = pair.lp_token();
    let balance = ctx.reader.balance(&lp, ctx.account).await?;
    let balance = require_positive(balance, &lp)?;
    Ok((lp, gauge, balance))
}

/// `reserve * amount / total_supply`, rounded down.
fn pro_rata(reserve: U256, amount: U256, total_supply: U256) -> Result<U256> {
    reserve
        .checked_mul(amount)
        .map(|scaled| scaled / total_supply)
        .ok_or_else(|| Error::invalid_amount(format!("{} is too large", amount)))
}
