//! Step-plan builders, one per user-facing action.
//!
//! | Action | Module | Steps |
//! |--------|--------|-------|
//! | Swap / wrap / unwrap | `swap` | allowance, swap |
//! | Add / remove liquidity | `liquidity` | allowances, deposit, gauge, stake |
//! | Stake / unstake | `stake` | LP allowance, deposit / withdraw |
//! | Vest | `vest` | allowance, lock / increase / withdraw / merge |
//! | Vote | `vote` | vote / reset |
//! | Bribe | `bribe` | allowance, notify reward |
//! | Redeem option | `redeem` | allowance, exercise |
//! | Claim all | `claim` | bribes, gauge rewards, rebases |

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::models::{Address, Pair, Token};
use crate::orchestrator::PlanContext;
use crate::utils::{ensure_balance, parse_amount};

pub mod bribe;
pub mod claim;
pub mod liquidity;
pub mod redeem;
pub mod stake;
pub mod swap;
pub mod vest;
pub mod vote;

pub use bribe::CreateBribe;
pub use claim::ClaimAll;
pub use liquidity::{AddLiquidity, LiquidityFlags, RemoveLiquidity};
pub use redeem::{RedeemMode, RedeemOption};
pub use stake::{StakeLp, UnstakeLp};
pub use swap::{Route, Swap};
pub use vest::{CreateLock, IncreaseAmount, IncreaseDuration, MergeLocks, WithdrawLock};
pub use vote::{CastVote, ResetVotes};

/// Identifies a pair by its tokens and curve type.
#[derive(Debug, Clone, PartialEq)]
pub struct PairKey {
    pub token_a: Token,
    pub token_b: Token,
    pub stable: bool,
}

impl PairKey {
    pub fn new(token_a: &Token, token_b: &Token, stable: bool) -> Self {
        Self {
            token_a: token_a.clone(),
            token_b: token_b.clone(),
            stable,
        }
    }

    pub fn label(&self) -> String {
        let kind = if self.stable { "sAMM" } else { "vAMM" };
        format!("{}-{}/{}", kind, self.token_a.symbol, self.token_b.symbol)
    }

    pub async fn find(&self, ctx: &PlanContext<'_>) -> Result<Option<Pair>> {
        Ok(ctx
            .reader
            .pair(&self.token_a.address, &self.token_b.address, self.stable)
            .await?)
    }

    pub async fn require(&self, ctx: &PlanContext<'_>) -> Result<Pair> {
        self.find(ctx)
            .await?
            .ok_or_else(|| Error::missing("pair", self.label()))
    }
}

/// Parse `input` into raw units and check it against the account's balance
/// of `token`.
pub async fn require_amount(ctx: &PlanContext<'_>, input: &str, token: &Token) -> Result<U256> {
    let amount = parse_amount(input, token)?;
    let balance = ctx.reader.balance(token, ctx.account).await?;
    ensure_balance(amount, balance, token)?;
    Ok(amount)
}

/// Check an amount that is not typed by the user (e.g. a full balance).
pub fn require_positive(amount: U256, token: &Token) -> Result<U256> {
    if amount.is_zero() {
        return Err(Error::invalid_amount(format!(
            "{} amount must be positive",
            token.symbol
        )));
    }
    Ok(amount)
}

/// The action's slippage, or the configured default.
pub fn slippage(ctx: &PlanContext<'_>, requested: Option<Decimal>) -> Result<Decimal> {
    let slippage = requested.unwrap_or(ctx.config.trading.default_slippage);
    if slippage < Decimal::ZERO || slippage >= Decimal::ONE {
        return Err(Error::invalid_amount(format!(
            "slippage {} must be between 0 and 1",
            slippage
        )));
    }
    Ok(slippage)
}

/// A raw amount as a decimal-string call argument.
pub fn raw(amount: U256) -> Value {
    json!(amount.to_string())
}

pub fn addr(address: &Address) -> Value {
    json!(address)
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! In-memory reader for plan-level unit tests.

    use alloy_primitives::U256;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::chain::{ChainError, ChainReader};
    use crate::config::Config;
    use crate::models::{Address, Pair, RewardsSnapshot, Token, VestPosition};
    use crate::utils::to_raw_units;

    pub fn address(n: u8) -> Address {
        Address::parse(&format!("0x{:040x}", n)).unwrap()
    }

    pub fn token(n: u8, symbol: &str, decimals: u8) -> Token {
        Token::new(address(n), symbol, decimals)
    }

    pub fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    /// `amount` whole tokens in raw units.
    pub fn units(amount: &str, decimals: u8) -> U256 {
        to_raw_units(dec(amount), decimals).unwrap()
    }

    pub fn account() -> Address {
        address(0xaa)
    }

    pub fn config() -> Config {
        Config::default()
    }

    #[derive(Default)]
    pub struct FakeReader {
        pub balances: Mutex<HashMap<Address, U256>>,
        pub staked: Mutex<HashMap<Address, U256>>,
        pub pairs: Mutex<Vec<Pair>>,
        pub positions: Mutex<Vec<VestPosition>>,
        pub rewards: Mutex<RewardsSnapshot>,
    }

    impl FakeReader {
        pub fn with_balance(self, token: &Token, amount: &str) -> Self {
            self.balances
                .lock()
                .unwrap()
                .insert(token.address.clone(), units(amount, token.decimals));
            self
        }

        pub fn with_pair(self, pair: Pair) -> Self {
            self.pairs.lock().unwrap().push(pair);
            self
        }

        pub fn with_position(self, position: VestPosition) -> Self {
            self.positions.lock().unwrap().push(position);
            self
        }
    }

    #[async_trait]
    impl ChainReader for FakeReader {
        async fn allowance(
            &self,
            _token: &Token,
            _owner: &Address,
            _spender: &Address,
        ) -> Result<U256, ChainError> {
            Ok(U256::ZERO)
        }

        async fn balance(&self, token: &Token, _owner: &Address) -> Result<U256, ChainError> {
            Ok(self
                .balances
                .lock()
                .unwrap()
                .get(&token.address)
                .copied()
                .unwrap_or_default())
        }

        async fn staked_balance(
            &self,
            gauge: &Address,
            _owner: &Address,
        ) -> Result<U256, ChainError> {
            Ok(self
                .staked
                .lock()
                .unwrap()
                .get(gauge)
                .copied()
                .unwrap_or_default())
        }

        async fn pair(
            &self,
            token_a: &Address,
            token_b: &Address,
            stable: bool,
        ) -> Result<Option<Pair>, ChainError> {
            Ok(self
                .pairs
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.stable == stable && p.contains(token_a) && p.contains(token_b))
                .cloned())
        }

        async fn vest_position(
            &self,
            _owner: &Address,
            nft_id: u64,
        ) -> Result<Option<VestPosition>, ChainError> {
            Ok(self
                .positions
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.id == nft_id)
                .cloned())
        }

        async fn rewards(&self, _owner: &Address) -> Result<RewardsSnapshot, ChainError> {
            Ok(self.rewards.lock().unwrap().clone())
        }
    }
}
