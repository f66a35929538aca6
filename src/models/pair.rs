use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{token_name, Address, Token};

/// A router pair (pool) as seen by the client, with its optional gauge and
/// bribe contracts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pair {
    pub address: Address,
    pub token0: Token,
    pub token1: Token,
    pub stable: bool,
    #[serde(default)]
    pub reserve0: Decimal,
    #[serde(default)]
    pub reserve1: Decimal,
    #[serde(default)]
    pub total_supply: Decimal,
    #[serde(default)]
    pub gauge: Option<Gauge>,
}

/// Gauge attached to a pair. `fee_bribe` collects trading fees for voters,
/// `bribe` collects third-party incentives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gauge {
    pub address: Address,
    pub fee_bribe: Option<Address>,
    pub bribe: Option<Address>,
}

impl Pair {
    pub fn new(address: Address, token0: Token, token1: Token, stable: bool) -> Self {
        Self {
            address,
            token0,
            token1,
            stable,
            reserve0: Decimal::ZERO,
            reserve1: Decimal::ZERO,
            total_supply: Decimal::ZERO,
            gauge: None,
        }
    }

    pub fn symbol(&self) -> String {
        let kind = if self.stable { "sAMM" } else { "vAMM" };
        format!("{}-{}/{}", kind, token_name(&self.token0), token_name(&self.token1))
    }

    /// The pair's LP token. LP tokens always carry 18 decimals.
    pub fn lp_token(&self) -> Token {
        Token::new(self.address.clone(), &format!("{} LP", self.symbol()), 18)
    }

    /// Spot price of token1 denominated in token0.
    pub fn price(&self) -> Decimal {
        if self.reserve1.is_zero() {
            return Decimal::ZERO;
        }
        self.reserve0 / self.reserve1
    }

    pub fn contains(&self, token: &Address) -> bool {
        &self.token0.address == token || &self.token1.address == token
    }

    pub fn gauge_address(&self) -> Option<&Address> {
        self.gauge.as_ref().map(|g| &g.address)
    }
}
