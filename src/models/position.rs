use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Address, Token};

/// A vote-escrowed lock, owned as an NFT.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VestPosition {
    pub id: u64,
    pub amount: Decimal,
    /// Unix seconds at which the lock expires.
    pub lock_end: u64,
    pub voted: bool,
}

impl VestPosition {
    pub fn is_expired(&self, now: u64) -> bool {
        self.lock_end <= now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BribeKind {
    /// Trading fees routed to voters.
    Fee,
    /// Third-party incentives.
    Bribe,
}

/// A claimable reward on one bribe contract for one NFT.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BribeReward {
    pub kind: BribeKind,
    pub contract: Address,
    pub nft_id: u64,
    pub token: Token,
    pub amount: Decimal,
}

/// Pending emissions on a gauge for the connected account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GaugeReward {
    pub gauge: Address,
    pub pair_symbol: String,
    pub tokens: Vec<Token>,
    pub amount: Decimal,
}

/// Rebase claimable from the ve-distributor for one NFT.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistributionReward {
    pub nft_id: u64,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RewardsSnapshot {
    pub bribes: Vec<BribeReward>,
    pub gauges: Vec<GaugeReward>,
    pub distributions: Vec<DistributionReward>,
}

impl RewardsSnapshot {
    /// True when nothing has a positive pending amount.
    pub fn is_empty(&self) -> bool {
        self.bribes.iter().all(|b| b.amount <= Decimal::ZERO)
            && self.gauges.iter().all(|g| g.amount <= Decimal::ZERO)
            && self.distributions.iter().all(|d| d.amount <= Decimal::ZERO)
    }
}
