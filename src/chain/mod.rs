//! Capability boundary to the contracts.
//!
//! The orchestration core never encodes ABIs itself: a write is a
//! [`ContractCall`] handed to a [`ChainWriter`], and every read the
//! orchestrators need before planning goes through a [`ChainReader`].

use alloy_primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Address, Pair, RewardsSnapshot, Token, VestPosition};

/// EIP-1193 "unsupported method" provider error code.
pub const UNSUPPORTED_METHOD: i64 = 4200;
/// EIP-1193 "user rejected request" provider error code.
pub const USER_REJECTED: i64 = 4001;

/// One state-changing contract call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractCall {
    pub to: Address,
    /// Solidity signature, e.g. `approve(address,uint256)`.
    pub function: String,
    pub args: Vec<serde_json::Value>,
    /// Native value in raw units, as a decimal string.
    pub value: Option<String>,
}

impl ContractCall {
    pub fn new(to: &Address, function: &str, args: Vec<serde_json::Value>) -> Self {
        Self {
            to: to.clone(),
            function: function.to_string(),
            args,
            value: None,
        }
    }

    pub fn with_value(mut self, raw: String) -> Self {
        self.value = Some(raw);
        self
    }

    /// Function name without its parameter list.
    pub fn method(&self) -> &str {
        self.function
            .split_once('(')
            .map(|(name, _)| name)
            .unwrap_or(&self.function)
    }
}

/// Handle returned once a transaction has been broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHandle {
    pub hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub status: ReceiptStatus,
    pub transaction_hash: String,
}

/// Failures reported by a wallet, provider or node.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    /// Structured revert from simulation or execution.
    #[error("execution reverted{}", revert_suffix(.reason))]
    Revert { reason: Option<String> },

    /// JSON-RPC / EIP-1193 error with a code.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unknown error")]
    Unknown,
}

fn revert_suffix(reason: &Option<String>) -> String {
    reason
        .as_ref()
        .map(|r| format!(": {}", r))
        .unwrap_or_default()
}

impl ChainError {
    pub fn is_unsupported_method(&self) -> bool {
        matches!(self, ChainError::Rpc { code, .. } if *code == UNSUPPORTED_METHOD)
    }

    /// The most specific human-readable message available.
    pub fn user_message(&self) -> String {
        match self {
            ChainError::Revert {
                reason: Some(reason),
            } if !reason.trim().is_empty() => reason.trim().to_string(),
            ChainError::Revert { .. } => "Transaction reverted".to_string(),
            ChainError::Rpc { code, .. } if *code == USER_REJECTED => {
                "User rejected the request".to_string()
            }
            ChainError::Rpc { message, .. } if !message.trim().is_empty() => {
                message.trim().to_string()
            }
            ChainError::Transport(message) if !message.trim().is_empty() => {
                message.trim().to_string()
            }
            _ => "Unknown error".to_string(),
        }
    }
}

/// Reads the orchestrators perform before and between writes. Token amounts
/// are raw on-chain units.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn allowance(
        &self,
        token: &Token,
        owner: &Address,
        spender: &Address,
    ) -> Result<U256, ChainError>;

    async fn balance(&self, token: &Token, owner: &Address) -> Result<U256, ChainError>;

    /// LP tokens `owner` has staked in `gauge`.
    async fn staked_balance(&self, gauge: &Address, owner: &Address) -> Result<U256, ChainError>;

    /// Resolve the pair for two tokens, including its gauge when one exists.
    async fn pair(
        &self,
        token_a: &Address,
        token_b: &Address,
        stable: bool,
    ) -> Result<Option<Pair>, ChainError>;

    /// A vest position owned by `owner`, or `None` when it does not exist or
    /// belongs to someone else.
    async fn vest_position(
        &self,
        owner: &Address,
        nft_id: u64,
    ) -> Result<Option<VestPosition>, ChainError>;

    async fn rewards(&self, owner: &Address) -> Result<RewardsSnapshot, ChainError>;
}

/// Submits writes. Implementations simulate the call first so reverts
/// surface before the wallet prompt.
#[async_trait]
pub trait ChainWriter: Send + Sync {
    async fn simulate_and_submit(&self, call: &ContractCall) -> Result<TxHandle, ChainError>;

    async fn wait_for_confirmation(&self, handle: &TxHandle) -> Result<Receipt, ChainError>;
}
