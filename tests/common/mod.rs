//! In-memory chain shared by the orchestration scenarios.

#![allow(dead_code)]

use alloy_primitives::U256;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dexter_tx_rs::chain::{
    ChainError, ChainReader, ChainWriter, ContractCall, Receipt, ReceiptStatus, TxHandle,
};
use dexter_tx_rs::models::{Address, Pair, RewardsSnapshot, Token, VestPosition};
use dexter_tx_rs::utils::to_raw_units;
use dexter_tx_rs::{CacheInvalidator, Config, DataKey, Orchestrator, TransactionQueueStore};

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

type Effect = Box<dyn Fn(&mut ChainState) + Send + Sync>;

#[derive(Default)]
pub struct ChainState {
    pub balances: HashMap<Address, U256>,
    pub allowances: HashMap<(Address, Address), U256>,
    pub staked: HashMap<Address, U256>,
    pub pairs: Vec<Pair>,
    pub positions: Vec<VestPosition>,
    pub rewards: RewardsSnapshot,
}

/// Fake chain recording every submitted call in order. Approvals set the
/// allowance to the approved amount; other state changes are scripted per
/// method with [`MockChain::on_write`].
#[derive(Default)]
pub struct MockChain {
    state: Mutex<ChainState>,
    submitted: Mutex<Vec<ContractCall>>,
    effects: Mutex<HashMap<String, Effect>>,
    /// 1-based index of the write that fails, with its error.
    fail_on: Mutex<Option<(usize, ChainError)>>,
    revert_on: Mutex<Option<usize>>,
    allowance_error: Mutex<Option<ChainError>>,
    reads: Mutex<usize>,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_balance(&self, token: &Token, amount: &str) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert(token.address.clone(), units(amount, token.decimals));
    }

    pub fn set_allowance(&self, token: &Token, spender: &Address, amount: &str) {
        self.set_raw_allowance(token, spender, units(amount, token.decimals));
    }

    pub fn set_raw_allowance(&self, token: &Token, spender: &Address, raw: U256) {
        self.state
            .lock()
            .unwrap()
            .allowances
            .insert((token.address.clone(), spender.clone()), raw);
    }

    pub fn allowance_of(&self, token: &Token, spender: &Address) -> U256 {
        self.state
            .lock()
            .unwrap()
            .allowances
            .get(&(token.address.clone(), spender.clone()))
            .copied()
            .unwrap_or_default()
    }

    pub fn add_pair(&self, pair: Pair) {
        self.state.lock().unwrap().pairs.push(pair);
    }

    pub fn add_position(&self, position: VestPosition) {
        self.state.lock().unwrap().positions.push(position);
    }

    pub fn set_rewards(&self, rewards: RewardsSnapshot) {
        self.state.lock().unwrap().rewards = rewards;
    }

    pub fn on_write<F>(&self, method: &str, effect: F)
    where
        F: Fn(&mut ChainState) + Send + Sync + 'static,
    {
        self.effects
            .lock()
            .unwrap()
            .insert(method.to_string(), Box::new(effect));
    }

    pub fn fail_write(&self, nth: usize, error: ChainError) {
        *self.fail_on.lock().unwrap() = Some((nth, error));
    }

    pub fn revert_write(&self, nth: usize) {
        *self.revert_on.lock().unwrap() = Some(nth);
    }

    /// Every allowance read fails with `error`.
    pub fn fail_allowance_reads(&self, error: ChainError) {
        *self.allowance_error.lock().unwrap() = Some(error);
    }

    pub fn submitted(&self) -> Vec<ContractCall> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submitted_methods(&self) -> Vec<String> {
        self.submitted()
            .iter()
            .map(|c| c.method().to_string())
            .collect()
    }

    pub fn allowance_reads(&self) -> usize {
        *self.reads.lock().unwrap()
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn allowance(
        &self,
        token: &Token,
        _owner: &Address,
        spender: &Address,
    ) -> Result<U256, ChainError> {
        *self.reads.lock().unwrap() += 1;
        if let Some(error) = self.allowance_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self
            .state
            .lock()
            .unwrap()
            .allowances
            .get(&(token.address.clone(), spender.clone()))
            .copied()
            .unwrap_or_default())
    }

    async fn balance(&self, token: &Token, _owner: &Address) -> Result<U256, ChainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .balances
            .get(&token.address)
            .copied()
            .unwrap_or_default())
    }

    async fn staked_balance(&self, gauge: &Address, _owner: &Address) -> Result<U256, ChainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .staked
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
            .state
            .lock()
            .unwrap()
            .pairs
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
            .state
            .lock()
            .unwrap()
            .positions
            .iter()
            .find(|p| p.id == nft_id)
            .cloned())
    }

    async fn rewards(&self, _owner: &Address) -> Result<RewardsSnapshot, ChainError> {
        Ok(self.state.lock().unwrap().rewards.clone())
    }
}

#[async_trait]
impl ChainWriter for MockChain {
    async fn simulate_and_submit(&self, call: &ContractCall) -> Result<TxHandle, ChainError> {
        let nth = {
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push(call.clone());
            submitted.len()
        };
        if let Some((fail_at, error)) = self.fail_on.lock().unwrap().clone() {
            if fail_at == nth {
                return Err(error);
            }
        }
        Ok(TxHandle {
            hash: format!("0x{:064x}", nth),
        })
    }

    async fn wait_for_confirmation(&self, handle: &TxHandle) -> Result<Receipt, ChainError> {
        let nth = self.submitted.lock().unwrap().len();
        if *self.revert_on.lock().unwrap() == Some(nth) {
            return Ok(Receipt {
                status: ReceiptStatus::Reverted,
                transaction_hash: handle.hash.clone(),
            });
        }

        let Some(call) = self.submitted.lock().unwrap().last().cloned() else {
            return Err(ChainError::Unknown);
        };
        let mut state = self.state.lock().unwrap();
        if call.method() == "approve" {
            let spender = call.args.first().and_then(|s| s.as_str());
            let amount = call.args.get(1).and_then(|a| a.as_str());
            if let (Some(spender), Some(amount)) = (spender, amount) {
                let spender = Address::parse(spender).map_err(|_| ChainError::Unknown)?;
                let amount = U256::from_str_radix(amount, 10).map_err(|_| ChainError::Unknown)?;
                state.allowances.insert((call.to.clone(), spender), amount);
            }
        }
        if let Some(effect) = self.effects.lock().unwrap().get(call.method()) {
            effect(&mut state);
        }
        Ok(Receipt {
            status: ReceiptStatus::Success,
            transaction_hash: handle.hash.clone(),
        })
    }
}

/// Remembers every invalidation.
#[derive(Default)]
pub struct RecordingInvalidator {
    pub keys: Mutex<Vec<DataKey>>,
}

impl RecordingInvalidator {
    pub fn keys(&self) -> Vec<DataKey> {
        self.keys.lock().unwrap().clone()
    }
}

impl CacheInvalidator for RecordingInvalidator {
    fn invalidate(&self, keys: &[DataKey]) {
        self.keys.lock().unwrap().extend_from_slice(keys);
    }
}

pub fn orchestrator(
    chain: &Arc<MockChain>,
    invalidator: &Arc<RecordingInvalidator>,
    config: Config,
) -> Orchestrator {
    Orchestrator::new(
        TransactionQueueStore::new(),
        chain.clone(),
        chain.clone(),
        invalidator.clone(),
        Arc::new(config),
    )
}
