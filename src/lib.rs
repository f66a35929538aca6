//! # dexter-tx-rs
//!
//! Transaction orchestration for a ve(3,3) DEX client. Each user action is
//! planned as a batch of steps, published to an observable queue and executed
//! one write at a time, with every step moving through
//! `WAITING → PENDING → SUBMITTED → CONFIRMED` (or `REJECTED`, or `DONE`
//! when nothing needed to be sent).
//!
//! ## Actions
//!
//! | Action | Type | Steps |
//! |--------|------|-------|
//! | Swap / wrap / unwrap | [`Swap`] | allowance, swap |
//! | Add liquidity | [`AddLiquidity`] | allowances, deposit, gauge, LP allowance, stake |
//! | Remove liquidity | [`RemoveLiquidity`] | unstake, LP allowance, withdraw |
//! | Stake / unstake | [`StakeLp`], [`UnstakeLp`] | LP allowance, deposit / withdraw |
//! | Vest | [`CreateLock`], [`IncreaseAmount`], [`IncreaseDuration`], [`WithdrawLock`], [`MergeLocks`] | allowance, lock |
//! | Vote | [`CastVote`], [`ResetVotes`] | vote / reset |
//! | Bribe | [`CreateBribe`] | allowance, notify reward |
//! | Redeem option | [`RedeemOption`] | allowance, exercise |
//! | Claim all | [`ClaimAll`] | fees/bribes, gauge rewards, rebases |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dexter_tx_rs::{Config, NoopInvalidator, Orchestrator, Swap, TransactionQueueStore};
//!
//! let store = TransactionQueueStore::new();
//! let mut updates = store.subscribe();
//! let orchestrator = Orchestrator::new(
//!     store,
//!     reader,  // Arc<dyn ChainReader>
//!     writer,  // Arc<dyn ChainWriter>
//!     Arc::new(NoopInvalidator),
//!     Arc::new(Config::load()?),
//! );
//!
//! let report = orchestrator.execute(Some(&account), &swap).await?;
//! println!("{} finished with {} receipt(s)", report.title, report.receipts.len());
//! ```

pub mod actions;
pub mod api;
pub mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod queue;
pub mod utils;

pub use actions::{
    AddLiquidity, CastVote, ClaimAll, CreateBribe, CreateLock, IncreaseAmount, IncreaseDuration,
    LiquidityFlags, MergeLocks, RedeemMode, RedeemOption, RemoveLiquidity, ResetVotes, Route,
    StakeLp, Swap, UnstakeLp, WithdrawLock,
};
pub use alloy_primitives::U256;
pub use api::{DexterApi, PairListing, PairsResponse, Quote};
pub use cache::{load_from_file, save_to_file, ClientSettings};
pub use chain::{ChainError, ChainReader, ChainWriter, ContractCall, Receipt, ReceiptStatus, TxHandle};
pub use config::Config;
pub use error::{Error, Result};
pub use models::{
    Address, Pair, StepId, StepPatch, StepStatus, Token, TransactionBatch, TransactionStep,
};
pub use orchestrator::{
    Action, BatchReport, BroadcastInvalidator, CacheInvalidator, DataKey, NoopInvalidator,
    Orchestrator,
};
pub use queue::{QueueState, TransactionQueueStore};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
