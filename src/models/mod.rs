pub mod asset;
pub mod pair;
pub mod position;
pub mod step;

pub use asset::{token_name, Address, Token};
pub use pair::{Gauge, Pair};
pub use position::{
    BribeKind, BribeReward, DistributionReward, GaugeReward, RewardsSnapshot, VestPosition,
};
pub use step::{StepId, StepPatch, StepStatus, TransactionBatch, TransactionStep};
