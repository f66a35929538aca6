use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::addr;
use crate::chain::ContractCall;
use crate::error::{Error, Result};
use crate::models::{Address, BribeKind, RewardsSnapshot};
use crate::orchestrator::{Action, DataKey, Plan, PlanContext, PlannedStep};

/// Reward tokens per bribe contract, in first-seen order.
type ClaimGroup = Vec<(Address, Vec<Address>)>;

/// Claim every pending reward: voter fees and bribes, gauge emissions and
/// ve-distributor rebases.
#[derive(Debug, Clone, Default)]
pub struct ClaimAll;

fn group_bribes(rewards: &RewardsSnapshot) -> BTreeMap<(BribeKind, u64), ClaimGroup> {
    let mut groups: BTreeMap<(BribeKind, u64), ClaimGroup> = BTreeMap::new();
    for reward in rewards.bribes.iter().filter(|b| b.amount > Decimal::ZERO) {
        let group = groups.entry((reward.kind, reward.nft_id)).or_default();
        match group.iter_mut().find(|(contract, _)| *contract == reward.contract) {
            Some((_, tokens)) => {
                if !tokens.contains(&reward.token.address) {
                    tokens.push(reward.token.address.clone());
                }
            }
            None => group.push((reward.contract.clone(), vec![reward.token.address.clone()])),
        }
    }
    groups
}

#[async_trait]
impl Action for ClaimAll {
    fn title(&self) -> String {
        "Claim all rewards".to_string()
    }

    fn purpose(&self) -> String {
        "Collect fees, bribes, emissions and rebases in one go".to_string()
    }

    fn invalidates(&self) -> Vec<DataKey> {
        vec![DataKey::Rewards, DataKey::Balances, DataKey::VestPositions]
    }

    async fn plan(&self, ctx: &PlanContext<'_>) -> Result<Vec<PlannedStep>> {
        let rewards = ctx.reader.rewards(ctx.account).await?;
        if rewards.is_empty() {
            return Err(Error::NothingToDo {
                action: self.title(),
            });
        }

        let voter = &ctx.config.contracts.voter;
        let mut plan = Plan::new();

        for ((kind, nft_id), group) in group_bribes(&rewards) {
            let (function, label) = match kind {
                BribeKind::Fee => ("claimFees(address[],address[][],uint256)", "fees"),
                BribeKind::Bribe => ("claimBribes(address[],address[][],uint256)", "bribes"),
            };
            let contracts: Vec<Value> = group.iter().map(|(c, _)| addr(c)).collect();
            let tokens: Vec<Value> = group
                .iter()
                .map(|(_, tokens)| Value::Array(tokens.iter().map(addr).collect()))
                .collect();
            plan.call(
                format!("Claim {} for vest #{}", label, nft_id),
                ContractCall::new(
                    voter,
                    function,
                    vec![
                        Value::Array(contracts),
                        Value::Array(tokens),
                        json!(nft_id.to_string()),
                    ],
                ),
            );
        }

        for reward in rewards.gauges.iter().filter(|g| g.amount > Decimal::ZERO) {
            let tokens: Vec<Value> = reward.tokens.iter().map(|t| addr(&t.address)).collect();
            plan.call(
                format!("Claim {} rewards", reward.pair_symbol),
                ContractCall::new(
                    &reward.gauge,
                    "getReward(address,address[])",
                    vec![addr(ctx.account), Value::Array(tokens)],
                ),
            );
        }

        for reward in rewards
            .distributions
            .iter()
            .filter(|d| d.amount > Decimal::ZERO)
        {
            plan.call(
                format!("Claim rebase for vest #{}", reward.nft_id),
                ContractCall::new(
                    &ctx.config.contracts.ve_distributor,
                    "claim(uint256)",
                    vec![json!(reward.nft_id.to_string())],
                ),
            );
        }

        Ok(plan.into_steps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::fixtures::*;
    use crate::models::{BribeReward, DistributionReward, GaugeReward};
    use crate::orchestrator::{Resolvable, StepAction};

    fn bribe(kind: BribeKind, contract: u8, nft_id: u64, token_n: u8, amount: &str) -> BribeReward {
        BribeReward {
            kind,
            contract: address(contract),
            nft_id,
            token: token(token_n, "TKN", 18),
            amount: dec(amount),
        }
    }

    #[tokio::test]
    async fn test_nothing_to_claim() {
        let reader = FakeReader::default();
        *reader.rewards.lock().unwrap() = RewardsSnapshot {
            distributions: vec![DistributionReward {
                nft_id: 1,
                amount: Decimal::ZERO,
            }],
            ..Default::default()
        };
        let config = config();
        let ctx = PlanContext {
            reader: &reader,
            account: &account(),
            config: &config,
        };
        assert!(matches!(
            ClaimAll.plan(&ctx).await.unwrap_err(),
            Error::NothingToDo { .. }
        ));
    }

    #[tokio::test]
    async fn test_claim_batches_bribes_per_kind_and_nft() {
        let reader = FakeReader::default();
        *reader.rewards.lock().unwrap() = RewardsSnapshot {
            bribes: vec![
                bribe(BribeKind::Fee, 20, 1, 3, "1"),
                bribe(BribeKind::Fee, 20, 1, 4, "2"),
                bribe(BribeKind::Fee, 21, 1, 3, "1"),
                bribe(BribeKind::Bribe, 30, 1, 5, "1"),
                bribe(BribeKind::Bribe, 31, 2, 5, "0"),
            ],
            gauges: vec![
                GaugeReward {
                    gauge: address(60),
                    pair_symbol: "vAMM-AAA/BBB".into(),
                    tokens: vec![token(9, "VELO", 18)],
                    amount: dec("4"),
                },
                GaugeReward {
                    gauge: address(61),
                    pair_symbol: "sAMM-CCC/DDD".into(),
                    tokens: vec![token(9, "VELO", 18)],
                    amount: Decimal::ZERO,
                },
            ],
            distributions: vec![DistributionReward {
                nft_id: 1,
                amount: dec("0.1"),
            }],
        };
        let config = config();
        let ctx = PlanContext {
            reader: &reader,
            account: &account(),
            config: &config,
        };
        let steps = ClaimAll.plan(&ctx).await.unwrap();
        let descriptions: Vec<_> = steps.iter().map(|s| s.step.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec![
                "Claim fees for vest #1",
                "Claim bribes for vest #1",
                "Claim vAMM-AAA/BBB rewards",
                "Claim rebase for vest #1",
            ]
        );
        let StepAction::Call(Resolvable::Ready(fees)) = &steps[0].action else {
            panic!("expected a ready call");
        };
        assert_eq!(fees.args[0], json!([address(20), address(21)]));
        assert_eq!(fees.args[1], json!([[address(3), address(4)], [address(3)]]));
    }
}
