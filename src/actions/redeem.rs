use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{addr, raw, require_amount};
use crate::chain::ContractCall;
use crate::error::{Error, Result};
use crate::models::Token;
use crate::orchestrator::{Action, Allowance, DataKey, Plan, PlanContext, PlannedStep};
use crate::utils::{check_amount, deadline, ensure_balance, format_units, to_raw_units};

/// What the exercised option turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedeemMode {
    /// Liquid governance tokens, paid for in full.
    Liquid,
    /// A new max-length vest, at a discount.
    Vest,
}

/// Exercise option tokens by paying the strike in `payment`.
#[derive(Debug, Clone)]
pub struct RedeemOption {
    pub option: Token,
    pub amount: String,
    pub payment: Token,
    /// Upper bound on the payment, in whole `payment` units.
    pub max_payment: Decimal,
    pub mode: RedeemMode,
}

#[async_trait]
impl Action for RedeemOption {
    fn title(&self) -> String {
        format!("Redeem {}", self.option.symbol)
    }

    fn purpose(&self) -> String {
        match self.mode {
            RedeemMode::Liquid => format!(
                "Pay {} to convert {} {} into liquid tokens",
                self.payment.symbol,
                self.amount.trim(),
                self.option.symbol
            ),
            RedeemMode::Vest => format!(
                "Pay {} to convert {} {} into a vest",
                self.payment.symbol,
                self.amount.trim(),
                self.option.symbol
            ),
        }
    }

    fn invalidates(&self) -> Vec<DataKey> {
        let mut keys = vec![DataKey::Balances, DataKey::Allowances];
        if self.mode == RedeemMode::Vest {
            keys.push(DataKey::VestPositions);
        }
        keys
    }

    async fn plan(&self, ctx: &PlanContext<'_>) -> Result<Vec<PlannedStep>> {
        let option_token = &ctx.config.contracts.option_token;
        if &self.option.address != option_token {
            return Err(Error::missing("option token", &self.option.address));
        }
        let amount = require_amount(ctx, &self.amount, &self.option).await?;
        check_amount(self.max_payment, &self.payment)?;
        let max_payment = to_raw_units(self.max_payment, self.payment.decimals)?;
        let balance = ctx.reader.balance(&self.payment, ctx.account).await?;
        ensure_balance(max_payment, balance, &self.payment)?;

        let function = match self.mode {
            RedeemMode::Liquid => "exercise(uint256,uint256,address,uint256)",
            RedeemMode::Vest => "exerciseVe(uint256,uint256,address,uint256)",
        };
        let shown = format_units(amount, self.option.decimals);
        let description = match self.mode {
            RedeemMode::Liquid => format!("Redeem {} {}", shown, self.option.symbol),
            RedeemMode::Vest => format!("Redeem {} {} as a vest", shown, self.option.symbol),
        };

        let mut plan = Plan::new();
        plan.approve(Allowance::new(
            &self.payment,
            option_token,
            "option contract",
            max_payment,
        ))
        .call(
            description,
            ContractCall::new(
                option_token,
                function,
                vec![
                    raw(amount),
                    raw(max_payment),
                    addr(ctx.account),
                    serde_json::json!(deadline(ctx.config.trading.deadline_minutes).to_string()),
                ],
            ),
        );
        Ok(plan.into_steps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::fixtures::*;
    use crate::orchestrator::{Resolvable, StepAction};

    fn redeem(config: &crate::config::Config, mode: RedeemMode) -> RedeemOption {
        RedeemOption {
            option: Token::new(config.contracts.option_token.clone(), "oVELO", 18),
            amount: "10".into(),
            payment: token(4, "USDC", 6),
            max_payment: dec("3.5"),
            mode,
        }
    }

    #[tokio::test]
    async fn test_redeem_vest_uses_exercise_ve() {
        let config = config();
        let action = redeem(&config, RedeemMode::Vest);
        let reader = FakeReader::default()
            .with_balance(&action.option, "10")
            .with_balance(&action.payment, "5");
        let ctx = PlanContext {
            reader: &reader,
            account: &account(),
            config: &config,
        };
        let steps = action.plan(&ctx).await.unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step.description, "Checking your USDC allowance");
        let StepAction::Call(Resolvable::Ready(call)) = &steps[1].action else {
            panic!("expected a ready call");
        };
        assert_eq!(call.method(), "exerciseVe");
        assert_eq!(call.args[1], serde_json::json!("3500000"));
        assert!(action.invalidates().contains(&DataKey::VestPositions));
    }

    #[tokio::test]
    async fn test_redeem_checks_payment_balance() {
        let config = config();
        let action = redeem(&config, RedeemMode::Liquid);
        let reader = FakeReader::default()
            .with_balance(&action.option, "10")
            .with_balance(&action.payment, "1");
        let ctx = PlanContext {
            reader: &reader,
            account: &account(),
            config: &config,
        };
        assert!(matches!(
            action.plan(&ctx).await.unwrap_err(),
            Error::InvalidAmount { .. }
        ));
    }

    #[tokio::test]
    async fn test_redeem_rejects_unknown_option() {
        let config = config();
        let mut action = redeem(&config, RedeemMode::Liquid);
        action.option = token(8, "oFAKE", 18);
        let reader = FakeReader::default();
        let ctx = PlanContext {
            reader: &reader,
            account: &account(),
            config: &config,
        };
        assert!(matches!(
            action.plan(&ctx).await.unwrap_err(),
            Error::MissingEntity { .. }
        ));
    }
}
