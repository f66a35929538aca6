use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{addr, raw, require_amount, slippage};
use crate::chain::ContractCall;
use crate::error::{Error, Result};
use crate::models::{Address, Token};
use crate::orchestrator::{Action, Allowance, DataKey, Plan, PlanContext, PlannedStep};
use crate::utils::{apply_slippage, deadline, floor_raw_units, format_units};

/// One hop of a router path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub from: Address,
    pub to: Address,
    pub stable: bool,
}

/// Swap an exact input amount along a quoted route.
///
/// Native ⇄ wrapped-native pairs are handled as a wrap/unwrap on the wrapped
/// token contract instead of a router swap.
#[derive(Debug, Clone)]
pub struct Swap {
    pub from: Token,
    pub to: Token,
    /// User input, in whole `from` units.
    pub amount_in: String,
    /// Quoted output, in whole `to` units.
    pub quoted_out: Decimal,
    pub routes: Vec<Route>,
    pub slippage: Option<Decimal>,
}

impl Swap {
    fn is_wrap(&self) -> bool {
        self.from.is_native() && !self.to.is_native() && self.from.address == self.to.address
    }

    fn is_unwrap(&self) -> bool {
        self.to.is_native() && !self.from.is_native() && self.from.address == self.to.address
    }

    fn routes_json(&self) -> Value {
        Value::Array(
            self.routes
                .iter()
                .map(|r| json!([r.from, r.to, r.stable]))
                .collect(),
        )
    }
}

#[async_trait]
impl Action for Swap {
    fn title(&self) -> String {
        if self.is_wrap() {
            format!("Wrap {}", self.from.symbol)
        } else if self.is_unwrap() {
            format!("Unwrap {}", self.from.symbol)
        } else {
            format!("Swap {} for {}", self.from.symbol, self.to.symbol)
        }
    }

    fn purpose(&self) -> String {
        format!(
            "Trade {} {} for at least the quoted amount of {}",
            self.amount_in.trim(),
            self.from.symbol,
            self.to.symbol
        )
    }

    fn invalidates(&self) -> Vec<DataKey> {
        vec![DataKey::Balances, DataKey::Allowances, DataKey::Pairs]
    }

    async fn plan(&self, ctx: &PlanContext<'_>) -> Result<Vec<PlannedStep>> {
        let amount = require_amount(ctx, &self.amount_in, &self.from).await?;
        let shown = format_units(amount, self.from.decimals);
        let mut plan = Plan::new();

        if self.is_wrap() {
            plan.call(
                format!("Wrap {} {}", shown, self.from.symbol),
                ContractCall::new(&self.to.address, "deposit()", vec![])
                    .with_value(amount.to_string()),
            );
            return Ok(plan.into_steps());
        }
        if self.is_unwrap() {
            plan.call(
                format!("Unwrap {} {}", shown, self.from.symbol),
                ContractCall::new(&self.from.address, "withdraw(uint256)", vec![raw(amount)]),
            );
            return Ok(plan.into_steps());
        }

        if self.from.address == self.to.address {
            return Err(Error::invalid_amount("cannot swap a token for itself"));
        }
        let (first, last) = match (self.routes.first(), self.routes.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(Error::missing(
                    "route",
                    format!("{} -> {}", self.from.symbol, self.to.symbol),
                ))
            }
        };
        if first.from != self.from.address || last.to != self.to.address {
            return Err(Error::missing(
                "route",
                format!("{} -> {}", self.from.symbol, self.to.symbol),
            ));
        }
        if self.quoted_out <= Decimal::ZERO {
            return Err(Error::invalid_amount(format!(
                "no liquidity to swap {} for {}",
                self.from.symbol, self.to.symbol
            )));
        }

        let slippage = slippage(ctx, self.slippage)?;
        let quoted = floor_raw_units(self.quoted_out, self.to.decimals)?;
        let min_out = apply_slippage(quoted, slippage)?;
        let router = &ctx.config.contracts.router;
        let deadline = json!(deadline(ctx.config.trading.deadline_minutes).to_string());
        let description = format!(
            "Swap {} {} for {}",
            shown, self.from.symbol, self.to.symbol
        );

        let call = if self.from.is_native() {
            ContractCall::new(
                router,
                "swapExactETHForTokens(uint256,(address,address,bool)[],address,uint256)",
                vec![raw(min_out), self.routes_json(), addr(ctx.account), deadline],
            )
            .with_value(amount.to_string())
        } else {
            let function = if self.to.is_native() {
                "swapExactTokensForETH(uint256,uint256,(address,address,bool)[],address,uint256)"
            } else {
                "swapExactTokensForTokens(uint256,uint256,(address,address,bool)[],address,uint256)"
            };
            ContractCall::new(
                router,
                function,
                vec![
                    raw(amount),
                    raw(min_out),
                    self.routes_json(),
                    addr(ctx.account),
                    deadline,
                ],
            )
        };

        plan.approve(Allowance::new(&self.from, router, "router", amount))
            .call(description, call);
        Ok(plan.into_steps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::fixtures::*;
    use crate::orchestrator::StepAction;

    fn swap(from: &Token, to: &Token, amount: &str) -> Swap {
        Swap {
            from: from.clone(),
            to: to.clone(),
            amount_in: amount.to_string(),
            quoted_out: dec("20"),
            routes: vec![Route {
                from: from.address.clone(),
                to: to.address.clone(),
                stable: false,
            }],
            slippage: None,
        }
    }

    #[tokio::test]
    async fn test_erc20_swap_plans_approval_then_swap() {
        let usdc = token(1, "USDC", 6);
        let velo = token(2, "VELO", 18);
        let reader = FakeReader::default().with_balance(&usdc, "100");
        let config = config();
        let ctx = PlanContext {
            reader: &reader,
            account: &account(),
            config: &config,
        };
        let steps = swap(&usdc, &velo, "10").plan(&ctx).await.unwrap();
        assert_eq!(steps.len(), 2);
        assert!(steps[0].is_allowance());
        let StepAction::Call(crate::orchestrator::Resolvable::Ready(call)) = &steps[1].action else {
            panic!("expected a ready call");
        };
        assert_eq!(call.method(), "swapExactTokensForTokens");
        assert_eq!(call.args[0], json!("10000000"));
        // 20 * (1 - 0.005)
        assert_eq!(call.args[1], json!("19900000000000000000"));
    }

    #[tokio::test]
    async fn test_swap_amount_beyond_decimal_range() {
        let shib = token(3, "SHIB", 18);
        let usdc = token(1, "USDC", 6);
        let reader = FakeReader::default().with_balance(&shib, "500000000000");
        let config = config();
        let ctx = PlanContext {
            reader: &reader,
            account: &account(),
            config: &config,
        };
        let steps = swap(&shib, &usdc, "100000000000").plan(&ctx).await.unwrap();
        assert_eq!(steps[1].step.description, "Swap 100000000000 SHIB for USDC");
        let StepAction::Call(crate::orchestrator::Resolvable::Ready(call)) = &steps[1].action else {
            panic!("expected a ready call");
        };
        assert_eq!(call.args[0], json!("100000000000000000000000000000"));
        // 20 * (1 - 0.005) at 6 decimals
        assert_eq!(call.args[1], json!("19900000"));
    }

    #[tokio::test]
    async fn test_native_swap_has_no_approval() {
        let eth = Token::native(address(9), "ETH");
        let velo = token(2, "VELO", 18);
        let reader = FakeReader::default().with_balance(&eth, "1");
        let config = config();
        let ctx = PlanContext {
            reader: &reader,
            account: &account(),
            config: &config,
        };
        let steps = swap(&eth, &velo, "0.5").plan(&ctx).await.unwrap();
        assert_eq!(steps.len(), 1);
        let StepAction::Call(crate::orchestrator::Resolvable::Ready(call)) = &steps[0].action else {
            panic!("expected a ready call");
        };
        assert_eq!(call.value.as_deref(), Some("500000000000000000"));
    }

    #[tokio::test]
    async fn test_wrap_is_a_single_deposit() {
        let weth = token(9, "WETH", 18);
        let eth = Token::native(address(9), "ETH");
        let reader = FakeReader::default().with_balance(&eth, "2");
        let config = config();
        let ctx = PlanContext {
            reader: &reader,
            account: &account(),
            config: &config,
        };
        let action = swap(&eth, &weth, "1");
        assert_eq!(action.title(), "Wrap ETH");
        let steps = action.plan(&ctx).await.unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].step.description, "Wrap 1 ETH");
    }

    #[tokio::test]
    async fn test_swap_validation_errors() {
        let usdc = token(1, "USDC", 6);
        let velo = token(2, "VELO", 18);
        let reader = FakeReader::default().with_balance(&usdc, "5");
        let config = config();
        let ctx = PlanContext {
            reader: &reader,
            account: &account(),
            config: &config,
        };
        let err = swap(&usdc, &velo, "10").plan(&ctx).await.unwrap_err();
        assert!(matches!(err, Error::InvalidAmount { .. }));

        let mut no_route = swap(&usdc, &velo, "1");
        no_route.routes.clear();
        let err = no_route.plan(&ctx).await.unwrap_err();
        assert!(matches!(err, Error::MissingEntity { kind: "route", .. }));

        let mut dry = swap(&usdc, &velo, "1");
        dry.quoted_out = Decimal::ZERO;
        assert!(matches!(
            dry.plan(&ctx).await.unwrap_err(),
            Error::InvalidAmount { .. }
        ));
    }
}
