//! Step plans: what each planned step will do once the runner reaches it.

use alloy_primitives::U256;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::chain::{ChainReader, ContractCall};
use crate::config::Config;
use crate::error::Result;
use crate::models::{Address, StepId, Token, TransactionStep};

/// Reads available to a step while it is being resolved.
pub struct ResolveContext<'a> {
    pub reader: &'a dyn ChainReader,
    pub account: &'a Address,
    pub config: &'a Config,
}

/// Produces a step's concrete input once its predecessors have confirmed.
/// `None` means the step has nothing left to do and is marked done.
#[async_trait]
pub trait Resolve<T>: Send + Sync {
    async fn resolve(&self, ctx: &ResolveContext<'_>) -> Result<Option<T>>;
}

pub enum Resolvable<T> {
    Ready(T),
    Deferred(Arc<dyn Resolve<T>>),
}

impl<T: Clone + Send + Sync> Resolvable<T> {
    pub async fn resolve(&self, ctx: &ResolveContext<'_>) -> Result<Option<T>> {
        match self {
            Resolvable::Ready(value) => Ok(Some(value.clone())),
            Resolvable::Deferred(resolver) => resolver.resolve(ctx).await,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Resolvable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolvable::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Resolvable::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// Spend the approval step must cover.
#[derive(Debug, Clone, PartialEq)]
pub struct Allowance {
    pub token: Token,
    pub spender: Address,
    /// Shown to the user, e.g. "router" or "gauge".
    pub spender_label: String,
    /// Raw units of `token`.
    pub amount: U256,
}

impl Allowance {
    pub fn new(token: &Token, spender: &Address, spender_label: &str, amount: U256) -> Self {
        Self {
            token: token.clone(),
            spender: spender.clone(),
            spender_label: spender_label.to_string(),
            amount,
        }
    }
}

#[derive(Debug)]
pub enum StepAction {
    /// Approve only when the fresh allowance is below the amount.
    EnsureAllowance(Resolvable<Allowance>),
    Call(Resolvable<ContractCall>),
}

#[derive(Debug)]
pub struct PlannedStep {
    pub step: TransactionStep,
    pub action: StepAction,
}

impl PlannedStep {
    pub fn id(&self) -> StepId {
        self.step.id
    }

    pub fn allowance(symbol: &str, allowance: Allowance) -> Self {
        Self::allowance_with(symbol, Resolvable::Ready(allowance))
    }

    pub fn allowance_with(symbol: &str, allowance: Resolvable<Allowance>) -> Self {
        Self {
            step: TransactionStep::new(format!("Checking your {} allowance", symbol)),
            action: StepAction::EnsureAllowance(allowance),
        }
    }

    pub fn call(description: impl Into<String>, call: ContractCall) -> Self {
        Self::call_with(description, Resolvable::Ready(call))
    }

    pub fn call_with(description: impl Into<String>, call: Resolvable<ContractCall>) -> Self {
        Self {
            step: TransactionStep::new(description),
            action: StepAction::Call(call),
        }
    }

    pub fn deferred<R>(description: impl Into<String>, resolver: R) -> Self
    where
        R: Resolve<ContractCall> + 'static,
    {
        Self::call_with(description, Resolvable::Deferred(Arc::new(resolver)))
    }

    pub fn is_allowance(&self) -> bool {
        matches!(self.action, StepAction::EnsureAllowance(_))
    }
}

/// Plan builder that keeps the approval step ahead of the call it enables.
#[derive(Debug, Default)]
pub struct Plan {
    steps: Vec<PlannedStep>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: PlannedStep) -> &mut Self {
        self.steps.push(step);
        self
    }

    /// Add an approval step unless the token is native.
    pub fn approve(&mut self, allowance: Allowance) -> &mut Self {
        if allowance.token.needs_approval() {
            let symbol = allowance.token.symbol.clone();
            self.steps.push(PlannedStep::allowance(&symbol, allowance));
        }
        self
    }

    pub fn call(&mut self, description: impl Into<String>, call: ContractCall) -> &mut Self {
        self.steps.push(PlannedStep::call(description, call));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_steps(self) -> Vec<PlannedStep> {
        self.steps
    }
}
