//! HTTP client for the backing pair, quote and name-resolution APIs.

use anyhow::anyhow;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::actions::Route;
use crate::config::NetworkConfig;
use crate::error::Result;
use crate::models::{Address, Pair};
use crate::utils::remove_trailing_slash;

/// A pair as listed by the pairs API, with its liquidity figures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PairListing {
    #[serde(flatten)]
    pub pair: Pair,
    /// Total value locked, in USD.
    #[serde(default)]
    pub tvl: Decimal,
    /// Total bribe value for the current epoch, in USD.
    #[serde(default)]
    pub tbv: Decimal,
    #[serde(default)]
    pub apr: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PairsResponse {
    pub data: Vec<PairListing>,
    /// USD price per token address.
    #[serde(default)]
    pub prices: HashMap<Address, Decimal>,
}

impl PairsResponse {
    pub fn price(&self, token: &Address) -> Option<Decimal> {
        self.prices.get(token).copied()
    }
}

/// Best route found by the router API for an exact-in swap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub amount_out: Decimal,
    pub routes: Vec<Route>,
    #[serde(default)]
    pub price_impact: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct ResolveResponse {
    address: Option<Address>,
}

pub struct DexterApi {
    pairs_url: String,
    router_url: String,
    domain_url: String,
    retries: u32,
    retry_base_delay_ms: u64,
    client: reqwest::Client,
}

impl DexterApi {
    pub fn new(network: &NetworkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(network.http_timeout())
            .build()?;
        Ok(Self::with_client(network, client))
    }

    pub fn with_client(network: &NetworkConfig, client: reqwest::Client) -> Self {
        Self {
            pairs_url: remove_trailing_slash(&network.pairs_api),
            router_url: remove_trailing_slash(&network.router_api),
            domain_url: remove_trailing_slash(&network.domain_api),
            retries: network.http_retries,
            retry_base_delay_ms: network.retry_base_delay_ms,
            client,
        }
    }

    fn build_pairs_url(&self) -> String {
        format!("{}/pairs", self.pairs_url)
    }

    fn build_quote_url(&self, from: &Address, to: &Address, amount: &str) -> String {
        format!(
            "{}/quote?from={}&to={}&amount={}",
            self.router_url, from, to, amount
        )
    }

    fn build_resolve_url(&self, name: &str) -> String {
        format!("{}/resolve/{}", self.domain_url, name.trim().to_lowercase())
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> anyhow::Result<T> {
        debug!("[api] GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(anyhow!("rate_limited"));
        }
        if !status.is_success() {
            return Err(anyhow!("{} returned {}", url, status));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// All listed pairs with token prices, TVL and TBV.
    pub async fn pairs(&self) -> Result<PairsResponse> {
        let url = self.build_pairs_url();
        let pairs = crate::utils::retry(self.retries, self.retry_base_delay_ms, || {
            self.fetch_json::<PairsResponse>(&url)
        })
        .await?;
        Ok(pairs)
    }

    /// Quote an exact-in swap. `amount` is in raw units of `from`.
    pub async fn quote(&self, from: &Address, to: &Address, amount: &str) -> Result<Quote> {
        let url = self.build_quote_url(from, to, amount);
        let quote = crate::utils::retry(self.retries, self.retry_base_delay_ms, || {
            self.fetch_json::<Quote>(&url)
        })
        .await?;
        Ok(quote)
    }

    /// Resolve a human-readable name (e.g. `alice.eth`) to an address.
    pub async fn resolve(&self, name: &str) -> Result<Option<Address>> {
        let url = self.build_resolve_url(name);
        let resolved = crate::utils::retry(self.retries, self.retry_base_delay_ms, || {
            self.fetch_json::<ResolveResponse>(&url)
        })
        .await?;
        Ok(resolved.address)
    }
}
