//! Configuration: backing API endpoints, contract addresses and trading
//! defaults.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::Address;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub network: NetworkConfig,
    pub contracts: ContractsConfig,
    pub trading: TradingConfig,
    pub write: WriteConfig,
    /// Where client settings (custom tokens, filters) are persisted.
    pub settings_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Pair/price aggregation API.
    pub pairs_api: String,
    /// Swap routing/quoting API.
    pub router_api: String,
    /// Domain resolution API.
    pub domain_api: String,
    pub http_timeout_secs: u64,
    pub http_retries: u32,
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsConfig {
    pub router: Address,
    pub factory: Address,
    pub voter: Address,
    pub vote_escrow: Address,
    pub ve_distributor: Address,
    pub minter: Address,
    pub option_token: Address,
    pub wrapped_native: Address,
    /// Governance token locked into vote-escrow positions.
    pub governance_token: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Default slippage as a fraction (0.005 = 0.5%).
    pub default_slippage: Decimal,
    pub deadline_minutes: u64,
    /// Longest allowed vest lock, in seconds.
    pub max_lock_duration_secs: u64,
    pub native_symbol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteConfig {
    /// Approve the maximum uint256 instead of the exact spend.
    pub unlimited_approvals: bool,
    /// Treat the provider's "unsupported method" error as a silent no-op.
    pub ignore_unsupported_method: bool,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(config::ConfigError::Message(e.to_string())))?;

        config.validate()?;
        Ok(config)
    }

    /// Layered load: built-in defaults, `config/default`, `config/{DEXTER_ENV}`,
    /// `config/local`, then `DEXTER__SECTION__KEY` environment variables.
    pub fn load() -> Result<Self> {
        let defaults = config::Config::try_from(&Config::default())?;
        let mut settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("config/default").required(false));

        if let Ok(env) = std::env::var("DEXTER_ENV") {
            settings = settings
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        settings = settings
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("DEXTER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Config = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Error::Config(config::ConfigError::Message(msg.to_string()));

        if self.trading.default_slippage <= Decimal::ZERO
            || self.trading.default_slippage > Decimal::new(5, 1)
        {
            return Err(invalid("Default slippage must be in (0, 0.5]"));
        }
        if self.trading.deadline_minutes == 0 {
            return Err(invalid("Deadline must be at least one minute"));
        }
        if self.trading.max_lock_duration_secs == 0 {
            return Err(invalid("Maximum lock duration must be positive"));
        }
        for (name, url) in [
            ("pairs_api", &self.network.pairs_api),
            ("router_api", &self.network.router_api),
            ("domain_api", &self.network.domain_api),
        ] {
            if url.trim().is_empty() {
                return Err(invalid(&format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }
}

impl NetworkConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        let addr = |s: &str| Address::parse(s).unwrap_or_else(|_| Address::zero());
        Self {
            network: NetworkConfig {
                pairs_api: "https://api.dexter.fi/api/v1".to_string(),
                router_api: "https://router.dexter.fi".to_string(),
                domain_api: "https://names.dexter.fi".to_string(),
                http_timeout_secs: 30,
                http_retries: 3,
                retry_base_delay_ms: 500,
            },
            contracts: ContractsConfig {
                router: addr("0xa062ae8a9c5e11aaa026fc2670b0d65ccc8b2858"),
                factory: addr("0xf1046053aa5682b4f9a81b5481394da16be5ff5a"),
                voter: addr("0x41c914ee0c7e1a5edcd0295623e6dc557b5abf3c"),
                vote_escrow: addr("0xfaf8fd17d9840595845582fcb047df13f006787d"),
                ve_distributor: addr("0x9d4736ec60715e71afe72973f7885dcbc21ea99b"),
                minter: addr("0x6dc9e1c04eab2a8fbc4e7c2a6d5b6f8c77a0b0e2"),
                option_token: addr("0x1f514a61bcde34f94bc39731235690ab9da737f7"),
                wrapped_native: addr("0x4200000000000000000000000000000000000006"),
                governance_token: addr("0x9560e827af36c94d2ac33a39bce1fe78631088db"),
            },
            trading: TradingConfig {
                default_slippage: Decimal::new(5, 3),
                deadline_minutes: 30,
                max_lock_duration_secs: 4 * 365 * 24 * 60 * 60,
                native_symbol: "ETH".to_string(),
            },
            write: WriteConfig {
                unlimited_approvals: false,
                ignore_unsupported_method: true,
            },
            settings_path: "dexter_settings.json".to_string(),
        }
    }
}
