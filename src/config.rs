//! Configuration management for the swap SDK and the maker daemon
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub cnd: CndConfig,
    #[serde(default)]
    pub swap: SwapConfig,
    pub maker: Option<MakerConfig>,
    #[serde(default)]
    pub ledgers: LedgersConfig,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CndConfig {
    pub url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

/// Bounds for swap action discovery
#[derive(Debug, Clone, Deserialize)]
pub struct SwapConfig {
    pub poll_interval_ms: u64,
    pub action_timeout_secs: u64,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            action_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MakerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_alpha_expiry_secs")]
    pub alpha_expiry_secs: u64,
    #[serde(default = "default_beta_expiry_secs")]
    pub beta_expiry_secs: u64,
    #[serde(default = "default_accept_timeout_secs")]
    pub accept_timeout_secs: u64,
    #[serde(default = "default_accept_interval_ms")]
    pub accept_interval_ms: u64,
    #[serde(default = "default_take_retention_secs")]
    pub take_retention_secs: u64,
    #[serde(default)]
    pub orders: Vec<OrderConfig>,
}

/// An order the maker daemon publishes at startup
#[derive(Debug, Clone, Deserialize)]
pub struct OrderConfig {
    pub valid_for_secs: u64,
    pub bid: OrderAssetConfig,
    pub ask: OrderAssetConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderAssetConfig {
    pub ledger: String,
    pub asset: String,
    pub nominal_amount: String,
}

/// Network of each ledger this client trades on
#[derive(Debug, Clone, Deserialize)]
pub struct LedgersConfig {
    pub bitcoin_network: Option<String>,
    pub ethereum_chain_id: Option<u64>,
    pub lightning_network: Option<String>,
}

impl Default for LedgersConfig {
    fn default() -> Self {
        Self {
            bitcoin_network: Some("regtest".to_string()),
            ethereum_chain_id: Some(17),
            lightning_network: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub contract: String,
    pub decimals: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_alpha_expiry_secs() -> u64 {
    24 * 60 * 60
}

fn default_beta_expiry_secs() -> u64 {
    12 * 60 * 60
}

fn default_accept_timeout_secs() -> u64 {
    60
}

fn default_accept_interval_ms() -> u64 {
    1_000
}

fn default_take_retention_secs() -> u64 {
    60 * 60
}

impl Settings {
    /// Load settings from the configured file
    pub fn load() -> Result<Self> {
        let config_path = env::var("SWAP_SDK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::parse(&config_str)
    }

    /// Parse settings from TOML text
    pub fn parse(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.cnd.url.is_empty() {
            anyhow::bail!("cnd.url must be set");
        }

        if self.swap.poll_interval_ms == 0 {
            anyhow::bail!("swap.poll_interval_ms must be greater than zero");
        }

        if let Some(maker) = &self.maker {
            if maker.beta_expiry_secs >= maker.alpha_expiry_secs {
                anyhow::bail!(
                    "maker.beta_expiry_secs ({}) must be below maker.alpha_expiry_secs ({})",
                    maker.beta_expiry_secs,
                    maker.alpha_expiry_secs
                );
            }
            if maker.accept_interval_ms == 0 {
                anyhow::bail!("maker.accept_interval_ms must be greater than zero");
            }
            if maker.orders.is_empty() {
                tracing::warn!("Maker configured without orders - nothing will be published");
            }
        }

        let mut seen = HashSet::new();
        for token in &self.tokens {
            if !seen.insert(token.symbol.to_lowercase()) {
                anyhow::bail!("Token {} configured more than once", token.symbol);
            }
        }

        Ok(())
    }

    /// Action discovery bounds derived from the swap section
    pub fn try_params(&self) -> crate::swap::TryParams {
        crate::swap::TryParams {
            max_timeout: Duration::from_secs(self.swap.action_timeout_secs),
            try_interval: Duration::from_millis(self.swap.poll_interval_ms),
        }
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    lazy_static::lazy_static! {
        static ref ENV_VAR: regex::Regex =
            regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var pattern");
    }

    let mut result = input.to_string();
    for cap in ENV_VAR.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
