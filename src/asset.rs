//! Asset resolution and nominal/base-unit conversion
//!
//! Nominal amounts are the human readable decimals found in orders ("1.5"),
//! base units are the integer quantities the ledgers work with (satoshi, wei,
//! token units).

use crate::config::TokenConfig;
use crate::error::{SdkError, SdkResult};

use ethers::types::U256;
use ethers::utils::{format_units, parse_units, ParseUnits};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const BITCOIN_DECIMALS: u32 = 8;
pub const ETHER_DECIMALS: u32 = 18;

/// ERC-20 token known to this client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub symbol: String,
    pub contract: String,
    pub decimals: u32,
}

/// An asset as far as conversion and swap construction are concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    Bitcoin,
    Ether,
    Erc20(Token),
}

impl Asset {
    pub fn decimals(&self) -> u32 {
        match self {
            Asset::Bitcoin => BITCOIN_DECIMALS,
            Asset::Ether => ETHER_DECIMALS,
            Asset::Erc20(token) => token.decimals,
        }
    }

    /// Asset name as used by the swap daemon
    pub fn swap_name(&self) -> &'static str {
        match self {
            Asset::Bitcoin => "bitcoin",
            Asset::Ether => "ether",
            Asset::Erc20(_) => "erc20",
        }
    }

    pub fn token_contract(&self) -> Option<&str> {
        match self {
            Asset::Erc20(token) => Some(&token.contract),
            _ => None,
        }
    }

    pub fn to_base_units(&self, nominal: &str) -> SdkResult<U256> {
        to_base_units(nominal, self.decimals())
    }

    pub fn to_nominal(&self, base: U256) -> SdkResult<String> {
        to_nominal(base, self.decimals())
    }
}

/// Resolves `(ledger, asset)` names from orders to concrete assets
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: HashMap<String, Token>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(tokens: &[TokenConfig]) -> Self {
        let mut registry = Self::new();
        for token in tokens {
            registry.register(Token {
                symbol: token.symbol.clone(),
                contract: token.contract.clone(),
                decimals: token.decimals,
            });
        }
        registry
    }

    pub fn register(&mut self, token: Token) {
        self.tokens.insert(token.symbol.to_lowercase(), token);
    }

    pub fn token(&self, symbol: &str) -> Option<&Token> {
        self.tokens.get(&symbol.to_lowercase())
    }

    /// Resolve an order-level asset; `None` when this client cannot trade it
    pub fn resolve(&self, ledger: &str, asset: &str) -> Option<Asset> {
        match (ledger.to_lowercase().as_str(), asset.to_lowercase().as_str()) {
            ("bitcoin", "bitcoin") | ("lightning", "bitcoin") => Some(Asset::Bitcoin),
            ("ethereum", "ether") => Some(Asset::Ether),
            ("ethereum", symbol) => self.token(symbol).cloned().map(Asset::Erc20),
            _ => None,
        }
    }
}

/// Parse a nominal amount as a plain number, rejecting NaN
pub fn parse_nominal(nominal: &str) -> Option<f64> {
    nominal
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| !n.is_nan())
}

/// Convert a nominal decimal amount into base units
pub fn to_base_units(nominal: &str, decimals: u32) -> SdkResult<U256> {
    let nominal = nominal.trim();
    validate_decimal(nominal, decimals)?;

    match parse_units(nominal, decimals)
        .map_err(|e| SdkError::Conversion(format!("{}: {}", nominal, e)))?
    {
        ParseUnits::U256(value) => Ok(value),
        ParseUnits::I256(_) => Err(SdkError::Conversion(format!(
            "negative amount {}",
            nominal
        ))),
    }
}

/// Convert base units into a nominal decimal string without trailing zeros
pub fn to_nominal(base: U256, decimals: u32) -> SdkResult<String> {
    let formatted =
        format_units(base, decimals).map_err(|e| SdkError::Conversion(e.to_string()))?;

    if formatted.contains('.') {
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        Ok(trimmed.to_string())
    } else {
        Ok(formatted)
    }
}

/// Convert a nominal bitcoin amount into satoshi
pub fn to_satoshis(nominal: &str) -> SdkResult<u64> {
    let sats = to_base_units(nominal, BITCOIN_DECIMALS)?;
    u256_to_u64(sats)
}

/// Parse an integer satoshi count as found in ledger action payloads
pub fn parse_satoshis(amount: &str) -> SdkResult<u64> {
    amount
        .trim()
        .parse::<u64>()
        .map_err(|e| SdkError::Conversion(format!("invalid satoshi amount {}: {}", amount, e)))
}

/// Parse an arbitrary-precision integer wei amount
pub fn parse_wei(amount: &str) -> SdkResult<U256> {
    let amount = amount.trim();
    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SdkError::Conversion(format!("invalid wei amount {}", amount)));
    }
    U256::from_dec_str(amount)
        .map_err(|e| SdkError::Conversion(format!("invalid wei amount {}: {}", amount, e)))
}

fn u256_to_u64(value: U256) -> SdkResult<u64> {
    if value > U256::from(u64::MAX) {
        return Err(SdkError::Conversion(format!("{} does not fit in u64", value)));
    }
    Ok(value.as_u64())
}

fn validate_decimal(nominal: &str, decimals: u32) -> SdkResult<()> {
    let (int, frac) = nominal.split_once('.').unwrap_or((nominal, ""));

    let well_formed = !int.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit());
    if !well_formed {
        return Err(SdkError::Conversion(format!(
            "invalid nominal amount {:?}",
            nominal
        )));
    }

    if frac.len() > decimals as usize {
        return Err(SdkError::Conversion(format!(
            "{} has more than {} decimals",
            nominal, decimals
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TokenRegistry {
        let mut registry = TokenRegistry::new();
        registry.register(Token {
            symbol: "PAY".into(),
            contract: "0xB97048628DB6B661D4C2aA833e95Dbe1A905B280".into(),
            decimals: 18,
        });
        registry
    }

    #[test]
    fn test_bitcoin_nominal_to_satoshi() {
        assert_eq!(to_satoshis("1.5").unwrap(), 150_000_000);
        assert_eq!(to_satoshis("0.00000001").unwrap(), 1);
        assert_eq!(to_satoshis("21").unwrap(), 2_100_000_000);
    }

    #[test]
    fn test_ether_nominal_to_wei() {
        let wei = to_base_units("1", ETHER_DECIMALS).unwrap();
        assert_eq!(wei, U256::exp10(18));

        let wei = to_base_units("0.25", ETHER_DECIMALS).unwrap();
        assert_eq!(wei, U256::from(250_000_000_000_000_000u64));
    }

    #[test]
    fn test_rejects_malformed_amounts() {
        assert!(to_base_units("-1", 8).is_err());
        assert!(to_base_units("", 8).is_err());
        assert!(to_base_units("1.2.3", 8).is_err());
        assert!(to_base_units("abc", 8).is_err());
        assert!(to_base_units("0.000000001", 8).is_err());
    }

    #[test]
    fn test_base_units_back_to_nominal() {
        assert_eq!(to_nominal(U256::from(150_000_000u64), 8).unwrap(), "1.5");
        assert_eq!(to_nominal(U256::exp10(18), 18).unwrap(), "1");
    }

    #[test]
    fn test_parse_nominal_rejects_nan() {
        assert_eq!(parse_nominal("1.5"), Some(1.5));
        assert_eq!(parse_nominal("NaN"), None);
        assert_eq!(parse_nominal("one"), None);
    }

    #[test]
    fn test_parse_wei_handles_large_values() {
        let wei = parse_wei("1000000000000000000000000").unwrap();
        assert_eq!(wei, U256::exp10(24));
        assert!(parse_wei("1e18").is_err());
        assert!(parse_wei("0x10").is_err());
    }

    #[test]
    fn test_parse_satoshis() {
        assert_eq!(parse_satoshis("100000").unwrap(), 100_000);
        assert!(parse_satoshis("1.5").is_err());
    }

    #[test]
    fn test_resolve_assets() {
        let registry = registry();
        assert_eq!(registry.resolve("bitcoin", "bitcoin"), Some(Asset::Bitcoin));
        assert_eq!(registry.resolve("lightning", "bitcoin"), Some(Asset::Bitcoin));
        assert_eq!(registry.resolve("ethereum", "ether"), Some(Asset::Ether));

        let pay = registry.resolve("ethereum", "pay").unwrap();
        assert_eq!(pay.swap_name(), "erc20");
        assert_eq!(
            pay.token_contract(),
            Some("0xB97048628DB6B661D4C2aA833e95Dbe1A905B280")
        );

        assert_eq!(registry.resolve("ethereum", "unknown"), None);
        assert_eq!(registry.resolve("bitcoin", "ether"), None);
    }
}
