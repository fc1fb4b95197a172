//! Execution parameters and their expiry safety rule

use crate::cnd::types::{LedgerSpec, Peer};
use crate::config::LedgersConfig;
use crate::error::{SdkError, SdkResult};
use crate::wallet::{BitcoinNetwork, Ledger};

use serde::{Deserialize, Serialize};

const HOUR: u64 = 60 * 60;

/// Minimum distance of the alpha expiry from now on mainnet
pub const MAINNET_MIN_ALPHA_EXPIRY_SECS: u64 = 23 * HOUR;
/// Minimum distance of the beta expiry from now on mainnet
pub const MAINNET_MIN_BETA_EXPIRY_SECS: u64 = 11 * HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitcoinParams {
    pub network: BitcoinNetwork,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthereumParams {
    pub chain_id: u64,
}

/// Network of every ledger the maker trades on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitcoin: Option<BitcoinParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethereum: Option<EthereumParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lightning: Option<BitcoinParams>,
}

impl NetworkParams {
    pub fn from_config(config: &LedgersConfig) -> SdkResult<Self> {
        let network = |name: &Option<String>| -> SdkResult<Option<BitcoinParams>> {
            name.as_deref()
                .map(|n| {
                    n.parse::<BitcoinNetwork>()
                        .map(|network| BitcoinParams { network })
                        .map_err(SdkError::Config)
                })
                .transpose()
        };

        Ok(Self {
            bitcoin: network(&config.bitcoin_network)?,
            ethereum: config.ethereum_chain_id.map(|chain_id| EthereumParams { chain_id }),
            lightning: network(&config.lightning_network)?,
        })
    }

    /// Ledger spec for a ledger named in an order
    pub fn spec_for(&self, ledger: &str) -> Option<LedgerSpec> {
        match ledger.to_lowercase().as_str() {
            "bitcoin" => self.bitcoin.map(|p| LedgerSpec::Bitcoin { network: p.network }),
            "ethereum" => self.ethereum.map(|p| LedgerSpec::Ethereum {
                chain_id: p.chain_id,
            }),
            "lightning" => self.lightning.map(|p| LedgerSpec::Lightning { network: p.network }),
            _ => None,
        }
    }

    pub fn specs(&self) -> Vec<LedgerSpec> {
        [Ledger::Bitcoin, Ledger::Ethereum, Ledger::Lightning]
            .iter()
            .filter_map(|l| self.spec_for(l.as_str()))
            .collect()
    }
}

/// Terms both parties must agree on before a swap request is sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionParams {
    pub peer: Peer,
    /// Unix timestamp (seconds)
    pub alpha_expiry: u64,
    /// Unix timestamp (seconds)
    pub beta_expiry: u64,
    pub ledgers: NetworkParams,
}

/// Expiry safety rule
///
/// All-mainnet ledger sets need alpha beyond now + 23h, beta beyond now + 11h
/// and alpha after beta. All-test sets only need alpha after beta. Mixed
/// sets and sets naming no ledger are rejected.
pub fn is_valid_execution_params(params: &ExecutionParams, now: u64) -> bool {
    let specs = params.ledgers.specs();
    if specs.is_empty() {
        return false;
    }

    let ordered = params.alpha_expiry > params.beta_expiry;

    if specs.iter().all(LedgerSpec::is_mainnet) {
        ordered
            && params.alpha_expiry > now + MAINNET_MIN_ALPHA_EXPIRY_SECS
            && params.beta_expiry > now + MAINNET_MIN_BETA_EXPIRY_SECS
    } else if specs.iter().all(|s| !s.is_mainnet()) {
        ordered
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::ethereum::MAINNET_CHAIN_ID;
    use serde_json::json;

    const NOW: u64 = 1_600_000_000;

    fn params(bitcoin: BitcoinNetwork, chain_id: u64, alpha_in: u64, beta_in: u64) -> ExecutionParams {
        ExecutionParams {
            peer: Peer {
                peer_id: "QmMakerPeer".into(),
                address_hint: None,
            },
            alpha_expiry: NOW + alpha_in,
            beta_expiry: NOW + beta_in,
            ledgers: NetworkParams {
                bitcoin: Some(BitcoinParams { network: bitcoin }),
                ethereum: Some(EthereumParams { chain_id }),
                lightning: None,
            },
        }
    }

    #[test]
    fn test_mainnet_with_default_expiries_is_valid() {
        let params = params(BitcoinNetwork::Mainnet, MAINNET_CHAIN_ID, 24 * HOUR, 12 * HOUR);
        assert!(is_valid_execution_params(&params, NOW));
    }

    #[test]
    fn test_beta_after_alpha_is_invalid() {
        let params = params(BitcoinNetwork::Mainnet, MAINNET_CHAIN_ID, 24 * HOUR, 25 * HOUR);
        assert!(!is_valid_execution_params(&params, NOW));
    }

    #[test]
    fn test_short_mainnet_alpha_expiry_is_invalid() {
        let params = params(BitcoinNetwork::Mainnet, MAINNET_CHAIN_ID, 2 * HOUR, HOUR);
        assert!(!is_valid_execution_params(&params, NOW));
    }

    #[test]
    fn test_testnet_only_needs_ordering() {
        let params = params(BitcoinNetwork::Testnet, 3, 2 * HOUR, HOUR);
        assert!(is_valid_execution_params(&params, NOW));
    }

    #[test]
    fn test_mixed_networks_are_invalid() {
        let params = params(BitcoinNetwork::Mainnet, 3, 24 * HOUR, 12 * HOUR);
        assert!(!is_valid_execution_params(&params, NOW));
    }

    #[test]
    fn test_no_ledgers_is_invalid() {
        let mut params = params(BitcoinNetwork::Testnet, 3, 2 * HOUR, HOUR);
        params.ledgers = NetworkParams::default();
        assert!(!is_valid_execution_params(&params, NOW));
    }

    #[test]
    fn test_wire_format() {
        let params: ExecutionParams = serde_json::from_value(json!({
            "peer": { "peer_id": "QmMakerPeer", "address_hint": "/ip4/127.0.0.1/tcp/9939" },
            "alpha_expiry": 1600086400,
            "beta_expiry": 1600043200,
            "ledgers": {
                "bitcoin": { "network": "regtest" },
                "ethereum": { "chain_id": 17 }
            }
        }))
        .unwrap();

        assert_eq!(
            params.ledgers.spec_for("Ethereum"),
            Some(LedgerSpec::Ethereum { chain_id: 17 })
        );
        assert_eq!(params.ledgers.spec_for("lightning"), None);
        assert!(is_valid_execution_params(&params, NOW));
    }

    #[test]
    fn test_from_config() {
        let config = LedgersConfig {
            bitcoin_network: Some("testnet".into()),
            ethereum_chain_id: Some(3),
            lightning_network: Some("nonsense".into()),
        };
        assert!(matches!(NetworkParams::from_config(&config), Err(SdkError::Config(_))));

        let config = LedgersConfig {
            lightning_network: None,
            ..config
        };
        let networks = NetworkParams::from_config(&config).unwrap();
        assert_eq!(networks.specs().len(), 2);
    }
}
