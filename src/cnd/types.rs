//! Wire types of the swap daemon API

use crate::wallet::{BitcoinNetwork, Ledger};

use serde::{Deserialize, Serialize};

/// Ledger together with its network parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum LedgerSpec {
    Bitcoin { network: BitcoinNetwork },
    Ethereum { chain_id: u64 },
    Lightning { network: BitcoinNetwork },
}

impl LedgerSpec {
    pub fn ledger(&self) -> Ledger {
        match self {
            LedgerSpec::Bitcoin { .. } => Ledger::Bitcoin,
            LedgerSpec::Ethereum { .. } => Ledger::Ethereum,
            LedgerSpec::Lightning { .. } => Ledger::Lightning,
        }
    }

    pub fn name(&self) -> &'static str {
        self.ledger().as_str()
    }

    pub fn is_mainnet(&self) -> bool {
        match self {
            LedgerSpec::Bitcoin { network } | LedgerSpec::Lightning { network } => {
                network.is_mainnet()
            }
            LedgerSpec::Ethereum { chain_id } => {
                *chain_id == crate::wallet::ethereum::MAINNET_CHAIN_ID
            }
        }
    }
}

/// Asset with its base-unit quantity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    pub name: String,
    pub quantity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_contract: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub peer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_hint: Option<String>,
}

/// Body of a new swap request sent to the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub alpha_ledger: LedgerSpec,
    pub beta_ledger: LedgerSpec,
    pub alpha_asset: AssetSpec,
    pub beta_asset: AssetSpec,
    pub alpha_expiry: u64,
    pub beta_expiry: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_ledger_refund_identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta_ledger_redeem_identity: Option<String>,
    pub peer: Peer,
}

/// Trade parameters of an existing swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapParameters {
    pub alpha_ledger: LedgerSpec,
    pub beta_ledger: LedgerSpec,
    pub alpha_asset: AssetSpec,
    pub beta_asset: AssetSpec,
}

/// Typed view of a swap entity's properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapProperties {
    pub id: String,
    pub role: String,
    pub status: String,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<String>,
    pub parameters: SwapParameters,
    #[serde(default)]
    pub state: serde_json::Value,
}

pub const STATUS_IN_PROGRESS: &str = "IN_PROGRESS";
pub const TERMINAL_STATUSES: [&str; 3] = ["SWAPPED", "NOT_SWAPPED", "INTERNAL_FAILURE"];

pub fn is_terminal_status(status: &str) -> bool {
    TERMINAL_STATUSES.contains(&status)
}

/// Identity of the local daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CndInfo {
    pub id: String,
    #[serde(default)]
    pub listen_addresses: Vec<String>,
}

/// RFC 7807 problem document returned on errors
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Problem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}
