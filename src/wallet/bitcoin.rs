//! Bitcoin wallet capability

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bitcoin network as named by the swap daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitcoinNetwork {
    Mainnet,
    Testnet,
    Regtest,
}

impl BitcoinNetwork {
    pub fn as_str(&self) -> &'static str {
        match self {
            BitcoinNetwork::Mainnet => "mainnet",
            BitcoinNetwork::Testnet => "testnet",
            BitcoinNetwork::Regtest => "regtest",
        }
    }

    pub fn is_mainnet(&self) -> bool {
        matches!(self, BitcoinNetwork::Mainnet)
    }
}

impl fmt::Display for BitcoinNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BitcoinNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" | "bitcoin" => Ok(BitcoinNetwork::Mainnet),
            "testnet" | "test" => Ok(BitcoinNetwork::Testnet),
            "regtest" => Ok(BitcoinNetwork::Regtest),
            other => Err(format!("unknown bitcoin network {}", other)),
        }
    }
}

/// Transaction as reported by a bitcoin wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitcoinTransaction {
    pub txid: String,
    pub confirmations: u32,
}

/// Operations the swap client needs from a bitcoin wallet
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BitcoinWallet: Send + Sync {
    /// Fresh receive address
    async fn get_address(&self) -> anyhow::Result<String>;

    /// Spendable balance in satoshi
    async fn get_balance(&self) -> anyhow::Result<u64>;

    /// Fee estimate in satoshi per weight unit
    async fn get_fee(&self) -> anyhow::Result<String>;

    async fn send_to_address(
        &self,
        address: &str,
        satoshis: u64,
        network: BitcoinNetwork,
    ) -> anyhow::Result<String>;

    async fn broadcast_transaction(
        &self,
        transaction_hex: &str,
        network: BitcoinNetwork,
    ) -> anyhow::Result<String>;

    async fn get_transaction(&self, txid: &str) -> anyhow::Result<BitcoinTransaction>;

    /// Resolves once the transaction has at least `confirmations`
    async fn get_transaction_with_confirmations(
        &self,
        txid: &str,
        confirmations: u32,
    ) -> anyhow::Result<BitcoinTransaction>;
}
