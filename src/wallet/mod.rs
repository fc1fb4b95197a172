//! Wallet module - capability contracts and the per-ledger registry
//!
//! This module provides:
//! - The `BitcoinWallet`, `EthereumWallet` and `LightningWallet` contracts
//! - `Wallets`, which decides which concrete wallet backs which ledger
//!
//! Concrete node clients live outside this crate and are handed in as trait objects.

pub mod bitcoin;
pub mod ethereum;
pub mod lightning;

pub use bitcoin::{BitcoinNetwork, BitcoinTransaction, BitcoinWallet};
pub use ethereum::{EthereumTransaction, EthereumWallet, TransactionReceipt};
pub use lightning::{LightningNodeInfo, LightningWallet};

use crate::error::{SdkError, SdkResult};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Ledgers a wallet can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ledger {
    Bitcoin,
    Ethereum,
    Lightning,
}

impl Ledger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ledger::Bitcoin => "bitcoin",
            Ledger::Ethereum => "ethereum",
            Ledger::Lightning => "lightning",
        }
    }
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wallet handles a swap is entitled to use
///
/// Cloning is cheap and every handle is shared; wallets serialize their own calls.
#[derive(Clone, Default)]
pub struct Wallets {
    bitcoin: Option<Arc<dyn BitcoinWallet>>,
    ethereum: Option<Arc<dyn EthereumWallet>>,
    lightning: Option<Arc<dyn LightningWallet>>,
}

impl Wallets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bitcoin(mut self, wallet: Arc<dyn BitcoinWallet>) -> Self {
        self.bitcoin = Some(wallet);
        self
    }

    pub fn with_ethereum(mut self, wallet: Arc<dyn EthereumWallet>) -> Self {
        self.ethereum = Some(wallet);
        self
    }

    pub fn with_lightning(mut self, wallet: Arc<dyn LightningWallet>) -> Self {
        self.lightning = Some(wallet);
        self
    }

    /// Get the bitcoin wallet, failing if none is configured
    pub fn bitcoin(&self) -> SdkResult<Arc<dyn BitcoinWallet>> {
        self.bitcoin
            .clone()
            .ok_or(SdkError::WalletNotConfigured { ledger: "bitcoin" })
    }

    /// Get the ethereum wallet, failing if none is configured
    pub fn ethereum(&self) -> SdkResult<Arc<dyn EthereumWallet>> {
        self.ethereum
            .clone()
            .ok_or(SdkError::WalletNotConfigured { ledger: "ethereum" })
    }

    /// Get the lightning wallet, failing if none is configured
    pub fn lightning(&self) -> SdkResult<Arc<dyn LightningWallet>> {
        self.lightning
            .clone()
            .ok_or(SdkError::WalletNotConfigured { ledger: "lightning" })
    }

    pub fn supports(&self, ledger: Ledger) -> bool {
        match ledger {
            Ledger::Bitcoin => self.bitcoin.is_some(),
            Ledger::Ethereum => self.ethereum.is_some(),
            Ledger::Lightning => self.lightning.is_some(),
        }
    }

    /// All ledgers with a configured wallet
    pub fn configured_ledgers(&self) -> Vec<Ledger> {
        [Ledger::Bitcoin, Ledger::Ethereum, Ledger::Lightning]
            .into_iter()
            .filter(|l| self.supports(*l))
            .collect()
    }
}

impl fmt::Debug for Wallets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallets")
            .field("ledgers", &self.configured_ledgers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::bitcoin::MockBitcoinWallet;

    #[test]
    fn test_missing_wallet_is_typed_error() {
        let wallets = Wallets::new();

        match wallets.ethereum() {
            Err(SdkError::WalletNotConfigured { ledger }) => assert_eq!(ledger, "ethereum"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        assert!(wallets.bitcoin().is_err());
        assert!(wallets.lightning().is_err());
        assert!(wallets.configured_ledgers().is_empty());
    }

    #[test]
    fn test_registered_wallet_resolves() {
        let wallets = Wallets::new().with_bitcoin(Arc::new(MockBitcoinWallet::new()));

        assert!(wallets.bitcoin().is_ok());
        assert!(wallets.supports(Ledger::Bitcoin));
        assert!(!wallets.supports(Ledger::Lightning));
        assert_eq!(wallets.configured_ledgers(), vec![Ledger::Bitcoin]);
        assert_eq!(format!("{:?}", wallets), "Wallets { ledgers: [Bitcoin] }");
    }
}
