//! Transaction handles returned by ledger actions
//!
//! A `Transaction` pairs a ledger transaction id with the wallet able to look
//! it up. Handles are created by the dispatcher and only ever queried.

mod status;

pub use status::{resolve, TransactionStatus};

use crate::error::SdkResult;
use crate::wallet::{BitcoinWallet, EthereumWallet, Ledger, Wallets};

use std::fmt;
use std::sync::Arc;

/// Wallet used to query a transaction; the variant fixes the chain
#[derive(Clone)]
pub enum TransactionBackend {
    Bitcoin(Arc<dyn BitcoinWallet>),
    Ethereum(Arc<dyn EthereumWallet>),
}

#[derive(Clone)]
pub struct Transaction {
    id: String,
    backend: TransactionBackend,
}

impl Transaction {
    pub fn bitcoin(txid: impl Into<String>, wallet: Arc<dyn BitcoinWallet>) -> Self {
        Self {
            id: txid.into(),
            backend: TransactionBackend::Bitcoin(wallet),
        }
    }

    pub fn ethereum(hash: impl Into<String>, wallet: Arc<dyn EthereumWallet>) -> Self {
        Self {
            id: hash.into(),
            backend: TransactionBackend::Ethereum(wallet),
        }
    }

    /// Build a handle from the registry, failing if the chain has no wallet
    pub fn from_wallets(ledger: Ledger, id: impl Into<String>, wallets: &Wallets) -> SdkResult<Self> {
        match ledger {
            Ledger::Bitcoin => Ok(Self::bitcoin(id, wallets.bitcoin()?)),
            Ledger::Ethereum => Ok(Self::ethereum(id, wallets.ethereum()?)),
            Ledger::Lightning => Err(crate::error::SdkError::Internal(
                "lightning payments have no on-chain transaction".to_string(),
            )),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn ledger(&self) -> Ledger {
        match self.backend {
            TransactionBackend::Bitcoin(_) => Ledger::Bitcoin,
            TransactionBackend::Ethereum(_) => Ledger::Ethereum,
        }
    }

    pub fn backend(&self) -> &TransactionBackend {
        &self.backend
    }

    /// Current status, blocking until `confirmations` are reached if given
    pub async fn status(&self, confirmations: Option<u32>) -> SdkResult<TransactionStatus> {
        resolve(self, confirmations).await
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("ledger", &self.ledger())
            .field("id", &self.id)
            .finish()
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.ledger() == other.ledger() && self.id == other.id
    }
}
