//! Transaction status resolution across ledgers
//!
//! Ledgers confirm differently:
//! - Ethereum: a transaction with confirmations also has a receipt whose status
//!   tells whether execution succeeded
//! - Bitcoin: a transaction is valid once it is included, so any confirmation
//!   means confirmed

use super::{Transaction, TransactionBackend};
use crate::error::{SdkError, SdkResult};
use crate::wallet::{BitcoinWallet, EthereumWallet, TransactionReceipt};

use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Uniform view of a transaction's progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Failed,
    Pending,
    Confirmed,
    NotFound,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Failed => "failed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::NotFound => "not_found",
        };
        f.write_str(s)
    }
}

/// Resolve the status of a transaction, waiting for `confirmations` if given
///
/// Every call fetches the transaction once and decides from that snapshot.
pub async fn resolve(
    transaction: &Transaction,
    confirmations: Option<u32>,
) -> SdkResult<TransactionStatus> {
    let status = match transaction.backend() {
        TransactionBackend::Ethereum(wallet) => {
            ethereum_status(wallet.as_ref(), transaction.id(), confirmations).await?
        }
        TransactionBackend::Bitcoin(wallet) => {
            bitcoin_status(wallet.as_ref(), transaction.id(), confirmations).await
        }
    };

    debug!(
        "Transaction {} on {} is {}",
        transaction.id(),
        transaction.ledger(),
        status
    );
    Ok(status)
}

async fn ethereum_status(
    wallet: &dyn EthereumWallet,
    hash: &str,
    required: Option<u32>,
) -> SdkResult<TransactionStatus> {
    let transaction = wallet
        .get_transaction(hash)
        .await
        .map_err(|e| SdkError::Transport(format!("get ethereum transaction {}: {:#}", hash, e)))?;

    let Some(transaction) = transaction else {
        return Ok(TransactionStatus::NotFound);
    };

    let satisfied = required.map_or(true, |required| transaction.confirmations >= required);
    if satisfied {
        if transaction.confirmations == 0 {
            return Ok(TransactionStatus::Pending);
        }

        let receipt = wallet.get_transaction_receipt(hash).await.map_err(|e| {
            SdkError::Transport(format!("get ethereum receipt {}: {:#}", hash, e))
        })?;
        let receipt = receipt.ok_or_else(|| SdkError::InconsistentChainState {
            tx_id: hash.to_string(),
            message: format!(
                "no receipt despite {} confirmations",
                transaction.confirmations
            ),
        })?;
        return Ok(receipt_status(&receipt));
    }

    let required = required.unwrap_or_default();
    debug!(
        "Waiting for {} confirmations of {} (currently {})",
        required, hash, transaction.confirmations
    );
    match wallet.get_transaction_with_confirmations(hash, required).await {
        Ok(receipt) => Ok(receipt_status(&receipt)),
        Err(e) => {
            warn!("Waiting for confirmations of {} failed: {:#}", hash, e);
            Ok(TransactionStatus::Failed)
        }
    }
}

fn receipt_status(receipt: &TransactionReceipt) -> TransactionStatus {
    if receipt.succeeded() {
        TransactionStatus::Confirmed
    } else {
        TransactionStatus::Failed
    }
}

async fn bitcoin_status(
    wallet: &dyn BitcoinWallet,
    txid: &str,
    required: Option<u32>,
) -> TransactionStatus {
    let lookup = match required {
        Some(required) => wallet.get_transaction_with_confirmations(txid, required).await,
        None => wallet.get_transaction(txid).await,
    };

    match lookup {
        Ok(transaction) if required.is_none() && transaction.confirmations == 0 => {
            TransactionStatus::Pending
        }
        Ok(_) => TransactionStatus::Confirmed,
        Err(e) => {
            debug!("Bitcoin transaction {} lookup failed: {:#}", txid, e);
            TransactionStatus::NotFound
        }
    }
}
