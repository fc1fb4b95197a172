//! Ethereum wallet capability

use async_trait::async_trait;
use ethers::types::U256;
use serde::{Deserialize, Serialize};

pub const MAINNET_CHAIN_ID: u64 = 1;

/// Transaction as reported by an ethereum wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthereumTransaction {
    pub hash: String,
    pub confirmations: u32,
}

/// Receipt of a mined transaction; `status` is `Some(1)` on success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub status: Option<u64>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, Some(status) if status != 0)
    }
}

/// Operations the swap client needs from an ethereum wallet
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EthereumWallet: Send + Sync {
    async fn get_account(&self) -> anyhow::Result<String>;

    /// Ether balance in wei
    async fn get_balance(&self) -> anyhow::Result<U256>;

    async fn get_erc20_balance(&self, contract_address: &str) -> anyhow::Result<U256>;

    async fn call_contract(
        &self,
        data: &str,
        contract_address: &str,
        gas_limit: u64,
        chain_id: u64,
    ) -> anyhow::Result<String>;

    async fn deploy_contract(
        &self,
        data: &str,
        amount: U256,
        gas_limit: u64,
        chain_id: u64,
    ) -> anyhow::Result<String>;

    /// `None` if the node does not know the transaction
    async fn get_transaction(&self, hash: &str) -> anyhow::Result<Option<EthereumTransaction>>;

    async fn get_transaction_receipt(
        &self,
        hash: &str,
    ) -> anyhow::Result<Option<TransactionReceipt>>;

    /// Resolves once the transaction has at least `confirmations`, failing if it is rejected
    async fn get_transaction_with_confirmations(
        &self,
        hash: &str,
        confirmations: u32,
    ) -> anyhow::Result<TransactionReceipt>;
}
