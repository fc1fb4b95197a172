//! Lightning wallet capability

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identity of the node behind a lightning wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightningNodeInfo {
    pub identity_pubkey: String,
    pub chain: String,
    pub network: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LightningWallet: Send + Sync {
    async fn node_info(&self) -> anyhow::Result<LightningNodeInfo>;

    /// Local channel balance in satoshi
    async fn get_channel_balance(&self) -> anyhow::Result<u64>;

    async fn send_payment(
        &self,
        to_pubkey: &str,
        satoshis: u64,
        secret_hash: &str,
        final_cltv_delta: u32,
    ) -> anyhow::Result<()>;

    /// Returns the payment request of the new invoice
    async fn add_hold_invoice(
        &self,
        satoshis: u64,
        secret_hash: &str,
        expiry: u32,
        cltv_expiry: u32,
    ) -> anyhow::Result<String>;

    async fn settle_invoice(&self, secret: &str) -> anyhow::Result<()>;
}
