//! Ledger actions returned by the swap daemon
//!
//! Wire shape: `{ "type": "<tag>", "payload": { ... } }`. Amounts are decimal
//! strings in the asset's base unit.

use crate::error::{SdkError, SdkResult};
use crate::wallet::BitcoinNetwork;

use serde::{Deserialize, Serialize};

/// One low-level operation needed to advance a swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum LedgerAction {
    BitcoinBroadcastSignedTransaction(BroadcastSignedTransaction),
    BitcoinSendAmountToAddress(SendAmountToAddress),
    EthereumCallContract(CallContract),
    EthereumDeployContract(DeployContract),
    LndSendPayment(LndSendPayment),
    LndAddHoldInvoice(LndAddHoldInvoice),
    LndSettleInvoice(LndSettleInvoice),
}

pub const TAGS: [&str; 7] = [
    "bitcoin-broadcast-signed-transaction",
    "bitcoin-send-amount-to-address",
    "ethereum-call-contract",
    "ethereum-deploy-contract",
    "lnd-send-payment",
    "lnd-add-hold-invoice",
    "lnd-settle-invoice",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastSignedTransaction {
    pub hex: String,
    pub network: BitcoinNetwork,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendAmountToAddress {
    pub to: String,
    /// Satoshi
    pub amount: String,
    pub network: BitcoinNetwork,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContract {
    pub contract_address: String,
    pub data: Option<String>,
    pub gas_limit: u64,
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployContract {
    pub data: String,
    /// Wei
    pub amount: String,
    pub gas_limit: u64,
    pub chain_id: u64,
}

/// Identity the daemon expects the local lightning node to have
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LndNode {
    pub self_public_key: String,
    pub chain: String,
    pub network: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LndSendPayment {
    #[serde(flatten)]
    pub node: LndNode,
    pub to_public_key: String,
    /// Satoshi
    pub amount: String,
    pub secret_hash: String,
    pub final_cltv_delta: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LndAddHoldInvoice {
    #[serde(flatten)]
    pub node: LndNode,
    /// Satoshi
    pub amount: String,
    pub secret_hash: String,
    pub expiry: u32,
    pub cltv_expiry: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LndSettleInvoice {
    #[serde(flatten)]
    pub node: LndNode,
    pub secret: String,
}

impl LedgerAction {
    /// Decode a ledger action, rejecting tags this client cannot dispatch
    pub fn decode(value: serde_json::Value) -> SdkResult<Self> {
        let tag = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| SdkError::ProtocolViolation("ledger action without type".to_string()))?
            .to_string();

        if !TAGS.contains(&tag.as_str()) {
            return Err(SdkError::UnsupportedLedgerAction(tag));
        }

        serde_json::from_value(value).map_err(|e| {
            SdkError::ProtocolViolation(format!("malformed {} payload: {}", tag, e))
        })
    }

    pub fn tag(&self) -> &'static str {
        match self {
            LedgerAction::BitcoinBroadcastSignedTransaction(_) => TAGS[0],
            LedgerAction::BitcoinSendAmountToAddress(_) => TAGS[1],
            LedgerAction::EthereumCallContract(_) => TAGS[2],
            LedgerAction::EthereumDeployContract(_) => TAGS[3],
            LedgerAction::LndSendPayment(_) => TAGS[4],
            LedgerAction::LndAddHoldInvoice(_) => TAGS[5],
            LedgerAction::LndSettleInvoice(_) => TAGS[6],
        }
    }
}
