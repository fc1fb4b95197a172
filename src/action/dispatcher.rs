//! Ledger action dispatcher
//!
//! Maps each `LedgerAction` to exactly one wallet call and normalizes the
//! result. Wallet failures are wrapped with the action tag and the exact call
//! parameters; the raw wallet error type never leaves this module.

use super::ledger::{
    BroadcastSignedTransaction, CallContract, DeployContract, LedgerAction, LndAddHoldInvoice,
    LndNode, LndSendPayment, LndSettleInvoice, SendAmountToAddress,
};
use crate::asset::{parse_satoshis, parse_wei};
use crate::error::{SdkError, SdkResult, WalletError};
use crate::tx::Transaction;
use crate::wallet::{LightningWallet, Wallets};

use serde_json::json;
use std::future::Future;
use tracing::{debug, error, info};

/// Result of a dispatched ledger action
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerActionOutcome {
    /// On-chain transaction that can be queried for its status
    Transaction(Transaction),
    /// Lightning payment sent; identified by its secret hash
    SecretHash(String),
    /// Hold invoice added
    PaymentRequest(String),
    /// Hold invoice settled with this secret
    Secret(String),
}

impl LedgerActionOutcome {
    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            LedgerActionOutcome::Transaction(tx) => Some(tx),
            _ => None,
        }
    }
}

/// Executes ledger actions against the configured wallets
#[derive(Debug, Clone)]
pub struct LedgerActionDispatcher {
    wallets: Wallets,
}

impl LedgerActionDispatcher {
    pub fn new(wallets: Wallets) -> Self {
        Self { wallets }
    }

    pub fn wallets(&self) -> &Wallets {
        &self.wallets
    }

    /// Decode a raw daemon payload and execute it
    pub async fn execute_raw(&self, value: serde_json::Value) -> SdkResult<LedgerActionOutcome> {
        let action = LedgerAction::decode(value)?;
        self.execute(action).await
    }

    /// Execute a ledger action; each call reaches the wallet at most once
    pub async fn execute(&self, action: LedgerAction) -> SdkResult<LedgerActionOutcome> {
        let tag = action.tag();
        debug!("Dispatching ledger action {}", tag);

        let result = match action {
            LedgerAction::BitcoinBroadcastSignedTransaction(payload) => {
                self.broadcast_signed_transaction(tag, payload).await
            }
            LedgerAction::BitcoinSendAmountToAddress(payload) => {
                self.send_amount_to_address(tag, payload).await
            }
            LedgerAction::EthereumCallContract(payload) => self.call_contract(tag, payload).await,
            LedgerAction::EthereumDeployContract(payload) => {
                self.deploy_contract(tag, payload).await
            }
            LedgerAction::LndSendPayment(payload) => self.send_payment(tag, payload).await,
            LedgerAction::LndAddHoldInvoice(payload) => self.add_hold_invoice(tag, payload).await,
            LedgerAction::LndSettleInvoice(payload) => self.settle_invoice(tag, payload).await,
        };

        match &result {
            Ok(outcome) => {
                info!("Ledger action {} executed: {:?}", tag, outcome);
                crate::metrics::record_ledger_action(tag, true);
            }
            Err(e) => {
                error!("Ledger action {} failed: {}", tag, e);
                crate::metrics::record_ledger_action(tag, false);
            }
        }

        result
    }

    async fn broadcast_signed_transaction(
        &self,
        tag: &'static str,
        payload: BroadcastSignedTransaction,
    ) -> SdkResult<LedgerActionOutcome> {
        let wallet = self.wallets.bitcoin()?;
        hex::decode(&payload.hex)
            .map_err(|e| SdkError::Conversion(format!("signed transaction is not hex: {}", e)))?;

        let parameters = json!({ "hex": payload.hex, "network": payload.network });
        let txid = wallet_call(
            tag,
            parameters,
            wallet.broadcast_transaction(&payload.hex, payload.network),
        )
        .await?;

        Ok(LedgerActionOutcome::Transaction(Transaction::bitcoin(
            txid, wallet,
        )))
    }

    async fn send_amount_to_address(
        &self,
        tag: &'static str,
        payload: SendAmountToAddress,
    ) -> SdkResult<LedgerActionOutcome> {
        let wallet = self.wallets.bitcoin()?;
        let satoshis = parse_satoshis(&payload.amount)?;

        let parameters = json!({
            "to": payload.to,
            "satoshis": satoshis,
            "network": payload.network,
        });
        let txid = wallet_call(
            tag,
            parameters,
            wallet.send_to_address(&payload.to, satoshis, payload.network),
        )
        .await?;

        Ok(LedgerActionOutcome::Transaction(Transaction::bitcoin(
            txid, wallet,
        )))
    }

    async fn call_contract(
        &self,
        tag: &'static str,
        payload: CallContract,
    ) -> SdkResult<LedgerActionOutcome> {
        let wallet = self.wallets.ethereum()?;
        let data = payload.data.as_deref().unwrap_or_default();

        let parameters = json!({
            "data": data,
            "contract_address": payload.contract_address,
            "gas_limit": payload.gas_limit,
            "chain_id": payload.chain_id,
        });
        let hash = wallet_call(
            tag,
            parameters,
            wallet.call_contract(
                data,
                &payload.contract_address,
                payload.gas_limit,
                payload.chain_id,
            ),
        )
        .await?;

        Ok(LedgerActionOutcome::Transaction(Transaction::ethereum(
            hash, wallet,
        )))
    }

    async fn deploy_contract(
        &self,
        tag: &'static str,
        payload: DeployContract,
    ) -> SdkResult<LedgerActionOutcome> {
        let wallet = self.wallets.ethereum()?;
        let amount = parse_wei(&payload.amount)?;

        let parameters = json!({
            "data": payload.data,
            "amount": amount.to_string(),
            "gas_limit": payload.gas_limit,
            "chain_id": payload.chain_id,
        });
        let hash = wallet_call(
            tag,
            parameters,
            wallet.deploy_contract(&payload.data, amount, payload.gas_limit, payload.chain_id),
        )
        .await?;

        Ok(LedgerActionOutcome::Transaction(Transaction::ethereum(
            hash, wallet,
        )))
    }

    async fn send_payment(
        &self,
        tag: &'static str,
        payload: LndSendPayment,
    ) -> SdkResult<LedgerActionOutcome> {
        let wallet = self.wallets.lightning()?;
        assert_lnd_node(tag, wallet.as_ref(), &payload.node).await?;
        let satoshis = parse_satoshis(&payload.amount)?;

        let parameters = json!({
            "to_public_key": payload.to_public_key,
            "satoshis": satoshis,
            "secret_hash": payload.secret_hash,
            "final_cltv_delta": payload.final_cltv_delta,
        });
        wallet_call(
            tag,
            parameters,
            wallet.send_payment(
                &payload.to_public_key,
                satoshis,
                &payload.secret_hash,
                payload.final_cltv_delta,
            ),
        )
        .await?;

        Ok(LedgerActionOutcome::SecretHash(payload.secret_hash))
    }

    async fn add_hold_invoice(
        &self,
        tag: &'static str,
        payload: LndAddHoldInvoice,
    ) -> SdkResult<LedgerActionOutcome> {
        let wallet = self.wallets.lightning()?;
        assert_lnd_node(tag, wallet.as_ref(), &payload.node).await?;
        let satoshis = parse_satoshis(&payload.amount)?;

        let parameters = json!({
            "satoshis": satoshis,
            "secret_hash": payload.secret_hash,
            "expiry": payload.expiry,
            "cltv_expiry": payload.cltv_expiry,
        });
        let payment_request = wallet_call(
            tag,
            parameters,
            wallet.add_hold_invoice(
                satoshis,
                &payload.secret_hash,
                payload.expiry,
                payload.cltv_expiry,
            ),
        )
        .await?;

        Ok(LedgerActionOutcome::PaymentRequest(payment_request))
    }

    async fn settle_invoice(
        &self,
        tag: &'static str,
        payload: LndSettleInvoice,
    ) -> SdkResult<LedgerActionOutcome> {
        let wallet = self.wallets.lightning()?;
        assert_lnd_node(tag, wallet.as_ref(), &payload.node).await?;

        let parameters = json!({ "secret": payload.secret });
        wallet_call(tag, parameters, wallet.settle_invoice(&payload.secret)).await?;

        Ok(LedgerActionOutcome::Secret(payload.secret))
    }
}

/// Await a wallet call, wrapping its failure with the call context
async fn wallet_call<T>(
    action: &'static str,
    parameters: serde_json::Value,
    call: impl Future<Output = anyhow::Result<T>>,
) -> SdkResult<T> {
    call.await
        .map_err(|source| WalletError::new(action, parameters, source).into())
}

/// Check the lightning wallet talks to the node the daemon expects
async fn assert_lnd_node(
    action: &'static str,
    wallet: &dyn LightningWallet,
    expected: &LndNode,
) -> SdkResult<()> {
    let info = wallet_call(action, json!({}), wallet.node_info()).await?;

    let checks = [
        ("self_public_key", &expected.self_public_key, &info.identity_pubkey),
        ("chain", &expected.chain, &info.chain),
        ("network", &expected.network, &info.network),
    ];
    for (field, expected, actual) in checks {
        if !expected.eq_ignore_ascii_case(actual) {
            return Err(SdkError::LightningNodeMismatch {
                field,
                expected: expected.clone(),
                actual: actual.clone(),
            });
        }
    }

    Ok(())
}
