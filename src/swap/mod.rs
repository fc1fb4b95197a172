//! Swap driver
//!
//! A `Swap` owns no state besides its href. Every operation re-fetches the
//! swap entity from the daemon, looks for the one permitted action of the
//! requested name, and executes it at most once. Only discovery is retried;
//! execution failures propagate to the caller untouched.

pub mod fields;

pub use fields::resolve_fields;

use crate::action::{LedgerActionDispatcher, LedgerActionOutcome};
use crate::cnd::types::{is_terminal_status, SwapProperties};
use crate::cnd::Cnd;
use crate::error::{SdkError, SdkResult};
use crate::siren::{Action, Entity};

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bounds of the action discovery loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryParams {
    pub max_timeout: Duration,
    pub try_interval: Duration,
}

impl Default for TryParams {
    fn default() -> Self {
        Self {
            max_timeout: Duration::from_secs(30),
            try_interval: Duration::from_secs(1),
        }
    }
}

/// What one look at the swap entity found
#[derive(Debug, Clone, PartialEq)]
pub enum Discovery {
    NoActionAvailable,
    ActionAvailable(Action),
    Terminal(String),
}

/// Result of an executed action
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The daemon handled the action itself (accept, decline)
    Completed,
    /// The daemon returned a ledger action that was dispatched to a wallet
    Ledger(LedgerActionOutcome),
}

impl ActionOutcome {
    pub fn ledger(&self) -> Option<&LedgerActionOutcome> {
        match self {
            ActionOutcome::Ledger(outcome) => Some(outcome),
            ActionOutcome::Completed => None,
        }
    }
}

/// Check the advertised actions and pick the one named `name`
///
/// A swap offers at most one action at a time. More than one is a protocol
/// violation and is never retried.
pub fn select_action(entity: &Entity, name: &str) -> SdkResult<Discovery> {
    if entity.actions.len() > 1 {
        let names: Vec<&str> = entity.actions.iter().map(|a| a.name.as_str()).collect();
        return Err(SdkError::ProtocolViolation(format!(
            "more than one action available: {}",
            names.join(", ")
        )));
    }

    if let Some(action) = entity.actions.iter().find(|a| a.name == name) {
        return Ok(Discovery::ActionAvailable(action.clone()));
    }

    match entity.status() {
        Some(status) if is_terminal_status(status) => Ok(Discovery::Terminal(status.to_string())),
        _ => Ok(Discovery::NoActionAvailable),
    }
}

/// Handle on one swap driven by the daemon
#[derive(Clone)]
pub struct Swap {
    href: String,
    cnd: Arc<dyn Cnd>,
    dispatcher: LedgerActionDispatcher,
}

impl std::fmt::Debug for Swap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Swap").field("href", &self.href).finish()
    }
}

impl Swap {
    pub fn new(href: impl Into<String>, cnd: Arc<dyn Cnd>, dispatcher: LedgerActionDispatcher) -> Self {
        Self {
            href: href.into(),
            cnd,
            dispatcher,
        }
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    /// Swap id, the last segment of the href
    pub fn id(&self) -> &str {
        self.href
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.href)
    }

    /// Fresh copy of the swap entity
    pub async fn entity(&self) -> SdkResult<Entity> {
        self.cnd.fetch(&self.href).await
    }

    /// Typed swap properties: role, status, protocol and trade parameters
    pub async fn fetch_details(&self) -> SdkResult<SwapProperties> {
        let entity = self.entity().await?;
        entity.properties_as().map_err(|e| {
            SdkError::ProtocolViolation(format!("swap {} has malformed properties: {}", self.href, e))
        })
    }

    pub async fn accept(&self, params: TryParams) -> SdkResult<ActionOutcome> {
        self.try_execute_action("accept", params).await
    }

    pub async fn decline(&self, params: TryParams) -> SdkResult<ActionOutcome> {
        self.try_execute_action("decline", params).await
    }

    pub async fn deploy(&self, params: TryParams) -> SdkResult<ActionOutcome> {
        self.try_execute_action("deploy", params).await
    }

    pub async fn fund(&self, params: TryParams) -> SdkResult<ActionOutcome> {
        self.try_execute_action("fund", params).await
    }

    pub async fn redeem(&self, params: TryParams) -> SdkResult<ActionOutcome> {
        self.try_execute_action("redeem", params).await
    }

    pub async fn refund(&self, params: TryParams) -> SdkResult<ActionOutcome> {
        self.try_execute_action("refund", params).await
    }

    /// Wait for the action `name` to become available, then execute it once
    pub async fn try_execute_action(&self, name: &str, params: TryParams) -> SdkResult<ActionOutcome> {
        let action = match tokio::time::timeout(
            params.max_timeout,
            self.discover(name, params.try_interval),
        )
        .await
        {
            Ok(found) => found?,
            Err(_) => {
                warn!("No {} action on {} within {:?}", name, self.href, params.max_timeout);
                crate::metrics::record_swap_action(name, false);
                return Err(SdkError::Timeout {
                    operation: format!("{} action on {}", name, self.href),
                });
            }
        };

        let result = self.execute(action).await;
        crate::metrics::record_swap_action(name, result.is_ok());
        result
    }

    async fn discover(&self, name: &str, interval: Duration) -> SdkResult<Action> {
        loop {
            match self.cnd.fetch(&self.href).await {
                Ok(entity) => match select_action(&entity, name)? {
                    Discovery::ActionAvailable(action) => {
                        debug!("Action {} available on {}", name, self.href);
                        return Ok(action);
                    }
                    Discovery::Terminal(status) => {
                        return Err(SdkError::SwapTerminated {
                            swap: self.href.clone(),
                            status,
                        });
                    }
                    Discovery::NoActionAvailable => {
                        debug!("Action {} not yet available on {}", name, self.href);
                    }
                },
                Err(e) if e.is_retryable() => {
                    warn!("Fetching {} failed, retrying: {}", self.href, e);
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(interval).await;
        }
    }

    async fn execute(&self, action: Action) -> SdkResult<ActionOutcome> {
        let fields = resolve_fields(&action.fields, self.dispatcher.wallets()).await?;
        info!("Executing {} on {}", action.name, self.href);

        let response = self.cnd.execute_action(&action, &fields).await?;
        match response {
            Some(body) if body.get("type").is_some() => {
                let outcome = self.dispatcher.execute_raw(body).await?;
                Ok(ActionOutcome::Ledger(outcome))
            }
            _ => Ok(ActionOutcome::Completed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnd::testing::{swap_entity, Reply, ScriptedCnd};
    use crate::siren::Field;
    use crate::tx::TransactionStatus;
    use crate::wallet::bitcoin::MockBitcoinWallet;
    use crate::wallet::ethereum::MockEthereumWallet;
    use crate::wallet::{BitcoinNetwork, BitcoinTransaction, Ledger, Wallets};
    use serde_json::json;

    const HREF: &str = "/swaps/rfc003/399e8ff5";

    fn params() -> TryParams {
        TryParams {
            max_timeout: Duration::from_secs(10),
            try_interval: Duration::from_secs(1),
        }
    }

    fn swap(cnd: &Arc<ScriptedCnd>, wallets: Wallets) -> Swap {
        Swap::new(HREF, cnd.clone(), LedgerActionDispatcher::new(wallets))
    }

    fn entity(status: &str, actions: &[&str]) -> Reply {
        Reply::Entity(swap_entity("399e8ff5", status, actions))
    }

    #[test]
    fn test_swap_id_from_href() {
        let cnd = Arc::new(ScriptedCnd::new());
        assert_eq!(swap(&cnd, Wallets::new()).id(), "399e8ff5");
    }

    #[test]
    fn test_select_action_rules() {
        let decline = swap_entity("a", "IN_PROGRESS", &["decline"]);
        assert!(matches!(
            select_action(&decline, "decline").unwrap(),
            Discovery::ActionAvailable(action) if action.name == "decline"
        ));
        assert_eq!(select_action(&decline, "fund").unwrap(), Discovery::NoActionAvailable);

        let pair = swap_entity("a", "IN_PROGRESS", &["accept", "decline"]);
        assert!(matches!(
            select_action(&pair, "accept"),
            Err(SdkError::ProtocolViolation(_))
        ));

        let two_ledger = swap_entity("a", "IN_PROGRESS", &["fund", "refund"]);
        assert!(matches!(
            select_action(&two_ledger, "fund"),
            Err(SdkError::ProtocolViolation(_))
        ));

        let repeated = swap_entity("a", "IN_PROGRESS", &["accept", "accept"]);
        assert!(matches!(
            select_action(&repeated, "accept"),
            Err(SdkError::ProtocolViolation(_))
        ));

        let done = swap_entity("a", "SWAPPED", &[]);
        assert_eq!(
            select_action(&done, "redeem").unwrap(),
            Discovery::Terminal("SWAPPED".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_after_action_appears() {
        let mut accept = swap_entity("399e8ff5", "IN_PROGRESS", &["accept"]);
        accept.actions[0].fields.push(Field {
            name: "beta_ledger_refund_identity".into(),
            class: vec!["ethereum".into(), "address".into()],
            kind: Some("text".into()),
            value: None,
            title: None,
        });
        let cnd = Arc::new(ScriptedCnd::new().script(
            HREF,
            vec![entity("IN_PROGRESS", &[]), Reply::Entity(accept)],
        ));

        let mut ethereum = MockEthereumWallet::new();
        ethereum
            .expect_get_account()
            .times(1)
            .returning(|| Ok("0x00a329c0648769a73afac7f9381e08fb43dbea72".to_string()));
        let wallets = Wallets::new().with_ethereum(Arc::new(ethereum));

        let outcome = swap(&cnd, wallets).accept(params()).await.unwrap();

        assert_eq!(outcome, ActionOutcome::Completed);
        assert_eq!(cnd.fetch_count(), 2);
        let executed = cnd.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].0, "accept");
        assert_eq!(
            executed[0].1["beta_ledger_refund_identity"],
            "0x00a329c0648769a73afac7f9381e08fb43dbea72"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_ledger_actions_is_fatal() {
        let cnd = Arc::new(ScriptedCnd::new().script(HREF, vec![entity("IN_PROGRESS", &["fund", "redeem"])]));

        let err = swap(&cnd, Wallets::new()).fund(params()).await.unwrap_err();

        assert!(matches!(err, SdkError::ProtocolViolation(_)));
        assert_eq!(cnd.fetch_count(), 1);
        assert!(cnd.executed().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_and_decline_together_is_fatal() {
        let cnd = Arc::new(ScriptedCnd::new().script(HREF, vec![entity("IN_PROGRESS", &["accept", "decline"])]));

        let err = swap(&cnd, Wallets::new()).accept(params()).await.unwrap_err();

        assert!(matches!(err, SdkError::ProtocolViolation(_)));
        assert_eq!(cnd.fetch_count(), 1);
        assert!(cnd.executed().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_action_never_appears() {
        let cnd = Arc::new(ScriptedCnd::new().script(HREF, vec![entity("IN_PROGRESS", &[])]));

        let err = swap(&cnd, Wallets::new()).redeem(params()).await.unwrap_err();

        assert!(matches!(err, SdkError::Timeout { .. }));
        assert!(cnd.fetch_count() >= 10);
        assert!(cnd.executed().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_are_retried() {
        let cnd = Arc::new(ScriptedCnd::new().script(
            HREF,
            vec![
                Reply::Transport,
                Reply::Transport,
                entity("IN_PROGRESS", &["decline"]),
            ],
        ));

        let outcome = swap(&cnd, Wallets::new()).decline(params()).await.unwrap();

        assert_eq!(outcome, ActionOutcome::Completed);
        assert_eq!(cnd.fetch_count(), 3);
        assert_eq!(cnd.executed_names(), vec!["decline"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_problem_is_not_retried() {
        let cnd = Arc::new(ScriptedCnd::new().script(HREF, vec![Reply::Problem(400)]));

        let err = swap(&cnd, Wallets::new()).accept(params()).await.unwrap_err();

        assert!(matches!(err, SdkError::Problem { status: 400, .. }));
        assert_eq!(cnd.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_swap_stops_discovery() {
        let cnd = Arc::new(ScriptedCnd::new().script(HREF, vec![entity("NOT_SWAPPED", &[])]));

        let err = swap(&cnd, Wallets::new()).refund(params()).await.unwrap_err();

        assert!(matches!(err, SdkError::SwapTerminated { status, .. } if status == "NOT_SWAPPED"));
        assert_eq!(cnd.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fund_dispatches_ledger_action() {
        let cnd = Arc::new(
            ScriptedCnd::new()
                .script(HREF, vec![entity("IN_PROGRESS", &["fund"])])
                .respond_to(
                    "fund",
                    json!({
                        "type": "bitcoin-send-amount-to-address",
                        "payload": {
                            "to": "bcrt1qcqslz7lfn34dl096t5uwurff9spen5h4v2pmap",
                            "amount": "100000000",
                            "network": "regtest"
                        }
                    }),
                ),
        );

        let mut bitcoin = MockBitcoinWallet::new();
        bitcoin
            .expect_send_to_address()
            .withf(|to, amount, network| {
                to == "bcrt1qcqslz7lfn34dl096t5uwurff9spen5h4v2pmap"
                    && *amount == 100_000_000
                    && *network == BitcoinNetwork::Regtest
            })
            .times(1)
            .returning(|_, _, _| Ok("fund-txid".to_string()));
        bitcoin.expect_get_transaction().returning(|txid| {
            Ok(BitcoinTransaction {
                txid: txid.to_string(),
                confirmations: 0,
            })
        });
        let wallets = Wallets::new().with_bitcoin(Arc::new(bitcoin));

        let outcome = swap(&cnd, wallets).fund(params()).await.unwrap();

        let tx = outcome
            .ledger()
            .and_then(|o| o.transaction())
            .expect("fund should produce a transaction")
            .clone();
        assert_eq!(tx.id(), "fund-txid");
        assert_eq!(tx.ledger(), Ledger::Bitcoin);
        assert_eq!(tx.status(None).await.unwrap(), TransactionStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wallet_failure_is_not_retried() {
        let cnd = Arc::new(
            ScriptedCnd::new()
                .script(HREF, vec![entity("IN_PROGRESS", &["redeem"])])
                .respond_to(
                    "redeem",
                    json!({
                        "type": "ethereum-call-contract",
                        "payload": {
                            "contract_address": "0xe2ba5fa3e3fa4e9ac5a9a1d3e2bdd5e5a9e6f9b6",
                            "data": "0x1234",
                            "gas_limit": 100000,
                            "chain_id": 17
                        }
                    }),
                ),
        );

        let mut ethereum = MockEthereumWallet::new();
        ethereum
            .expect_call_contract()
            .times(1)
            .returning(|_, _, _, _| Err(anyhow::anyhow!("insufficient funds for gas")));
        let wallets = Wallets::new().with_ethereum(Arc::new(ethereum));

        let err = swap(&cnd, wallets).redeem(params()).await.unwrap_err();

        assert!(err.is_wallet_error());
        assert_eq!(cnd.executed_names(), vec!["redeem"]);
        assert_eq!(cnd.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_details() {
        let cnd = Arc::new(ScriptedCnd::new().script(HREF, vec![entity("IN_PROGRESS", &[])]));

        let details = swap(&cnd, Wallets::new()).fetch_details().await.unwrap();

        assert_eq!(details.id, "399e8ff5");
        assert_eq!(details.role, "Bob");
        assert_eq!(details.protocol, "rfc003");
        assert_eq!(details.parameters.alpha_asset.quantity, "100000000");
    }
}
