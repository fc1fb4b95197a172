//! Entry point for sending and listing swaps

use crate::action::LedgerActionDispatcher;
use crate::cnd::types::{is_terminal_status, LedgerSpec, SwapRequest, STATUS_IN_PROGRESS};
use crate::cnd::{Cnd, RFC003_SWAPS_PATH};
use crate::error::{SdkError, SdkResult, WalletError};
use crate::swap::Swap;
use crate::wallet::Wallets;

use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Client bound to one daemon and one set of wallets
#[derive(Clone)]
pub struct ComitClient {
    cnd: Arc<dyn Cnd>,
    dispatcher: LedgerActionDispatcher,
}

impl ComitClient {
    pub fn new(cnd: Arc<dyn Cnd>, wallets: Wallets) -> Self {
        Self {
            cnd,
            dispatcher: LedgerActionDispatcher::new(wallets),
        }
    }

    pub fn cnd(&self) -> &Arc<dyn Cnd> {
        &self.cnd
    }

    pub fn wallets(&self) -> &Wallets {
        self.dispatcher.wallets()
    }

    /// Send a swap request, filling our Ethereum identities when left empty
    pub async fn send_swap(&self, mut request: SwapRequest) -> SdkResult<Swap> {
        let alpha_needs = matches!(request.alpha_ledger, LedgerSpec::Ethereum { .. })
            && request.alpha_ledger_refund_identity.is_none();
        let beta_needs = matches!(request.beta_ledger, LedgerSpec::Ethereum { .. })
            && request.beta_ledger_redeem_identity.is_none();

        if alpha_needs || beta_needs {
            let account = self
                .wallets()
                .ethereum()?
                .get_account()
                .await
                .map_err(|e| WalletError::new("ethereum-get-account", json!({}), e))?;
            if alpha_needs {
                request.alpha_ledger_refund_identity = Some(account.clone());
            }
            if beta_needs {
                request.beta_ledger_redeem_identity = Some(account);
            }
        }

        let href = self.cnd.post_swap(&request).await?;
        info!("Swap request sent to {}: {}", request.peer.peer_id, href);
        Ok(self.swap(href))
    }

    /// Swap with the given id, or `None` if the daemon does not know it
    pub async fn retrieve_swap_by_id(&self, swap_id: &str) -> SdkResult<Option<Swap>> {
        let href = format!("{}/{}", RFC003_SWAPS_PATH, swap_id);
        match self.cnd.fetch(&href).await {
            Ok(entity) => {
                let href = entity.self_href().map(str::to_string).unwrap_or(href);
                Ok(Some(self.swap(href)))
            }
            Err(SdkError::NotFound(_)) => {
                debug!("Swap {} not known to the daemon", swap_id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Swaps waiting for our accept or decline
    pub async fn get_new_swaps(&self) -> SdkResult<Vec<Swap>> {
        self.swaps_where(|entity| entity.has_action("accept")).await
    }

    pub async fn get_ongoing_swaps(&self) -> SdkResult<Vec<Swap>> {
        self.swaps_where(|entity| entity.status() == Some(STATUS_IN_PROGRESS))
            .await
    }

    pub async fn get_done_swaps(&self) -> SdkResult<Vec<Swap>> {
        self.swaps_where(|entity| entity.status().map(is_terminal_status).unwrap_or(false))
            .await
    }

    pub async fn peer_id(&self) -> SdkResult<String> {
        Ok(self.cnd.info().await?.id)
    }

    pub async fn peer_listen_addresses(&self) -> SdkResult<Vec<String>> {
        Ok(self.cnd.info().await?.listen_addresses)
    }

    fn swap(&self, href: String) -> Swap {
        Swap::new(href, self.cnd.clone(), self.dispatcher.clone())
    }

    async fn swaps_where<F>(&self, predicate: F) -> SdkResult<Vec<Swap>>
    where
        F: Fn(&crate::siren::Entity) -> bool,
    {
        let swaps = self.cnd.get_swaps().await?;
        Ok(swaps
            .iter()
            .filter(|entity| predicate(entity))
            .filter_map(|entity| entity.self_href().map(str::to_string))
            .map(|href| self.swap(href))
            .collect())
    }
}
