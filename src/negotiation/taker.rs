//! Taker side of the negotiation
//!
//! Every check runs before the swap request is sent. A failed check returns
//! a `ValidationError` and nothing is submitted to the daemon or the maker.

use super::execution_params::{is_valid_execution_params, ExecutionParams};
use super::order::{is_order_valid, order_matches_criteria, MatchingCriteria, Order, OrderAsset};
use crate::asset::TokenRegistry;
use crate::client::ComitClient;
use crate::cnd::http::check_response;
use crate::cnd::types::{AssetSpec, LedgerSpec, SwapRequest};
use crate::error::{SdkResult, ValidationError};
use crate::swap::Swap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Remote maker as seen by a taker
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MakerClient: Send + Sync {
    async fn get_order_by_trading_pair(&self, trading_pair: &str) -> SdkResult<Order>;

    async fn get_execution_params(&self, order_id: &str) -> SdkResult<ExecutionParams>;

    async fn take_order(&self, order_id: &str, swap_id: &str) -> SdkResult<()>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TakeRequest<'a> {
    swap_id: &'a str,
}

/// Maker reached over its HTTP negotiation API
pub struct HttpMakerClient {
    client: Client,
    base_url: String,
}

impl HttpMakerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SdkResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(2))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MakerClient for HttpMakerClient {
    async fn get_order_by_trading_pair(&self, trading_pair: &str) -> SdkResult<Order> {
        let url = format!("{}/orders/{}", self.base_url, trading_pair);
        let response = self.client.get(&url).send().await?;
        let response = check_response(response, &format!("order for {}", trading_pair)).await?;
        Ok(response.json().await?)
    }

    async fn get_execution_params(&self, order_id: &str) -> SdkResult<ExecutionParams> {
        let url = format!("{}/orders/{}/executionParams", self.base_url, order_id);
        let response = self.client.get(&url).send().await?;
        let response =
            check_response(response, &format!("execution params of order {}", order_id)).await?;
        Ok(response.json().await?)
    }

    async fn take_order(&self, order_id: &str, swap_id: &str) -> SdkResult<()> {
        let url = format!("{}/orders/{}/take", self.base_url, order_id);
        let response = self
            .client
            .post(&url)
            .json(&TakeRequest { swap_id })
            .send()
            .await?;
        check_response(response, &format!("order {}", order_id)).await?;
        Ok(())
    }
}

/// Swap request for an order: the taker funds the ask on alpha and receives the bid on beta
pub fn swap_request_from_order(
    order: &Order,
    params: &ExecutionParams,
    tokens: &TokenRegistry,
) -> SdkResult<SwapRequest> {
    let leg = |side: &OrderAsset| -> SdkResult<(LedgerSpec, AssetSpec)> {
        let unsupported = || ValidationError::UnsupportedAsset {
            ledger: side.ledger.clone(),
            asset: side.asset.clone(),
        };
        let asset = tokens.resolve(&side.ledger, &side.asset).ok_or_else(unsupported)?;
        let ledger = params.ledgers.spec_for(&side.ledger).ok_or_else(unsupported)?;
        let quantity = asset.to_base_units(&side.nominal_amount)?;

        Ok((
            ledger,
            AssetSpec {
                name: asset.swap_name().to_string(),
                quantity: quantity.to_string(),
                token_contract: asset.token_contract().map(str::to_string),
            },
        ))
    };

    let (alpha_ledger, alpha_asset) = leg(&order.ask)?;
    let (beta_ledger, beta_asset) = leg(&order.bid)?;

    Ok(SwapRequest {
        alpha_ledger,
        beta_ledger,
        alpha_asset,
        beta_asset,
        alpha_expiry: params.alpha_expiry,
        beta_expiry: params.beta_expiry,
        alpha_ledger_refund_identity: None,
        beta_ledger_redeem_identity: None,
        peer: params.peer.clone(),
    })
}

pub struct TakerNegotiator {
    maker: Arc<dyn MakerClient>,
    client: ComitClient,
    tokens: TokenRegistry,
}

impl TakerNegotiator {
    pub fn new(maker: Arc<dyn MakerClient>, client: ComitClient, tokens: TokenRegistry) -> Self {
        Self {
            maker,
            client,
            tokens,
        }
    }

    /// Fetch the maker's order for the criteria's trading pair and check it
    pub async fn get_order(&self, criteria: &MatchingCriteria) -> SdkResult<Order> {
        let trading_pair = criteria.trading_pair();
        let order = self.maker.get_order_by_trading_pair(&trading_pair).await?;
        debug!("Maker offers order {:?} on {}", order, trading_pair);

        if !is_order_valid(&order) {
            warn!("Order {} from maker is malformed", order.id);
            return Err(ValidationError::InvalidOrder(order.id).into());
        }
        if !order_matches_criteria(&order, criteria) {
            info!("Order {} does not satisfy the criteria", order.id);
            return Err(ValidationError::CriteriaMismatch(order.id).into());
        }

        Ok(order)
    }

    /// Validate the execution parameters, send the swap request and take the order
    pub async fn take(&self, order: &Order) -> SdkResult<Swap> {
        let params = self.maker.get_execution_params(&order.id).await?;
        if !is_valid_execution_params(&params, super::now()) {
            warn!("Execution params of order {} are unsafe: {:?}", order.id, params);
            return Err(ValidationError::UnsafeExecutionParams(order.id.clone()).into());
        }

        let request = swap_request_from_order(order, &params, &self.tokens)?;
        let swap = self.client.send_swap(request).await?;
        info!("Swap {} created for order {}", swap.id(), order.id);

        self.maker.take_order(&order.id, swap.id()).await?;
        Ok(swap)
    }

    /// Find an order matching the criteria and take it
    pub async fn negotiate_and_take(&self, criteria: &MatchingCriteria) -> SdkResult<(Order, Swap)> {
        let order = self.get_order(criteria).await?;
        let swap = self.take(&order).await?;
        Ok((order, swap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Token;
    use crate::cnd::testing::ScriptedCnd;
    use crate::cnd::types::Peer;
    use crate::error::SdkError;
    use crate::negotiation::execution_params::{BitcoinParams, EthereumParams, NetworkParams};
    use crate::negotiation::order::CriteriaAsset;
    use crate::wallet::ethereum::MockEthereumWallet;
    use crate::wallet::{BitcoinNetwork, Wallets};

    const PAY: &str = "0xB97048628DB6B661D4C2aA833e95Dbe1A905B280";
    const HOUR: u64 = 60 * 60;

    fn tokens() -> TokenRegistry {
        let mut tokens = TokenRegistry::new();
        tokens.register(Token {
            symbol: "PAY".into(),
            contract: PAY.into(),
            decimals: 18,
        });
        tokens
    }

    fn order() -> Order {
        Order {
            id: "order-1".into(),
            valid_until: super::super::now() + HOUR,
            bid: OrderAsset {
                ledger: "ethereum".into(),
                asset: "PAY".into(),
                nominal_amount: "9000".into(),
            },
            ask: OrderAsset {
                ledger: "bitcoin".into(),
                asset: "bitcoin".into(),
                nominal_amount: "1.1".into(),
            },
        }
    }

    fn criteria() -> MatchingCriteria {
        MatchingCriteria {
            bid: CriteriaAsset {
                ledger: "ethereum".into(),
                asset: "pay".into(),
                min_nominal_amount: Some("1000".into()),
                max_nominal_amount: None,
            },
            ask: CriteriaAsset {
                ledger: "bitcoin".into(),
                asset: "bitcoin".into(),
                min_nominal_amount: None,
                max_nominal_amount: Some("2".into()),
            },
            min_rate: Some(8000.0),
        }
    }

    fn params(alpha_in: u64, beta_in: u64) -> ExecutionParams {
        let now = super::super::now();
        ExecutionParams {
            peer: Peer {
                peer_id: "QmMakerPeer".into(),
                address_hint: Some("/ip4/127.0.0.1/tcp/9939".into()),
            },
            alpha_expiry: now + alpha_in,
            beta_expiry: now + beta_in,
            ledgers: NetworkParams {
                bitcoin: Some(BitcoinParams {
                    network: BitcoinNetwork::Regtest,
                }),
                ethereum: Some(EthereumParams { chain_id: 17 }),
                lightning: None,
            },
        }
    }

    fn ethereum_wallet() -> Wallets {
        let mut ethereum = MockEthereumWallet::new();
        ethereum
            .expect_get_account()
            .returning(|| Ok("0x00a329c0648769a73afac7f9381e08fb43dbea72".to_string()));
        Wallets::new().with_ethereum(Arc::new(ethereum))
    }

    fn taker(maker: MockMakerClient, cnd: &Arc<ScriptedCnd>) -> TakerNegotiator {
        TakerNegotiator::new(
            Arc::new(maker),
            ComitClient::new(cnd.clone(), ethereum_wallet()),
            tokens(),
        )
    }

    #[test]
    fn test_swap_request_from_order() {
        let request = swap_request_from_order(&order(), &params(24 * HOUR, 12 * HOUR), &tokens()).unwrap();

        assert_eq!(
            request.alpha_ledger,
            LedgerSpec::Bitcoin {
                network: BitcoinNetwork::Regtest
            }
        );
        assert_eq!(request.alpha_asset.name, "bitcoin");
        assert_eq!(request.alpha_asset.quantity, "110000000");
        assert_eq!(request.beta_asset.name, "erc20");
        assert_eq!(request.beta_asset.quantity, "9000000000000000000000");
        assert_eq!(request.beta_asset.token_contract.as_deref(), Some(PAY));
        assert_eq!(request.peer.peer_id, "QmMakerPeer");
    }

    #[test]
    fn test_unknown_asset_aborts_request() {
        let err = swap_request_from_order(&order(), &params(24 * HOUR, 12 * HOUR), &TokenRegistry::new())
            .unwrap_err();
        assert!(matches!(
            err,
            SdkError::Validation(ValidationError::UnsupportedAsset { .. })
        ));
    }

    #[tokio::test]
    async fn test_negotiate_and_take() {
        let mut maker = MockMakerClient::new();
        maker
            .expect_get_order_by_trading_pair()
            .withf(|pair| pair == "bitcoin-bitcoin-ethereum-pay")
            .times(1)
            .returning(|_| Ok(order()));
        maker
            .expect_get_execution_params()
            .withf(|id| id == "order-1")
            .times(1)
            .returning(|_| Ok(params(24 * HOUR, 12 * HOUR)));
        maker
            .expect_take_order()
            .withf(|order_id, swap_id| order_id == "order-1" && swap_id == "new-swap")
            .times(1)
            .returning(|_, _| Ok(()));
        let cnd = Arc::new(ScriptedCnd::new());

        let (order, swap) = taker(maker, &cnd).negotiate_and_take(&criteria()).await.unwrap();

        assert_eq!(order.id, "order-1");
        assert_eq!(swap.id(), "new-swap");
        let posted = cnd.posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(
            posted[0].beta_ledger_redeem_identity.as_deref(),
            Some("0x00a329c0648769a73afac7f9381e08fb43dbea72")
        );
    }

    #[tokio::test]
    async fn test_invalid_order_aborts_before_any_request() {
        let mut maker = MockMakerClient::new();
        maker.expect_get_order_by_trading_pair().returning(|_| {
            let mut order = order();
            order.bid.nominal_amount = "lots".into();
            Ok(order)
        });
        maker.expect_get_execution_params().never();
        maker.expect_take_order().never();
        let cnd = Arc::new(ScriptedCnd::new());

        let err = taker(maker, &cnd).negotiate_and_take(&criteria()).await.unwrap_err();

        assert!(matches!(err, SdkError::Validation(ValidationError::InvalidOrder(_))));
        assert!(cnd.posted().is_empty());
    }

    #[tokio::test]
    async fn test_criteria_mismatch_aborts() {
        let mut maker = MockMakerClient::new();
        maker.expect_get_order_by_trading_pair().returning(|_| {
            let mut order = order();
            // rate 7000 PAY per BTC, below the 8000 minimum
            order.bid.nominal_amount = "7700".into();
            Ok(order)
        });
        maker.expect_get_execution_params().never();
        maker.expect_take_order().never();
        let cnd = Arc::new(ScriptedCnd::new());

        let err = taker(maker, &cnd).negotiate_and_take(&criteria()).await.unwrap_err();

        assert!(matches!(err, SdkError::Validation(ValidationError::CriteriaMismatch(_))));
        assert!(cnd.posted().is_empty());
    }

    #[tokio::test]
    async fn test_unsafe_execution_params_abort() {
        let mut maker = MockMakerClient::new();
        maker.expect_get_order_by_trading_pair().returning(|_| Ok(order()));
        maker
            .expect_get_execution_params()
            .returning(|_| Ok(params(HOUR, 2 * HOUR)));
        maker.expect_take_order().never();
        let cnd = Arc::new(ScriptedCnd::new());

        let err = taker(maker, &cnd).negotiate_and_take(&criteria()).await.unwrap_err();

        assert!(matches!(
            err,
            SdkError::Validation(ValidationError::UnsafeExecutionParams(_))
        ));
        assert!(cnd.posted().is_empty());
    }

    #[tokio::test]
    async fn test_maker_errors_propagate() {
        let mut maker = MockMakerClient::new();
        maker
            .expect_get_order_by_trading_pair()
            .returning(|pair| Err(SdkError::NotFound(format!("order for {}", pair))));
        let cnd = Arc::new(ScriptedCnd::new());

        let err = taker(maker, &cnd).negotiate_and_take(&criteria()).await.unwrap_err();

        assert!(matches!(err, SdkError::NotFound(_)));
        assert!(cnd.posted().is_empty());
    }
}
