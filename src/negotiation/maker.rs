//! Maker side of the negotiation
//!
//! Publishes orders, hands out execution parameters and accepts swaps that
//! takers create against an order. A take only schedules the accept loop;
//! the loop waits for the swap to show up, checks it against the order and
//! accepts it.

use super::execution_params::{BitcoinParams, EthereumParams, ExecutionParams, NetworkParams};
use super::matching::{swap_networks_match, swap_order_match};
use super::order::{is_order_valid, Order};
use super::order_book::{OrderBook, Take};
use crate::asset::TokenRegistry;
use crate::client::ComitClient;
use crate::cnd::types::{LedgerSpec, Peer, SwapProperties};
use crate::config::{MakerConfig, OrderConfig};
use crate::error::{SdkError, SdkResult, ValidationError};
use crate::swap::{ActionOutcome, Swap, TryParams};

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Timing of the maker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MakerParams {
    /// Offset of the alpha expiry from the time execution params are requested
    pub alpha_expiry: Duration,
    pub beta_expiry: Duration,
    /// Bound on waiting for a taken swap to become visible
    pub accept_timeout: Duration,
    pub accept_interval: Duration,
    /// Bounds of the accept action itself
    pub try_params: TryParams,
    /// How long a settled take stays queryable
    pub take_retention: Duration,
}

impl Default for MakerParams {
    fn default() -> Self {
        Self {
            alpha_expiry: Duration::from_secs(24 * 60 * 60),
            beta_expiry: Duration::from_secs(12 * 60 * 60),
            accept_timeout: Duration::from_secs(60),
            accept_interval: Duration::from_secs(1),
            try_params: TryParams::default(),
            take_retention: Duration::from_secs(60 * 60),
        }
    }
}

impl MakerParams {
    pub fn from_config(config: &MakerConfig, try_params: TryParams) -> Self {
        Self {
            alpha_expiry: Duration::from_secs(config.alpha_expiry_secs),
            beta_expiry: Duration::from_secs(config.beta_expiry_secs),
            accept_timeout: Duration::from_secs(config.accept_timeout_secs),
            accept_interval: Duration::from_millis(config.accept_interval_ms),
            try_params,
            take_retention: Duration::from_secs(config.take_retention_secs),
        }
    }
}

/// Answer to a take request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeStatus {
    /// Accept loop started
    Scheduled,
    /// Repeated take for a swap already being handled
    AlreadyScheduled,
}

/// Where the accept loop of a taken order stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TakeState {
    Pending { order_id: String },
    Accepted { order_id: String },
    Rejected { order_id: String, reason: String },
}

impl TakeState {
    fn order_id(&self) -> &str {
        match self {
            TakeState::Pending { order_id }
            | TakeState::Accepted { order_id }
            | TakeState::Rejected { order_id, .. } => order_id,
        }
    }
}

struct TakeRecord {
    state: TakeState,
    settled_at: Option<Instant>,
}

struct Inner {
    client: ComitClient,
    order_book: OrderBook,
    takes: DashMap<String, TakeRecord>,
    tokens: TokenRegistry,
    networks: NetworkParams,
    params: MakerParams,
}

#[derive(Clone)]
pub struct MakerNegotiator {
    inner: Arc<Inner>,
}

impl MakerNegotiator {
    pub fn new(
        client: ComitClient,
        tokens: TokenRegistry,
        networks: NetworkParams,
        params: MakerParams,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                order_book: OrderBook::new(),
                takes: DashMap::new(),
                tokens,
                networks,
                params,
            }),
        }
    }

    /// Publish an order; it must be complete and tradeable on our ledgers
    pub async fn add_order(&self, order: Order) -> SdkResult<()> {
        if !is_order_valid(&order) {
            return Err(ValidationError::InvalidOrder(order.id.clone()).into());
        }
        for side in [&order.bid, &order.ask] {
            let tradeable = self.inner.tokens.resolve(&side.ledger, &side.asset).is_some()
                && self.inner.networks.spec_for(&side.ledger).is_some();
            if !tradeable {
                return Err(ValidationError::UnsupportedAsset {
                    ledger: side.ledger.clone(),
                    asset: side.asset.clone(),
                }
                .into());
            }
        }

        let trading_pair = order.trading_pair();
        info!(
            "Publishing order {} on {}: {} {} for {} {}",
            order.id,
            trading_pair,
            order.bid.nominal_amount,
            order.bid.asset,
            order.ask.nominal_amount,
            order.ask.asset
        );
        self.inner.order_book.insert(order).await;

        crate::metrics::record_order_published(&trading_pair);
        crate::metrics::record_open_orders(self.inner.order_book.len().await);
        Ok(())
    }

    /// Build and publish orders from configuration
    pub async fn publish_orders(&self, orders: &[OrderConfig]) -> SdkResult<Vec<Order>> {
        let now = super::now();
        let mut published = Vec::with_capacity(orders.len());
        for config in orders {
            let order = Order::from_config(config, now);
            self.add_order(order.clone()).await?;
            published.push(order);
        }
        Ok(published)
    }

    pub async fn get_order_by_trading_pair(&self, trading_pair: &str) -> Option<Order> {
        self.inner
            .order_book
            .by_trading_pair(trading_pair, super::now())
            .await
    }

    /// Execution parameters for an open order, `None` if there is no such order
    pub async fn get_execution_params(&self, order_id: &str) -> SdkResult<Option<ExecutionParams>> {
        let now = super::now();
        let Some(order) = self.inner.order_book.by_id(order_id, now).await else {
            return Ok(None);
        };

        let info = self.inner.client.cnd().info().await?;

        let mut ledgers = NetworkParams::default();
        for side in [&order.bid, &order.ask] {
            match self.inner.networks.spec_for(&side.ledger) {
                Some(LedgerSpec::Bitcoin { network }) => {
                    ledgers.bitcoin = Some(BitcoinParams { network })
                }
                Some(LedgerSpec::Ethereum { chain_id }) => {
                    ledgers.ethereum = Some(EthereumParams { chain_id })
                }
                Some(LedgerSpec::Lightning { network }) => {
                    ledgers.lightning = Some(BitcoinParams { network })
                }
                None => {
                    return Err(SdkError::Internal(format!(
                        "order {} names unconfigured ledger {}",
                        order.id, side.ledger
                    )))
                }
            }
        }

        Ok(Some(ExecutionParams {
            peer: Peer {
                peer_id: info.id,
                address_hint: info.listen_addresses.into_iter().next(),
            },
            alpha_expiry: now + self.inner.params.alpha_expiry.as_secs(),
            beta_expiry: now + self.inner.params.beta_expiry.as_secs(),
            ledgers,
        }))
    }

    /// Take an order for a swap the taker already created
    ///
    /// Removes the order from the book and starts the accept loop in the
    /// background. Fails with `NotFound` for unknown or expired orders.
    pub async fn take_order(&self, order_id: &str, swap_id: &str) -> SdkResult<TakeStatus> {
        if self
            .inner
            .takes
            .get(swap_id)
            .is_some_and(|record| record.state.order_id() == order_id)
        {
            debug!("Swap {} already took order {}", swap_id, order_id);
            return Ok(TakeStatus::AlreadyScheduled);
        }

        match self
            .inner
            .order_book
            .take(order_id, swap_id, super::now())
            .await
        {
            Take::AlreadyTaken => {
                debug!("Order {} already taken by swap {}", order_id, swap_id);
                Ok(TakeStatus::AlreadyScheduled)
            }
            Take::Unknown => Err(SdkError::NotFound(format!("order {}", order_id))),
            Take::Taken(order) => {
                info!("Order {} taken by swap {}", order_id, swap_id);
                self.inner.takes.insert(
                    swap_id.to_string(),
                    TakeRecord {
                        state: TakeState::Pending {
                            order_id: order.id.clone(),
                        },
                        settled_at: None,
                    },
                );
                crate::metrics::record_open_orders(self.inner.order_book.len().await);

                let maker = self.clone();
                let swap_id = swap_id.to_string();
                tokio::spawn(async move {
                    if let Err(e) = maker.accept_taken_order(order, swap_id.clone()).await {
                        error!("Swap {} not accepted: {}", swap_id, e);
                    }
                });

                Ok(TakeStatus::Scheduled)
            }
        }
    }

    pub fn take_state(&self, swap_id: &str) -> Option<TakeState> {
        self.inner.takes.get(swap_id).map(|record| record.state.clone())
    }

    pub async fn open_orders(&self) -> usize {
        self.inner.order_book.len().await
    }

    /// Drop expired orders and takes settled longer ago than the retention window
    pub async fn prune_expired(&self) -> usize {
        let pruned = self.inner.order_book.prune_expired(super::now()).await;
        for order in &pruned {
            debug!("Order {} expired", order.id);
        }

        let retention = self.inner.params.take_retention;
        self.inner.takes.retain(|swap_id, record| match record.settled_at {
            Some(settled_at) if settled_at.elapsed() >= retention => {
                debug!("Forgetting take of swap {}", swap_id);
                false
            }
            _ => true,
        });
        crate::metrics::record_open_orders(self.inner.order_book.len().await);
        pruned.len()
    }

    async fn accept_taken_order(&self, order: Order, swap_id: String) -> SdkResult<ActionOutcome> {
        let started = Instant::now();
        let order_id = order.id.clone();
        let result = self.wait_and_accept(&order, &swap_id).await;

        let (state, outcome) = match &result {
            Ok(_) => (
                TakeState::Accepted {
                    order_id: order.id.clone(),
                },
                "accepted",
            ),
            Err(e) => {
                let outcome = match e {
                    SdkError::Validation(_) => "mismatch",
                    SdkError::Timeout { .. } => "timeout",
                    _ => "failed",
                };
                (
                    TakeState::Rejected {
                        order_id: order.id.clone(),
                        reason: e.to_string(),
                    },
                    outcome,
                )
            }
        };

        self.inner.takes.insert(
            swap_id.clone(),
            TakeRecord {
                state,
                settled_at: Some(Instant::now()),
            },
        );
        self.inner.order_book.settle(&order_id, &swap_id).await;

        // The swap was never accepted in these cases, so the order is still fillable
        if matches!(outcome, "mismatch" | "timeout") && !order.is_expired(super::now()) {
            info!("Reopening order {} after {} of swap {}", order_id, outcome, swap_id);
            self.inner.order_book.restore(order).await;
            crate::metrics::record_open_orders(self.inner.order_book.len().await);
        }

        crate::metrics::record_order_taken(outcome, started.elapsed().as_secs_f64());
        result
    }

    async fn wait_and_accept(&self, order: &Order, swap_id: &str) -> SdkResult<ActionOutcome> {
        let (swap, details) = match tokio::time::timeout(
            self.inner.params.accept_timeout,
            self.wait_for_swap(swap_id),
        )
        .await
        {
            Ok(found) => found?,
            Err(_) => {
                return Err(SdkError::Timeout {
                    operation: format!("swap {} to become visible", swap_id),
                })
            }
        };

        if !swap_order_match(&details.parameters, order, &self.inner.tokens)
            || !swap_networks_match(&details.parameters, &self.inner.networks)
        {
            warn!("Swap {} does not match order {}, not accepting", swap_id, order.id);
            return Err(ValidationError::SwapOrderMismatch {
                swap_id: swap_id.to_string(),
                order_id: order.id.clone(),
            }
            .into());
        }

        let outcome = swap.accept(self.inner.params.try_params).await?;
        info!("Accepted swap {} for order {}", swap_id, order.id);
        Ok(outcome)
    }

    async fn wait_for_swap(&self, swap_id: &str) -> SdkResult<(Swap, SwapProperties)> {
        loop {
            match self.inner.client.retrieve_swap_by_id(swap_id).await {
                Ok(Some(swap)) => match swap.fetch_details().await {
                    Ok(details) => return Ok((swap, details)),
                    Err(SdkError::NotFound(_)) => debug!("Swap {} vanished, retrying", swap_id),
                    Err(e) if e.is_retryable() => warn!("Fetching swap {} failed: {}", swap_id, e),
                    Err(e) => return Err(e),
                },
                Ok(None) => debug!("Swap {} not yet visible", swap_id),
                Err(e) if e.is_retryable() => warn!("Looking up swap {} failed: {}", swap_id, e),
                Err(e) => return Err(e),
            }

            tokio::time::sleep(self.inner.params.accept_interval).await;
        }
    }
}
