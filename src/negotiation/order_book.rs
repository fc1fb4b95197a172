//! Maker order book shared by concurrent take requests
//!
//! Both indexes live behind one lock so an order is never visible by pair
//! while already gone by id, or the reverse.

use super::order::Order;

use std::collections::HashMap;
use tokio::sync::RwLock;

/// Result of a take attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Take {
    /// Order removed from the book for this swap
    Taken(Order),
    /// Same order already taken with the same swap id
    AlreadyTaken,
    /// No open order with this id
    Unknown,
}

/// Order taken by a swap whose accept loop has not settled yet
#[derive(Debug, Clone)]
struct TakenBy {
    swap_id: String,
    valid_until: u64,
}

#[derive(Debug, Default)]
struct Book {
    by_id: HashMap<String, Order>,
    /// Trading pair -> order ids in publication order
    by_pair: HashMap<String, Vec<String>>,
    /// Order id -> pending take
    taken: HashMap<String, TakenBy>,
}

impl Book {
    fn unlink(&mut self, order: &Order) {
        let pair = order.trading_pair();
        if let Some(ids) = self.by_pair.get_mut(&pair) {
            ids.retain(|id| id != &order.id);
            if ids.is_empty() {
                self.by_pair.remove(&pair);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct OrderBook {
    book: RwLock<Book>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an order; an order with the same id is replaced
    pub async fn insert(&self, order: Order) {
        let mut book = self.book.write().await;
        if let Some(previous) = book.by_id.remove(&order.id) {
            book.unlink(&previous);
        }
        book.taken.remove(&order.id);
        book.by_pair
            .entry(order.trading_pair())
            .or_default()
            .push(order.id.clone());
        book.by_id.insert(order.id.clone(), order);
    }

    /// Oldest unexpired order for a trading pair
    pub async fn by_trading_pair(&self, trading_pair: &str, now: u64) -> Option<Order> {
        let book = self.book.read().await;
        book.by_pair
            .get(&trading_pair.to_lowercase())?
            .iter()
            .filter_map(|id| book.by_id.get(id))
            .find(|order| !order.is_expired(now))
            .cloned()
    }

    /// Unexpired open order by id
    pub async fn by_id(&self, order_id: &str, now: u64) -> Option<Order> {
        self.book
            .read()
            .await
            .by_id
            .get(order_id)
            .filter(|order| !order.is_expired(now))
            .cloned()
    }

    /// Remove an order for a swap; expired orders cannot be taken
    pub async fn take(&self, order_id: &str, swap_id: &str, now: u64) -> Take {
        let mut book = self.book.write().await;

        if book
            .taken
            .get(order_id)
            .is_some_and(|taken| taken.swap_id == swap_id)
        {
            return Take::AlreadyTaken;
        }

        match book.by_id.remove(order_id) {
            Some(order) if order.is_expired(now) => {
                book.unlink(&order);
                Take::Unknown
            }
            Some(order) => {
                book.unlink(&order);
                book.taken.insert(
                    order_id.to_string(),
                    TakenBy {
                        swap_id: swap_id.to_string(),
                        valid_until: order.valid_until,
                    },
                );
                Take::Taken(order)
            }
            None => Take::Unknown,
        }
    }

    /// Put back an order whose take did not lead to an accepted swap
    pub async fn restore(&self, order: Order) {
        self.insert(order).await;
    }

    /// Forget the pending take of an order once the swap's accept loop is done
    pub async fn settle(&self, order_id: &str, swap_id: &str) {
        let mut book = self.book.write().await;
        if book
            .taken
            .get(order_id)
            .is_some_and(|taken| taken.swap_id == swap_id)
        {
            book.taken.remove(order_id);
        }
    }

    /// Drop expired orders and take records, returning the expired orders
    pub async fn prune_expired(&self, now: u64) -> Vec<Order> {
        let mut book = self.book.write().await;
        book.taken.retain(|_, taken| taken.valid_until > now);

        let expired: Vec<String> = book
            .by_id
            .values()
            .filter(|order| order.is_expired(now))
            .map(|order| order.id.clone())
            .collect();

        let mut removed = Vec::with_capacity(expired.len());
        for id in expired {
            if let Some(order) = book.by_id.remove(&id) {
                book.unlink(&order);
                removed.push(order);
            }
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.book.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Takes whose accept loop has not settled
    pub async fn pending_takes(&self) -> usize {
        self.book.read().await.taken.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::order::OrderAsset;
    use std::sync::Arc;

    const NOW: u64 = 1_600_000_000;

    fn order(id: &str, valid_until: u64) -> Order {
        Order {
            id: id.into(),
            valid_until,
            bid: OrderAsset {
                ledger: "ethereum".into(),
                asset: "ether".into(),
                nominal_amount: "50".into(),
            },
            ask: OrderAsset {
                ledger: "bitcoin".into(),
                asset: "bitcoin".into(),
                nominal_amount: "1.5".into(),
            },
        }
    }

    const PAIR: &str = "bitcoin-bitcoin-ethereum-ether";

    #[tokio::test]
    async fn test_lookup_by_pair_and_id() {
        let book = OrderBook::new();
        book.insert(order("a", NOW + 60)).await;

        assert_eq!(book.by_trading_pair(PAIR, NOW).await.unwrap().id, "a");
        assert_eq!(book.by_trading_pair("BITCOIN-bitcoin-ethereum-ether", NOW).await.unwrap().id, "a");
        assert!(book.by_id("a", NOW).await.is_some());
        assert!(book.by_trading_pair("ethereum-ether-bitcoin-bitcoin", NOW).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_orders_are_not_served() {
        let book = OrderBook::new();
        book.insert(order("old", NOW - 1)).await;
        book.insert(order("fresh", NOW + 60)).await;

        assert_eq!(book.by_trading_pair(PAIR, NOW).await.unwrap().id, "fresh");
        assert!(book.by_id("old", NOW).await.is_none());
        assert_eq!(book.take("old", "swap", NOW).await, Take::Unknown);

        let pruned = book.prune_expired(NOW + 60).await;
        assert_eq!(pruned.len(), 1);
        assert!(book.is_empty().await);
    }

    #[tokio::test]
    async fn test_take_removes_from_both_indexes() {
        let book = OrderBook::new();
        book.insert(order("a", NOW + 60)).await;

        assert!(matches!(book.take("a", "swap-1", NOW).await, Take::Taken(o) if o.id == "a"));
        assert!(book.by_id("a", NOW).await.is_none());
        assert!(book.by_trading_pair(PAIR, NOW).await.is_none());

        assert_eq!(book.take("a", "swap-1", NOW).await, Take::AlreadyTaken);
        assert_eq!(book.take("a", "swap-2", NOW).await, Take::Unknown);
    }

    #[tokio::test]
    async fn test_restore_reopens_order() {
        let book = OrderBook::new();
        book.insert(order("a", NOW + 60)).await;
        let Take::Taken(taken) = book.take("a", "swap-1", NOW).await else {
            panic!("order should be taken");
        };

        book.restore(taken).await;

        assert!(book.by_trading_pair(PAIR, NOW).await.is_some());
        assert!(matches!(book.take("a", "swap-2", NOW).await, Take::Taken(_)));
    }

    #[tokio::test]
    async fn test_take_records_are_released() {
        let book = OrderBook::new();
        book.insert(order("a", NOW + 60)).await;
        book.insert(order("b", NOW + 30)).await;
        book.take("a", "swap-a", NOW).await;
        book.take("b", "swap-b", NOW).await;
        assert_eq!(book.pending_takes().await, 2);

        book.settle("a", "swap-other").await;
        assert_eq!(book.pending_takes().await, 2);
        book.settle("a", "swap-a").await;
        assert_eq!(book.pending_takes().await, 1);
        assert_eq!(book.take("a", "swap-a", NOW).await, Take::Unknown);

        book.prune_expired(NOW + 30).await;
        assert_eq!(book.pending_takes().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_takes_fill_once() {
        let book = Arc::new(OrderBook::new());
        book.insert(order("a", NOW + 60)).await;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let book = book.clone();
                tokio::spawn(async move { book.take("a", &format!("swap-{}", i), NOW).await })
            })
            .collect();

        let mut taken = 0;
        for handle in handles {
            if let Take::Taken(_) = handle.await.unwrap() {
                taken += 1;
            }
        }
        assert_eq!(taken, 1);
    }
}
