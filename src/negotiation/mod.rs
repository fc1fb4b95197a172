//! Maker/taker negotiation
//!
//! This module provides:
//! - The order model and the taker's matching criteria
//! - Execution parameters with the expiry safety rule
//! - The maker order book and accept loop
//! - The taker flow from order discovery to a taken order

pub mod execution_params;
pub mod maker;
pub mod matching;
pub mod order;
pub mod order_book;
pub mod taker;

pub use execution_params::{is_valid_execution_params, ExecutionParams, NetworkParams};
pub use maker::{MakerNegotiator, MakerParams, TakeState, TakeStatus};
pub use matching::{swap_networks_match, swap_order_match};
pub use order::{
    is_order_valid, order_matches_criteria, trading_pair, CriteriaAsset, MatchingCriteria, Order,
    OrderAsset,
};
pub use order_book::OrderBook;
pub use taker::{swap_request_from_order, HttpMakerClient, MakerClient, TakerNegotiator};

/// Current unix time in seconds
pub(crate) fn now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
