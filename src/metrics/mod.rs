//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Ledger actions dispatched to wallets
//! - Swap actions executed against the daemon
//! - Orders published and taken by the maker

use crate::error::{SdkError, SdkResult};

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    // Execution metrics
    pub static ref LEDGER_ACTIONS: CounterVec = register_counter_vec!(
        "swap_sdk_ledger_actions_total",
        "Ledger actions dispatched to wallets by tag and outcome",
        &["action", "outcome"]
    ).unwrap();

    pub static ref SWAP_ACTIONS: CounterVec = register_counter_vec!(
        "swap_sdk_swap_actions_total",
        "Swap actions executed by name and outcome",
        &["action", "outcome"]
    ).unwrap();

    // Negotiation metrics
    pub static ref ORDERS_PUBLISHED: CounterVec = register_counter_vec!(
        "swap_sdk_orders_published_total",
        "Orders published by trading pair",
        &["trading_pair"]
    ).unwrap();

    pub static ref ORDERS_OPEN: Gauge = register_gauge!(
        "swap_sdk_orders_open",
        "Orders currently in the order book"
    ).unwrap();

    pub static ref ORDERS_TAKEN: CounterVec = register_counter_vec!(
        "swap_sdk_orders_taken_total",
        "Order takes by outcome of the accept loop",
        &["outcome"]
    ).unwrap();

    pub static ref ACCEPT_LATENCY: HistogramVec = register_histogram_vec!(
        "swap_sdk_accept_latency_seconds",
        "Time from take request to accepted swap",
        &["outcome"],
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> SdkResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| SdkError::Internal(format!("cannot bind metrics port: {}", e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| SdkError::Internal(format!("metrics server failed: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> Result<String, StatusCode> {
    render().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Current metrics in the Prometheus text format
pub fn render() -> SdkResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| SdkError::Internal(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| SdkError::Internal(e.to_string()))
}

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

// Helper functions to record metrics

pub fn record_ledger_action(tag: &str, success: bool) {
    LEDGER_ACTIONS
        .with_label_values(&[tag, outcome(success)])
        .inc();
}

pub fn record_swap_action(action: &str, success: bool) {
    SWAP_ACTIONS
        .with_label_values(&[action, outcome(success)])
        .inc();
}

pub fn record_order_published(trading_pair: &str) {
    ORDERS_PUBLISHED.with_label_values(&[trading_pair]).inc();
}

pub fn record_open_orders(count: usize) {
    ORDERS_OPEN.set(count as f64);
}

/// `outcome` is one of `accepted`, `mismatch`, `timeout`, `failed`
pub fn record_order_taken(outcome: &str, latency_secs: f64) {
    ORDERS_TAKEN.with_label_values(&[outcome]).inc();
    ACCEPT_LATENCY
        .with_label_values(&[outcome])
        .observe(latency_secs);
}
