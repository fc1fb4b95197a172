//! Swap maker - publishes orders and accepts the swaps takers create for them
//!
//! Connects to the local swap daemon, publishes the configured orders and
//! serves the negotiation API takers use to fetch and take them.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use tesseract_swap_sdk::api;
use tesseract_swap_sdk::asset::TokenRegistry;
use tesseract_swap_sdk::client::ComitClient;
use tesseract_swap_sdk::cnd::HttpCnd;
use tesseract_swap_sdk::config::Settings;
use tesseract_swap_sdk::metrics::MetricsServer;
use tesseract_swap_sdk::negotiation::{MakerNegotiator, MakerParams, NetworkParams};
use tesseract_swap_sdk::wallet::Wallets;

const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting swap maker v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    let maker_config = settings
        .maker
        .clone()
        .context("Configuration has no [maker] section")?;
    info!(
        "Loaded configuration with {} orders and {} tokens",
        maker_config.orders.len(),
        settings.tokens.len()
    );

    // Connect to the swap daemon
    let cnd = Arc::new(HttpCnd::new(
        &settings.cnd.url,
        Duration::from_secs(settings.cnd.http_timeout_secs),
    )?);
    // Wallets are supplied by embedders of the library; the daemon alone only negotiates
    let client = ComitClient::new(cnd, Wallets::new());
    let peer_id = client
        .peer_id()
        .await
        .with_context(|| format!("Swap daemon at {} unreachable", settings.cnd.url))?;
    info!("Connected to swap daemon as {}", peer_id);

    let maker = MakerNegotiator::new(
        client,
        TokenRegistry::from_config(&settings.tokens),
        NetworkParams::from_config(&settings.ledgers)?,
        MakerParams::from_config(&maker_config, settings.try_params()),
    );

    let published = maker.publish_orders(&maker_config.orders).await?;
    for order in &published {
        info!("Order {} open on {}", order.id, order.trading_pair());
    }

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Start API server
    let api_handle = tokio::spawn({
        let maker = maker.clone();
        let host = maker_config.host.clone();
        let port = maker_config.port;
        async move {
            if let Err(e) = api::run_server(&host, port, maker).await {
                error!("API server error: {}", e);
            }
        }
    });

    // Expired order pruning loop
    let prune_handle = tokio::spawn({
        let maker = maker.clone();
        async move {
            loop {
                tokio::time::sleep(PRUNE_INTERVAL).await;

                let pruned = maker.prune_expired().await;
                if pruned > 0 {
                    warn!("{} orders expired without being taken", pruned);
                }
            }
        }
    });

    info!("Swap maker is running");
    info!("API server: http://{}:{}", maker_config.host, maker_config.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    // Abort background tasks
    let mut handles = vec![api_handle, prune_handle];
    handles.extend(metrics_handle);
    for handle in &handles {
        handle.abort();
    }
    futures::future::join_all(handles).await;

    info!("Swap maker stopped with {} open orders", maker.open_orders().await);
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tesseract_swap_sdk=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
