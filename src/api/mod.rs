//! Maker negotiation HTTP API

use crate::error::{SdkError, SdkResult};
use crate::negotiation::{MakerNegotiator, TakeStatus};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub maker: MakerNegotiator,
}

/// Routes of the maker API
///
/// All order routes share the `:key` segment: a trading pair for the order
/// lookup, an order id for the other two.
pub fn router(maker: MakerNegotiator) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/orders/:key", get(get_order))
        .route("/orders/:key/executionParams", get(get_execution_params))
        .route("/orders/:key/take", post(take_order))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { maker })
}

/// Run the HTTP API server
pub async fn run_server(host: &str, port: u16, maker: MakerNegotiator) -> SdkResult<()> {
    let app = router(maker);

    let addr = format!("{}:{}", host, port);
    info!("Starting maker API on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SdkError::Internal(format!("cannot bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| SdkError::Internal(format!("maker API failed: {}", e)))?;

    Ok(())
}

/// Health check endpoint - basic liveness
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        open_orders: state.maker.open_orders().await,
    })
}

async fn get_order(State(state): State<AppState>, Path(trading_pair): Path<String>) -> Response {
    match state.maker.get_order_by_trading_pair(&trading_pair).await {
        Some(order) => Json(order).into_response(),
        None => problem(
            StatusCode::NOT_FOUND,
            "Order not found",
            Some(format!("no open order for {}", trading_pair)),
        ),
    }
}

async fn get_execution_params(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Response {
    match state.maker.get_execution_params(&order_id).await {
        Ok(Some(params)) => Json(params).into_response(),
        Ok(None) => problem(
            StatusCode::NOT_FOUND,
            "Order not found",
            Some(format!("no open order {}", order_id)),
        ),
        Err(e) => {
            warn!("Execution params for {} unavailable: {}", order_id, e);
            problem(StatusCode::BAD_GATEWAY, "Swap daemon unavailable", Some(e.to_string()))
        }
    }
}

async fn take_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    body: Option<Json<TakeRequest>>,
) -> Response {
    let Some(swap_id) = body.and_then(|Json(body)| body.swap_id).filter(|id| !id.is_empty()) else {
        return problem(StatusCode::BAD_REQUEST, "Missing swapId", None);
    };

    match state.maker.take_order(&order_id, &swap_id).await {
        Ok(status) => Json(TakeResponse {
            order_id,
            swap_id,
            status: match status {
                TakeStatus::Scheduled => "scheduled",
                TakeStatus::AlreadyScheduled => "already_scheduled",
            },
        })
        .into_response(),
        Err(SdkError::NotFound(what)) => problem(StatusCode::NOT_FOUND, "Order not found", Some(what)),
        Err(e) => problem(StatusCode::INTERNAL_SERVER_ERROR, "Take failed", Some(e.to_string())),
    }
}

fn problem(status: StatusCode, title: &str, detail: Option<String>) -> Response {
    (
        status,
        Json(ProblemResponse {
            title: title.to_string(),
            detail,
        }),
    )
        .into_response()
}

// Request and response types

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TakeRequest {
    swap_id: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    open_orders: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TakeResponse {
    order_id: String,
    swap_id: String,
    status: &'static str,
}

#[derive(Serialize)]
struct ProblemResponse {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}
