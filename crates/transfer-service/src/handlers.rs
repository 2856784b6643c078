//! API request handlers for Transfer Service

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use devcred_common::DeveloperAddress;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    models::{BridgeQuote, ExecuteRequest, PollResponse, QuoteRequest, TransferRecord},
    poller::PollerHandle,
    tracker::Tracker,
};

/// Shared application state
pub struct AppState {
    pub tracker: Mutex<Tracker>,
    pub poller: PollerHandle,
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<devcred_common::Error> for ApiError {
    fn from(err: devcred_common::Error) -> Self {
        use devcred_common::Error;

        let status = match &err {
            Error::IneligibleScore { .. }
            | Error::BudgetExceeded { .. }
            | Error::InvalidAmount { .. }
            | Error::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::StaleQuote(_) | Error::InvalidState(_) => StatusCode::CONFLICT,
            Error::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "transfer-service"
    }))
}

/// Request a transfer quote
pub async fn quote_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuoteRequest>,
) -> Result<Json<BridgeQuote>, ApiError> {
    info!(
        "Quote request: {} {} from {} to {}",
        payload.from_amount, payload.from_token, payload.source_chain, payload.dest_chain
    );

    let mut tracker = state.tracker.lock().await;
    let quote = tracker.request_quote(payload).await?;

    Ok(Json(quote))
}

/// Execute a previously issued quote
pub async fn execute_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExecuteRequest>,
) -> Result<Json<TransferRecord>, ApiError> {
    info!(
        "Executing quote {} for {}",
        payload.quote_id, payload.developer
    );

    let mut tracker = state.tracker.lock().await;
    let record = tracker.execute(payload).await?;
    drop(tracker);

    // a record is now in flight
    state.poller.ensure_running();

    Ok(Json(record))
}

/// Get a transfer record by id
pub async fn get_transfer_handler(
    State(state): State<Arc<AppState>>,
    Path(record_id): Path<String>,
) -> Result<Json<TransferRecord>, ApiError> {
    let mut tracker = state.tracker.lock().await;
    let record = tracker.record(&record_id).await?;

    Ok(Json(record))
}

/// Get a developer's transfer history, newest first
pub async fn get_developer_transfers_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let developer = DeveloperAddress::from_hex(&address)?;

    let mut tracker = state.tracker.lock().await;
    let transfers = tracker.developer_transfers(&developer).await?;

    Ok(Json(serde_json::json!({
        "developer": developer,
        "transfers": transfers,
        "total": transfers.len()
    })))
}

/// Run one poll cycle immediately (the manual retry path for stuck records)
pub async fn poll_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PollResponse>, ApiError> {
    let mut tracker = state.tracker.lock().await;
    let remaining = tracker.poll_cycle().await?;
    drop(tracker);

    if remaining > 0 {
        state.poller.ensure_running();
    }

    Ok(Json(PollResponse {
        remaining_in_flight: remaining,
    }))
}
