//! Transfer Service
//!
//! Moves disbursed USDC across chains through a bridge aggregator and tracks
//! each transfer from quote through execution to a terminal status. Status
//! only advances by polling; the background poller runs exactly while any
//! transfer is non-terminal.

pub mod bridge;
pub mod config;
pub mod handlers;
pub mod models;
pub mod poller;
pub mod storage;
pub mod tracker;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use bridge::{BridgeApi, HttpBridge, MockBridge};
pub use config::Config;
pub use handlers::AppState;
pub use models::{BridgeQuote, QuoteRequest, TransferRecord, TransferStatus};
pub use poller::PollerHandle;
pub use storage::Storage;
pub use tracker::{Tracker, TrackerConfig};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/transfers/quote", post(handlers::quote_handler))
        .route("/api/transfers/execute", post(handlers::execute_handler))
        .route("/api/transfers/poll", post(handlers::poll_handler))
        .route("/api/transfers/:record_id", get(handlers::get_transfer_handler))
        .route(
            "/api/developers/:address/transfers",
            get(handlers::get_developer_transfers_handler),
        )
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
