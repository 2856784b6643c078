//! Scoring Service
//!
//! Converts multi-source reputation sub-scores into one weighted 0-850
//! credit score and maps it to a funding ceiling. The score factor weight
//! table is admin-managed and versioned; the ceiling calculation prefers
//! the funding ledger and falls back to the shared local tier schedule.

pub mod aggregator;
pub mod config;
pub mod funding;
pub mod handlers;
pub mod models;
pub mod storage;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use handlers::AppState;
pub use models::{DeveloperScore, ScoreFactor, ScoreRequest, ScoreResponse, WeightTable};
pub use storage::Storage;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/score", post(handlers::compute_score_handler))
        .route("/api/scores/:address", get(handlers::get_score_handler))
        .route("/api/ceiling/:score", get(handlers::get_ceiling_handler))
        .route("/api/factors", get(handlers::list_factors_handler))
        .route("/api/factors/:factor_id", put(handlers::upsert_factor_handler))
        .route(
            "/api/factors/:factor_id/toggle",
            post(handlers::toggle_factor_handler),
        )
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
