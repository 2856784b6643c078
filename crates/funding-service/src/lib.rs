//! Funding Service
//!
//! The funding ledger: credit profiles, milestone-gated project funding,
//! settlement, and repayment. Also the authoritative source for the
//! score-to-ceiling schedule consumed by the scoring service.

pub mod config;
pub mod custody_client;
pub mod handlers;
pub mod machine;
pub mod models;
pub mod scoring_client;
pub mod storage;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use handlers::AppState;
pub use machine::FundingMachine;
pub use models::{
    CreditProfile, FundingRequest, Milestone, MilestoneStatus, Project, RepaymentPolicy,
    CONFIRMATION_THRESHOLD,
};
pub use storage::Storage;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/funding/request", post(handlers::request_funding_handler))
        .route("/api/ceiling/:score", get(handlers::get_ceiling_handler))
        .route("/api/profiles/:address", get(handlers::get_profile_handler))
        .route("/api/projects/:project_id", get(handlers::get_project_handler))
        .route(
            "/api/developers/:address/projects",
            get(handlers::get_developer_projects_handler),
        )
        .route(
            "/api/projects/:project_id/milestones/:index/confirm",
            post(handlers::confirm_milestone_handler),
        )
        .route(
            "/api/projects/:project_id/milestones/:index/complete",
            post(handlers::complete_milestone_handler),
        )
        .route(
            "/api/projects/:project_id/settle",
            post(handlers::settle_project_handler),
        )
        .route("/api/repayments", post(handlers::repay_handler))
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
