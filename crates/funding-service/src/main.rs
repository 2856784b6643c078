//! Funding Service
//!
//! REST API for project funding, milestone verification, and repayment

use anyhow::{Context, Result};
use funding_service::custody_client::HttpCustody;
use funding_service::scoring_client::HttpScoring;
use funding_service::{
    create_router, AppState, Config, FundingMachine, RepaymentPolicy, Storage,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "funding_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting Funding Service");
    info!("Redis URL: {}", config.redis_url);
    info!("Scoring URL: {}", config.scoring_url);
    info!("Custody URL: {}", config.custody_url);

    // Initialize storage
    let storage = Storage::new(&config.redis_url)
        .await
        .context("Failed to initialize storage")?;

    let machine = FundingMachine::new(
        storage,
        Arc::new(HttpScoring::new(config.scoring_url.clone())),
        Arc::new(HttpCustody::new(config.custody_url.clone())),
        RepaymentPolicy {
            significant_progress_ratio: config.significant_progress_ratio,
        },
    );

    // Create application state
    let state = AppState {
        machine: Mutex::new(machine),
    };

    // Create router
    let app = create_router(state);

    // Bind and serve
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Funding Service running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
