//! Scoring Service
//!
//! REST API for credit scoring and funding ceiling lookups

use anyhow::{Context, Result};
use scoring_service::funding::LedgerCeiling;
use scoring_service::{create_router, AppState, Config, Storage};
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
                .unwrap_or_else(|_| "scoring_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting Scoring Service");
    info!("Redis URL: {}", config.redis_url);
    info!("Ledger URL: {}", config.ledger_url);

    // Initialize storage
    let storage = Storage::new(&config.redis_url)
        .await
        .context("Failed to initialize storage")?;

    // Create application state
    let state = AppState {
        storage: Mutex::new(storage),
        ceiling_source: Arc::new(LedgerCeiling::new(config.ledger_url.clone())),
    };

    // Create router
    let app = create_router(state);

    // Bind and serve
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Scoring Service running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
