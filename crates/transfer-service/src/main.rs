//! Transfer Service
//!
//! REST API for cross-chain transfer quotes, execution, and status tracking

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transfer_service::{
    create_router, AppState, BridgeApi, Config, HttpBridge, MockBridge, PollerHandle, Storage,
    Tracker, TrackerConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transfer_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting Transfer Service");
    info!("Redis URL: {}", config.redis_url);
    if config.mock_mode {
        info!("Running with mock bridge");
    } else {
        info!("Bridge URL: {}", config.bridge_url);
    }

    let bridge: Arc<dyn BridgeApi> = if config.mock_mode {
        Arc::new(MockBridge::new())
    } else {
        Arc::new(HttpBridge::new(config.bridge_url.clone()))
    };

    // Initialize storage for the API tracker
    let mut storage = Storage::new(&config.redis_url)
        .await
        .context("Failed to initialize storage")?;

    let in_flight = storage.inflight_ids().await?.len();

    let tracker = Tracker::new(
        storage,
        bridge.clone(),
        TrackerConfig {
            quote_validity_secs: config.quote_validity_secs,
        },
    );

    let poller = PollerHandle::new(config.redis_url.clone(), bridge, config.poll_interval_secs);

    // resume polling for transfers left in flight across a restart
    if in_flight > 0 {
        info!("{} transfer(s) in flight at boot, starting poller", in_flight);
        poller.ensure_running();
    }

    // Create application state
    let state = AppState {
        tracker: Mutex::new(tracker),
        poller,
    };

    // Create router
    let app = create_router(state);

    // Bind and serve
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Transfer Service running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
