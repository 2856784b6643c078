//! API request handlers for Scoring Service

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    aggregator::aggregate,
    funding::{resolve_ceiling, CeilingSource},
    models::{
        DeveloperScore, FactorsResponse, ScoreFactor, ScoreRequest, ScoreResponse,
        UpsertFactorRequest,
    },
    storage::Storage,
};

/// Shared application state
pub struct AppState {
    pub storage: Mutex<Storage>,
    pub ceiling_source: Arc<dyn CeilingSource>,
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

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
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
        "service": "scoring-service"
    }))
}

/// Compute a developer's credit score from submitted per-source raw scores
pub async fn compute_score_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, ApiError> {
    info!("Computing score for developer: {}", payload.developer);

    let mut storage = state.storage.lock().await;

    // one table snapshot for the whole run
    let table = storage.get_table().await?;
    let score = aggregate(&payload.sub_scores, &table);

    let ceiling = resolve_ceiling(state.ceiling_source.as_ref(), score).await?;

    let record = DeveloperScore {
        developer: payload.developer,
        score,
        table_version: table.version,
        computed_at: Utc::now(),
    };
    storage.save_score(&record).await?;

    Ok(Json(ScoreResponse {
        developer: payload.developer,
        score,
        ceiling,
        table_version: table.version,
    }))
}

/// Get the latest computed score for a developer
pub async fn get_score_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<DeveloperScore>, ApiError> {
    let developer = devcred_common::DeveloperAddress::from_hex(&address)?;

    let mut storage = state.storage.lock().await;
    let score = storage.get_score(&developer).await?;

    match score {
        Some(s) => Ok(Json(s)),
        None => Err(ApiError {
            status: StatusCode::NOT_FOUND,
            message: format!("No score recorded for developer: {}", developer),
        }),
    }
}

/// Resolve the funding ceiling for a score
pub async fn get_ceiling_handler(
    State(state): State<Arc<AppState>>,
    Path(score): Path<u16>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ceiling = resolve_ceiling(state.ceiling_source.as_ref(), score).await?;

    Ok(Json(serde_json::json!({
        "score": score,
        "ceiling": ceiling
    })))
}

/// List the score factor table
pub async fn list_factors_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FactorsResponse>, ApiError> {
    let mut storage = state.storage.lock().await;
    let table = storage.get_table().await?;

    Ok(Json(FactorsResponse {
        version: table.version,
        factors: table.factors,
    }))
}

/// Create or replace a score factor
pub async fn upsert_factor_handler(
    State(state): State<Arc<AppState>>,
    Path(factor_id): Path<String>,
    Json(payload): Json<UpsertFactorRequest>,
) -> Result<Json<FactorsResponse>, ApiError> {
    info!("Upserting score factor: {}", factor_id);

    if payload.weight < 0.0 || !payload.weight.is_finite() {
        return Err(ApiError {
            status: StatusCode::BAD_REQUEST,
            message: format!("Invalid weight for factor {}: {}", factor_id, payload.weight),
        });
    }

    let mut storage = state.storage.lock().await;
    let mut table = storage.get_table().await?;

    table.upsert(ScoreFactor {
        id: factor_id,
        name: payload.name,
        weight: payload.weight,
        active: payload.active,
    });
    storage.save_table(&table).await?;

    Ok(Json(FactorsResponse {
        version: table.version,
        factors: table.factors,
    }))
}

/// Toggle a score factor's active flag
pub async fn toggle_factor_handler(
    State(state): State<Arc<AppState>>,
    Path(factor_id): Path<String>,
) -> Result<Json<FactorsResponse>, ApiError> {
    info!("Toggling score factor: {}", factor_id);

    let mut storage = state.storage.lock().await;
    let mut table = storage.get_table().await?;

    if !table.toggle(&factor_id) {
        return Err(ApiError {
            status: StatusCode::NOT_FOUND,
            message: format!("Score factor not found: {}", factor_id),
        });
    }
    storage.save_table(&table).await?;

    Ok(Json(FactorsResponse {
        version: table.version,
        factors: table.factors,
    }))
}
