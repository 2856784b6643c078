//! API request handlers for Funding Service

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use devcred_common::{ceiling_for_score, DeveloperAddress};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    machine::FundingMachine,
    models::{
        CompleteMilestoneRequest, CompleteMilestoneResponse, CreditProfile, FundingRequest,
        FundingResponse, Project, RepaymentRequest, RepaymentResponse, SettleProjectRequest,
        SettleProjectResponse,
    },
};

/// Shared application state
pub struct AppState {
    pub machine: Mutex<FundingMachine>,
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
        "service": "funding-service"
    }))
}

/// Fund a new project from a milestone plan
pub async fn request_funding_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FundingRequest>,
) -> Result<Json<FundingResponse>, ApiError> {
    info!("Funding request from developer: {}", payload.developer);

    let mut machine = state.machine.lock().await;
    let response = machine.request_funding(payload).await?;

    Ok(Json(response))
}

/// Authoritative score-to-ceiling lookup backed by the shared tier schedule
pub async fn get_ceiling_handler(
    Path(score): Path<u16>,
) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(serde_json::json!({
        "score": score,
        "ceiling": ceiling_for_score(score)
    })))
}

/// Get a developer's credit profile
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<CreditProfile>, ApiError> {
    let developer = DeveloperAddress::from_hex(&address)?;

    let mut machine = state.machine.lock().await;
    let profile = machine.profile(&developer).await?;

    Ok(Json(profile))
}

/// Get a project by id
pub async fn get_project_handler(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<u64>,
) -> Result<Json<Project>, ApiError> {
    let mut machine = state.machine.lock().await;
    let project = machine.project(project_id).await?;

    Ok(Json(project))
}

/// Get all projects for a developer, newest first
pub async fn get_developer_projects_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let developer = DeveloperAddress::from_hex(&address)?;

    let mut machine = state.machine.lock().await;
    let projects = machine.developer_projects(&developer).await?;

    Ok(Json(serde_json::json!({
        "developer": developer,
        "projects": projects,
        "total": projects.len()
    })))
}

/// Record one confirmation on a milestone
pub async fn confirm_milestone_handler(
    State(state): State<Arc<AppState>>,
    Path((project_id, index)): Path<(u64, usize)>,
) -> Result<Json<Project>, ApiError> {
    info!(
        "Confirmation for milestone {} of project {}",
        index, project_id
    );

    let mut machine = state.machine.lock().await;
    let project = machine.confirm_milestone(project_id, index).await?;

    Ok(Json(project))
}

/// Complete a milestone, releasing its reward
pub async fn complete_milestone_handler(
    State(state): State<Arc<AppState>>,
    Path((project_id, index)): Path<(u64, usize)>,
    Json(payload): Json<CompleteMilestoneRequest>,
) -> Result<Json<CompleteMilestoneResponse>, ApiError> {
    info!(
        "Completion attempt for milestone {} of project {} by {}",
        index, project_id, payload.caller
    );

    let mut machine = state.machine.lock().await;
    let response = machine
        .complete_milestone(project_id, index, payload.caller)
        .await?;

    Ok(Json(response))
}

/// Settle (close) a project
pub async fn settle_project_handler(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<u64>,
    Json(payload): Json<SettleProjectRequest>,
) -> Result<Json<SettleProjectResponse>, ApiError> {
    info!("Settling project {} for {}", project_id, payload.caller);

    let mut machine = state.machine.lock().await;
    let response = machine.settle_project(project_id, payload.caller).await?;

    Ok(Json(response))
}

/// Repay part or all of an outstanding loan
pub async fn repay_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RepaymentRequest>,
) -> Result<Json<RepaymentResponse>, ApiError> {
    info!(
        "Repayment of {} from developer: {}",
        payload.amount, payload.developer
    );

    let mut machine = state.machine.lock().await;
    let response = machine.repay(payload).await?;

    Ok(Json(response))
}
