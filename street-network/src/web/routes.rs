//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tracing::warn;

use crate::manager::ResolveError;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(deployments))
        .route("/status/:deployment", get(deployment_status))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Registered deployments.
async fn deployments(State(state): State<AppState>) -> Json<DeploymentsResponse> {
    let deployments = state
        .manager
        .deployments()
        .into_iter()
        .map(String::from)
        .collect();
    Json(DeploymentsResponse { deployments })
}

/// Status of every backend of a deployment.
async fn deployment_status(
    State(state): State<AppState>,
    Path(deployment): Path<String>,
) -> Result<Json<DeploymentStatusResponse>, AppError> {
    let street_networks = state.manager.statuses(&deployment)?;
    Ok(Json(DeploymentStatusResponse {
        deployment,
        street_networks,
    }))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound { message: String },
    Internal { message: String },
}

impl From<ResolveError> for AppError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::UnknownDeployment(_) => AppError::NotFound {
                message: e.to_string(),
            },
            _ => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message.clone()),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message.clone()),
        };

        warn!(%status, "{}", message);

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
