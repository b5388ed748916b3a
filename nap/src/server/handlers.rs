//! Route handlers

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::AppState;
use crate::domain::{ExecutionGraph, ExecutionStep, RequirementsVerdict};
use crate::error::EngineError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalRequest {
    pub goal: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateArtifactRequest {
    pub goal: String,
    pub step: ExecutionStep,
}

/// `artifact` is `null` when the provider returned nothing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactResponse {
    pub artifact: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// Failure of a request, rendered as `{ "error": message }`
pub enum ApiError {
    BadRequest(String),
    Engine(EngineError),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Engine(err) => {
                error!(kind = err.kind(), error = %err, "Operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("health: called");
    Json(HealthResponse {
        status: "ok".to_string(),
        provider: state.engine.provider().map(|p| p.name().to_string()),
        model: state.engine.model().map(str::to_string),
    })
}

pub async fn analyze_requirements(
    State(state): State<AppState>,
    body: Result<Json<GoalRequest>, JsonRejection>,
) -> Result<Json<RequirementsVerdict>, ApiError> {
    let Json(request) = body?;
    info!(goal_len = request.goal.len(), "Analyzing requirements");
    let verdict = state.engine.analyze(&request.goal).await?;
    Ok(Json(verdict))
}

pub async fn generate_graph(
    State(state): State<AppState>,
    body: Result<Json<GoalRequest>, JsonRejection>,
) -> Result<Json<ExecutionGraph>, ApiError> {
    let Json(request) = body?;
    info!(goal_len = request.goal.len(), "Compiling graph");
    let graph = state.engine.compile(&request.goal).await?;
    Ok(Json(graph))
}

pub async fn generate_artifact(
    State(state): State<AppState>,
    body: Result<Json<GenerateArtifactRequest>, JsonRejection>,
) -> Result<Json<ArtifactResponse>, ApiError> {
    let Json(request) = body?;
    info!(step_id = %request.step.id, title = %request.step.title, "Generating artifact");
    let artifact = state.engine.generate(&request.goal, &request.step).await?;
    Ok(Json(ArtifactResponse { artifact }))
}
