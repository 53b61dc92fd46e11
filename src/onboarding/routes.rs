//! REST endpoints for onboarding resolution and session driving.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

use super::checkpoint::AwaitingInput;
use super::flavor::AgentFlavor;
use super::inputs::OnboardingInputs;
use super::phase::OnboardingPhase;
use super::resolver::PhaseResolver;
use super::session::{OnboardingSessions, SessionRecord, StepUpdate, Suspension};

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub sessions: Arc<OnboardingSessions>,
    /// Used when a start request names no flavor.
    pub default_flavor: AgentFlavor,
}

/// Session view returned by every session endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub thread_id: String,
    pub flavor: AgentFlavor,
    pub phase: OnboardingPhase,
    /// Resolver rule that produced `phase`; absent once ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<&'static str>,
    pub inputs: OnboardingInputs,
    pub task: AwaitingInput,
    pub updated_at: DateTime<Utc>,
}

impl From<&SessionRecord> for SessionStatus {
    fn from(record: &SessionRecord) -> Self {
        let resolution = record.resolution();
        Self {
            thread_id: record.thread_id.clone(),
            flavor: record.flavor,
            phase: resolution.phase,
            rule: resolution.rule,
            inputs: record.effective_inputs(),
            task: record.task.clone(),
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    #[serde(default)]
    flavor: Option<AgentFlavor>,
    #[serde(flatten)]
    inputs: OnboardingInputs,
}

#[derive(Debug, Deserialize)]
struct StartRequest {
    #[serde(default)]
    flavor: Option<AgentFlavor>,
}

#[derive(Debug, Deserialize)]
struct StepRequest {
    step: StepUpdate,
}

#[derive(Debug, Deserialize)]
struct AwaitRequest {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RejectRequest {
    reason: String,
}

/// Maps session errors onto HTTP responses.
struct ApiError(SessionError);

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SessionError::NotFound { .. } => StatusCode::NOT_FOUND,
            SessionError::AlreadyReady { .. } | SessionError::NoPendingInput { .. } => {
                StatusCode::CONFLICT
            }
            SessionError::Store(e) => {
                tracing::warn!("Onboarding store error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({"error": self.0.to_string()}))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "agent-onboarding"
    }))
}

/// POST /api/onboarding/resolve
///
/// Pure resolution of a caller-supplied snapshot. When `flavor` is given its
/// requirement flags override the ones in the body.
async fn resolve(Json(request): Json<ResolveRequest>) -> impl IntoResponse {
    let (resolver, inputs) = match request.flavor {
        Some(flavor) => (
            flavor.resolver(),
            request.inputs.with_requirements(flavor.requirements()),
        ),
        None => (PhaseResolver::standard(), request.inputs),
    };
    let resolution = resolver.explain(&inputs);
    Json(serde_json::json!({
        "phase": resolution.phase,
        "rule": resolution.rule,
    }))
}

/// GET /api/onboarding/sessions
async fn list_sessions(State(state): State<OnboardingRouteState>) -> ApiResult<Vec<SessionStatus>> {
    let records = state.sessions.list().await?;
    Ok(Json(records.iter().map(SessionStatus::from).collect()))
}

/// GET /api/onboarding/{thread_id}
async fn get_session(
    State(state): State<OnboardingRouteState>,
    Path(thread_id): Path<String>,
) -> ApiResult<SessionStatus> {
    let record = state.sessions.status(&thread_id).await?;
    Ok(Json(SessionStatus::from(&record)))
}

/// POST /api/onboarding/{thread_id}/start
async fn start_session(
    State(state): State<OnboardingRouteState>,
    Path(thread_id): Path<String>,
    Json(request): Json<StartRequest>,
) -> ApiResult<SessionStatus> {
    let flavor = request.flavor.unwrap_or(state.default_flavor);
    let record = state.sessions.start(&thread_id, flavor).await?;
    Ok(Json(SessionStatus::from(&record)))
}

/// POST /api/onboarding/{thread_id}/steps
async fn apply_step(
    State(state): State<OnboardingRouteState>,
    Path(thread_id): Path<String>,
    Json(request): Json<StepRequest>,
) -> ApiResult<SessionStatus> {
    let record = state.sessions.apply(&thread_id, request.step).await?;
    Ok(Json(SessionStatus::from(&record)))
}

/// POST /api/onboarding/{thread_id}/await
async fn await_input(
    State(state): State<OnboardingRouteState>,
    Path(thread_id): Path<String>,
    Json(request): Json<AwaitRequest>,
) -> ApiResult<Suspension> {
    let suspension = state
        .sessions
        .await_input(&thread_id, &request.message)
        .await?;
    Ok(Json(suspension))
}

/// POST /api/onboarding/{thread_id}/reject
async fn reject_input(
    State(state): State<OnboardingRouteState>,
    Path(thread_id): Path<String>,
    Json(request): Json<RejectRequest>,
) -> ApiResult<SessionStatus> {
    let record = state
        .sessions
        .reject_input(&thread_id, &request.reason)
        .await?;
    Ok(Json(SessionStatus::from(&record)))
}

/// POST /api/onboarding/{thread_id}/fire
async fn fire_agent(
    State(state): State<OnboardingRouteState>,
    Path(thread_id): Path<String>,
) -> ApiResult<SessionStatus> {
    let record = state.sessions.fire(&thread_id).await?;
    Ok(Json(SessionStatus::from(&record)))
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/onboarding/resolve", post(resolve))
        .route("/api/onboarding/sessions", get(list_sessions))
        .route("/api/onboarding/{thread_id}", get(get_session))
        .route("/api/onboarding/{thread_id}/start", post(start_session))
        .route("/api/onboarding/{thread_id}/steps", post(apply_step))
        .route("/api/onboarding/{thread_id}/await", post(await_input))
        .route("/api/onboarding/{thread_id}/reject", post(reject_input))
        .route("/api/onboarding/{thread_id}/fire", post(fire_agent))
        .with_state(state)
}
