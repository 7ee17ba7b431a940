//! Route handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::domain::{generate_id, RunResult};
use crate::runtime::{RunError, RunRequest};
use crate::signals::{AggregationResult, MetricsSnapshot, SignalQuery};

use super::{AppState, JsonResponse};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route("/agent-runs", post(run_agent))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === /health ===

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    healthy: bool,
    version: String,
    uptime_seconds: u64,
    aggregation: MetricsSnapshot,
}

async fn health(State(state): State<AppState>) -> Json<JsonResponse<HealthResponse>> {
    Json(JsonResponse::ok(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        aggregation: state.metrics.snapshot(),
    }))
}

// === /sessions (orchestration entrypoint) ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest {
    #[serde(default)]
    subject_id: String,
    #[serde(default)]
    topic: String,
    #[serde(default)]
    week: Option<u32>,
    #[serde(default)]
    day: Option<u32>,
    #[serde(default)]
    force_refresh: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    session_id: String,
    plan_summary: String,
    degraded_mode: bool,
    cache_hits: u32,
    cache_misses: u32,
    signal_quality: String,
}

/// Signal quality classification for the session response:
/// every agent fresh -> full; all present but some stale -> partial;
/// any agent entirely missing -> degraded.
fn signal_quality(result: &AggregationResult) -> &'static str {
    if result.is_degraded() {
        "degraded"
    } else if result.fresh_count() == result.signals.len() as u32 {
        "full"
    } else {
        "partial"
    }
}

async fn create_session(
    State(state): State<AppState>,
    body: Result<Json<SessionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(json) => json,
        Err(rejection) => return bad_request(format!("malformed request body: {}", rejection)),
    };
    if request.subject_id.trim().is_empty() {
        return bad_request("subjectId is required");
    }
    if request.topic.trim().is_empty() {
        return bad_request("topic is required");
    }

    let query = SignalQuery::new(request.subject_id.as_str(), request.topic.as_str())
        .with_window(request.week, request.day);
    let result = state.aggregator.get_all_signals(&query, request.force_refresh).await;

    let contributing = result.signals.len() as u32 - result.null_count();
    let response = SessionResponse {
        session_id: generate_id("session", &request.topic),
        plan_summary: format!(
            "{} of {} agents contributed signals for '{}'",
            contributing,
            result.signals.len(),
            request.topic
        ),
        degraded_mode: result.is_degraded(),
        cache_hits: result.cache_hits,
        cache_misses: result.cache_misses,
        signal_quality: signal_quality(&result).to_string(),
    };

    info!(
        session = %response.session_id,
        degraded = response.degraded_mode,
        quality = %response.signal_quality,
        "session planned"
    );
    (StatusCode::OK, Json(JsonResponse::ok(response))).into_response()
}

// === /agent-runs (phase runtime endpoint) ===

async fn run_agent(
    State(state): State<AppState>,
    body: Result<Json<RunRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(json) => json,
        Err(rejection) => return bad_request(format!("malformed request body: {}", rejection)),
    };

    match state.engine.execute(request).await {
        Ok(run) => (StatusCode::OK, Json(JsonResponse::ok(run))).into_response(),
        Err(RunError::Validation(message)) => bad_request(message),
        Err(RunError::Failed { error, partial, .. }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(JsonResponse::err_with_data(error, *partial)),
        )
            .into_response(),
    }
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(JsonResponse::<RunResult>::err(message)),
    )
        .into_response()
}
