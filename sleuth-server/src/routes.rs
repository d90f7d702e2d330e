use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use sleuth_agent::{AgentConfig, AgentRequest, AgentResponse, Orchestrator};
use tokio_util::sync::CancellationToken;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared by every request. Runs never share mutable state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub config: Arc<AgentConfig>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, config: AgentConfig) -> Self {
        Self {
            orchestrator,
            config: Arc::new(config),
        }
    }
}

/// Builds the API router. At most `max_concurrent_runs` agent runs are in
/// flight at once; further requests wait for a slot.
pub fn router(state: AppState, max_concurrent_runs: usize) -> Router {
    Router::new()
        .route(
            "/api/agent/run",
            post(run_agent).layer(ConcurrencyLimitLayer::new(max_concurrent_runs.max(1))),
        )
        .route("/api/health", get(health))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn run_agent(State(state): State<AppState>, Json(request): Json<AgentRequest>) -> Response {
    let config = state.config.merge(&request.overrides());
    let cancellation = CancellationToken::new();
    // Dropped with this future when the client goes away, cancelling the run.
    let guard = cancellation.clone().drop_guard();

    let orchestrator = state.orchestrator.clone();
    let task = tokio::spawn(async move {
        orchestrator
            .run(request.user_input, &config, &cancellation)
            .await
    });

    let joined = task.await;
    guard.disarm();

    match joined {
        Ok(result) => Json(AgentResponse::from(result)).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "agent run task aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "agent run aborted unexpectedly" })),
            )
                .into_response()
        }
    }
}
