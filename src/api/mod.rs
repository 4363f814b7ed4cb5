//! HTTP API for health checks and session monitoring

use crate::config::ApiConfig;
use crate::error::{SchedulerError, SchedulerResult};
use crate::sessions::SessionManager;
use crate::store::DataStore;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DataStore>,
    pub sessions: Arc<SessionManager>,
    pub instance_id: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/sessions", get(get_sessions))
        .with_state(state)
}

/// Run the HTTP API server until `shutdown` is cancelled
pub async fn run_server(
    config: ApiConfig,
    state: AppState,
    shutdown: CancellationToken,
) -> SchedulerResult<()> {
    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SchedulerError::Internal(format!("cannot bind {}: {}", addr, e)))?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| SchedulerError::Internal(format!("API server: {}", e)))?;

    Ok(())
}

/// Liveness
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: state.instance_id,
    })
}

/// Readiness: the database must answer
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                ready: true,
                database: true,
            }),
        ),
        Err(e) => {
            warn!("Database health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    ready: false,
                    database: false,
                }),
            )
        }
    }
}

async fn get_sessions(State(state): State<AppState>) -> impl IntoResponse {
    Json(SessionsResponse {
        active: state.sessions.count(),
    })
}

// Response types

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    instance_id: String,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    database: bool,
}

#[derive(Serialize)]
struct SessionsResponse {
    active: usize,
}
