//! Coordinator health check endpoint

use axum::{extract::State, http::StatusCode, Json};
use sentinel_core::types::ClusterState;
use serde::Serialize;

use crate::server::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub version: String,
    pub coordinator_id: String,
    pub running: bool,
    pub cluster_state: ClusterState,
    pub current_primary: Option<String>,
    pub uptime_secs: u64,
    pub timestamp: String,
}

/// GET /health
///
/// 200 while the coordinator loops run, 503 otherwise. A degraded cluster
/// is reported in the body, not through the status code.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthCheck>) {
    let coordinator = &state.coordinator;
    let running = coordinator.is_running();
    let cluster_state = coordinator.cluster_state();

    let status = match (running, cluster_state) {
        (false, _) => "stopped",
        (true, ClusterState::Normal) => "healthy",
        (true, _) => "degraded",
    };

    let code = if running {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthCheck {
            status: status.to_string(),
            version: sentinel_core::VERSION.to_string(),
            coordinator_id: coordinator.coordinator_id().to_string(),
            running,
            cluster_state,
            current_primary: coordinator.current_primary(),
            uptime_secs: state.start_time.elapsed().as_secs(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }),
    )
}
