//! Failover management API endpoints
//!
//! Provides REST API for failover administration:
//! - View cluster status, nodes and the event history
//! - Add, remove and drain nodes
//! - Trigger failover, promote a node, acknowledge a settled state

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use sentinel_core::types::{
    ClusterState, FailoverEvent, FailoverStatus, Node, NodeId, NodeSpec, NodeStatusEntry,
    NodeStatusMap,
};
use sentinel_failover::{FailoverError, FailoverOutcome};

use crate::server::AppState;

/// Default number of events returned by `/events`
const DEFAULT_EVENT_LIMIT: usize = 50;

type ApiResult<T> = Result<T, (StatusCode, String)>;

/// Map a coordinator error onto an HTTP status
pub fn error_response(err: FailoverError) -> (StatusCode, String) {
    let status = match &err {
        FailoverError::NodeNotFound(_) => StatusCode::NOT_FOUND,
        FailoverError::NodeAlreadyExists(_) | FailoverError::InvalidState(_) => {
            StatusCode::CONFLICT
        }
        FailoverError::NotEligible(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FailoverError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        FailoverError::NoCandidate | FailoverError::QuorumNotReached { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        FailoverError::NodeUnreachable(_) => StatusCode::BAD_GATEWAY,
        FailoverError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, err.to_string())
}

// ============================================================================
// Response Types
// ============================================================================

/// List of nodes response
#[derive(Debug, Serialize)]
pub struct NodesListResponse {
    pub nodes: NodeStatusMap,
    pub total: usize,
    pub active: usize,
    pub healthy: usize,
}

/// Single node response
#[derive(Debug, Serialize)]
pub struct NodeDetailResponse {
    pub id: NodeId,
    #[serde(flatten)]
    pub status: NodeStatusEntry,
    pub failover_priority: i32,
    pub labels: HashMap<String, String>,
}

impl From<Node> for NodeDetailResponse {
    fn from(node: Node) -> Self {
        Self {
            status: NodeStatusEntry::from(&node),
            id: node.id,
            failover_priority: node.failover_priority,
            labels: node.labels,
        }
    }
}

/// Node removal response
#[derive(Debug, Serialize)]
pub struct RemoveNodeResponse {
    pub id: NodeId,
    pub was_primary: bool,
    pub cluster_state: ClusterState,
    pub current_primary: Option<NodeId>,
}

/// Event history response
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<FailoverEvent>,
    pub total: usize,
}

/// Result of an operator action
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub outcome: String,
    pub cluster_state: ClusterState,
    pub current_primary: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_primary: Option<NodeId>,
}

impl ActionResponse {
    fn new(state: &AppState, outcome: &str, previous_primary: Option<NodeId>) -> Self {
        Self {
            outcome: outcome.to_string(),
            cluster_state: state.coordinator.cluster_state(),
            current_primary: state.coordinator.current_primary(),
            previous_primary,
        }
    }
}

// ============================================================================
// Request Types
// ============================================================================

/// Event history query
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

/// Manual failover request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TriggerRequest {
    pub reason: Option<String>,
}

/// Maintenance mode request
#[derive(Debug, Deserialize)]
pub struct MaintenanceRequest {
    pub enabled: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/failover/status
pub async fn get_failover_status(State(state): State<AppState>) -> Json<FailoverStatus> {
    Json(state.coordinator.failover_status())
}

/// GET /api/v1/failover/nodes
pub async fn list_nodes(State(state): State<AppState>) -> Json<NodesListResponse> {
    let nodes = state.coordinator.node_status();
    let active = nodes.values().filter(|n| n.is_active).count();
    let healthy = nodes
        .values()
        .filter(|n| n.health_status == sentinel_core::types::HealthStatus::Healthy)
        .count();

    Json(NodesListResponse {
        total: nodes.len(),
        active,
        healthy,
        nodes,
    })
}

/// GET /api/v1/failover/nodes/{id}
pub async fn get_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<NodeDetailResponse>> {
    state
        .coordinator
        .node(&id)
        .map(|node| Json(node.into()))
        .ok_or_else(|| error_response(FailoverError::NodeNotFound(id)))
}

/// POST /api/v1/failover/nodes
pub async fn add_node(
    State(state): State<AppState>,
    Json(spec): Json<NodeSpec>,
) -> ApiResult<(StatusCode, Json<NodeDetailResponse>)> {
    if spec.id.trim().is_empty() || spec.host.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "node id and host must not be empty".to_string(),
        ));
    }

    let id = spec.id.clone();
    state.coordinator.add_node(spec).map_err(error_response)?;
    info!("Node {} added through the admin API", id);

    let node = state
        .coordinator
        .node(&id)
        .ok_or_else(|| error_response(FailoverError::NodeNotFound(id)))?;

    Ok((StatusCode::CREATED, Json(node.into())))
}

/// DELETE /api/v1/failover/nodes/{id}
///
/// Removing the primary starts a failover before the response is sent.
pub async fn remove_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RemoveNodeResponse>> {
    let node = state
        .coordinator
        .remove_node(&id)
        .await
        .map_err(error_response)?;
    info!("Node {} removed through the admin API", id);

    Ok(Json(RemoveNodeResponse {
        id: node.id,
        was_primary: node.is_primary,
        cluster_state: state.coordinator.cluster_state(),
        current_primary: state.coordinator.current_primary(),
    }))
}

/// POST /api/v1/failover/nodes/{id}/maintenance
pub async fn set_maintenance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MaintenanceRequest>,
) -> ApiResult<Json<NodeDetailResponse>> {
    state
        .coordinator
        .set_maintenance(&id, req.enabled)
        .map_err(error_response)?;

    state
        .coordinator
        .node(&id)
        .map(|node| Json(node.into()))
        .ok_or_else(|| error_response(FailoverError::NodeNotFound(id)))
}

/// GET /api/v1/failover/events?limit=
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<EventsResponse> {
    let events = state
        .coordinator
        .recent_events(query.limit.unwrap_or(DEFAULT_EVENT_LIMIT));

    Json(EventsResponse {
        total: events.len(),
        events,
    })
}

/// POST /api/v1/failover/trigger
pub async fn trigger_failover(
    State(state): State<AppState>,
    Json(req): Json<TriggerRequest>,
) -> ApiResult<Json<ActionResponse>> {
    let reason = req
        .reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| "requested through admin API".to_string());

    let outcome = state
        .coordinator
        .trigger_failover(reason)
        .await
        .map_err(error_response)?;

    match outcome {
        FailoverOutcome::Promoted { previous, .. } => {
            Ok(Json(ActionResponse::new(&state, "promoted", previous)))
        }
        FailoverOutcome::Cancelled => Ok(Json(ActionResponse::new(&state, "cancelled", None))),
        FailoverOutcome::Failed(failure) => Err(error_response(failure.into())),
        FailoverOutcome::Skipped(current) => Err(error_response(FailoverError::InvalidState(
            format!("cannot fail over while {}", current),
        ))),
    }
}

/// POST /api/v1/failover/promote/{id}
pub async fn promote_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    let previous = state.coordinator.current_primary();
    state
        .coordinator
        .promote_node(&id)
        .await
        .map_err(error_response)?;

    Ok(Json(ActionResponse::new(&state, "promoted", previous)))
}

/// POST /api/v1/failover/acknowledge
pub async fn acknowledge(State(state): State<AppState>) -> ApiResult<Json<ActionResponse>> {
    state
        .coordinator
        .acknowledge()
        .await
        .map_err(error_response)?;

    Ok(Json(ActionResponse::new(&state, "acknowledged", None)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRecorder;
    use crate::server::create_router;
    use crate::testing::StaticTransport;
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use sentinel_core::types::{FailoverConfig, NodeRole};
    use sentinel_failover::{FailoverCoordinator, FailoverCoordinatorBuilder};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn setup(nodes: &[(&str, NodeRole)]) -> (Router, Arc<FailoverCoordinator>) {
        let coordinator = FailoverCoordinatorBuilder::new()
            .config(FailoverConfig {
                recovery_delay_ms: 0,
                ..Default::default()
            })
            .transport(Arc::new(StaticTransport::new()))
            .nodes(
                nodes
                    .iter()
                    .map(|(id, role)| NodeSpec::new(*id, *id, 7000, *role)),
            )
            .build()
            .unwrap();
        let coordinator = Arc::new(coordinator);
        coordinator.health_tick().await;

        let state = AppState::new(coordinator.clone(), Arc::new(MetricsRecorder::detached()));
        (create_router(state), coordinator)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()));
        (status, value)
    }

    #[tokio::test]
    async fn test_status_and_nodes() {
        let (app, _) = setup(&[("p", NodeRole::Primary), ("s1", NodeRole::Secondary)]).await;

        let (status, body) = send(&app, "GET", "/api/v1/failover/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current_state"], "normal");
        assert_eq!(body["current_primary"], "p");
        assert_eq!(body["healthy_nodes"], 2);

        let (status, body) = send(&app, "GET", "/api/v1/failover/nodes", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["nodes"]["s1"]["role"], "secondary");

        let (status, body) = send(&app, "GET", "/api/v1/failover/nodes/p", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "p");
        assert_eq!(body["is_primary"], true);

        let (status, _) = send(&app, "GET", "/api/v1/failover/nodes/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_node() {
        let (app, coordinator) = setup(&[("p", NodeRole::Primary)]).await;

        let spec = json!({"id": "s2", "host": "s2", "port": 7000, "role": "hot_spare"});
        let (status, body) = send(&app, "POST", "/api/v1/failover/nodes", Some(spec.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["role"], "hot_spare");
        assert!(coordinator.node("s2").is_some());

        let (status, _) = send(&app, "POST", "/api/v1/failover/nodes", Some(spec)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let blank = json!({"id": " ", "host": "x", "port": 1});
        let (status, _) = send(&app, "POST", "/api/v1/failover/nodes", Some(blank)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_remove_primary_fails_over() {
        let (app, _) = setup(&[("p", NodeRole::Primary), ("s1", NodeRole::Secondary)]).await;

        let (status, body) = send(&app, "DELETE", "/api/v1/failover/nodes/p", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["was_primary"], true);
        assert_eq!(body["current_primary"], "s1");
        assert_eq!(body["cluster_state"], "failover_complete");

        let (status, body) = send(&app, "GET", "/api/v1/failover/events?limit=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["events"][0]["type"], "failover_completed");
    }

    #[tokio::test]
    async fn test_promote() {
        let (app, coordinator) =
            setup(&[("p", NodeRole::Primary), ("s1", NodeRole::Secondary)]).await;

        let (status, body) = send(&app, "POST", "/api/v1/failover/promote/s1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current_primary"], "s1");
        assert_eq!(body["previous_primary"], "p");
        assert_eq!(coordinator.current_primary().as_deref(), Some("s1"));

        let (status, _) = send(&app, "POST", "/api/v1/failover/promote/s1", None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        coordinator.set_maintenance("p", true).unwrap();
        let (status, _) = send(&app, "POST", "/api/v1/failover/promote/p", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_trigger_without_candidate_then_acknowledge() {
        let (app, coordinator) = setup(&[("p", NodeRole::Primary)]).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/failover/trigger",
            Some(json!({"reason": "drill"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.as_str().unwrap().contains("No eligible candidate"));
        assert_eq!(coordinator.cluster_state(), ClusterState::Degraded);

        let (status, _) = send(&app, "POST", "/api/v1/failover/trigger", Some(json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(&app, "POST", "/api/v1/failover/acknowledge", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cluster_state"], "normal");
        assert_eq!(body["current_primary"], "p");
    }

    #[tokio::test]
    async fn test_trigger_promotes() {
        let (app, _) = setup(&[("p", NodeRole::Primary), ("s1", NodeRole::Standby)]).await;

        let (status, body) = send(&app, "POST", "/api/v1/failover/trigger", Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "promoted");
        assert_eq!(body["current_primary"], "s1");
        assert_eq!(body["previous_primary"], "p");
    }

    #[tokio::test]
    async fn test_maintenance() {
        let (app, _) = setup(&[("p", NodeRole::Primary), ("s1", NodeRole::Secondary)]).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/failover/nodes/s1/maintenance",
            Some(json!({"enabled": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["health_status"], "maintenance");

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/failover/nodes/nope/maintenance",
            Some(json!({"enabled": true})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let (app, coordinator) = setup(&[("p", NodeRole::Primary)]).await;

        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "stopped");

        coordinator.start().unwrap();
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["current_primary"], "p");
        coordinator.stop().await;

        let (status, _) = send(&app, "GET", "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            error_response(FailoverError::NodeNotFound("x".into())).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_response(FailoverError::QuorumNotReached { needed: 2, got: 1 }).0,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            error_response(FailoverError::Timeout("slow".into())).0,
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            error_response(FailoverError::Internal("bug".into())).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
