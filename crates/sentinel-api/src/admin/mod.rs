//! Admin API routes for failover management
//!
//! These endpoints expose the coordinator's status queries, membership
//! changes and operator actions.

mod failover;
mod server;

use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

pub use failover::*;
pub use server::*;

/// Routes mounted under `/api/v1/failover`
pub fn failover_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_failover_status))
        .route("/nodes", get(list_nodes).post(add_node))
        .route("/nodes/{id}", get(get_node).delete(remove_node))
        .route("/nodes/{id}/maintenance", post(set_maintenance))
        .route("/events", get(list_events))
        .route("/trigger", post(trigger_failover))
        .route("/promote/{id}", post(promote_node))
        .route("/acknowledge", post(acknowledge))
}
