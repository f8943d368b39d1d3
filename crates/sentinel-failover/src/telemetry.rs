//! Failover metrics
//!
//! Recorded through the `metrics` facade; the binary installs the
//! Prometheus recorder that renders them.

use metrics::{counter, gauge, histogram};

use sentinel_core::types::{ClusterState, FailoverEventType};

/// Metric names
pub mod names {
    // State machine
    pub const CLUSTER_STATE: &str = "sentinel_cluster_state";
    pub const EVENTS_TOTAL: &str = "sentinel_failover_events_total";
    pub const FAILOVERS_TOTAL: &str = "sentinel_failovers_total";
    pub const FAILOVER_DURATION_SECONDS: &str = "sentinel_failover_duration_seconds";
    pub const OBSERVER_ERRORS_TOTAL: &str = "sentinel_observer_errors_total";

    // Membership
    pub const NODES_TOTAL: &str = "sentinel_nodes_total";
    pub const NODES_ACTIVE: &str = "sentinel_nodes_active";
    pub const NODES_HEALTHY: &str = "sentinel_nodes_healthy";
    pub const NODE_HEALTH_SCORE: &str = "sentinel_node_health_score";

    // Probes
    pub const HEARTBEATS_FAILED_TOTAL: &str = "sentinel_heartbeats_failed_total";
    pub const HEARTBEAT_TIMEOUTS_TOTAL: &str = "sentinel_heartbeat_timeouts_total";
}

pub fn record_state(state: ClusterState) {
    gauge!(names::CLUSTER_STATE).set(state.code() as f64);
}

pub fn record_event(event_type: FailoverEventType) {
    counter!(names::EVENTS_TOTAL, "type" => event_type.as_str()).increment(1);
}

/// `result` is one of `completed`, `failed`, `cancelled`
pub fn record_failover(result: &'static str, duration_secs: f64) {
    counter!(names::FAILOVERS_TOTAL, "result" => result).increment(1);
    histogram!(names::FAILOVER_DURATION_SECONDS, "result" => result).record(duration_secs);
}

pub fn record_observer_errors(count: u64) {
    if count > 0 {
        counter!(names::OBSERVER_ERRORS_TOTAL).increment(count);
    }
}

pub fn record_membership(total: usize, active: usize, healthy: usize) {
    gauge!(names::NODES_TOTAL).set(total as f64);
    gauge!(names::NODES_ACTIVE).set(active as f64);
    gauge!(names::NODES_HEALTHY).set(healthy as f64);
}

pub fn record_health_score(node_id: &str, score: f64) {
    gauge!(names::NODE_HEALTH_SCORE, "node" => node_id.to_string()).set(score);
}

pub fn record_heartbeats(failed: usize, timeouts: usize) {
    if failed > 0 {
        counter!(names::HEARTBEATS_FAILED_TOTAL).increment(failed as u64);
    }
    if timeouts > 0 {
        counter!(names::HEARTBEAT_TIMEOUTS_TOTAL).increment(timeouts as u64);
    }
}
