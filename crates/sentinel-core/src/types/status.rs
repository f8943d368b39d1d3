//! Query API responses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::{
    ClusterState, FailoverEvent, FailoverMode, FailoverStats, HealthStatus, Node, NodeId,
    NodeRole,
};

/// Cluster-level failover status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverStatus {
    pub current_state: ClusterState,
    pub current_primary: Option<NodeId>,
    pub failover_mode: FailoverMode,
    pub total_nodes: usize,
    pub active_nodes: usize,
    pub healthy_nodes: usize,
    pub stats: FailoverStats,
    pub last_event: Option<FailoverEvent>,
}

/// Per-node status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatusEntry {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub role: NodeRole,
    pub is_primary: bool,
    pub is_active: bool,
    pub health_status: HealthStatus,
    pub health_score: f64,
    pub resource_usage: HashMap<String, f64>,
    pub network_latency_ms: f64,
    pub last_heartbeat: DateTime<Utc>,
    pub consecutive_failures: u32,
}

impl From<&Node> for NodeStatusEntry {
    fn from(node: &Node) -> Self {
        Self {
            name: node.name.clone(),
            host: node.address.clone(),
            port: node.port,
            role: node.role,
            is_primary: node.is_primary,
            is_active: node.is_active,
            health_status: node.health_status,
            health_score: node.health_score,
            resource_usage: node.resource_usage.clone(),
            network_latency_ms: node.network_latency_ms,
            last_heartbeat: node.last_heartbeat,
            consecutive_failures: node.consecutive_failures,
        }
    }
}

/// Node statuses keyed by node id, ordered
pub type NodeStatusMap = BTreeMap<NodeId, NodeStatusEntry>;
