//! Cluster member types
//!
//! A [`Node`] is the coordinator's view of one cluster member: its role,
//! its latest health verdict and its liveness.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a cluster node
pub type NodeId = String;

/// Node role for failover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Serves the protected role
    Primary,
    /// First choice for promotion
    #[default]
    Secondary,
    /// Cold backup
    Backup,
    /// Warm standby
    Standby,
    /// Hot spare, ready to take over immediately
    HotSpare,
}

impl NodeRole {
    /// Suitability of the role for promotion, in [0, 1]
    pub fn promotion_score(&self) -> f64 {
        match self {
            NodeRole::Secondary => 1.0,
            NodeRole::HotSpare => 0.9,
            NodeRole::Standby => 0.8,
            NodeRole::Backup => 0.6,
            NodeRole::Primary => 0.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Primary => "primary",
            NodeRole::Secondary => "secondary",
            NodeRole::Backup => "backup",
            NodeRole::Standby => "standby",
            NodeRole::HotSpare => "hot_spare",
        }
    }
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    /// No verdict yet, or the probe itself failed
    #[default]
    Unknown,
    /// Excluded from probing by an operator
    Maintenance,
}

impl HealthStatus {
    /// Map a health score to a status
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            HealthStatus::Healthy
        } else if score >= 0.6 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        }
    }

    /// Whether this verdict counts as a failed check for the primary
    pub fn is_failure(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy | HealthStatus::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Unknown => "unknown",
            HealthStatus::Maintenance => "maintenance",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership request for adding a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    /// Human-readable name, defaults to the id
    #[serde(default)]
    pub name: Option<String>,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub role: NodeRole,
    /// Added to the candidate score as `priority * 0.1`
    #[serde(default)]
    pub failover_priority: i32,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, host: impl Into<String>, port: u16, role: NodeRole) -> Self {
        Self {
            id: id.into(),
            name: None,
            host: host.into(),
            port,
            role,
            failover_priority: 0,
            labels: HashMap::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.failover_priority = priority;
        self
    }

    pub fn into_node(self) -> Node {
        let mut node = Node::new(self.id, self.host, self.port, self.role);
        if let Some(name) = self.name {
            node.name = name;
        }
        node.failover_priority = self.failover_priority;
        node.labels = self.labels;
        node
    }
}

impl From<NodeSpec> for Node {
    fn from(spec: NodeSpec) -> Self {
        spec.into_node()
    }
}

/// A cluster member as tracked by the coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// Host used by the probe transport
    pub address: String,
    pub port: u16,
    pub role: NodeRole,
    pub health_status: HealthStatus,
    /// Latest health score in [0, 1]
    pub health_score: f64,
    pub last_heartbeat: DateTime<Utc>,
    /// Resource usage percentages by metric name
    pub resource_usage: HashMap<String, f64>,
    pub network_latency_ms: f64,
    pub is_active: bool,
    pub is_primary: bool,
    pub failover_priority: i32,
    pub labels: HashMap<String, String>,
    /// Failed health checks in a row
    pub consecutive_failures: u32,
}

impl Node {
    pub fn new(id: impl Into<String>, address: impl Into<String>, port: u16, role: NodeRole) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            address: address.into(),
            port,
            role,
            health_status: HealthStatus::Unknown,
            health_score: 0.0,
            last_heartbeat: Utc::now(),
            resource_usage: HashMap::new(),
            network_latency_ms: 0.0,
            is_active: true,
            is_primary: false,
            failover_priority: 0,
            labels: HashMap::new(),
            consecutive_failures: 0,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.health_status == HealthStatus::Healthy
    }

    /// Average of the known resource usage percentages
    pub fn average_resource_usage(&self) -> Option<f64> {
        if self.resource_usage.is_empty() {
            return None;
        }
        let total: f64 = self.resource_usage.values().sum();
        Some(total / self.resource_usage.len() as f64)
    }

    /// `host:port` form of the node address
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
