//! Heartbeat-based liveness tracking
//!
//! Liveness is tracked separately from health: a node can be reachable but
//! unhealthy, and health probes are far more expensive than a ping.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use sentinel_core::types::{HealthStatus, Node, NodeId};

use crate::registry::NodeRegistry;
use crate::transport::ProbeTransport;

/// Result of one heartbeat round
#[derive(Debug, Default, Clone)]
pub struct HeartbeatSummary {
    pub delivered: usize,
    pub failed: usize,
    /// Inactive nodes that answered again
    pub reactivated: Vec<NodeId>,
}

/// A node whose heartbeat went silent
#[derive(Debug, Clone)]
pub struct TimedOutNode {
    pub node_id: NodeId,
    pub was_primary: bool,
    pub silent_for: chrono::Duration,
}

/// Heartbeat monitor
pub struct HeartbeatMonitor {
    transport: Arc<dyn ProbeTransport>,
    timeout: chrono::Duration,
}

impl HeartbeatMonitor {
    pub fn new(transport: Arc<dyn ProbeTransport>, timeout: std::time::Duration) -> Self {
        Self {
            transport,
            timeout: chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Ping every registered node, active or not
    pub async fn send_heartbeats(&self, registry: &NodeRegistry) -> HeartbeatSummary {
        let targets: Vec<Node> = registry.list();

        let results = join_all(
            targets
                .iter()
                .map(|node| self.transport.ping(&node.address, node.port)),
        )
        .await;

        let mut summary = HeartbeatSummary::default();
        let now = Utc::now();

        for (node, result) in targets.iter().zip(results) {
            match result {
                Ok(rtt) => {
                    summary.delivered += 1;
                    if self.record_heartbeat(registry, &node.id, now) {
                        summary.reactivated.push(node.id.clone());
                    }
                    debug!("Heartbeat from {} in {:?}", node.id, rtt);
                }
                Err(e) => {
                    summary.failed += 1;
                    debug!("Heartbeat to {} failed: {}", node.id, e);
                }
            }
        }

        summary
    }

    /// Refresh a node's heartbeat, returning true when it was re-activated
    pub fn record_heartbeat(&self, registry: &NodeRegistry, node_id: &str, at: DateTime<Utc>) -> bool {
        let mut inner = registry.write();
        let Some(node) = inner.nodes.get_mut(node_id) else {
            return false;
        };

        node.last_heartbeat = at;
        if node.is_active {
            return false;
        }

        node.is_active = true;
        info!("Node {} is answering heartbeats again", node_id);
        true
    }

    /// Mark active nodes silent for longer than the timeout as inactive
    pub fn scan_timeouts(&self, registry: &NodeRegistry, now: DateTime<Utc>) -> Vec<TimedOutNode> {
        let mut timed_out = Vec::new();
        let mut inner = registry.write();
        let primary = inner.current_primary.clone();

        for (id, node) in inner.nodes.iter_mut() {
            if !node.is_active {
                continue;
            }

            let silent_for = now - node.last_heartbeat;
            if silent_for > self.timeout {
                warn!(
                    "Node {} hasn't answered a heartbeat in {}ms, marking inactive",
                    id,
                    silent_for.num_milliseconds()
                );
                node.is_active = false;
                node.health_status = HealthStatus::Unhealthy;
                node.health_score = 0.0;
                timed_out.push(TimedOutNode {
                    node_id: id.clone(),
                    was_primary: primary.as_deref() == Some(id.as_str()),
                    silent_for,
                });
            }
        }

        timed_out
    }
}
