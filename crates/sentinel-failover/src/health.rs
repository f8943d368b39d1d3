//! Node health probing and scoring
//!
//! A probe runs four steps against one node: reachability, resource
//! metrics, service health and round-trip latency. Each step feeds a
//! partial score; the weighted total maps onto a [`HealthStatus`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use sentinel_core::types::{HealthStatus, HealthThresholds, Node, NodeId};

use crate::error::{FailoverError, FailoverResult};
use crate::registry::NodeRegistry;
use crate::transport::{ProbeTransport, ResourceMetrics, ServiceHealth};

const RESOURCE_WEIGHT: f64 = 0.4;
const SERVICE_WEIGHT: f64 = 0.4;
const LATENCY_WEIGHT: f64 = 0.2;

/// Each breached resource threshold multiplies the resource score by this
const BREACH_PENALTY: f64 = 0.8;

/// Outcome of probing one node
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub score: f64,
    pub resources: Option<ResourceMetrics>,
    pub latency_ms: f64,
}

impl HealthReport {
    fn failed(status: HealthStatus, latency_ms: f64) -> Self {
        Self {
            status,
            score: 0.0,
            resources: None,
            latency_ms,
        }
    }
}

/// Emitted when a node's health status changes
#[derive(Debug, Clone)]
pub struct HealthChange {
    pub node_id: NodeId,
    pub previous: HealthStatus,
    pub current: HealthStatus,
    pub score: f64,
}

/// Health checker
pub struct HealthChecker {
    transport: Arc<dyn ProbeTransport>,
    thresholds: HealthThresholds,
    connect_timeout: Duration,
    changes: broadcast::Sender<HealthChange>,
}

impl HealthChecker {
    pub fn new(
        transport: Arc<dyn ProbeTransport>,
        thresholds: HealthThresholds,
        connect_timeout: Duration,
    ) -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            transport,
            thresholds,
            connect_timeout,
            changes,
        }
    }

    /// Subscribe to health status changes
    pub fn subscribe(&self) -> broadcast::Receiver<HealthChange> {
        self.changes.subscribe()
    }

    /// Probe one node. Never fails: probe errors become `Unknown`.
    pub async fn check_node(&self, node: &Node) -> HealthReport {
        let start = Instant::now();

        if !self
            .transport
            .connect(&node.address, node.port, self.connect_timeout)
            .await
        {
            debug!("Node {} unreachable at {}", node.id, node.endpoint());
            return HealthReport::failed(HealthStatus::Unhealthy, elapsed_ms(start));
        }

        match self.probe(node, start).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Health probe of node {} failed: {}", node.id, e);
                HealthReport::failed(HealthStatus::Unknown, elapsed_ms(start))
            }
        }
    }

    async fn probe(&self, node: &Node, start: Instant) -> FailoverResult<HealthReport> {
        let resources = self
            .transport
            .fetch_resource_metrics(&node.address, node.port)
            .await?;
        let resource_score = self.resource_score(&resources);

        let services = self
            .transport
            .fetch_service_health(&node.address, node.port)
            .await?;
        if services.error_rate > self.thresholds.error_rate {
            warn!(
                "Node {} error rate {:.1}% exceeds threshold {:.1}%",
                node.id, services.error_rate, self.thresholds.error_rate
            );
        }
        let service_score = service_score(&services);

        let latency_ms = elapsed_ms(start);
        let latency_score = self.latency_score(latency_ms);

        let score = (RESOURCE_WEIGHT * resource_score
            + SERVICE_WEIGHT * service_score
            + LATENCY_WEIGHT * latency_score)
            .clamp(0.0, 1.0);

        if !score.is_finite() {
            return Err(FailoverError::Internal(format!(
                "non-finite health score for node {}",
                node.id
            )));
        }

        Ok(HealthReport {
            status: HealthStatus::from_score(score),
            score,
            resources: Some(resources),
            latency_ms,
        })
    }

    /// 1.0 reduced by 20% per breached cpu, memory or disk threshold
    pub fn resource_score(&self, metrics: &ResourceMetrics) -> f64 {
        let t = &self.thresholds;
        let breaches = [
            metrics.cpu_usage > t.cpu_usage,
            metrics.memory_usage > t.memory_usage,
            metrics.disk_usage > t.disk_usage,
        ]
        .iter()
        .filter(|b| **b)
        .count();

        BREACH_PENALTY.powi(breaches as i32).max(0.0)
    }

    pub fn latency_score(&self, latency_ms: f64) -> f64 {
        (1.0 - latency_ms / self.thresholds.network_latency).max(0.0)
    }

    /// Probe every active node not in maintenance and record the results.
    /// The primary is probed even when inactive so health-based failover
    /// still sees a primary that stopped answering heartbeats.
    pub async fn sweep(&self, registry: &NodeRegistry) -> Vec<HealthChange> {
        let targets: Vec<Node> = registry
            .list()
            .into_iter()
            .filter(|n| n.is_active || n.is_primary)
            .filter(|n| n.health_status != HealthStatus::Maintenance)
            .collect();

        let reports = join_all(targets.iter().map(|node| self.check_node(node))).await;

        let mut changes = Vec::new();
        for (node, report) in targets.iter().zip(reports) {
            if let Some(change) = self.record(registry, &node.id, report) {
                changes.push(change);
            }
        }
        changes
    }

    /// Apply a report to the registry entry
    pub fn record(
        &self,
        registry: &NodeRegistry,
        node_id: &str,
        report: HealthReport,
    ) -> Option<HealthChange> {
        let change = {
            let mut inner = registry.write();
            let node = inner.nodes.get_mut(node_id)?;

            // Skip results for nodes that went into maintenance mid-probe
            if node.health_status == HealthStatus::Maintenance {
                return None;
            }

            let previous = node.health_status;
            node.health_status = report.status;
            node.health_score = report.score;
            node.network_latency_ms = report.latency_ms;
            if let Some(resources) = &report.resources {
                node.resource_usage = resources.usage_map();
            }

            if report.status.is_failure() {
                node.consecutive_failures = node.consecutive_failures.saturating_add(1);
            } else {
                node.consecutive_failures = 0;
            }

            (previous != report.status).then(|| HealthChange {
                node_id: node_id.to_string(),
                previous,
                current: report.status,
                score: report.score,
            })
        };

        if let Some(change) = &change {
            info!(
                "Node {} health {} -> {} (score {:.2})",
                change.node_id, change.previous, change.current, change.score
            );
            let _ = self.changes.send(change.clone());
        }

        change
    }
}

/// Mean of the running ratio and the success rate
pub fn service_score(health: &ServiceHealth) -> f64 {
    let running_ratio = if health.services_total == 0 {
        0.0
    } else {
        health.services_running as f64 / health.services_total as f64
    };
    let success = (1.0 - health.error_rate / 100.0).max(0.0);
    (running_ratio + success) / 2.0
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use sentinel_core::types::NodeRole;

    fn checker(transport: Arc<MockTransport>) -> HealthChecker {
        HealthChecker::new(transport, HealthThresholds::default(), Duration::from_secs(1))
    }

    #[test]
    fn test_resource_score() {
        let hc = checker(Arc::new(MockTransport::new()));

        assert_eq!(hc.resource_score(&ResourceMetrics::new(10.0, 10.0, 10.0)), 1.0);
        assert!((hc.resource_score(&ResourceMetrics::new(95.0, 10.0, 10.0)) - 0.8).abs() < 1e-9);
        assert!((hc.resource_score(&ResourceMetrics::new(95.0, 95.0, 95.0)) - 0.512).abs() < 1e-9);
        // At the threshold is not a breach
        assert_eq!(hc.resource_score(&ResourceMetrics::new(80.0, 85.0, 90.0)), 1.0);
    }

    #[test]
    fn test_service_score() {
        let all_up = ServiceHealth {
            services_running: 4,
            services_total: 4,
            ..Default::default()
        };
        assert_eq!(service_score(&all_up), 1.0);

        let none_declared = ServiceHealth::default();
        assert_eq!(service_score(&none_declared), 0.5);

        let failing = ServiceHealth {
            services_running: 1,
            services_total: 2,
            error_rate: 150.0,
            ..Default::default()
        };
        assert_eq!(service_score(&failing), 0.25);
    }

    #[test]
    fn test_latency_score() {
        let hc = checker(Arc::new(MockTransport::new()));
        assert_eq!(hc.latency_score(0.0), 1.0);
        assert_eq!(hc.latency_score(50.0), 0.5);
        assert_eq!(hc.latency_score(250.0), 0.0);
    }

    #[tokio::test]
    async fn test_healthy_node() {
        let transport = Arc::new(MockTransport::new());
        let hc = checker(transport.clone());
        let node = Node::new("a", "10.0.0.1", 7000, NodeRole::Secondary);

        let report = hc.check_node(&node).await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.score >= 0.8);
        assert!(report.resources.is_some());
    }

    #[tokio::test]
    async fn test_unreachable_is_unhealthy() {
        let transport = Arc::new(MockTransport::new());
        transport.set_reachable("10.0.0.1", false);
        let hc = checker(transport.clone());
        let node = Node::new("a", "10.0.0.1", 7000, NodeRole::Secondary);

        let report = hc.check_node(&node).await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.score, 0.0);
    }

    #[tokio::test]
    async fn test_probe_error_is_unknown() {
        let transport = Arc::new(MockTransport::new());
        transport.set_metrics_error("10.0.0.1", true);
        let hc = checker(transport.clone());
        let node = Node::new("a", "10.0.0.1", 7000, NodeRole::Secondary);

        let report = hc.check_node(&node).await;
        assert_eq!(report.status, HealthStatus::Unknown);
        assert_eq!(report.score, 0.0);
    }

    #[tokio::test]
    async fn test_resource_pressure_lowers_score() {
        let transport = Arc::new(MockTransport::new());
        transport.set_resources("10.0.0.1", ResourceMetrics::new(95.0, 95.0, 95.0));
        let hc = checker(transport.clone());
        let node = Node::new("a", "10.0.0.1", 7000, NodeRole::Secondary);

        let report = hc.check_node(&node).await;
        // 0.4 * 0.512 + 0.4 + 0.2 * latency
        assert!(report.score < 0.81);
        assert!(report.score > 0.7);
        assert_eq!(report.resources.unwrap().cpu_usage, 95.0);
    }

    #[tokio::test]
    async fn test_sweep_counts_failures_and_signals_changes() {
        let transport = Arc::new(MockTransport::new());
        let hc = checker(transport.clone());
        let mut rx = hc.subscribe();

        let registry = NodeRegistry::new();
        registry
            .add_node(Node::new("a", "10.0.0.1", 7000, NodeRole::Primary))
            .unwrap();
        registry
            .add_node(Node::new("b", "10.0.0.2", 7000, NodeRole::Secondary))
            .unwrap();

        let changes = hc.sweep(&registry).await;
        assert_eq!(changes.len(), 2);
        assert_eq!(rx.recv().await.unwrap().current, HealthStatus::Healthy);

        transport.set_reachable("10.0.0.1", false);
        hc.sweep(&registry).await;
        let changes = hc.sweep(&registry).await;
        assert!(changes.is_empty());

        let a = registry.get("a").unwrap();
        assert_eq!(a.health_status, HealthStatus::Unhealthy);
        assert_eq!(a.consecutive_failures, 2);
        assert_eq!(registry.get("b").unwrap().consecutive_failures, 0);

        transport.set_reachable("10.0.0.1", true);
        hc.sweep(&registry).await;
        assert_eq!(registry.get("a").unwrap().consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_sweep_skips_maintenance_and_inactive() {
        let transport = Arc::new(MockTransport::new());
        let hc = checker(transport.clone());

        let registry = NodeRegistry::new();
        registry
            .add_node(Node::new("a", "10.0.0.1", 7000, NodeRole::Secondary))
            .unwrap();
        registry
            .add_node(Node::new("b", "10.0.0.2", 7000, NodeRole::Secondary))
            .unwrap();
        registry.set_maintenance("a", true).unwrap();
        registry.write().nodes.get_mut("b").unwrap().is_active = false;

        let changes = hc.sweep(&registry).await;
        assert!(changes.is_empty());
        assert_eq!(registry.get("a").unwrap().health_status, HealthStatus::Maintenance);
        assert_eq!(registry.get("b").unwrap().health_status, HealthStatus::Unknown);
    }
}
