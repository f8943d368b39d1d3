//! Cluster membership registry
//!
//! Nodes, the current primary, the cluster state and the record of the last
//! failure live behind one lock, so every read sees them consistent with
//! each other and every transition updates them together.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

use sentinel_core::types::{ClusterState, HealthStatus, Node, NodeId, NodeRole};

use crate::error::{FailoverError, FailoverResult};

/// The node that caused the current failover cycle
#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub node_id: Option<NodeId>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    pub(crate) current_primary: Option<NodeId>,
    pub(crate) state: ClusterState,
    pub(crate) last_failure: Option<FailureRecord>,
}

impl RegistryState {
    pub(crate) fn primary(&self) -> Option<&Node> {
        self.current_primary
            .as_ref()
            .and_then(|id| self.nodes.get(id))
    }

    /// Make `node_id` the only primary, returning the previous one
    pub(crate) fn promote(&mut self, node_id: &str) -> Option<NodeId> {
        let previous = self.current_primary.take();

        for node in self.nodes.values_mut() {
            if node.id == node_id {
                node.is_primary = true;
                node.role = NodeRole::Primary;
                node.consecutive_failures = 0;
            } else if node.is_primary || node.role == NodeRole::Primary {
                node.is_primary = false;
                node.role = NodeRole::Secondary;
            }
        }

        self.current_primary = Some(node_id.to_string());
        previous.filter(|id| id != node_id)
    }
}

/// A node taken out of the registry
#[derive(Debug, Clone)]
pub struct RemovedNode {
    pub node: Node,
    pub was_primary: bool,
}

/// Registry of cluster members
#[derive(Debug, Default)]
pub struct NodeRegistry {
    inner: RwLock<RegistryState>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. A node registered with the primary role becomes the
    /// current primary when there is none; otherwise it joins as secondary.
    pub fn add_node(&self, mut node: Node) -> FailoverResult<()> {
        let mut inner = self.inner.write();

        if inner.nodes.contains_key(&node.id) {
            return Err(FailoverError::NodeAlreadyExists(node.id));
        }

        let id = node.id.clone();
        let mut wants_primary = node.role == NodeRole::Primary || node.is_primary;
        node.is_primary = false;

        if wants_primary {
            if let Some(existing) = &inner.current_primary {
                warn!(
                    "Node {} registered as primary but {} is primary, joining as secondary",
                    id, existing
                );
                node.role = NodeRole::Secondary;
                wants_primary = false;
            }
        }

        info!(
            "Registered node {} ({}) at {} as {}",
            id,
            node.name,
            node.endpoint(),
            node.role
        );
        inner.nodes.insert(id.clone(), node);

        if wants_primary {
            inner.promote(&id);
        }

        Ok(())
    }

    /// Remove a node. If it was the primary, the primary slot is left empty
    /// and the caller decides whether to fail over.
    pub fn remove_node(&self, node_id: &str) -> FailoverResult<RemovedNode> {
        let mut inner = self.inner.write();

        let node = inner
            .nodes
            .remove(node_id)
            .ok_or_else(|| FailoverError::NodeNotFound(node_id.to_string()))?;

        let was_primary = inner.current_primary.as_deref() == Some(node_id);
        if was_primary {
            inner.current_primary = None;
        }

        info!("Removed node {} (was_primary={})", node_id, was_primary);
        Ok(RemovedNode { node, was_primary })
    }

    pub fn get(&self, node_id: &str) -> Option<Node> {
        self.inner.read().nodes.get(node_id).cloned()
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.inner.read().nodes.contains_key(node_id)
    }

    /// All nodes, ordered by id
    pub fn list(&self) -> Vec<Node> {
        self.inner.read().nodes.values().cloned().collect()
    }

    pub fn list_active(&self) -> Vec<Node> {
        self.inner
            .read()
            .nodes
            .values()
            .filter(|n| n.is_active)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().nodes.is_empty()
    }

    pub fn current_primary(&self) -> Option<NodeId> {
        self.inner.read().current_primary.clone()
    }

    pub fn cluster_state(&self) -> ClusterState {
        self.inner.read().state
    }

    pub fn last_failure(&self) -> Option<FailureRecord> {
        self.inner.read().last_failure.clone()
    }

    /// Number of nodes flagged primary
    pub fn primary_count(&self) -> usize {
        self.inner
            .read()
            .nodes
            .values()
            .filter(|n| n.is_primary)
            .count()
    }

    /// Put a node into or take it out of maintenance. Nodes in maintenance
    /// are neither probed for health nor considered for promotion.
    pub fn set_maintenance(&self, node_id: &str, enabled: bool) -> FailoverResult<()> {
        let mut inner = self.inner.write();
        let node = inner
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| FailoverError::NodeNotFound(node_id.to_string()))?;

        if enabled {
            node.health_status = HealthStatus::Maintenance;
        } else if node.health_status == HealthStatus::Maintenance {
            node.health_status = HealthStatus::Unknown;
        }
        node.consecutive_failures = 0;

        info!("Node {} maintenance={}", node_id, enabled);
        Ok(())
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.inner.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.inner.write()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, role: NodeRole) -> Node {
        Node::new(id, "127.0.0.1", 7000, role)
    }

    #[test]
    fn test_add_and_get() {
        let registry = NodeRegistry::new();
        registry.add_node(node("p", NodeRole::Primary)).unwrap();
        registry.add_node(node("s1", NodeRole::Secondary)).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.current_primary().as_deref(), Some("p"));
        assert!(registry.get("p").unwrap().is_primary);
        assert!(!registry.get("s1").unwrap().is_primary);
        assert_eq!(registry.cluster_state(), ClusterState::Normal);
    }

    #[test]
    fn test_duplicate_rejected() {
        let registry = NodeRegistry::new();
        registry.add_node(node("a", NodeRole::Secondary)).unwrap();

        let err = registry.add_node(node("a", NodeRole::Backup)).unwrap_err();
        assert!(matches!(err, FailoverError::NodeAlreadyExists(id) if id == "a"));
        assert_eq!(registry.get("a").unwrap().role, NodeRole::Secondary);
    }

    #[test]
    fn test_second_primary_joins_as_secondary() {
        let registry = NodeRegistry::new();
        registry.add_node(node("p1", NodeRole::Primary)).unwrap();
        registry.add_node(node("p2", NodeRole::Primary)).unwrap();

        assert_eq!(registry.primary_count(), 1);
        assert_eq!(registry.current_primary().as_deref(), Some("p1"));
        assert_eq!(registry.get("p2").unwrap().role, NodeRole::Secondary);
        assert!(!registry.get("p2").unwrap().is_primary);
    }

    #[test]
    fn test_remove_primary_clears_slot() {
        let registry = NodeRegistry::new();
        registry.add_node(node("p", NodeRole::Primary)).unwrap();
        registry.add_node(node("s1", NodeRole::Secondary)).unwrap();

        let removed = registry.remove_node("p").unwrap();
        assert!(removed.was_primary);
        assert_eq!(removed.node.id, "p");
        assert_eq!(registry.current_primary(), None);
        assert!(!registry.contains("p"));

        assert!(matches!(
            registry.remove_node("p"),
            Err(FailoverError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_list_active() {
        let registry = NodeRegistry::new();
        registry.add_node(node("a", NodeRole::Secondary)).unwrap();
        registry.add_node(node("b", NodeRole::Secondary)).unwrap();
        registry.write().nodes.get_mut("b").unwrap().is_active = false;

        let active: Vec<_> = registry.list_active().into_iter().map(|n| n.id).collect();
        assert_eq!(active, vec!["a".to_string()]);
    }

    #[test]
    fn test_maintenance_toggle() {
        let registry = NodeRegistry::new();
        registry.add_node(node("a", NodeRole::Secondary)).unwrap();

        registry.set_maintenance("a", true).unwrap();
        assert_eq!(registry.get("a").unwrap().health_status, HealthStatus::Maintenance);

        registry.set_maintenance("a", false).unwrap();
        assert_eq!(registry.get("a").unwrap().health_status, HealthStatus::Unknown);

        assert!(registry.set_maintenance("missing", true).is_err());
    }

    #[test]
    fn test_promote_returns_previous() {
        let registry = NodeRegistry::new();
        registry.add_node(node("p", NodeRole::Primary)).unwrap();
        registry.add_node(node("s1", NodeRole::HotSpare)).unwrap();

        let previous = registry.write().promote("s1");
        assert_eq!(previous.as_deref(), Some("p"));
        assert_eq!(registry.primary_count(), 1);
        assert_eq!(registry.get("s1").unwrap().role, NodeRole::Primary);
        assert_eq!(registry.get("p").unwrap().role, NodeRole::Secondary);
    }
}
