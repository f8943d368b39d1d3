//! Promotion candidate ranking

use std::cmp::Ordering;

use sentinel_core::types::{Node, NodeId, PriorityWeights};

/// Weight of `failover_priority` in the candidate score
const PRIORITY_WEIGHT: f64 = 0.1;

/// Latency at which the latency component reaches zero
const LATENCY_CEILING_MS: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub node_id: NodeId,
    pub score: f64,
}

/// Ranks eligible nodes for promotion
#[derive(Debug, Clone, Default)]
pub struct CandidateSelector {
    weights: PriorityWeights,
}

impl CandidateSelector {
    pub fn new(weights: PriorityWeights) -> Self {
        Self { weights }
    }

    /// Active, healthy, non-primary nodes other than `failing`
    pub fn is_eligible(node: &Node, failing: Option<&str>) -> bool {
        node.is_active
            && !node.is_primary
            && node.is_healthy()
            && failing != Some(node.id.as_str())
    }

    pub fn score(&self, node: &Node) -> f64 {
        let w = &self.weights;

        let resource_score = node
            .average_resource_usage()
            .map(|avg| (1.0 - avg / 100.0).max(0.0))
            .unwrap_or(1.0);
        let latency_score = (1.0 - node.network_latency_ms / LATENCY_CEILING_MS).max(0.0);

        node.health_score * w.health_score
            + resource_score * w.resource_usage
            + latency_score * w.network_latency
            + node.role.promotion_score() * w.node_role
            + node.failover_priority as f64 * PRIORITY_WEIGHT
    }

    /// Eligible candidates by descending score, ties by ascending id
    pub fn rank(&self, nodes: &[Node], failing: Option<&str>) -> Vec<ScoredCandidate> {
        let mut ranked: Vec<ScoredCandidate> = nodes
            .iter()
            .filter(|n| Self::is_eligible(n, failing))
            .map(|n| ScoredCandidate {
                node_id: n.id.clone(),
                score: self.score(n),
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.node_id.cmp(&b.node_id))
        });
        ranked
    }

    pub fn select(&self, nodes: &[Node], failing: Option<&str>) -> Option<ScoredCandidate> {
        self.rank(nodes, failing).into_iter().next()
    }
}
