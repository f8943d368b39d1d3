//! Failover audit events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::{ClusterState, NodeId};

/// Kind of failover event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailoverEventType {
    FailoverInitiated,
    FailoverCompleted,
    FailoverFailed,
    /// The primary recovered before a candidate was promoted
    FailoverCancelled,
    RecoveryInitiated,
    RecoveryCompleted,
    StateChanged,
    ManualPromotion,
}

impl FailoverEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailoverEventType::FailoverInitiated => "failover_initiated",
            FailoverEventType::FailoverCompleted => "failover_completed",
            FailoverEventType::FailoverFailed => "failover_failed",
            FailoverEventType::FailoverCancelled => "failover_cancelled",
            FailoverEventType::RecoveryInitiated => "recovery_initiated",
            FailoverEventType::RecoveryCompleted => "recovery_completed",
            FailoverEventType::StateChanged => "state_changed",
            FailoverEventType::ManualPromotion => "manual_promotion",
        }
    }

    pub fn is_recovery(&self) -> bool {
        matches!(
            self,
            FailoverEventType::RecoveryInitiated | FailoverEventType::RecoveryCompleted
        )
    }

    pub fn is_failover(&self) -> bool {
        matches!(
            self,
            FailoverEventType::FailoverInitiated
                | FailoverEventType::FailoverCompleted
                | FailoverEventType::FailoverFailed
                | FailoverEventType::FailoverCancelled
                | FailoverEventType::ManualPromotion
        )
    }
}

impl std::fmt::Display for FailoverEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of a state machine transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: FailoverEventType,
    pub trigger_node: Option<NodeId>,
    pub target_node: Option<NodeId>,
    pub old_state: ClusterState,
    pub new_state: ClusterState,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl FailoverEvent {
    pub fn new(
        event_type: FailoverEventType,
        old_state: ClusterState,
        new_state: ClusterState,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type,
            trigger_node: None,
            target_node: None,
            old_state,
            new_state,
            timestamp: Utc::now(),
            reason: reason.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_trigger(mut self, node: Option<NodeId>) -> Self {
        self.trigger_node = node;
        self
    }

    pub fn with_target(mut self, node: Option<NodeId>) -> Self {
        self.target_node = node;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Single JSON line, the persisted event format
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Aggregate failover statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailoverStats {
    pub failovers_initiated: u64,
    pub failovers_completed: u64,
    pub failovers_failed: u64,
    pub recoveries_completed: u64,
    /// Failovers cancelled because the primary came back
    pub false_alarms: u64,
    pub callback_errors: u64,
    pub average_failover_time_ms: f64,
}

impl FailoverStats {
    /// Fold a completed failover duration into the running average
    pub fn record_failover_time(&mut self, elapsed_ms: f64) {
        let n = self.failovers_completed as f64;
        if n <= 1.0 {
            self.average_failover_time_ms = elapsed_ms;
        } else {
            self.average_failover_time_ms += (elapsed_ms - self.average_failover_time_ms) / n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_line() {
        let event = FailoverEvent::new(
            FailoverEventType::FailoverCompleted,
            ClusterState::FailoverInProgress,
            ClusterState::FailoverComplete,
            "Node s1 promoted to primary",
        )
        .with_trigger(Some("p".to_string()))
        .with_target(Some("s1".to_string()))
        .with_metadata("failover_time_ms", 12.5);

        let line = event.to_json_line().unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("\"type\":\"failover_completed\""));
        assert!(line.contains("\"new_state\":\"failover_complete\""));

        let parsed: FailoverEvent = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.id, event.id);
        assert_eq!(parsed.target_node.as_deref(), Some("s1"));
    }

    #[test]
    fn test_running_average() {
        let mut stats = FailoverStats::default();
        stats.failovers_completed = 1;
        stats.record_failover_time(100.0);
        assert_eq!(stats.average_failover_time_ms, 100.0);

        stats.failovers_completed = 2;
        stats.record_failover_time(200.0);
        assert_eq!(stats.average_failover_time_ms, 150.0);
    }

    #[test]
    fn test_event_kinds() {
        assert!(FailoverEventType::RecoveryCompleted.is_recovery());
        assert!(!FailoverEventType::RecoveryCompleted.is_failover());
        assert!(FailoverEventType::FailoverFailed.is_failover());
        assert!(!FailoverEventType::StateChanged.is_failover());
    }
}
