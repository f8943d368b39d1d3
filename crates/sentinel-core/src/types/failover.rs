//! Failover state machine types and configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Cluster-wide failover state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClusterState {
    #[default]
    Normal,
    Degraded,
    FailoverInProgress,
    FailoverComplete,
    RecoveryInProgress,
    RecoveryComplete,
}

impl ClusterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterState::Normal => "normal",
            ClusterState::Degraded => "degraded",
            ClusterState::FailoverInProgress => "failover_in_progress",
            ClusterState::FailoverComplete => "failover_complete",
            ClusterState::RecoveryInProgress => "recovery_in_progress",
            ClusterState::RecoveryComplete => "recovery_complete",
        }
    }

    /// Numeric code exported as a gauge
    pub fn code(&self) -> u8 {
        match self {
            ClusterState::Normal => 0,
            ClusterState::Degraded => 1,
            ClusterState::FailoverInProgress => 2,
            ClusterState::FailoverComplete => 3,
            ClusterState::RecoveryInProgress => 4,
            ClusterState::RecoveryComplete => 5,
        }
    }

    /// States in which a transition is already being worked on
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            ClusterState::FailoverInProgress | ClusterState::RecoveryInProgress
        )
    }
}

impl std::fmt::Display for ClusterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How failover is triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailoverMode {
    /// Health failures and heartbeat silence both trigger failover
    #[default]
    Automatic,
    /// Only operator-triggered failover
    Manual,
    /// Only operator-triggered failover, at planned times
    Scheduled,
    /// Only health-check failures trigger failover
    HealthBased,
}

impl FailoverMode {
    pub fn triggers_on_health(&self) -> bool {
        matches!(self, FailoverMode::Automatic | FailoverMode::HealthBased)
    }

    pub fn triggers_on_silence(&self) -> bool {
        matches!(self, FailoverMode::Automatic)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailoverMode::Automatic => "automatic",
            FailoverMode::Manual => "manual",
            FailoverMode::Scheduled => "scheduled",
            FailoverMode::HealthBased => "health_based",
        }
    }
}

impl std::str::FromStr for FailoverMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "automatic" => Ok(FailoverMode::Automatic),
            "manual" => Ok(FailoverMode::Manual),
            "scheduled" => Ok(FailoverMode::Scheduled),
            "health_based" | "health-based" => Ok(FailoverMode::HealthBased),
            other => Err(crate::Error::InvalidArgument(format!(
                "unknown failover mode: {}",
                other
            ))),
        }
    }
}

/// Weights of the candidate scoring function
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityWeights {
    pub health_score: f64,
    pub resource_usage: f64,
    pub network_latency: f64,
    pub node_role: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            health_score: 0.4,
            resource_usage: 0.2,
            network_latency: 0.2,
            node_role: 0.2,
        }
    }
}

/// Thresholds used by the health checker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    /// Percent
    pub cpu_usage: f64,
    /// Percent
    pub memory_usage: f64,
    /// Percent
    pub disk_usage: f64,
    /// Milliseconds
    pub network_latency: f64,
    /// Percent of failed requests
    pub error_rate: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            cpu_usage: 80.0,
            memory_usage: 85.0,
            disk_usage: 90.0,
            network_latency: 100.0,
            error_rate: 5.0,
        }
    }
}

/// Failover configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailoverConfig {
    /// Interval between liveness pings
    pub heartbeat_interval_ms: u64,
    /// Silence after which a node is considered dead
    pub heartbeat_timeout_ms: u64,
    /// Interval between health sweeps
    pub health_check_interval_ms: u64,
    /// Interval of the failover-condition monitor
    pub monitor_interval_ms: u64,
    /// Upper bound on candidate selection and probing
    pub failover_timeout_ms: u64,
    /// TCP connect timeout for probes
    pub connect_timeout_ms: u64,
    /// Upper bound on a single observer hook
    pub observer_timeout_ms: u64,
    /// Failed health checks in a row before the primary is failed over
    pub max_consecutive_failures: u32,
    pub failover_mode: FailoverMode,
    pub auto_recovery_enabled: bool,
    /// Minimum time between a failover and the failed node rejoining
    pub recovery_delay_ms: u64,
    /// Reachable members required before promotion
    pub quorum_size: usize,
    /// Whether `quorum_size` is checked before promotion
    pub enforce_quorum: bool,
    pub priority_weights: PriorityWeights,
    pub health_thresholds: HealthThresholds,
    /// Number of events kept in memory
    pub event_history_size: usize,
    /// Optional JSON-lines file receiving every event
    pub event_log_path: Option<PathBuf>,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 5_000,
            heartbeat_timeout_ms: 15_000,
            health_check_interval_ms: 10_000,
            monitor_interval_ms: 1_000,
            failover_timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
            observer_timeout_ms: 5_000,
            max_consecutive_failures: 3,
            failover_mode: FailoverMode::Automatic,
            auto_recovery_enabled: true,
            recovery_delay_ms: 300_000,
            quorum_size: 2,
            enforce_quorum: false,
            priority_weights: PriorityWeights::default(),
            health_thresholds: HealthThresholds::default(),
            event_history_size: crate::DEFAULT_EVENT_HISTORY,
            event_log_path: None,
        }
    }
}

impl FailoverConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn failover_timeout(&self) -> Duration {
        Duration::from_millis(self.failover_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn observer_timeout(&self) -> Duration {
        Duration::from_millis(self.observer_timeout_ms)
    }

    pub fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay_ms)
    }

    pub fn validate(&self) -> crate::Result<()> {
        let intervals = [
            ("heartbeat_interval_ms", self.heartbeat_interval_ms),
            ("heartbeat_timeout_ms", self.heartbeat_timeout_ms),
            ("health_check_interval_ms", self.health_check_interval_ms),
            ("monitor_interval_ms", self.monitor_interval_ms),
            ("failover_timeout_ms", self.failover_timeout_ms),
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("observer_timeout_ms", self.observer_timeout_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(crate::Error::InvalidConfig(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        if self.heartbeat_timeout_ms <= self.heartbeat_interval_ms {
            return Err(crate::Error::InvalidConfig(format!(
                "heartbeat_timeout_ms ({}) must exceed heartbeat_interval_ms ({})",
                self.heartbeat_timeout_ms, self.heartbeat_interval_ms
            )));
        }

        if self.max_consecutive_failures == 0 {
            return Err(crate::Error::InvalidConfig(
                "max_consecutive_failures must be at least 1".into(),
            ));
        }

        if self.event_history_size == 0 {
            return Err(crate::Error::InvalidConfig(
                "event_history_size must be at least 1".into(),
            ));
        }

        if self.enforce_quorum && self.quorum_size == 0 {
            return Err(crate::Error::InvalidConfig(
                "quorum_size must be at least 1 when quorum is enforced".into(),
            ));
        }

        let w = &self.priority_weights;
        if [w.health_score, w.resource_usage, w.network_latency, w.node_role]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(crate::Error::InvalidConfig(
                "priority weights must be finite and non-negative".into(),
            ));
        }

        if self.health_thresholds.network_latency <= 0.0 {
            return Err(crate::Error::InvalidConfig(
                "health_thresholds.network_latency must be positive".into(),
            ));
        }

        Ok(())
    }
}
