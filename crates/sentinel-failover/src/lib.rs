//! Sentinel Failover - Failure detection and primary promotion
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Failover Coordinator                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌───────────────┐  ┌───────────────┐  ┌───────────────┐   │
//! │  │   Heartbeat   │  │ HealthChecker │  │   Selector    │   │
//! │  │               │  │               │  │               │   │
//! │  │ - Pings       │  │ - Resources   │  │ - Eligibility │   │
//! │  │ - Timeouts    │  │ - Services    │  │ - Scoring     │   │
//! │  │ - Reactivate  │  │ - Latency     │  │ - Ranking     │   │
//! │  └───────┬───────┘  └───────┬───────┘  └───────┬───────┘   │
//! │          │                  │                  │           │
//! │          └──────────────────┼──────────────────┘           │
//! │                             │                               │
//! │          ┌──────────────────┼──────────────────┐           │
//! │          │                  │                  │           │
//! │  ┌───────┴───────┐  ┌───────┴───────┐  ┌───────┴───────┐   │
//! │  │ NodeRegistry  │  │ ProbeTransport│  │ EventLog and  │   │
//! │  │ (state, roles)│  │  (TCP/HTTP)   │  │  observers    │   │
//! │  └───────────────┘  └───────────────┘  └───────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Features
//!
//! - **Failure Detection**: Heartbeat silence and repeated health failures
//! - **Candidate Scoring**: Weighted health, resources, latency and role
//! - **Single Primary**: Promotion demotes every other node atomically
//! - **False-Alarm Guard**: Failover is cancelled if the primary comes back
//! - **Auto Recovery**: Failed nodes rejoin as secondaries once healthy
//! - **Audit Trail**: Bounded event history, optionally persisted as JSON lines

mod coordinator;
mod error;
mod events;
mod health;
mod heartbeat;
mod observer;
mod registry;
mod selector;
pub mod telemetry;
mod transport;

#[cfg(test)]
mod testing;

pub use coordinator::{
    FailoverCoordinator, FailoverCoordinatorBuilder, FailoverFailure, FailoverOutcome,
    FailoverTrigger,
};
pub use error::{FailoverError, FailoverResult};
pub use events::EventLog;
pub use health::{service_score, HealthChange, HealthChecker, HealthReport};
pub use heartbeat::{HeartbeatMonitor, HeartbeatSummary, TimedOutNode};
pub use observer::{FailoverObserver, LoggingObserver};
pub use registry::{FailureRecord, NodeRegistry, RemovedNode};
pub use selector::{CandidateSelector, ScoredCandidate};
pub use transport::{
    HttpProbeTransport, ProbeTransport, ResourceMetrics, ServiceHealth, TransportConfig,
};

// Re-export types from core
pub use sentinel_core::types::{
    ClusterState, FailoverConfig, FailoverEvent, FailoverEventType, FailoverMode, FailoverStats,
    FailoverStatus, HealthStatus, HealthThresholds, Node, NodeId, NodeRole, NodeSpec,
    NodeStatusEntry, NodeStatusMap, PriorityWeights,
};
