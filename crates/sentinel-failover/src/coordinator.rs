//! Failover coordinator - the state machine deciding when and to whom to fail over
//!
//! Responsibilities:
//! - Own the node registry and the probe components
//! - Run the heartbeat, health and monitor loops
//! - Drive cluster state transitions and record them as events
//! - Serve the query, membership and manual operations

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use sentinel_core::types::{
    ClusterState, FailoverConfig, FailoverEvent, FailoverEventType, FailoverStatus, Node, NodeId,
    NodeRole, NodeSpec, NodeStatusEntry, NodeStatusMap,
};

use crate::error::{FailoverError, FailoverResult};
use crate::events::EventLog;
use crate::health::{HealthChange, HealthChecker};
use crate::heartbeat::HeartbeatMonitor;
use crate::observer::{FailoverObserver, ObserverSet};
use crate::registry::{FailureRecord, NodeRegistry};
use crate::selector::{CandidateSelector, ScoredCandidate};
use crate::telemetry;
use crate::transport::{HttpProbeTransport, ProbeTransport, TransportConfig};

/// Why a failover was started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailoverTrigger {
    HeartbeatTimeout(NodeId),
    HealthFailures { node_id: NodeId, failures: u32 },
    PrimaryRemoved(NodeId),
    NoPrimary,
    Manual(String),
}

impl FailoverTrigger {
    fn node_id(&self) -> Option<&str> {
        match self {
            FailoverTrigger::HeartbeatTimeout(id)
            | FailoverTrigger::HealthFailures { node_id: id, .. }
            | FailoverTrigger::PrimaryRemoved(id) => Some(id.as_str()),
            FailoverTrigger::NoPrimary | FailoverTrigger::Manual(_) => None,
        }
    }

    fn reason(&self) -> String {
        match self {
            FailoverTrigger::HeartbeatTimeout(id) => {
                format!("Primary node {} heartbeat timeout", id)
            }
            FailoverTrigger::HealthFailures { node_id, failures } => format!(
                "Primary node {} has {} consecutive health failures",
                node_id, failures
            ),
            FailoverTrigger::PrimaryRemoved(id) => {
                format!("Primary node {} removed from cluster", id)
            }
            FailoverTrigger::NoPrimary => "Cluster has no primary".to_string(),
            FailoverTrigger::Manual(reason) => format!("Manual failover: {}", reason),
        }
    }

    /// Automatic triggers are re-checked against the primary before promotion
    fn may_be_false_alarm(&self) -> bool {
        matches!(
            self,
            FailoverTrigger::HeartbeatTimeout(_) | FailoverTrigger::HealthFailures { .. }
        )
    }
}

/// Why a failover ended in `Degraded`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailoverFailure {
    NoCandidate,
    QuorumNotReached { needed: usize, got: usize },
    TimedOut(Duration),
    CandidateLost(NodeId),
}

impl std::fmt::Display for FailoverFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailoverFailure::NoCandidate => write!(f, "No suitable node found for failover"),
            FailoverFailure::QuorumNotReached { needed, got } => write!(
                f,
                "Quorum not reached: {} reachable members, {} required",
                got, needed
            ),
            FailoverFailure::TimedOut(after) => {
                write!(f, "Failover timed out after {}ms", after.as_millis())
            }
            FailoverFailure::CandidateLost(id) => {
                write!(f, "Candidate {} left the cluster before promotion", id)
            }
        }
    }
}

impl From<FailoverFailure> for FailoverError {
    fn from(failure: FailoverFailure) -> Self {
        match failure {
            FailoverFailure::NoCandidate => FailoverError::NoCandidate,
            FailoverFailure::QuorumNotReached { needed, got } => {
                FailoverError::QuorumNotReached { needed, got }
            }
            FailoverFailure::TimedOut(_) => FailoverError::Timeout(failure.to_string()),
            FailoverFailure::CandidateLost(id) => FailoverError::NodeUnreachable(id),
        }
    }
}

/// Result of a failover attempt
#[derive(Debug, Clone, PartialEq)]
pub enum FailoverOutcome {
    Promoted {
        node_id: NodeId,
        previous: Option<NodeId>,
    },
    /// The primary came back before a candidate was promoted
    Cancelled,
    Failed(FailoverFailure),
    /// Another transition was already under way
    Skipped(ClusterState),
}

enum Selection {
    Candidate(ScoredCandidate),
    FalseAlarm,
    Failed(FailoverFailure),
}

/// The failover coordinator
pub struct FailoverCoordinator {
    coordinator_id: String,
    config: FailoverConfig,
    registry: Arc<NodeRegistry>,
    transport: Arc<dyn ProbeTransport>,
    health: HealthChecker,
    heartbeat: HeartbeatMonitor,
    selector: CandidateSelector,
    events: EventLog,
    observers: ObserverSet,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl FailoverCoordinator {
    pub fn new(config: FailoverConfig, transport: Arc<dyn ProbeTransport>) -> FailoverResult<Self> {
        config.validate()?;

        let events = match &config.event_log_path {
            Some(path) => EventLog::with_file(config.event_history_size, path)?,
            None => EventLog::new(config.event_history_size),
        };

        let health = HealthChecker::new(
            Arc::clone(&transport),
            config.health_thresholds.clone(),
            config.connect_timeout(),
        );
        let heartbeat = HeartbeatMonitor::new(Arc::clone(&transport), config.heartbeat_timeout());
        let selector = CandidateSelector::new(config.priority_weights.clone());
        let observers = ObserverSet::new(config.observer_timeout());

        Ok(Self {
            coordinator_id: "sentinel".to_string(),
            config,
            registry: Arc::new(NodeRegistry::new()),
            transport,
            health,
            heartbeat,
            selector,
            events,
            observers,
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        })
    }

    pub fn coordinator_id(&self) -> &str {
        &self.coordinator_id
    }

    pub fn config(&self) -> &FailoverConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn register_observer(&self, observer: Arc<dyn FailoverObserver>) {
        self.observers.register(observer);
    }

    /// Subscribe to node health changes
    pub fn subscribe_health(&self) -> broadcast::Receiver<HealthChange> {
        self.health.subscribe()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Spawn the heartbeat, health-check and monitor loops
    pub fn start(self: &Arc<Self>) -> FailoverResult<()> {
        self.config.validate()?;

        if self.registry.is_empty() {
            return Err(FailoverError::InvalidConfig(
                "no nodes registered, nothing to coordinate".to_string(),
            ));
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(FailoverError::InvalidState(
                "coordinator already started".to_string(),
            ));
        }

        info!(
            "Starting failover coordinator '{}' with {} nodes and {} observers (mode {}, primary {:?})",
            self.coordinator_id,
            self.registry.len(),
            self.observers.len(),
            self.config.failover_mode.as_str(),
            self.registry.current_primary()
        );

        let handles = vec![
            self.spawn_loop("heartbeat", self.config.heartbeat_interval(), |c| async move {
                c.heartbeat_tick().await
            }),
            self.spawn_loop("health-check", self.config.health_check_interval(), |c| async move {
                c.health_tick().await
            }),
            self.spawn_loop("failover-monitor", self.config.monitor_interval(), |c| async move {
                c.monitor_tick().await
            }),
        ];
        self.tasks.lock().extend(handles);

        self.update_gauges();
        Ok(())
    }

    /// Cancel the loops and wait for them to exit; a tick in flight is dropped
    pub async fn stop(&self) {
        info!("Stopping failover coordinator");
        self.shutdown.cancel();

        let handles = std::mem::take(&mut *self.tasks.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Coordinator loop ended abnormally: {}", e);
            }
        }

        info!("Failover coordinator stopped");
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.shutdown.is_cancelled()
    }

    fn spawn_loop<F, Fut>(self: &Arc<Self>, name: &'static str, period: Duration, tick: F) -> JoinHandle<()>
    where
        F: Fn(Arc<Self>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let this = Arc::clone(self);
        let token = self.shutdown.clone();

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tick(Arc::clone(&this)) => {}
                }
            }

            debug!("{} loop stopped", name);
        })
    }

    // ------------------------------------------------------------------
    // Loop bodies
    // ------------------------------------------------------------------

    /// Ping every node, then fail over if the primary went silent
    pub async fn heartbeat_tick(&self) {
        let summary = self.heartbeat.send_heartbeats(&self.registry).await;
        let timed_out = self.heartbeat.scan_timeouts(&self.registry, Utc::now());
        telemetry::record_heartbeats(summary.failed, timed_out.len());

        for node in timed_out {
            if node.was_primary && self.config.failover_mode.triggers_on_silence() {
                self.initiate_failover(FailoverTrigger::HeartbeatTimeout(node.node_id))
                    .await;
            }
        }
    }

    /// Probe node health, then fail over if the primary crossed the failure limit
    pub async fn health_tick(&self) {
        let changes = self.health.sweep(&self.registry).await;
        if !changes.is_empty() {
            debug!("{} node health changes", changes.len());
        }

        self.evaluate().await;
        self.update_gauges();
    }

    /// Check failover and recovery conditions
    pub async fn monitor_tick(&self) {
        match self.registry.cluster_state() {
            ClusterState::Normal => {
                self.evaluate().await;
            }
            ClusterState::Degraded | ClusterState::FailoverComplete => {
                if self.config.auto_recovery_enabled {
                    self.check_recovery().await;
                }
            }
            _ => {}
        }
        self.update_gauges();
    }

    async fn evaluate(&self) -> Option<FailoverOutcome> {
        let trigger = self.failover_condition()?;
        Some(self.initiate_failover(trigger).await)
    }

    fn failover_condition(&self) -> Option<FailoverTrigger> {
        let mode = self.config.failover_mode;
        let inner = self.registry.read();

        if inner.state != ClusterState::Normal {
            return None;
        }

        match inner.primary() {
            Some(primary) => {
                if !primary.is_active && mode.triggers_on_silence() {
                    Some(FailoverTrigger::HeartbeatTimeout(primary.id.clone()))
                } else if primary.consecutive_failures >= self.config.max_consecutive_failures
                    && mode.triggers_on_health()
                {
                    Some(FailoverTrigger::HealthFailures {
                        node_id: primary.id.clone(),
                        failures: primary.consecutive_failures,
                    })
                } else {
                    None
                }
            }
            None => {
                let automatic = mode.triggers_on_health() || mode.triggers_on_silence();
                let has_candidate = inner
                    .nodes
                    .values()
                    .any(|n| CandidateSelector::is_eligible(n, None));
                (automatic && has_candidate).then_some(FailoverTrigger::NoPrimary)
            }
        }
    }

    // ------------------------------------------------------------------
    // Failover
    // ------------------------------------------------------------------

    async fn initiate_failover(&self, trigger: FailoverTrigger) -> FailoverOutcome {
        let started = Instant::now();
        let reason = trigger.reason();

        let failing = {
            let mut inner = self.registry.write();
            if inner.state != ClusterState::Normal {
                debug!("Ignoring failover trigger in state {}: {}", inner.state, reason);
                return FailoverOutcome::Skipped(inner.state);
            }

            let failing = trigger
                .node_id()
                .map(str::to_string)
                .or_else(|| inner.current_primary.clone());
            inner.state = ClusterState::FailoverInProgress;
            inner.last_failure = Some(FailureRecord {
                node_id: failing.clone(),
                at: Utc::now(),
            });
            failing
        };

        warn!("Initiating failover: {}", reason);
        self.events.update_stats(|s| s.failovers_initiated += 1);
        self.emit(
            FailoverEvent::new(
                FailoverEventType::FailoverInitiated,
                ClusterState::Normal,
                ClusterState::FailoverInProgress,
                reason,
            )
            .with_trigger(failing.clone())
            .with_metadata("initiator", self.coordinator_id.clone()),
        )
        .await;

        let timeout = self.config.failover_timeout();
        let selection = tokio::time::timeout(
            timeout,
            self.choose_candidate(failing.as_deref(), trigger.may_be_false_alarm()),
        )
        .await
        .unwrap_or(Selection::Failed(FailoverFailure::TimedOut(timeout)));

        match selection {
            Selection::Candidate(candidate) => {
                self.commit_promotion(failing, candidate, started).await
            }
            Selection::FalseAlarm => self.cancel_failover(failing, started).await,
            Selection::Failed(failure) => self.fail_failover(failing, failure, started).await,
        }
    }

    /// Runs without the registry lock
    async fn choose_candidate(&self, failing: Option<&str>, check_false_alarm: bool) -> Selection {
        let nodes = self.registry.list();

        if check_false_alarm {
            let recovered = failing
                .and_then(|id| nodes.iter().find(|n| n.id == id))
                .is_some_and(|n| n.is_active && n.is_healthy());
            if recovered {
                return Selection::FalseAlarm;
            }
        }

        if self.config.enforce_quorum {
            let reachable = nodes
                .iter()
                .filter(|n| n.is_active && Some(n.id.as_str()) != failing)
                .count();
            if reachable < self.config.quorum_size {
                return Selection::Failed(FailoverFailure::QuorumNotReached {
                    needed: self.config.quorum_size,
                    got: reachable,
                });
            }
        }

        for candidate in self.selector.rank(&nodes, failing) {
            let Some(node) = nodes.iter().find(|n| n.id == candidate.node_id) else {
                continue;
            };

            if self
                .transport
                .connect(&node.address, node.port, self.config.connect_timeout())
                .await
            {
                debug!(
                    "Selected candidate {} (score {:.3})",
                    candidate.node_id, candidate.score
                );
                return Selection::Candidate(candidate);
            }
            warn!(
                "Candidate {} unreachable at {}, trying next",
                candidate.node_id,
                node.endpoint()
            );
        }

        Selection::Failed(FailoverFailure::NoCandidate)
    }

    async fn commit_promotion(
        &self,
        failing: Option<NodeId>,
        candidate: ScoredCandidate,
        started: Instant,
    ) -> FailoverOutcome {
        let previous = {
            let mut inner = self.registry.write();
            let present = inner
                .nodes
                .get(&candidate.node_id)
                .is_some_and(|n| n.is_active);

            if !present || inner.state != ClusterState::FailoverInProgress {
                None
            } else {
                let previous = inner.promote(&candidate.node_id);
                inner.state = ClusterState::FailoverComplete;
                Some(previous)
            }
        };

        let Some(previous) = previous else {
            return self
                .fail_failover(
                    failing,
                    FailoverFailure::CandidateLost(candidate.node_id),
                    started,
                )
                .await;
        };

        let elapsed = started.elapsed();
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        self.events.update_stats(|s| {
            s.failovers_completed += 1;
            s.record_failover_time(elapsed_ms);
        });
        telemetry::record_failover("completed", elapsed.as_secs_f64());

        info!(
            "Failover complete: {} promoted to primary in {:.1}ms",
            candidate.node_id, elapsed_ms
        );

        let mut event = FailoverEvent::new(
            FailoverEventType::FailoverCompleted,
            ClusterState::FailoverInProgress,
            ClusterState::FailoverComplete,
            format!("Node {} promoted to primary", candidate.node_id),
        )
        .with_trigger(failing)
        .with_target(Some(candidate.node_id.clone()))
        .with_metadata("candidate_score", candidate.score)
        .with_metadata("failover_time_ms", elapsed_ms);
        if let Some(previous) = &previous {
            event = event.with_metadata("previous_primary", previous.clone());
        }
        self.emit(event).await;

        FailoverOutcome::Promoted {
            node_id: candidate.node_id,
            previous,
        }
    }

    async fn cancel_failover(&self, failing: Option<NodeId>, started: Instant) -> FailoverOutcome {
        {
            let mut inner = self.registry.write();
            if inner.state == ClusterState::FailoverInProgress {
                inner.state = ClusterState::Normal;
            }
            inner.last_failure = None;
        }

        self.events.update_stats(|s| s.false_alarms += 1);
        telemetry::record_failover("cancelled", started.elapsed().as_secs_f64());
        info!("Primary {:?} recovered before promotion, failover cancelled", failing);

        self.emit(
            FailoverEvent::new(
                FailoverEventType::FailoverCancelled,
                ClusterState::FailoverInProgress,
                ClusterState::Normal,
                "Primary recovered before promotion",
            )
            .with_trigger(failing),
        )
        .await;

        FailoverOutcome::Cancelled
    }

    async fn fail_failover(
        &self,
        failing: Option<NodeId>,
        failure: FailoverFailure,
        started: Instant,
    ) -> FailoverOutcome {
        {
            let mut inner = self.registry.write();
            if inner.state == ClusterState::FailoverInProgress {
                inner.state = ClusterState::Degraded;
            }
        }

        self.events.update_stats(|s| s.failovers_failed += 1);
        telemetry::record_failover("failed", started.elapsed().as_secs_f64());
        error!("Failover failed: {}", failure);

        self.emit(
            FailoverEvent::new(
                FailoverEventType::FailoverFailed,
                ClusterState::FailoverInProgress,
                ClusterState::Degraded,
                failure.to_string(),
            )
            .with_trigger(failing),
        )
        .await;

        FailoverOutcome::Failed(failure)
    }

    // ------------------------------------------------------------------
    // Recovery
    // ------------------------------------------------------------------

    async fn check_recovery(&self) {
        let Some(record) = self.registry.last_failure() else {
            return;
        };

        let delay = chrono::Duration::from_std(self.config.recovery_delay())
            .unwrap_or(chrono::Duration::MAX);
        if Utc::now() - record.at < delay {
            return;
        }

        let failed = record
            .node_id
            .as_deref()
            .and_then(|id| self.registry.get(id));

        match failed {
            Some(node) if node.is_active && node.is_healthy() => {
                self.run_recovery(&node.id).await;
            }
            Some(_) => {}
            None => {
                self.settle("Failed node is no longer a cluster member").await;
            }
        }
    }

    async fn run_recovery(&self, node_id: &str) {
        let old_state = {
            let mut inner = self.registry.write();
            if !matches!(
                inner.state,
                ClusterState::Degraded | ClusterState::FailoverComplete
            ) {
                return;
            }
            let old = inner.state;
            inner.state = ClusterState::RecoveryInProgress;
            old
        };

        info!("Node {} recovered, rejoining cluster", node_id);
        self.emit(
            FailoverEvent::new(
                FailoverEventType::RecoveryInitiated,
                old_state,
                ClusterState::RecoveryInProgress,
                format!("Node {} is healthy again", node_id),
            )
            .with_trigger(Some(node_id.to_string())),
        )
        .await;

        let role = {
            let mut inner = self.registry.write();
            let resumes_primary = inner.current_primary.as_deref() == Some(node_id);

            let role = inner.nodes.get_mut(node_id).map(|node| {
                node.consecutive_failures = 0;
                if resumes_primary {
                    node.is_primary = true;
                    node.role = NodeRole::Primary;
                } else {
                    node.is_primary = false;
                    node.role = NodeRole::Secondary;
                }
                node.role
            });

            inner.last_failure = None;
            inner.state = ClusterState::RecoveryComplete;
            role
        };

        self.events.update_stats(|s| s.recoveries_completed += 1);
        let reason = match role {
            Some(role) => format!("Node {} rejoined as {}", node_id, role),
            None => format!("Node {} left the cluster during recovery", node_id),
        };
        self.emit(
            FailoverEvent::new(
                FailoverEventType::RecoveryCompleted,
                ClusterState::RecoveryInProgress,
                ClusterState::RecoveryComplete,
                reason,
            )
            .with_trigger(Some(node_id.to_string())),
        )
        .await;

        {
            let mut inner = self.registry.write();
            if inner.state == ClusterState::RecoveryComplete {
                inner.state = ClusterState::Normal;
            }
        }
        self.emit(FailoverEvent::new(
            FailoverEventType::StateChanged,
            ClusterState::RecoveryComplete,
            ClusterState::Normal,
            "Recovery complete",
        ))
        .await;
    }

    /// Return to `Normal` without a recovery cycle
    async fn settle(&self, reason: &str) {
        let old_state = {
            let mut inner = self.registry.write();
            if !matches!(
                inner.state,
                ClusterState::Degraded | ClusterState::FailoverComplete
            ) {
                return;
            }
            let old = inner.state;
            inner.state = ClusterState::Normal;
            inner.last_failure = None;
            old
        };

        info!("Cluster back to normal: {}", reason);
        self.emit(FailoverEvent::new(
            FailoverEventType::StateChanged,
            old_state,
            ClusterState::Normal,
            reason,
        ))
        .await;
    }

    // ------------------------------------------------------------------
    // Membership and manual operations
    // ------------------------------------------------------------------

    pub fn add_node(&self, spec: NodeSpec) -> FailoverResult<()> {
        self.registry.add_node(spec.into_node())?;
        self.update_gauges();
        Ok(())
    }

    /// Remove a node; removing the primary starts a failover
    pub async fn remove_node(&self, node_id: &str) -> FailoverResult<Node> {
        let removed = self.registry.remove_node(node_id)?;
        self.update_gauges();

        if removed.was_primary {
            let outcome = self
                .initiate_failover(FailoverTrigger::PrimaryRemoved(node_id.to_string()))
                .await;
            debug!("Failover after removing primary {}: {:?}", node_id, outcome);
        }

        Ok(removed.node)
    }

    pub fn set_maintenance(&self, node_id: &str, enabled: bool) -> FailoverResult<()> {
        self.registry.set_maintenance(node_id, enabled)
    }

    /// Operator-requested failover, honoured in every failover mode
    pub async fn trigger_failover(&self, reason: impl Into<String>) -> FailoverResult<FailoverOutcome> {
        if self.registry.is_empty() {
            return Err(FailoverError::InvalidState("no nodes registered".to_string()));
        }

        match self
            .initiate_failover(FailoverTrigger::Manual(reason.into()))
            .await
        {
            FailoverOutcome::Skipped(state) => Err(FailoverError::InvalidState(format!(
                "cannot fail over while {}",
                state
            ))),
            outcome => Ok(outcome),
        }
    }

    /// Make an active, healthy node the primary and return to `Normal`
    pub async fn promote_node(&self, node_id: &str) -> FailoverResult<()> {
        let (old_state, previous) = {
            let mut inner = self.registry.write();

            if inner.state.is_transitional() {
                return Err(FailoverError::InvalidState(format!(
                    "cannot promote while {}",
                    inner.state
                )));
            }

            let node = inner
                .nodes
                .get(node_id)
                .ok_or_else(|| FailoverError::NodeNotFound(node_id.to_string()))?;
            if !node.is_active || !node.is_healthy() {
                return Err(FailoverError::NotEligible(format!(
                    "node {} is {} (active={})",
                    node_id, node.health_status, node.is_active
                )));
            }
            if inner.current_primary.as_deref() == Some(node_id) {
                return Err(FailoverError::InvalidState(format!(
                    "node {} is already primary",
                    node_id
                )));
            }

            let old = inner.state;
            let previous = inner.promote(node_id);
            inner.state = ClusterState::Normal;
            inner.last_failure = None;
            (old, previous)
        };

        warn!("Node {} manually promoted to primary (was {:?})", node_id, previous);
        self.emit(
            FailoverEvent::new(
                FailoverEventType::ManualPromotion,
                old_state,
                ClusterState::Normal,
                format!("Node {} manually promoted to primary", node_id),
            )
            .with_trigger(previous)
            .with_target(Some(node_id.to_string())),
        )
        .await;

        Ok(())
    }

    /// Operator acknowledgement returning a settled state to `Normal`
    pub async fn acknowledge(&self) -> FailoverResult<ClusterState> {
        let old_state = {
            let mut inner = self.registry.write();
            match inner.state {
                ClusterState::Normal => return Ok(ClusterState::Normal),
                ClusterState::Degraded
                | ClusterState::FailoverComplete
                | ClusterState::RecoveryComplete => {
                    let old = inner.state;
                    inner.state = ClusterState::Normal;
                    inner.last_failure = None;
                    old
                }
                other => {
                    return Err(FailoverError::InvalidState(format!(
                        "cannot acknowledge while {}",
                        other
                    )))
                }
            }
        };

        info!("Operator acknowledged {}, back to normal", old_state);
        self.emit(FailoverEvent::new(
            FailoverEventType::StateChanged,
            old_state,
            ClusterState::Normal,
            "Acknowledged by operator",
        ))
        .await;

        Ok(ClusterState::Normal)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn cluster_state(&self) -> ClusterState {
        self.registry.cluster_state()
    }

    pub fn current_primary(&self) -> Option<NodeId> {
        self.registry.current_primary()
    }

    pub fn node(&self, node_id: &str) -> Option<Node> {
        self.registry.get(node_id)
    }

    pub fn failover_status(&self) -> FailoverStatus {
        let inner = self.registry.read();

        FailoverStatus {
            current_state: inner.state,
            current_primary: inner.current_primary.clone(),
            failover_mode: self.config.failover_mode,
            total_nodes: inner.nodes.len(),
            active_nodes: inner.nodes.values().filter(|n| n.is_active).count(),
            healthy_nodes: inner.nodes.values().filter(|n| n.is_healthy()).count(),
            stats: self.events.stats(),
            last_event: self.events.last(),
        }
    }

    pub fn node_status(&self) -> NodeStatusMap {
        self.registry
            .read()
            .nodes
            .iter()
            .map(|(id, node)| (id.clone(), NodeStatusEntry::from(node)))
            .collect()
    }

    /// Up to `limit` most recent events, oldest first
    pub fn recent_events(&self, limit: usize) -> Vec<FailoverEvent> {
        self.events.recent(limit)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn emit(&self, event: FailoverEvent) {
        telemetry::record_event(event.event_type);
        telemetry::record_state(event.new_state);
        self.events.append(event.clone());

        let failures = self.observers.dispatch(&event).await;
        if failures > 0 {
            self.events.update_stats(|s| s.callback_errors += failures);
            telemetry::record_observer_errors(failures);
        }
    }

    fn update_gauges(&self) {
        let inner = self.registry.read();
        telemetry::record_state(inner.state);
        telemetry::record_membership(
            inner.nodes.len(),
            inner.nodes.values().filter(|n| n.is_active).count(),
            inner.nodes.values().filter(|n| n.is_healthy()).count(),
        );
        for node in inner.nodes.values() {
            telemetry::record_health_score(&node.id, node.health_score);
        }
    }
}

impl std::fmt::Debug for FailoverCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverCoordinator")
            .field("coordinator_id", &self.coordinator_id)
            .field("mode", &self.config.failover_mode)
            .field("nodes", &self.registry.len())
            .field("state", &self.registry.cluster_state())
            .finish()
    }
}

/// Builder for FailoverCoordinator
pub struct FailoverCoordinatorBuilder {
    config: FailoverConfig,
    coordinator_id: Option<String>,
    transport: Option<Arc<dyn ProbeTransport>>,
    transport_config: Option<TransportConfig>,
    observers: Vec<Arc<dyn FailoverObserver>>,
    nodes: Vec<NodeSpec>,
}

impl FailoverCoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            config: FailoverConfig::default(),
            coordinator_id: None,
            transport: None,
            transport_config: None,
            observers: Vec::new(),
            nodes: Vec::new(),
        }
    }

    pub fn config(mut self, config: FailoverConfig) -> Self {
        self.config = config;
        self
    }

    /// Identity recorded in event metadata
    pub fn coordinator_id(mut self, id: impl Into<String>) -> Self {
        self.coordinator_id = Some(id.into());
        self
    }

    /// Use a custom probe transport instead of HTTP
    pub fn transport(mut self, transport: Arc<dyn ProbeTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Settings for the default HTTP transport
    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = Some(config);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn FailoverObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn node(mut self, spec: NodeSpec) -> Self {
        self.nodes.push(spec);
        self
    }

    pub fn nodes(mut self, specs: impl IntoIterator<Item = NodeSpec>) -> Self {
        self.nodes.extend(specs);
        self
    }

    pub fn build(self) -> FailoverResult<FailoverCoordinator> {
        let transport: Arc<dyn ProbeTransport> = match self.transport {
            Some(transport) => transport,
            None => {
                let config = self.transport_config.unwrap_or_else(|| TransportConfig {
                    connect_timeout: self.config.connect_timeout(),
                    ..Default::default()
                });
                Arc::new(HttpProbeTransport::new(config)?)
            }
        };

        let mut coordinator = FailoverCoordinator::new(self.config, transport)?;
        if let Some(id) = self.coordinator_id {
            coordinator.coordinator_id = id;
        }

        for spec in self.nodes {
            coordinator.add_node(spec)?;
        }
        for observer in self.observers {
            coordinator.register_observer(observer);
        }

        Ok(coordinator)
    }
}

impl Default for FailoverCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
