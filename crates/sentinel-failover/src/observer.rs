//! Observer hooks for failover transitions

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::RwLock;
use tracing::{error, info, warn};

use sentinel_core::types::{ClusterState, FailoverEvent};

use crate::error::FailoverError;

/// Receives failover notifications.
///
/// Errors, panics and hooks outliving the observer timeout are logged and
/// counted; they never reach the state machine.
#[async_trait]
pub trait FailoverObserver: Send + Sync {
    fn name(&self) -> &str {
        "observer"
    }

    async fn on_failover(&self, _event: &FailoverEvent) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_recovery(&self, _event: &FailoverEvent) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_state_change(&self, _old: ClusterState, _new: ClusterState) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Writes every notification to the log
#[derive(Debug, Default)]
pub struct LoggingObserver;

#[async_trait]
impl FailoverObserver for LoggingObserver {
    fn name(&self) -> &str {
        "logging"
    }

    async fn on_failover(&self, event: &FailoverEvent) -> anyhow::Result<()> {
        warn!(
            event = %event.event_type,
            trigger = ?event.trigger_node,
            target = ?event.target_node,
            "{}",
            event.reason
        );
        Ok(())
    }

    async fn on_recovery(&self, event: &FailoverEvent) -> anyhow::Result<()> {
        info!(
            event = %event.event_type,
            node = ?event.trigger_node,
            "{}",
            event.reason
        );
        Ok(())
    }

    async fn on_state_change(&self, old: ClusterState, new: ClusterState) -> anyhow::Result<()> {
        info!("Cluster state {} -> {}", old, new);
        Ok(())
    }
}

/// Registered observers
pub(crate) struct ObserverSet {
    observers: RwLock<Vec<Arc<dyn FailoverObserver>>>,
    timeout: Duration,
}

impl ObserverSet {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            timeout,
        }
    }

    pub(crate) fn register(&self, observer: Arc<dyn FailoverObserver>) {
        info!("Registered failover observer '{}'", observer.name());
        self.observers.write().push(observer);
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Deliver an event to every observer, returning the number of failures
    pub(crate) async fn dispatch(&self, event: &FailoverEvent) -> u64 {
        let observers: Vec<_> = self.observers.read().clone();
        let mut failures = 0;

        for observer in observers {
            if event.event_type.is_failover() {
                failures += self
                    .guarded(observer.name(), "on_failover", observer.on_failover(event))
                    .await;
            }
            if event.event_type.is_recovery() {
                failures += self
                    .guarded(observer.name(), "on_recovery", observer.on_recovery(event))
                    .await;
            }
            if event.old_state != event.new_state {
                failures += self
                    .guarded(
                        observer.name(),
                        "on_state_change",
                        observer.on_state_change(event.old_state, event.new_state),
                    )
                    .await;
            }
        }

        failures
    }

    /// Run one hook, returning 1 if it failed, panicked or timed out
    async fn guarded<F>(&self, name: &str, hook: &str, fut: F) -> u64
    where
        F: std::future::Future<Output = anyhow::Result<()>>,
    {
        let err = match tokio::time::timeout(self.timeout, AssertUnwindSafe(fut).catch_unwind()).await {
            Ok(Ok(Ok(()))) => return 0,
            Ok(Ok(Err(e))) => FailoverError::Callback(format!("{} {}: {:#}", name, hook, e)),
            Ok(Err(_)) => FailoverError::Callback(format!("{} {} panicked", name, hook)),
            Err(_) => FailoverError::Callback(format!(
                "{} {} timed out after {:?}",
                name, hook, self.timeout
            )),
        };

        error!(observer = name, "{}", err);
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use sentinel_core::types::FailoverEventType;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl FailoverObserver for Recorder {
        async fn on_failover(&self, event: &FailoverEvent) -> anyhow::Result<()> {
            self.calls.lock().push(format!("failover:{}", event.event_type));
            Ok(())
        }

        async fn on_recovery(&self, event: &FailoverEvent) -> anyhow::Result<()> {
            self.calls.lock().push(format!("recovery:{}", event.event_type));
            Ok(())
        }

        async fn on_state_change(&self, old: ClusterState, new: ClusterState) -> anyhow::Result<()> {
            self.calls.lock().push(format!("state:{}->{}", old, new));
            Ok(())
        }
    }

    struct Faulty;

    #[async_trait]
    impl FailoverObserver for Faulty {
        async fn on_failover(&self, _event: &FailoverEvent) -> anyhow::Result<()> {
            anyhow::bail!("pager unreachable")
        }

        async fn on_state_change(&self, _old: ClusterState, _new: ClusterState) -> anyhow::Result<()> {
            panic!("observer bug")
        }
    }

    struct Stuck;

    #[async_trait]
    impl FailoverObserver for Stuck {
        async fn on_failover(&self, _event: &FailoverEvent) -> anyhow::Result<()> {
            futures::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_routes_hooks() {
        let set = ObserverSet::new(Duration::from_secs(1));
        let recorder = Arc::new(Recorder::default());
        set.register(recorder.clone());

        let failover = FailoverEvent::new(
            FailoverEventType::FailoverInitiated,
            ClusterState::Normal,
            ClusterState::FailoverInProgress,
            "test",
        );
        let recovery = FailoverEvent::new(
            FailoverEventType::RecoveryCompleted,
            ClusterState::RecoveryInProgress,
            ClusterState::RecoveryComplete,
            "test",
        );

        assert_eq!(set.dispatch(&failover).await, 0);
        assert_eq!(set.dispatch(&recovery).await, 0);

        let calls = recorder.calls.lock().clone();
        assert_eq!(
            calls,
            vec![
                "failover:failover_initiated",
                "state:normal->failover_in_progress",
                "recovery:recovery_completed",
                "state:recovery_in_progress->recovery_complete",
            ]
        );
    }

    #[tokio::test]
    async fn test_faulty_observer_isolated() {
        let set = ObserverSet::new(Duration::from_secs(1));
        let recorder = Arc::new(Recorder::default());
        set.register(Arc::new(Faulty));
        set.register(recorder.clone());
        assert_eq!(set.len(), 2);

        let event = FailoverEvent::new(
            FailoverEventType::FailoverFailed,
            ClusterState::FailoverInProgress,
            ClusterState::Degraded,
            "no candidate",
        );

        assert_eq!(set.dispatch(&event).await, 2);
        assert_eq!(recorder.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_stuck_observer_times_out() {
        let set = ObserverSet::new(Duration::from_millis(50));
        let recorder = Arc::new(Recorder::default());
        set.register(Arc::new(Stuck));
        set.register(recorder.clone());

        let event = FailoverEvent::new(
            FailoverEventType::FailoverInitiated,
            ClusterState::Normal,
            ClusterState::FailoverInProgress,
            "heartbeat timeout",
        );

        let failures = tokio::time::timeout(Duration::from_secs(2), set.dispatch(&event))
            .await
            .expect("dispatch must not hang on a stuck observer");
        assert_eq!(failures, 1);
        assert_eq!(recorder.calls.lock().len(), 2);
    }
}
