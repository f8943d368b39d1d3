//! Scriptable probe transport for unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{FailoverError, FailoverResult};
use crate::transport::{ProbeTransport, ResourceMetrics, ServiceHealth};

#[derive(Debug, Clone)]
struct HostBehavior {
    reachable: bool,
    ping_ok: bool,
    metrics_error: bool,
    connect_delay: Duration,
    resources: ResourceMetrics,
    services: ServiceHealth,
}

impl Default for HostBehavior {
    fn default() -> Self {
        Self {
            reachable: true,
            ping_ok: true,
            metrics_error: false,
            connect_delay: Duration::ZERO,
            resources: ResourceMetrics::new(20.0, 30.0, 40.0),
            services: ServiceHealth {
                services_running: 4,
                services_total: 4,
                response_time_ms: 5.0,
                error_rate: 0.0,
            },
        }
    }
}

/// Every host is reachable and healthy until told otherwise
#[derive(Debug, Default)]
pub struct MockTransport {
    hosts: Mutex<HashMap<String, HostBehavior>>,
    connects: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, host: &str, f: impl FnOnce(&mut HostBehavior)) {
        f(self.hosts.lock().entry(host.to_string()).or_default());
    }

    fn behavior(&self, host: &str) -> HostBehavior {
        self.hosts.lock().get(host).cloned().unwrap_or_default()
    }

    /// Affects connects and pings
    pub fn set_reachable(&self, host: &str, reachable: bool) {
        self.update(host, |b| {
            b.reachable = reachable;
            b.ping_ok = reachable;
        });
    }

    pub fn set_ping(&self, host: &str, ok: bool) {
        self.update(host, |b| b.ping_ok = ok);
    }

    pub fn set_metrics_error(&self, host: &str, failing: bool) {
        self.update(host, |b| b.metrics_error = failing);
    }

    pub fn set_resources(&self, host: &str, resources: ResourceMetrics) {
        self.update(host, |b| b.resources = resources);
    }

    pub fn set_connect_delay(&self, host: &str, delay: Duration) {
        self.update(host, |b| b.connect_delay = delay);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProbeTransport for MockTransport {
    async fn connect(&self, host: &str, _port: u16, timeout: Duration) -> bool {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior(host);

        if behavior.connect_delay >= timeout {
            tokio::time::sleep(timeout).await;
            return false;
        }
        if !behavior.connect_delay.is_zero() {
            tokio::time::sleep(behavior.connect_delay).await;
        }
        behavior.reachable
    }

    async fn fetch_resource_metrics(
        &self,
        host: &str,
        _port: u16,
    ) -> FailoverResult<ResourceMetrics> {
        let behavior = self.behavior(host);
        if behavior.metrics_error {
            return Err(FailoverError::Transport(format!("{}: metrics unavailable", host)));
        }
        Ok(behavior.resources)
    }

    async fn fetch_service_health(&self, host: &str, _port: u16) -> FailoverResult<ServiceHealth> {
        let behavior = self.behavior(host);
        if behavior.metrics_error {
            return Err(FailoverError::Transport(format!("{}: services unavailable", host)));
        }
        Ok(behavior.services)
    }

    async fn ping(&self, host: &str, _port: u16) -> FailoverResult<Duration> {
        if self.behavior(host).ping_ok {
            Ok(Duration::from_millis(1))
        } else {
            Err(FailoverError::NodeUnreachable(host.to_string()))
        }
    }
}
