//! Probe transport reporting every node as reachable and healthy

use std::time::Duration;

use async_trait::async_trait;
use sentinel_failover::{FailoverResult, ProbeTransport, ResourceMetrics, ServiceHealth};

#[derive(Debug, Default)]
pub struct StaticTransport;

impl StaticTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProbeTransport for StaticTransport {
    async fn connect(&self, _host: &str, _port: u16, _timeout: Duration) -> bool {
        true
    }

    async fn fetch_resource_metrics(&self, _host: &str, _port: u16) -> FailoverResult<ResourceMetrics> {
        Ok(ResourceMetrics::new(10.0, 20.0, 30.0))
    }

    async fn fetch_service_health(&self, _host: &str, _port: u16) -> FailoverResult<ServiceHealth> {
        Ok(ServiceHealth {
            services_running: 2,
            services_total: 2,
            response_time_ms: 1.0,
            error_rate: 0.0,
        })
    }

    async fn ping(&self, _host: &str, _port: u16) -> FailoverResult<Duration> {
        Ok(Duration::from_millis(1))
    }
}
