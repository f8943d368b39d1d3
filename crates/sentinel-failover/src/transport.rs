//! Probe transport for reaching cluster nodes
//!
//! The coordinator never talks to nodes directly; every probe goes through
//! a [`ProbeTransport`]. [`HttpProbeTransport`] is the production
//! implementation:
//! - raw TCP connect for reachability
//! - `GET /health/resources` for resource metrics
//! - `GET /health/services` for service health
//! - `GET /health/ping` for liveness and round-trip time

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::net::TcpStream;
use tracing::debug;

use sentinel_core::config::ProbeConfig;

use crate::error::{FailoverError, FailoverResult};

/// Resource usage reported by a node, in percent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceMetrics {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    /// Informational, not scored
    pub network_io: f64,
}

impl ResourceMetrics {
    pub fn new(cpu_usage: f64, memory_usage: f64, disk_usage: f64) -> Self {
        Self {
            cpu_usage,
            memory_usage,
            disk_usage,
            network_io: 0.0,
        }
    }

    /// Usage map stored on the node record
    pub fn usage_map(&self) -> HashMap<String, f64> {
        HashMap::from([
            ("cpu_usage".to_string(), self.cpu_usage),
            ("memory_usage".to_string(), self.memory_usage),
            ("disk_usage".to_string(), self.disk_usage),
        ])
    }
}

/// Service-level health reported by a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceHealth {
    pub services_running: u32,
    pub services_total: u32,
    pub response_time_ms: f64,
    /// Percent of failed requests
    pub error_rate: f64,
}

/// Capability to probe a cluster node
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    /// Whether a connection to the node can be opened within `timeout`
    async fn connect(&self, host: &str, port: u16, timeout: Duration) -> bool;

    async fn fetch_resource_metrics(&self, host: &str, port: u16)
        -> FailoverResult<ResourceMetrics>;

    async fn fetch_service_health(&self, host: &str, port: u16) -> FailoverResult<ServiceHealth>;

    /// Liveness ping, returns the round-trip time
    async fn ping(&self, host: &str, port: u16) -> FailoverResult<Duration>;
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Connection timeout for HTTP requests
    pub connect_timeout: Duration,
    /// `http` or `https`
    pub scheme: String,
    /// Enable TLS certificate verification
    pub verify_tls: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            scheme: "http".to_string(),
            verify_tls: true,
        }
    }
}

impl TransportConfig {
    pub fn from_probe(probe: &ProbeConfig, connect_timeout: Duration) -> Self {
        Self {
            timeout: Duration::from_millis(probe.request_timeout_ms),
            connect_timeout,
            scheme: probe.scheme.clone(),
            ..Default::default()
        }
    }
}

/// HTTP probe transport
pub struct HttpProbeTransport {
    client: Client,
    config: TransportConfig,
}

impl HttpProbeTransport {
    pub fn new(config: TransportConfig) -> FailoverResult<Self> {
        let mut builder = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90));

        if !config.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build()?;

        Ok(Self { client, config })
    }

    fn url(&self, host: &str, port: u16, path: &str) -> String {
        format!("{}://{}:{}{}", self.config.scheme, host, port, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> FailoverResult<T> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FailoverError::Transport(format!(
                "GET {} failed with status {}",
                url,
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ProbeTransport for HttpProbeTransport {
    async fn connect(&self, host: &str, port: u16, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Connect to {}:{} failed: {}", host, port, e);
                false
            }
            Err(_) => {
                debug!("Connect to {}:{} timed out after {:?}", host, port, timeout);
                false
            }
        }
    }

    async fn fetch_resource_metrics(
        &self,
        host: &str,
        port: u16,
    ) -> FailoverResult<ResourceMetrics> {
        self.get_json(&self.url(host, port, "/health/resources")).await
    }

    async fn fetch_service_health(&self, host: &str, port: u16) -> FailoverResult<ServiceHealth> {
        self.get_json(&self.url(host, port, "/health/services")).await
    }

    async fn ping(&self, host: &str, port: u16) -> FailoverResult<Duration> {
        let url = self.url(host, port, "/health/ping");
        let start = Instant::now();

        match self.client.get(&url).send().await {
            Ok(r) if r.status().is_success() => Ok(start.elapsed()),
            Ok(r) => Err(FailoverError::NodeUnreachable(format!(
                "{}:{} ping failed with status {}",
                host,
                port,
                r.status()
            ))),
            Err(e) => Err(FailoverError::NodeUnreachable(format!(
                "{}:{}: {}",
                host, port, e
            ))),
        }
    }
}

impl std::fmt::Debug for HttpProbeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProbeTransport")
            .field("config", &self.config)
            .finish()
    }
}
