//! Configuration for Sentinel
//!
//! Loaded from a TOML file or from `SENTINEL_*` environment variables.
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 9400
//!
//! [failover]
//! heartbeat_interval_ms = 5000
//! heartbeat_timeout_ms = 15000
//! failover_mode = "automatic"
//!
//! [[nodes]]
//! id = "db-1"
//! host = "10.0.0.1"
//! port = 7000
//! role = "primary"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::types::{FailoverConfig, NodeSpec};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentinelConfig {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub failover: FailoverConfig,

    /// Initial cluster membership
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

impl SentinelConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::ConfigRead(format!("{}: {}", path, e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::ConfigParse(e.to_string()))
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(id) = std::env::var("SENTINEL_COORDINATOR_ID") {
            config.coordinator.id = id;
        }
        if let Ok(addr) = std::env::var("SENTINEL_BIND_ADDRESS") {
            config.server.bind_address = addr;
        }
        if let Ok(port) = std::env::var("SENTINEL_PORT") {
            if let Ok(p) = port.parse() {
                config.server.port = p;
            }
        }
        if let Ok(level) = std::env::var("SENTINEL_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("SENTINEL_LOG_FORMAT") {
            config.logging.format = format;
        }
        if let Ok(mode) = std::env::var("SENTINEL_FAILOVER_MODE") {
            match mode.parse() {
                Ok(m) => config.failover.failover_mode = m,
                Err(e) => tracing::warn!("Ignoring SENTINEL_FAILOVER_MODE: {}", e),
            }
        }
        if let Ok(v) = std::env::var("SENTINEL_HEARTBEAT_TIMEOUT_MS") {
            if let Ok(ms) = v.parse() {
                config.failover.heartbeat_timeout_ms = ms;
            }
        }
        if let Ok(v) = std::env::var("SENTINEL_AUTO_RECOVERY") {
            config.failover.auto_recovery_enabled = v == "true";
        }
        if let Ok(path) = std::env::var("SENTINEL_EVENT_LOG") {
            config.failover.event_log_path = Some(PathBuf::from(path));
        }

        config
    }

    /// Static validation; an empty node list is checked when the coordinator starts
    pub fn validate(&self) -> crate::Result<()> {
        self.failover.validate()?;

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.id.is_empty() {
                return Err(crate::Error::InvalidConfig("node id must not be empty".into()));
            }
            if !seen.insert(node.id.as_str()) {
                return Err(crate::Error::InvalidConfig(format!(
                    "duplicate node id: {}",
                    node.id
                )));
            }
        }

        if self.probe.request_timeout_ms == 0 {
            return Err(crate::Error::InvalidConfig(
                "probe.request_timeout_ms must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Identity of this coordinator instance, recorded in event metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub id: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            id: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "sentinel".to_string()),
        }
    }
}

/// Admin API server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0".to_string(),
            port: crate::DEFAULT_ADMIN_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// HTTP probe transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// `http` or `https`
    pub scheme: String,
    /// Per-request timeout for metric fetches and pings
    pub request_timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            request_timeout_ms: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FailoverMode, NodeRole};

    #[test]
    fn test_parse_toml() {
        let config = SentinelConfig::from_toml(
            r#"
            [coordinator]
            id = "sentinel-a"

            [server]
            enabled = true
            bind_address = "127.0.0.1"
            port = 9500

            [failover]
            heartbeat_interval_ms = 1000
            heartbeat_timeout_ms = 3000
            failover_mode = "health_based"
            enforce_quorum = true
            quorum_size = 2

            [[nodes]]
            id = "db-1"
            host = "10.0.0.1"
            port = 7000
            role = "primary"

            [[nodes]]
            id = "db-2"
            host = "10.0.0.2"
            port = 7000
            role = "hot_spare"
            failover_priority = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.coordinator.id, "sentinel-a");
        assert_eq!(config.server.port, 9500);
        assert_eq!(config.failover.failover_mode, FailoverMode::HealthBased);
        assert_eq!(config.failover.heartbeat_timeout_ms, 3000);
        assert_eq!(config.failover.max_consecutive_failures, 3);
        assert_eq!(config.nodes.len(), 2);
        assert_eq!(config.nodes[0].role, NodeRole::Primary);
        assert_eq!(config.nodes[1].failover_priority, 1);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sample_config() {
        let config =
            SentinelConfig::from_toml(include_str!("../../../config/sentinel.toml")).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.nodes.len(), 3);
        assert_eq!(config.nodes[2].labels["zone"], "eu-west-1b");
        assert_eq!(config.failover.priority_weights.node_role, 0.2);
    }

    #[test]
    fn test_duplicate_nodes_rejected() {
        let config = SentinelConfig::from_toml(
            r#"
            [[nodes]]
            id = "db-1"
            host = "a"
            port = 1

            [[nodes]]
            id = "db-1"
            host = "b"
            port = 2
            "#,
        )
        .unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_toml() {
        let err = SentinelConfig::from_toml("[failover\nheartbeat = ").unwrap_err();
        assert_eq!(err.code(), "ConfigError");
    }

    #[test]
    fn test_missing_file() {
        let err = SentinelConfig::from_file("/nonexistent/sentinel.toml").unwrap_err();
        assert!(matches!(err, crate::Error::ConfigRead(_)));
    }
}
