//! `sentinel check-config`

use sentinel_core::config::SentinelConfig;
use sentinel_core::types::NodeRole;

pub fn execute(config: &SentinelConfig) -> anyhow::Result<()> {
    config.validate()?;
    print!("{}", summary(config));

    if config.nodes.is_empty() {
        anyhow::bail!("no nodes configured, the coordinator would refuse to start");
    }

    Ok(())
}

fn summary(config: &SentinelConfig) -> String {
    let failover = &config.failover;
    let mut out = String::new();

    out.push_str(&format!("Coordinator:   {}\n", config.coordinator.id));
    out.push_str(&format!(
        "Admin API:     {}\n",
        if config.server.enabled {
            format!("{}:{}", config.server.bind_address, config.server.port)
        } else {
            "disabled".to_string()
        }
    ));
    out.push_str(&format!("Mode:          {}\n", failover.failover_mode.as_str()));
    out.push_str(&format!(
        "Heartbeat:     every {}ms, timeout {}ms\n",
        failover.heartbeat_interval_ms, failover.heartbeat_timeout_ms
    ));
    out.push_str(&format!(
        "Health check:  every {}ms, {} failures to fail over\n",
        failover.health_check_interval_ms, failover.max_consecutive_failures
    ));
    if failover.enforce_quorum {
        out.push_str(&format!("Quorum:        {}\n", failover.quorum_size));
    }

    out.push_str(&format!("Nodes ({}):\n", config.nodes.len()));
    for node in &config.nodes {
        let marker = if node.role == NodeRole::Primary { "*" } else { " " };
        out.push_str(&format!(
            "  {} {:<16} {:<24} {:<10} priority {}\n",
            marker,
            node.id,
            format!("{}:{}", node.host, node.port),
            node.role.as_str(),
            node.failover_priority
        ));
    }

    out
}
