//! `sentinel run`

use std::sync::Arc;

use anyhow::Context;
use sentinel_api::{AdminServer, AppState, MetricsRecorder};
use sentinel_core::config::SentinelConfig;
use sentinel_failover::{
    FailoverCoordinator, FailoverCoordinatorBuilder, HttpProbeTransport, LoggingObserver,
    TransportConfig,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

type ServerHandle = JoinHandle<sentinel_core::Result<()>>;

pub async fn execute(config: SentinelConfig) -> anyhow::Result<()> {
    config.validate()?;

    let metrics =
        Arc::new(MetricsRecorder::install().context("failed to install Prometheus recorder")?);
    info!("Prometheus metrics initialized");

    let coordinator = Arc::new(build_coordinator(&config)?);
    coordinator
        .start()
        .context("failed to start failover coordinator")?;

    let shutdown = CancellationToken::new();
    let mut server: Option<ServerHandle> = if config.server.enabled {
        let state = AppState::new(Arc::clone(&coordinator), metrics);
        let admin = AdminServer::new(config.server.clone(), state);
        Some(tokio::spawn(admin.run(shutdown.clone())))
    } else {
        info!("Admin API disabled");
        None
    };

    let server_exit = async {
        match server.as_mut() {
            Some(handle) => Some(handle.await),
            None => std::future::pending().await,
        }
    };

    let finished = tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for shutdown signal")?;
            info!("Shutdown signal received");
            None
        }
        res = server_exit => res,
    };

    shutdown.cancel();
    coordinator.stop().await;

    let result = match (finished, server) {
        (Some(result), _) => result,
        (None, Some(handle)) => handle.await,
        (None, None) => Ok(Ok(())),
    };

    match result {
        Ok(Ok(())) => {
            info!("Sentinel stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            error!("Admin API failed: {}", e);
            Err(anyhow::Error::from(e).context("admin API failed"))
        }
        Err(e) => Err(anyhow::Error::from(e).context("admin API task aborted")),
    }
}

fn build_coordinator(config: &SentinelConfig) -> anyhow::Result<FailoverCoordinator> {
    let transport = HttpProbeTransport::new(TransportConfig::from_probe(
        &config.probe,
        config.failover.connect_timeout(),
    ))?;

    let coordinator = FailoverCoordinatorBuilder::new()
        .config(config.failover.clone())
        .coordinator_id(config.coordinator.id.clone())
        .transport(Arc::new(transport))
        .observer(Arc::new(LoggingObserver))
        .nodes(config.nodes.iter().cloned())
        .build()?;

    info!(
        "Coordinator '{}' configured with {} nodes, mode {}",
        coordinator.coordinator_id(),
        config.nodes.len(),
        config.failover.failover_mode.as_str()
    );

    Ok(coordinator)
}
