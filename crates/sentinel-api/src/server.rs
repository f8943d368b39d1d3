//! Admin server implementation

use axum::{extract::FromRef, middleware, routing::get, Router};
use sentinel_core::{config::ServerConfig, Result};
use sentinel_failover::FailoverCoordinator;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use crate::admin;
use crate::metrics::{metrics_handler, metrics_middleware, MetricsRecorder};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<FailoverCoordinator>,
    pub metrics: Arc<MetricsRecorder>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(coordinator: Arc<FailoverCoordinator>, metrics: Arc<MetricsRecorder>) -> Self {
        Self {
            coordinator,
            metrics,
            start_time: Instant::now(),
        }
    }
}

impl FromRef<AppState> for Arc<MetricsRecorder> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.metrics)
    }
}

/// Build the full admin router
pub fn create_router(state: AppState) -> Router {
    let metrics = Arc::clone(&state.metrics);

    Router::new()
        // Metrics endpoint
        .route("/metrics", get(metrics_handler))
        .route("/health", get(admin::health_check))
        .nest("/api/v1/failover", admin::failover_routes())
        .layer(middleware::from_fn_with_state(metrics, metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Admin API server
pub struct AdminServer {
    config: ServerConfig,
    state: AppState,
}

impl AdminServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Serve until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let addr = format!("{}:{}", self.config.bind_address, self.config.port);
        let listener = TcpListener::bind(&addr).await?;

        info!("Sentinel admin API listening on http://{}", addr);
        info!("Failover API available at http://{}/api/v1/failover", addr);
        info!("Prometheus metrics at http://{}/metrics", addr);

        let app = create_router(self.state);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;

        info!("Admin API stopped");
        Ok(())
    }
}

impl std::fmt::Debug for AdminServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminServer")
            .field("config", &self.config)
            .finish()
    }
}
