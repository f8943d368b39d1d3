//! Sentinel admin API
//!
//! HTTP surface of the failover coordinator: status queries, membership
//! changes, operator actions, a health probe and Prometheus metrics.

pub mod admin;
pub mod metrics;
pub mod server;

#[cfg(test)]
mod testing;

pub use crate::metrics::MetricsRecorder;
pub use server::{create_router, AdminServer, AppState};
