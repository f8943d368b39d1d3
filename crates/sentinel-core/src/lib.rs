//! Sentinel Core Library
//!
//! Core types, configuration and errors for the Sentinel high-availability
//! failover coordinator.

pub mod config;
pub mod error;
pub mod types;

pub use config::SentinelConfig;
pub use error::{Error, Result};

/// Sentinel version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default number of failover events retained in memory
pub const DEFAULT_EVENT_HISTORY: usize = 1000;

/// Default admin API port
pub const DEFAULT_ADMIN_PORT: u16 = 9400;
