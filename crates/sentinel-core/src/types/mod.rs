//! Core types for Sentinel

mod event;
mod failover;
mod node;
mod status;

pub use event::*;
pub use failover::*;
pub use node::*;
pub use status::*;
