//! Failover error types

use thiserror::Error;

/// Result type for failover operations
pub type FailoverResult<T> = Result<T, FailoverError>;

/// Failover-related errors
#[derive(Error, Debug)]
pub enum FailoverError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node already exists: {0}")]
    NodeAlreadyExists(String),

    #[error("Node unreachable: {0}")]
    NodeUnreachable(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("No eligible candidate for promotion")]
    NoCandidate,

    #[error("Quorum not reached: needed {needed}, got {got}")]
    QuorumNotReached { needed: usize, got: usize },

    #[error("Observer callback failed: {0}")]
    Callback(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Node not eligible: {0}")]
    NotEligible(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] sentinel_core::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
