//! Error types surfaced across the manager facade

use thiserror::Error;

/// Errors reported by the client manager and its session.
///
/// Every failure also surfaces as exactly one delegate event for the
/// originating operation; nothing is thrown past the facade boundary and
/// the core never retries on its own.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("discovery failed: {0}")]
    DiscoveryFailed(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("link lost")]
    LinkLost,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("send queue full")]
    QueueFull,

    #[error("session closed")]
    SessionClosed,
}
