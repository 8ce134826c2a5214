//! Error types for chorale-stager
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Nothing in the staging engine is fatal to the process; the
//! worst case is a stalled or silent queue.

use thiserror::Error;

/// Main error type for the staging engine
#[derive(Error, Debug)]
pub enum Error {
    /// Staging queue errors (queue torn down under a pending barrier)
    #[error("Queue error: {0}")]
    Queue(String),

    /// Downstream sink transport failure (distinct from backpressure)
    #[error("Sink error: {0}")]
    Sink(String),

    /// Timestamp protocol misuse or transport failure
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Cross-queue alignment failure
    #[error("Sync error: {0}")]
    Sync(String),

    /// Errors from shared chorale-common facilities
    #[error(transparent)]
    Common(#[from] chorale_common::Error),
}

/// Convenience Result type using chorale-stager Error
pub type Result<T> = std::result::Result<T, Error>;
