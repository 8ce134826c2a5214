//! Common error types for Chorale

use thiserror::Error;

/// Common result type for Chorale operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Chorale crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A channel to a sink or remote device went away
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Malformed or out-of-order timestamp protocol message
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
