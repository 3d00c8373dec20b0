//! # Errors
//!
//! Failure taxonomy for the router. Only [`RouterError`] ever escapes a
//! session run; the other kinds are folded into failed status messages.

use thiserror::Error;

use crate::config::ConfigError;

/// Run-level failures returned from [`crate::Session`].
#[derive(Debug, Error)]
pub enum RouterError {
    /// Every configured coordinator timed out or could not be reached.
    #[error("all coordinators unreachable ({attempted} tried)")]
    CoordinatorsUnreachable { attempted: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be constructed.
    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),
}

/// Why a normalized statement could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("unsupported statement")]
    Unsupported,

    #[error("missing table name after {keyword}")]
    MissingTable { keyword: &'static str },
}

/// A single request to a coordinator or storage node that did not produce a
/// usable reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("server error: {0}")]
    Server(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("http client setup failed: {0}")]
    Setup(String),
}

/// A QUERY reply whose result fields do not follow the row/column layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("row field '{0}' carries no numeric row index")]
    MissingRowIndex(String),

    #[error("field '{0}' is not a string")]
    NonStringField(String),
}
