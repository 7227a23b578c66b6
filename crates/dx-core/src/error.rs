//! Typed error definitions for the DX spot aggregator.
//!
//! Provides [`DxError`] for domain-specific errors that are more informative
//! than plain `anyhow::Error` strings. Fetchers return these; the cache layer
//! absorbs them into stale-serving, so none of them reaches an HTTP caller.

use thiserror::Error;

/// Domain-specific errors for the DX spot aggregator.
#[derive(Debug, Error)]
pub enum DxError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// DNS, connect, TLS, or socket-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-success HTTP status.
    #[error("upstream returned status {0}")]
    Status(u16),

    /// Session protocol never reached the expected state.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An upstream call exceeded its deadline.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Payload could not be parsed at all.
    #[error("parse error: {0}")]
    Parse(String),

    /// The fetch completed but produced zero records.
    #[error("no records")]
    Empty,
}

impl From<std::io::Error> for DxError {
    fn from(e: std::io::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
