//! Domain-specific error types for the SceneLink protocol.
//!
//! All fallible operations return `Result<T, LinkError>`.
//! No panics on invalid input — every error is typed and recoverable.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the SceneLink protocol.
#[derive(Debug, Error)]
pub enum LinkError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// Received bytes that can never form a valid JSON document, or a
    /// document that violates the command/response shape rules.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A command document was valid JSON but not a valid command.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// The accumulated document exceeds the configured maximum size.
    #[error("document too large: {size} bytes (max {max})")]
    DocumentTooLarge { size: usize, max: usize },

    /// The preview session state machine rejected a transition.
    #[error("session state error: {0}")]
    Session(&'static str),

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The peer closed the connection before a complete document arrived.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Waited for the host to open its command port, but it never did.
    #[error("host did not start listening within {waited:?}")]
    StartupTimeout { waited: Duration },

    /// A requested local port could not be bound.
    #[error("port {port} unavailable: {reason}")]
    PortUnavailable { port: u16, reason: String },

    /// An internal channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    // ── Serialization Errors ─────────────────────────────────────
    /// Encoding of an outgoing document failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    // ── Application Errors ───────────────────────────────────────
    /// The host executed the command and reported failure.
    #[error("application error: {0}")]
    Application(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<serde_json::Error> for LinkError {
    fn from(e: serde_json::Error) -> Self {
        LinkError::Encoding(e.to_string())
    }
}

impl<T> From<tokio::sync::watch::error::SendError<T>> for LinkError {
    fn from(_: tokio::sync::watch::error::SendError<T>) -> Self {
        LinkError::ChannelClosed
    }
}
