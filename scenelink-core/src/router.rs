//! The host-side dispatch seam.
//!
//! The protocol core never interprets scene semantics. Everything a
//! host can do — scene edits, queries, viewport captures — hangs off
//! one [`CommandRouter`] implementation supplied by the embedding
//! crate. The server feeds it every non-preview command, and the
//! preview streamer drives its viewport capture through the same
//! trait, so hosts get a single point of scene access to serialize.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

// ── DispatchError ────────────────────────────────────────────────

/// Why a router refused or failed a command.
///
/// The server converts these into error responses via `Display`, so
/// the variants read as controller-facing messages.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The router does not implement this command name.
    #[error("unknown command type: {0}")]
    UnknownCommand(String),

    /// The params object is missing or carries malformed fields.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// The command is understood but execution failed.
    #[error("{0}")]
    Failed(String),
}

impl DispatchError {
    /// Shorthand for [`DispatchError::Failed`].
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

// ── CommandRouter ────────────────────────────────────────────────

/// Application-defined command execution.
///
/// `dispatch` receives the command name and its params and returns the
/// result payload for a success response. Implementations decide their
/// own command vocabulary; the names in [`crate::message::commands`]
/// are the conventional core set.
///
/// One router instance serves every connection and the preview
/// streamer concurrently, hence `Send + Sync`.
#[async_trait]
pub trait CommandRouter: Send + Sync {
    async fn dispatch(
        &self,
        kind: &str,
        params: Map<String, Value>,
    ) -> Result<Map<String, Value>, DispatchError>;
}
