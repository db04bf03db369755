//! # scenelink-core
//!
//! Core protocol library for SceneLink, a command/response and
//! live-preview link for remotely driving a 3D content-creation host.
//!
//! This crate contains:
//! - **Messages**: `Command`, `Response`, `PreviewFrame` — the JSON wire types
//! - **Codec**: `DocumentCodec` (parse-success framing) and `FrameCodec`
//!   (newline-delimited frames) for framed TCP I/O via `tokio_util`
//! - **Network**: `CommandChannel`, `FrameReceiver`, `PortProbe`,
//!   `StartupWaiter` — the controller-side transport pieces
//! - **Server**: `CommandServer` — the host-side accept/respond loop
//! - **Router**: `CommandRouter` — the dispatch seam hosts implement
//! - **Preview**: `PreviewSession` — the host's single streaming session
//! - **Error**: `LinkError` — typed, `thiserror`-based error hierarchy

pub mod codec;
pub mod error;
pub mod message;
pub mod network;
pub mod preview;
pub mod router;
pub mod server;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{DocumentCodec, FrameCodec, MAX_DOCUMENT_SIZE};
pub use error::LinkError;
pub use message::{Command, PreviewFrame, Response, ResponseStatus, commands};
pub use network::{
    CommandChannel, DEFAULT_COMMAND_PORT, DEFAULT_HOST, DEFAULT_PREVIEW_PORT, Endpoint,
    FrameReceiver, PortProbe, StartupWaiter,
};
pub use preview::{PreviewConfig, PreviewSession, SessionPhase};
pub use router::{CommandRouter, DispatchError};
pub use server::CommandServer;
