//! Controller-side error type.
//!
//! Wraps the protocol errors from `scenelink-core` and adds the
//! failure modes that only exist on this side of the wire: host
//! discovery, plugin installation, and frame/snapshot file IO.

use std::path::PathBuf;
use thiserror::Error;

use scenelink_core::LinkError;

#[derive(Debug, Error)]
pub enum CtlError {
    /// No host installation was found in the searched locations.
    #[error("host application not found: {0}")]
    HostNotFound(String),

    /// Copying the plugin into the addons directory failed.
    #[error("plugin install failed: {0}")]
    Install(#[from] fs_extra::error::Error),

    /// The addons directory could not be resolved on this system.
    #[error("no writable addons directory (tried {})", .0.display())]
    NoAddonsDir(PathBuf),

    /// Filesystem or process IO outside the protocol.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A protocol-level failure talking to the host.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// The host replied with something the operation cannot use.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}
