//! SceneLink controller library.
//!
//! Everything the `scenelink-ctl` binary does, as a library: locating
//! a host installation on this machine, installing a plugin into it,
//! launching the host process, and driving it over the command
//! channel — scene queries, object creation, snapshots, and the live
//! preview stream.

pub mod error;
pub mod install;
pub mod launch;
pub mod locate;
pub mod ops;

pub use error::CtlError;
pub use launch::{HostLauncher, RunningHost};
pub use locate::{HostInstall, HostLocator};
pub use ops::{AttachReport, Controller};
