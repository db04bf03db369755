//! SceneLink reference host.
//!
//! A self-contained host application for the SceneLink protocol: an
//! in-memory scene model, a synthetic viewport renderer, and a
//! [`SceneRouter`] that plugs both into `scenelink-core`'s command
//! server. It exists so controllers have something real to talk to —
//! every command and the live preview stream behave exactly as a
//! production host would, minus the DCC application underneath.

pub mod config;
pub mod router;
pub mod scene;
pub mod viewport;

pub use config::HostConfig;
pub use router::SceneRouter;
pub use scene::{ObjectKind, SceneModel, SceneObject};
pub use viewport::{ImageEncoding, RenderedView, ViewportRenderer};
