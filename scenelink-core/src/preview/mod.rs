//! Live viewport preview: session lifecycle and the frame streamer.

pub mod phase;
pub mod session;

pub use phase::SessionPhase;
pub use session::{PreviewConfig, PreviewSession};
