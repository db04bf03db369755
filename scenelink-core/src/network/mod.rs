//! Transport layer: endpoints, the command channel, port probing,
//! startup waiting, and the preview frame receiver.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod channel;
pub mod frames;
pub mod probe;
pub mod startup;

pub use channel::CommandChannel;
pub use frames::FrameReceiver;
pub use probe::PortProbe;
pub use startup::StartupWaiter;

// ── Constants ────────────────────────────────────────────────────

/// Conventional command port the host listens on.
pub const DEFAULT_COMMAND_PORT: u16 = 9876;

/// Conventional preview port the host streams frames on.
pub const DEFAULT_PREVIEW_PORT: u16 = 9877;

/// Hosts bind loopback unless explicitly configured otherwise.
pub const DEFAULT_HOST: &str = "127.0.0.1";

// ── Endpoint ─────────────────────────────────────────────────────

/// A host/port pair identifying one of the two SceneLink listeners.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// An endpoint on the loopback interface.
    pub fn loopback(port: u16) -> Self {
        Self::new(DEFAULT_HOST, port)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Same host, different port.
    pub fn with_port(&self, port: u16) -> Self {
        Self::new(self.host.clone(), port)
    }

    /// `host:port` form accepted by the socket APIs.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_addr_form() {
        let ep = Endpoint::loopback(9876);
        assert_eq!(ep.addr(), "127.0.0.1:9876");
        assert_eq!(ep.to_string(), "127.0.0.1:9876");
    }

    #[test]
    fn endpoint_with_port_keeps_host() {
        let ep = Endpoint::new("192.168.1.20", 9876).with_port(9877);
        assert_eq!(ep.host(), "192.168.1.20");
        assert_eq!(ep.port(), 9877);
    }
}
