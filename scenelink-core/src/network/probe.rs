//! Port availability checks.
//!
//! A port is "free" exactly when a listener can bind it right now.
//! The probe binds and immediately drops the listener, so the check
//! is momentary: the answer can be stale by the time the caller acts
//! on it. Callers that need the port should use [`PortProbe::reserve`]
//! and keep the listener.

use tokio::net::TcpListener;

use crate::error::LinkError;
use crate::network::Endpoint;

/// Bind-based availability probe for TCP ports.
pub struct PortProbe;

impl PortProbe {
    /// Returns `true` if `endpoint` can be bound at this instant.
    ///
    /// The probe listener is dropped before returning, releasing the
    /// port. `false` usually means some process is already listening —
    /// for the conventional command port, that the host is up.
    pub async fn is_free(endpoint: &Endpoint) -> bool {
        TcpListener::bind(endpoint.addr()).await.is_ok()
    }

    /// Binds `endpoint` and hands the listener to the caller.
    ///
    /// Unlike [`is_free`](Self::is_free) there is no probe-then-bind
    /// gap: the caller owns the port on success. Port 0 asks the OS
    /// for any free port; read the real one off the listener.
    pub async fn reserve(endpoint: &Endpoint) -> Result<TcpListener, LinkError> {
        TcpListener::bind(endpoint.addr())
            .await
            .map_err(|e| LinkError::PortUnavailable {
                port: endpoint.port(),
                reason: e.to_string(),
            })
    }
}
