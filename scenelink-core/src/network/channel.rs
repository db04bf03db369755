//! The controller side of the command stream.
//!
//! One [`CommandChannel`] wraps one TCP connection. The conversation
//! is strictly alternating — send a command, read exactly one
//! response, repeat — so the channel holds the framed stream directly
//! instead of splitting it across reader/writer tasks.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::codec::DocumentCodec;
use crate::error::LinkError;
use crate::message::{Command, Response};
use crate::network::Endpoint;

/// Default per-request deadline, matching the conventional controller
/// settings for scene operations that may render.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ── CommandChannel ───────────────────────────────────────────────

/// A connected command/response channel to a host.
#[derive(Debug)]
pub struct CommandChannel {
    framed: Framed<TcpStream, DocumentCodec>,
    peer: Endpoint,
}

impl CommandChannel {
    /// Connects to the host's command endpoint.
    ///
    /// A refused or unreachable endpoint surfaces as
    /// [`LinkError::Connection`]; a connect that hangs past `timeout`
    /// surfaces as [`LinkError::Timeout`].
    pub async fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<Self, LinkError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(endpoint.addr()))
            .await
            .map_err(|_| LinkError::Timeout(timeout))??;

        tracing::debug!(peer = %endpoint, "command channel connected");
        Ok(Self {
            framed: Framed::new(stream, DocumentCodec::new()),
            peer: endpoint.clone(),
        })
    }

    /// The endpoint this channel is connected to.
    pub fn peer(&self) -> &Endpoint {
        &self.peer
    }

    /// Sends one command, flushing it fully onto the wire.
    pub async fn send(&mut self, command: &Command) -> Result<(), LinkError> {
        self.framed.send(command.clone()).await
    }

    /// Reads exactly one response, validated against the shape rules.
    ///
    /// Returns [`LinkError::Timeout`] if no complete document arrives
    /// within `deadline` and [`LinkError::ConnectionClosed`] if the
    /// host disconnects first. A response that arrives in fragments is
    /// fine — only the complete-document deadline matters.
    pub async fn receive(&mut self, deadline: Duration) -> Result<Response, LinkError> {
        let item = tokio::time::timeout(deadline, self.framed.next())
            .await
            .map_err(|_| LinkError::Timeout(deadline))?;

        match item {
            Some(Ok(value)) => Response::from_value(value),
            Some(Err(e)) => Err(e),
            None => Err(LinkError::ConnectionClosed),
        }
    }

    /// One full exchange: send the command, await its response.
    pub async fn request(
        &mut self,
        command: &Command,
        deadline: Duration,
    ) -> Result<Response, LinkError> {
        self.send(command).await?;
        self.receive(deadline).await
    }
}
