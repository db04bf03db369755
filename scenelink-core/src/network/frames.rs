//! The subscriber side of the preview push stream.

use std::time::Duration;

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::codec::FrameCodec;
use crate::error::LinkError;
use crate::message::PreviewFrame;
use crate::network::Endpoint;

/// A connected, read-only preview frame stream.
///
/// The host writes frames at its configured rate and closes the
/// connection when the session stops; there is no terminal message.
/// End-of-stream is therefore an ordinary outcome, surfaced as
/// `Ok(None)` rather than an error.
#[derive(Debug)]
pub struct FrameReceiver {
    framed: Framed<TcpStream, FrameCodec>,
    peer: Endpoint,
}

impl FrameReceiver {
    /// Connects to a preview endpoint announced by a start response.
    pub async fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<Self, LinkError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(endpoint.addr()))
            .await
            .map_err(|_| LinkError::Timeout(timeout))??;

        tracing::debug!(peer = %endpoint, "preview stream connected");
        Ok(Self {
            framed: Framed::new(stream, FrameCodec::new()),
            peer: endpoint.clone(),
        })
    }

    pub fn peer(&self) -> &Endpoint {
        &self.peer
    }

    /// Reads the next frame.
    ///
    /// `Ok(Some(frame))` — a complete frame arrived.
    /// `Ok(None)` — the host closed the stream (session stopped).
    /// `Err(Timeout)` — no complete frame within `deadline`.
    pub async fn next_frame(&mut self, deadline: Duration) -> Result<Option<PreviewFrame>, LinkError> {
        let item = tokio::time::timeout(deadline, self.framed.next())
            .await
            .map_err(|_| LinkError::Timeout(deadline))?;

        match item {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}
