//! Wire codecs for the two SceneLink streams.
//!
//! ## Command stream (controller ↔ host)
//!
//! There is no length prefix. Each message is one JSON document and a
//! document is complete exactly when the accumulated bytes parse:
//!
//! ```text
//! {"type": "create_object", "params": {"type": "SPHERE"}}
//! └──────────────── one decoded item ────────────────────┘
//! ```
//!
//! [`DocumentCodec`] attempts a parse on every read. An incomplete
//! document (JSON "unexpected end of input") keeps accumulating; a
//! syntax error that no further bytes can repair fails the connection.
//! Braces and quotes inside string values are handled by the parser
//! itself, so no byte-level brace counting is needed — and any bytes
//! after the first complete document stay buffered for the next call,
//! which is what lets pipelined commands queue up naturally.
//!
//! ## Preview stream (host → subscriber)
//!
//! Push-only. [`FrameCodec`] delimits frames with a trailing newline:
//!
//! ```text
//! {"image": "<base64>", "width": 800, "height": 600}\n
//! ```

use bytes::BytesMut;
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::LinkError;
use crate::message::{Command, PreviewFrame, Response};

// ── Constants ────────────────────────────────────────────────────

/// Ceiling on a single accumulated document (64 MiB).
///
/// Generous because viewport captures travel inline as base64, but
/// still a hard stop against a peer that streams garbage forever.
pub const MAX_DOCUMENT_SIZE: usize = 64 * 1024 * 1024;

// ── DocumentCodec ────────────────────────────────────────────────

/// Parse-success framing for the command stream.
///
/// Decodes to raw [`Value`] so the host side can answer a syntactically
/// valid but malformed command with an error response instead of
/// dropping the connection. Encodes both [`Command`] and [`Response`],
/// so the same codec serves controller and host.
#[derive(Debug, Clone)]
pub struct DocumentCodec {
    max_size: usize,
}

impl Default for DocumentCodec {
    fn default() -> Self {
        Self {
            max_size: MAX_DOCUMENT_SIZE,
        }
    }
}

impl DocumentCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the document size ceiling.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }
}

impl Decoder for DocumentCodec {
    type Item = Value;
    type Error = LinkError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Value>, LinkError> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut stream = serde_json::Deserializer::from_slice(&src[..]).into_iter::<Value>();
        let parsed = match stream.next() {
            Some(Ok(value)) => Some((value, stream.byte_offset())),
            // Incomplete document — wait for more bytes, unless the
            // buffer already blew past the ceiling.
            Some(Err(e)) if e.is_eof() => {
                if src.len() > self.max_size {
                    return Err(LinkError::DocumentTooLarge {
                        size: src.len(),
                        max: self.max_size,
                    });
                }
                return Ok(None);
            }
            // A syntax error can never be repaired by more bytes.
            Some(Err(e)) => {
                return Err(LinkError::Protocol(format!("invalid JSON document: {e}")));
            }
            None => None,
        };

        match parsed {
            Some((value, consumed)) => {
                // Trailing bytes stay buffered for the next decode call.
                let _ = src.split_to(consumed);
                Ok(Some(value))
            }
            None => {
                // Buffer holds only insignificant whitespace.
                src.clear();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Value>, LinkError> {
        match self.decode(src)? {
            Some(value) => Ok(Some(value)),
            None if src.is_empty() => Ok(None),
            // Peer closed mid-document.
            None => Err(LinkError::ConnectionClosed),
        }
    }
}

impl Encoder<Command> for DocumentCodec {
    type Error = LinkError;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), LinkError> {
        let bytes = serde_json::to_vec(&item)?;
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

impl Encoder<Response> for DocumentCodec {
    type Error = LinkError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), LinkError> {
        let bytes = serde_json::to_vec(&item)?;
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

// ── FrameCodec ───────────────────────────────────────────────────

/// Newline-delimited JSON framing for the preview push stream.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_size: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self {
            max_size: MAX_DOCUMENT_SIZE,
        }
    }
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the frame size ceiling.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }
}

impl Decoder for FrameCodec {
    type Item = PreviewFrame;
    type Error = LinkError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<PreviewFrame>, LinkError> {
        let Some(pos) = src.iter().position(|&b| b == b'\n') else {
            if src.len() > self.max_size {
                return Err(LinkError::DocumentTooLarge {
                    size: src.len(),
                    max: self.max_size,
                });
            }
            return Ok(None);
        };

        let line = src.split_to(pos + 1);
        let frame = serde_json::from_slice(&line[..pos])
            .map_err(|e| LinkError::Protocol(format!("invalid preview frame: {e}")))?;
        Ok(Some(frame))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<PreviewFrame>, LinkError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            // Stream ended inside a frame.
            None => Err(LinkError::ConnectionClosed),
        }
    }
}

impl Encoder<PreviewFrame> for FrameCodec {
    type Error = LinkError;

    fn encode(&mut self, item: PreviewFrame, dst: &mut BytesMut) -> Result<(), LinkError> {
        let mut bytes = serde_json::to_vec(&item)?;
        bytes.push(b'\n');
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
