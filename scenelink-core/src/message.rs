//! Protocol message types: commands, responses, and preview frames.
//!
//! Everything on the wire is a single JSON document. Commands flow
//! controller → host, responses flow host → controller, and preview
//! frames flow host → subscriber on a separate push-only stream.

use crate::error::LinkError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ── Command names ────────────────────────────────────────────────

/// Well-known command names.
///
/// The protocol core treats the command `type` as an opaque string and
/// forwards it to the router; only the preview-session commands are
/// intercepted before dispatch. These constants exist so the server,
/// the streamer, and controllers agree on spelling.
pub mod commands {
    /// Snapshot of the scene graph: object names, types, transforms.
    pub const GET_SCENE_INFO: &str = "get_scene_info";
    /// Create a new object in the scene.
    pub const CREATE_OBJECT: &str = "create_object";
    /// Playback and complexity statistics for the open scene.
    pub const GET_SCENE_METRICS: &str = "get_scene_metrics";
    /// One-shot viewport render, returned inline as base64.
    pub const GET_VIEWPORT_IMAGE: &str = "get_viewport_image";
    /// Open the preview listener and begin streaming frames.
    pub const START_LIVE_PREVIEW: &str = "start_live_preview";
    /// Tear down the preview session.
    pub const STOP_LIVE_PREVIEW: &str = "stop_live_preview";
}

// ── Command ──────────────────────────────────────────────────────

/// A request sent from controller to host.
///
/// Wire form: `{"type": "<name>", "params": { ... }}`. The `params`
/// object may be empty or absent; absent decodes as empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Command name, e.g. `"get_scene_info"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Command arguments. Interpretation belongs to the router.
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl Command {
    /// Creates a command with no parameters.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Map::new(),
        }
    }

    /// Adds one parameter (builder style).
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Parses a decoded JSON document into a command.
    ///
    /// A document that is valid JSON but not a valid command (missing
    /// `type`, `params` not an object, not an object at all) yields
    /// [`LinkError::InvalidCommand`] — the connection survives, the
    /// host answers with an error response instead.
    pub fn from_value(value: Value) -> Result<Self, LinkError> {
        serde_json::from_value(value).map_err(|e| LinkError::InvalidCommand(e.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

// ── Response ─────────────────────────────────────────────────────

/// Outcome discriminant of a [`Response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// The command was executed; `result` is populated.
    Success,
    /// The command failed or was rejected; `message` explains why.
    Error,
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStatus::Success => write!(f, "success"),
            ResponseStatus::Error => write!(f, "error"),
        }
    }
}

/// A reply sent from host to controller, one per command.
///
/// Exactly one of `result` / `message` is present: `result` on
/// success, `message` on error. [`Response::from_value`] enforces this
/// on the receive path so a malformed host can never hand the caller
/// an ambiguous reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    /// Builds a success response carrying `result`.
    pub fn success(result: Map<String, Value>) -> Self {
        Self {
            status: ResponseStatus::Success,
            result: Some(result),
            message: None,
        }
    }

    /// Builds an error response carrying a human-readable reason.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            result: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Checks the success ⇔ result / error ⇔ message exclusivity rule.
    pub fn validate(&self) -> Result<(), LinkError> {
        match self.status {
            ResponseStatus::Success if self.result.is_none() => Err(LinkError::Protocol(
                "success response missing result field".into(),
            )),
            ResponseStatus::Success if self.message.is_some() => Err(LinkError::Protocol(
                "success response carries a message field".into(),
            )),
            ResponseStatus::Error if self.message.is_none() => Err(LinkError::Protocol(
                "error response missing message field".into(),
            )),
            ResponseStatus::Error if self.result.is_some() => Err(LinkError::Protocol(
                "error response carries a result field".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Parses and validates a decoded JSON document as a response.
    pub fn from_value(value: Value) -> Result<Self, LinkError> {
        let response: Response = serde_json::from_value(value)
            .map_err(|e| LinkError::Protocol(format!("malformed response: {e}")))?;
        response.validate()?;
        Ok(response)
    }

    /// Converts the response into the host's result payload.
    ///
    /// An error response becomes [`LinkError::Application`] carrying
    /// the host's message verbatim.
    pub fn into_result(self) -> Result<Map<String, Value>, LinkError> {
        match self.status {
            ResponseStatus::Success => Ok(self.result.unwrap_or_default()),
            ResponseStatus::Error => Err(LinkError::Application(
                self.message.unwrap_or_else(|| "unspecified error".into()),
            )),
        }
    }
}

// ── PreviewFrame ─────────────────────────────────────────────────

/// One viewport frame on the preview push stream.
///
/// Wire form: `{"image": "<base64>", "width": W, "height": H}` followed
/// by a newline. The image bytes are an encoded raster (PNG for the
/// reference host); the frame itself is format-agnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewFrame {
    /// Base64-encoded image bytes (standard alphabet, padded).
    pub image: String,
    pub width: u32,
    pub height: u32,
}

impl PreviewFrame {
    /// Wraps raw encoded image bytes into a frame.
    pub fn from_bytes(bytes: &[u8], width: u32, height: u32) -> Self {
        Self {
            image: BASE64.encode(bytes),
            width,
            height,
        }
    }

    /// Extracts a frame from a `get_viewport_image` result payload.
    ///
    /// Extra result fields (e.g. `format`) are ignored.
    pub fn from_result(result: &Map<String, Value>) -> Result<Self, LinkError> {
        serde_json::from_value(Value::Object(result.clone()))
            .map_err(|e| LinkError::Protocol(format!("viewport result is not a frame: {e}")))
    }

    /// Decodes the base64 payload back into image bytes.
    pub fn image_bytes(&self) -> Result<Vec<u8>, LinkError> {
        BASE64
            .decode(&self.image)
            .map_err(|e| LinkError::Protocol(format!("invalid base64 image payload: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_wire_shape() {
        let cmd = Command::new(commands::CREATE_OBJECT)
            .with_param("type", "SPHERE")
            .with_param("location", json!([0.0, 0.0, 2.0]));
        let value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(value["type"], "create_object");
        assert_eq!(value["params"]["type"], "SPHERE");
        assert_eq!(value["params"]["location"][2], 2.0);
    }

    #[test]
    fn command_params_default_to_empty() {
        let cmd = Command::from_value(json!({"type": "get_scene_info"})).unwrap();
        assert_eq!(cmd.kind, "get_scene_info");
        assert!(cmd.params.is_empty());
    }

    #[test]
    fn command_rejects_missing_type() {
        assert!(matches!(
            Command::from_value(json!({"params": {}})),
            Err(LinkError::InvalidCommand(_))
        ));
    }

    #[test]
    fn command_rejects_non_object_document() {
        assert!(matches!(
            Command::from_value(json!(42)),
            Err(LinkError::InvalidCommand(_))
        ));
    }

    #[test]
    fn response_success_roundtrip() {
        let value = json!({"status": "success", "result": {"name": "Sphere"}});
        let response = Response::from_value(value).unwrap();
        assert!(response.is_success());
        let result = response.into_result().unwrap();
        assert_eq!(result["name"], "Sphere");
    }

    #[test]
    fn response_error_becomes_application_error() {
        let value = json!({"status": "error", "message": "unknown command type: frobnicate"});
        let response = Response::from_value(value).unwrap();
        let err = response.into_result().unwrap_err();
        assert!(matches!(err, LinkError::Application(ref m) if m.contains("frobnicate")));
    }

    #[test]
    fn response_success_with_message_is_rejected() {
        let value = json!({"status": "success", "result": {}, "message": "should not be here"});
        assert!(matches!(
            Response::from_value(value),
            Err(LinkError::Protocol(_))
        ));
    }

    #[test]
    fn response_error_with_result_is_rejected() {
        let value = json!({"status": "error", "message": "boom", "result": {}});
        assert!(matches!(
            Response::from_value(value),
            Err(LinkError::Protocol(_))
        ));
    }

    #[test]
    fn response_unknown_status_is_rejected() {
        let value = json!({"status": "maybe", "result": {}});
        assert!(matches!(
            Response::from_value(value),
            Err(LinkError::Protocol(_))
        ));
    }

    #[test]
    fn success_never_serializes_message_field() {
        let text = serde_json::to_string(&Response::success(Map::new())).unwrap();
        assert!(!text.contains("message"));
        let text = serde_json::to_string(&Response::error("bad")).unwrap();
        assert!(!text.contains("result"));
    }

    #[test]
    fn preview_frame_roundtrip() {
        let frame = PreviewFrame::from_bytes(b"\x89PNG\r\n\x1a\n", 800, 600);
        let decoded = frame.image_bytes().unwrap();
        assert_eq!(decoded, b"\x89PNG\r\n\x1a\n");
        assert_eq!(frame.width, 800);
        assert_eq!(frame.height, 600);
    }

    #[test]
    fn preview_frame_from_result_ignores_extra_fields() {
        let result = json!({
            "image": BASE64.encode(b"raster"),
            "width": 320,
            "height": 240,
            "format": "png",
        });
        let map = match result {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        let frame = PreviewFrame::from_result(&map).unwrap();
        assert_eq!(frame.width, 320);
        assert_eq!(frame.image_bytes().unwrap(), b"raster");
    }

    #[test]
    fn preview_frame_rejects_bad_base64() {
        let frame = PreviewFrame {
            image: "not-base64!!!".into(),
            width: 1,
            height: 1,
        };
        assert!(matches!(
            frame.image_bytes(),
            Err(LinkError::Protocol(_))
        ));
    }
}
