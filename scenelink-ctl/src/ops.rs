//! Controller operations: the conversations a user runs against a
//! live host.
//!
//! [`Controller`] wraps one command channel and exposes the operations
//! the CLI offers. The attach flow reproduces the classic first-light
//! check: read the scene, drop a half-scale test sphere two units
//! above the default cube, confirm the host took it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{Map, Value, json};
use tracing::info;

use scenelink_core::network::channel::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_DEADLINE};
use scenelink_core::{Command, CommandChannel, Endpoint, FrameReceiver, PreviewFrame, commands};

use crate::error::CtlError;

// ── Controller ───────────────────────────────────────────────────

/// A connected controller running operations against one host.
#[derive(Debug)]
pub struct Controller {
    channel: CommandChannel,
    deadline: Duration,
}

/// What the attach smoke test found and did.
#[derive(Debug)]
pub struct AttachReport {
    /// Objects in the scene before the test edit.
    pub object_count: usize,
    /// Name the host gave the test sphere.
    pub created: String,
    /// Whether the sphere was placed relative to a found `Cube`.
    pub above_cube: bool,
}

impl Controller {
    pub async fn connect(endpoint: &Endpoint) -> Result<Self, CtlError> {
        let channel = CommandChannel::connect(endpoint, DEFAULT_CONNECT_TIMEOUT).await?;
        Ok(Self {
            channel,
            deadline: DEFAULT_DEADLINE,
        })
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// One exchange, unwrapped to the success payload.
    async fn run(&mut self, command: Command) -> Result<Map<String, Value>, CtlError> {
        let response = self.channel.request(&command, self.deadline).await?;
        Ok(response.into_result()?)
    }

    pub async fn scene_info(&mut self) -> Result<Map<String, Value>, CtlError> {
        self.run(Command::new(commands::GET_SCENE_INFO)).await
    }

    pub async fn metrics(&mut self) -> Result<Map<String, Value>, CtlError> {
        self.run(Command::new(commands::GET_SCENE_METRICS)).await
    }

    pub async fn create_object(
        &mut self,
        kind: &str,
        name: Option<&str>,
        location: Option<[f64; 3]>,
        scale: Option<[f64; 3]>,
    ) -> Result<Map<String, Value>, CtlError> {
        let mut command = Command::new(commands::CREATE_OBJECT).with_param("type", kind);
        if let Some(name) = name {
            command = command.with_param("name", name);
        }
        if let Some(location) = location {
            command = command.with_param("location", json!(location));
        }
        if let Some(scale) = scale {
            command = command.with_param("scale", json!(scale));
        }
        self.run(command).await
    }

    /// Captures the viewport and writes the decoded image to `out`.
    pub async fn snapshot(
        &mut self,
        width: Option<u32>,
        height: Option<u32>,
        format: Option<&str>,
        out: &Path,
    ) -> Result<PathBuf, CtlError> {
        let mut command = Command::new(commands::GET_VIEWPORT_IMAGE);
        if let Some(width) = width {
            command = command.with_param("width", width);
        }
        if let Some(height) = height {
            command = command.with_param("height", height);
        }
        if let Some(format) = format {
            command = command.with_param("format", format);
        }

        let result = self.run(command).await?;
        let frame = PreviewFrame::from_result(&result)?;
        std::fs::write(out, frame.image_bytes()?)?;
        info!(
            "snapshot {}x{} -> {}",
            frame.width,
            frame.height,
            out.display()
        );
        Ok(out.to_path_buf())
    }

    /// The attach smoke test.
    pub async fn attach(&mut self) -> Result<AttachReport, CtlError> {
        let info = self.scene_info().await?;
        let objects = info
            .get("objects")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let object_count = objects.len();

        let cube_location = objects
            .iter()
            .find(|o| o.get("name").and_then(Value::as_str) == Some("Cube"))
            .and_then(|o| o.get("location"))
            .and_then(vec3_from);

        let (location, above_cube) = match cube_location {
            Some([x, y, z]) => ([x, y, z + 2.0], true),
            None => ([0.0, 0.0, 2.0], false),
        };

        let result = self
            .create_object("SPHERE", Some("TestSphere"), Some(location), Some([0.5; 3]))
            .await?;
        let created = result
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| CtlError::UnexpectedResponse("create result carries no name".into()))?
            .to_string();

        Ok(AttachReport {
            object_count,
            created,
            above_cube,
        })
    }

    /// Asks the host to start streaming; returns the actual port.
    pub async fn start_preview(&mut self, port: u16, fps: u8) -> Result<u16, CtlError> {
        let command = Command::new(commands::START_LIVE_PREVIEW)
            .with_param("port", port)
            .with_param("fps", fps);
        let result = self.run(command).await?;
        result
            .get("port")
            .and_then(Value::as_u64)
            .map(|p| p as u16)
            .ok_or_else(|| CtlError::UnexpectedResponse("start result carries no port".into()))
    }

    /// Stops any running preview; `false` means none was running.
    pub async fn stop_preview(&mut self) -> Result<bool, CtlError> {
        let result = self.run(Command::new(commands::STOP_LIVE_PREVIEW)).await?;
        Ok(result
            .get("stopped")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    /// Starts the preview, saves `count` frames into `out_dir`, stops
    /// the session, and returns the written paths.
    pub async fn watch_preview(
        &mut self,
        preview_port: u16,
        fps: u8,
        count: usize,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, CtlError> {
        let port = self.start_preview(preview_port, fps).await?;
        let endpoint = self.channel.peer().with_port(port);

        // Stop the session even when saving failed part-way.
        let saved = save_frames(&endpoint, count, out_dir, self.deadline).await;
        let stopped = self.stop_preview().await;
        let saved = saved?;
        stopped?;
        Ok(saved)
    }
}

async fn save_frames(
    endpoint: &Endpoint,
    count: usize,
    out_dir: &Path,
    deadline: Duration,
) -> Result<Vec<PathBuf>, CtlError> {
    std::fs::create_dir_all(out_dir)?;
    let mut rx = FrameReceiver::connect(endpoint, DEFAULT_CONNECT_TIMEOUT).await?;

    let mut saved = Vec::with_capacity(count);
    for i in 0..count {
        let Some(frame) = rx.next_frame(deadline).await? else {
            break; // session ended early
        };
        let path = out_dir.join(format!("frame_{i:03}.png"));
        std::fs::write(&path, frame.image_bytes()?)?;
        saved.push(path);
    }
    info!("saved {} frames to {}", saved.len(), out_dir.display());
    Ok(saved)
}

fn vec3_from(value: &Value) -> Option<[f64; 3]> {
    let items = value.as_array()?;
    if items.len() != 3 {
        return None;
    }
    Some([
        items[0].as_f64()?,
        items[1].as_f64()?,
        items[2].as_f64()?,
    ])
}

/// Parses an `x,y,z` CLI argument into a coordinate triple.
pub fn parse_vec3(s: &str) -> Result<[f64; 3], String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("expected x,y,z (got {s:?})"));
    }
    let mut out = [0.0; 3];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("bad component {part:?}: {e}"))?;
    }
    Ok(out)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec3_cli_values_parse_with_whitespace() {
        assert_eq!(parse_vec3("1,2,3").unwrap(), [1.0, 2.0, 3.0]);
        assert_eq!(parse_vec3(" 0.5, -2, 4.25 ").unwrap(), [0.5, -2.0, 4.25]);
    }

    #[test]
    fn vec3_cli_values_reject_wrong_arity_and_junk() {
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("1,2,3,4").is_err());
        assert!(parse_vec3("1,two,3").is_err());
    }

    #[test]
    fn vec3_from_json_requires_three_numbers() {
        assert_eq!(vec3_from(&json!([1, 2, 3])), Some([1.0, 2.0, 3.0]));
        assert_eq!(vec3_from(&json!([1, 2])), None);
        assert_eq!(vec3_from(&json!("origin")), None);
        assert_eq!(vec3_from(&json!([1, "2", 3])), None);
    }
}
