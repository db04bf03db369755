//! Command dispatch for the reference host.
//!
//! [`SceneRouter`] is the host's [`CommandRouter`]: it owns the scene
//! behind a mutex and translates the core command vocabulary into
//! scene calls. Connections and the preview streamer all dispatch
//! through the same instance, so scene access is serialized here and
//! nowhere else.

use async_trait::async_trait;
use scenelink_core::{CommandRouter, DispatchError, PreviewFrame, commands};
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;

use crate::scene::{ObjectKind, SceneModel};
use crate::viewport::{ImageEncoding, ViewportRenderer};

// ── SceneRouter ──────────────────────────────────────────────────

pub struct SceneRouter {
    scene: Mutex<SceneModel>,
    renderer: ViewportRenderer,
}

impl SceneRouter {
    /// Router over a freshly seeded scene.
    pub fn new(renderer: ViewportRenderer) -> Self {
        Self::with_scene(SceneModel::new(), renderer)
    }

    pub fn with_scene(scene: SceneModel, renderer: ViewportRenderer) -> Self {
        Self {
            scene: Mutex::new(scene),
            renderer,
        }
    }

    async fn create_object(
        &self,
        params: &Map<String, Value>,
    ) -> Result<Map<String, Value>, DispatchError> {
        let tag = req_str(params, "type")?;
        let kind = ObjectKind::from_tag(tag).ok_or_else(|| {
            DispatchError::InvalidParams(format!(
                "type must be one of CUBE, SPHERE, PLANE, LIGHT, CAMERA (got {tag:?})"
            ))
        })?;
        let name = opt_str(params, "name")?.map(str::to_string);
        let location = opt_vec3(params, "location", [0.0; 3])?;
        let scale = opt_vec3(params, "scale", [1.0; 3])?;

        let object = self.scene.lock().await.create(kind, name, location, scale);
        tracing::info!(name = %object.name, kind = %object.kind, "object created");

        let mut result = Map::new();
        result.insert("name".into(), Value::String(object.name));
        result.insert("type".into(), Value::String(object.kind.tag().to_string()));
        result.insert("location".into(), json!(object.location));
        Ok(result)
    }

    async fn viewport_image(
        &self,
        params: &Map<String, Value>,
    ) -> Result<Map<String, Value>, DispatchError> {
        let width = opt_dim(params, "width")?;
        let height = opt_dim(params, "height")?;
        let encoding = match opt_str(params, "format")? {
            None => ImageEncoding::default(),
            Some(tag) => ImageEncoding::from_tag(tag).ok_or_else(|| {
                DispatchError::InvalidParams(format!("format must be PNG or JPEG (got {tag:?})"))
            })?,
        };

        let scene = self.scene.lock().await;
        let view = self
            .renderer
            .render(&scene, width, height, encoding)
            .map_err(|e| DispatchError::failed(format!("viewport render failed: {e}")))?;
        drop(scene);
        tracing::trace!(
            width = view.width,
            height = view.height,
            bytes = view.bytes.len(),
            "viewport captured"
        );

        let frame = PreviewFrame::from_bytes(&view.bytes, view.width, view.height);
        let value = serde_json::to_value(&frame)
            .map_err(|e| DispatchError::failed(format!("frame encode failed: {e}")))?;
        let Value::Object(mut result) = value else {
            return Err(DispatchError::failed("frame did not serialize to an object"));
        };
        result.insert(
            "format".into(),
            Value::String(view.encoding.tag().to_string()),
        );
        Ok(result)
    }
}

#[async_trait]
impl CommandRouter for SceneRouter {
    async fn dispatch(
        &self,
        kind: &str,
        params: Map<String, Value>,
    ) -> Result<Map<String, Value>, DispatchError> {
        match kind {
            commands::GET_SCENE_INFO => Ok(self.scene.lock().await.info()),
            commands::GET_SCENE_METRICS => Ok(self.scene.lock().await.metrics()),
            commands::CREATE_OBJECT => self.create_object(&params).await,
            commands::GET_VIEWPORT_IMAGE => self.viewport_image(&params).await,
            other => Err(DispatchError::UnknownCommand(other.to_string())),
        }
    }
}

// ── Param extraction ─────────────────────────────────────────────

fn req_str<'a>(params: &'a Map<String, Value>, key: &str) -> Result<&'a str, DispatchError> {
    match params.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(DispatchError::InvalidParams(format!(
            "{key} must be a string"
        ))),
        None => Err(DispatchError::InvalidParams(format!(
            "missing required field: {key}"
        ))),
    }
}

fn opt_str<'a>(
    params: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a str>, DispatchError> {
    match params.get(key) {
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(DispatchError::InvalidParams(format!(
            "{key} must be a string"
        ))),
        None => Ok(None),
    }
}

fn opt_vec3(
    params: &Map<String, Value>,
    key: &str,
    default: [f64; 3],
) -> Result<[f64; 3], DispatchError> {
    let Some(value) = params.get(key) else {
        return Ok(default);
    };
    let invalid = || DispatchError::InvalidParams(format!("{key} must be [x, y, z]"));
    let items = value.as_array().ok_or_else(invalid)?;
    if items.len() != 3 {
        return Err(invalid());
    }
    let mut out = [0.0; 3];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_f64().ok_or_else(invalid)?;
    }
    Ok(out)
}

fn opt_dim(params: &Map<String, Value>, key: &str) -> Result<Option<u32>, DispatchError> {
    match params.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                DispatchError::InvalidParams(format!("{key} must be a positive integer"))
            }),
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> SceneRouter {
        SceneRouter::new(ViewportRenderer::new(64, 64))
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn scene_info_lists_the_default_cube() {
        let router = router();
        let info = router
            .dispatch(commands::GET_SCENE_INFO, Map::new())
            .await
            .unwrap();
        assert_eq!(info["object_count"], 1);
        assert_eq!(info["objects"][0]["name"], "Cube");
    }

    #[tokio::test]
    async fn create_object_defaults_then_reports_placement() {
        let router = router();
        let result = router
            .dispatch(
                commands::CREATE_OBJECT,
                params(json!({ "type": "SPHERE", "location": [1.0, 2.0, 3.0] })),
            )
            .await
            .unwrap();
        assert_eq!(result["name"], "Sphere");
        assert_eq!(result["type"], "SPHERE");
        assert_eq!(result["location"], json!([1.0, 2.0, 3.0]));

        // Omitted placement lands at the origin.
        let result = router
            .dispatch(commands::CREATE_OBJECT, params(json!({ "type": "CUBE" })))
            .await
            .unwrap();
        assert_eq!(result["name"], "Cube.001");
        assert_eq!(result["location"], json!([0.0, 0.0, 0.0]));
    }

    #[tokio::test]
    async fn create_object_rejects_unknown_kind() {
        let err = router()
            .dispatch(
                commands::CREATE_OBJECT,
                params(json!({ "type": "TEAPOT" })),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidParams(_)));
        assert!(err.to_string().contains("TEAPOT"));
    }

    #[tokio::test]
    async fn create_object_rejects_malformed_location() {
        let err = router()
            .dispatch(
                commands::CREATE_OBJECT,
                params(json!({ "type": "CUBE", "location": [1.0, 2.0] })),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("location must be [x, y, z]"));

        let err = router()
            .dispatch(
                commands::CREATE_OBJECT,
                params(json!({ "type": "CUBE", "location": "origin" })),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn viewport_image_is_a_decodable_frame() {
        let router = router();
        let result = router
            .dispatch(
                commands::GET_VIEWPORT_IMAGE,
                params(json!({ "width": 32, "height": 32 })),
            )
            .await
            .unwrap();
        assert_eq!(result["format"], "PNG");

        let frame = PreviewFrame::from_result(&result).unwrap();
        assert_eq!((frame.width, frame.height), (32, 32));
        let bytes = frame.image_bytes().unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[tokio::test]
    async fn viewport_format_tag_is_validated() {
        let result = router()
            .dispatch(
                commands::GET_VIEWPORT_IMAGE,
                params(json!({ "format": "jpeg" })),
            )
            .await
            .unwrap();
        assert_eq!(result["format"], "JPEG");

        let err = router()
            .dispatch(
                commands::GET_VIEWPORT_IMAGE,
                params(json!({ "format": "EXR" })),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("EXR"));
    }

    #[tokio::test]
    async fn unknown_command_is_reported_as_such() {
        let err = router()
            .dispatch("teleport_objects", Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown command type: teleport_objects");
    }

    #[tokio::test]
    async fn metrics_follow_scene_edits() {
        let router = router();
        router
            .dispatch(commands::CREATE_OBJECT, params(json!({ "type": "LIGHT" })))
            .await
            .unwrap();
        let metrics = router
            .dispatch(commands::GET_SCENE_METRICS, Map::new())
            .await
            .unwrap();
        assert_eq!(metrics["objects"]["total"], 2);
        assert_eq!(metrics["objects"]["lights"], 1);
    }
}
