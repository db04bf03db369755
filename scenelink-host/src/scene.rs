//! The in-memory scene model.
//!
//! A deliberately small stand-in for a real content-creation scene
//! graph: typed objects with transforms, auto-suffixed names, and the
//! playback settings the metrics query reports. New documents open
//! with the customary default cube at the origin.

use std::fmt;

use serde_json::{Map, Value, json};

// ── ObjectKind ───────────────────────────────────────────────────

/// Object types the reference host can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Cube,
    Sphere,
    Plane,
    Light,
    Camera,
}

impl ObjectKind {
    /// Parses the `type` tag of a `create_object` command. Tags are
    /// conventionally uppercase but matched case-insensitively.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_uppercase().as_str() {
            "CUBE" => Some(Self::Cube),
            "SPHERE" => Some(Self::Sphere),
            "PLANE" => Some(Self::Plane),
            "LIGHT" => Some(Self::Light),
            "CAMERA" => Some(Self::Camera),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Cube => "CUBE",
            Self::Sphere => "SPHERE",
            Self::Plane => "PLANE",
            Self::Light => "LIGHT",
            Self::Camera => "CAMERA",
        }
    }

    /// Base for auto-generated object names.
    pub fn base_name(&self) -> &'static str {
        match self {
            Self::Cube => "Cube",
            Self::Sphere => "Sphere",
            Self::Plane => "Plane",
            Self::Light => "Light",
            Self::Camera => "Camera",
        }
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self, Self::Cube | Self::Sphere | Self::Plane)
    }

    /// Face count of the primitive at default resolution.
    fn polygons(&self) -> u64 {
        match self {
            Self::Cube => 6,
            // 32 segments × 16 rings UV sphere.
            Self::Sphere => 512,
            Self::Plane => 1,
            Self::Light | Self::Camera => 0,
        }
    }

    fn vertices(&self) -> u64 {
        match self {
            Self::Cube => 8,
            Self::Sphere => 482,
            Self::Plane => 4,
            Self::Light | Self::Camera => 0,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

// ── SceneObject ──────────────────────────────────────────────────

/// One object in the scene.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    pub location: [f64; 3],
    pub scale: [f64; 3],
}

impl SceneObject {
    fn describe(&self) -> Value {
        json!({
            "name": self.name,
            "type": self.kind.tag(),
            "location": self.location,
            "scale": self.scale,
        })
    }
}

// ── SceneModel ───────────────────────────────────────────────────

/// The open scene: objects plus playback settings.
#[derive(Debug, Clone)]
pub struct SceneModel {
    name: String,
    objects: Vec<SceneObject>,
    fps: u32,
    frame_current: u32,
    frame_start: u32,
    frame_end: u32,
}

impl Default for SceneModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneModel {
    /// A fresh document: one cube at the origin, 24 fps, frames 1..250.
    pub fn new() -> Self {
        Self {
            name: "Scene".into(),
            objects: vec![SceneObject {
                name: "Cube".into(),
                kind: ObjectKind::Cube,
                location: [0.0, 0.0, 0.0],
                scale: [1.0, 1.0, 1.0],
            }],
            fps: 24,
            frame_current: 1,
            frame_start: 1,
            frame_end: 250,
        }
    }

    /// A scene with no objects at all.
    pub fn empty() -> Self {
        Self {
            objects: Vec::new(),
            ..Self::new()
        }
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// Adds an object, suffixing the name if it is already taken
    /// (`Sphere`, `Sphere.001`, `Sphere.002`, …). Returns the object
    /// as stored, final name included.
    pub fn create(
        &mut self,
        kind: ObjectKind,
        name: Option<String>,
        location: [f64; 3],
        scale: [f64; 3],
    ) -> SceneObject {
        let base = name.unwrap_or_else(|| kind.base_name().to_string());
        let object = SceneObject {
            name: self.unique_name(&base),
            kind,
            location,
            scale,
        };
        self.objects.push(object.clone());
        object
    }

    fn unique_name(&self, base: &str) -> String {
        if self.object(base).is_none() {
            return base.to_string();
        }
        let mut n = 1u32;
        loop {
            let candidate = format!("{base}.{n:03}");
            if self.object(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// The `get_scene_info` result payload.
    pub fn info(&self) -> Map<String, Value> {
        let mut result = Map::new();
        result.insert("name".into(), self.name.clone().into());
        result.insert("object_count".into(), self.objects.len().into());
        result.insert(
            "objects".into(),
            Value::Array(self.objects.iter().map(SceneObject::describe).collect()),
        );
        result
    }

    /// The `get_scene_metrics` result payload.
    pub fn metrics(&self) -> Map<String, Value> {
        let meshes = self.objects.iter().filter(|o| o.kind.is_mesh()).count();
        let lights = self
            .objects
            .iter()
            .filter(|o| o.kind == ObjectKind::Light)
            .count();
        let cameras = self
            .objects
            .iter()
            .filter(|o| o.kind == ObjectKind::Camera)
            .count();
        let polygons: u64 = self.objects.iter().map(|o| o.kind.polygons()).sum();
        let vertices: u64 = self.objects.iter().map(|o| o.kind.vertices()).sum();

        // Synthetic but scene-derived memory figures.
        let image_memory = 16u64 * 1024 * 1024;
        let total_memory = 64 * 1024 * 1024 + self.objects.len() as u64 * 2048 + image_memory;

        let mut result = Map::new();
        result.insert("fps".into(), self.fps.into());
        result.insert("frame_current".into(), self.frame_current.into());
        result.insert("frame_start".into(), self.frame_start.into());
        result.insert("frame_end".into(), self.frame_end.into());
        result.insert(
            "objects".into(),
            json!({
                "total": self.objects.len(),
                "meshes": meshes,
                "lights": lights,
                "cameras": cameras,
            }),
        );
        result.insert("polygons".into(), polygons.into());
        result.insert("vertices".into(), vertices.into());
        result.insert(
            "memory".into(),
            json!({
                "total": total_memory,
                "images": image_memory,
            }),
        );
        result
    }
}

// ── Tests ────────────────────────────────────────────────────────
