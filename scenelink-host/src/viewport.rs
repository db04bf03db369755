//! Synthetic viewport renderer.
//!
//! Stands in for a real GPU viewport: a sky/ground gradient with one
//! flat marker per object, placed by a crude orthographic projection
//! of the object's location. Output is deterministic for a given
//! scene, so captures change exactly when the scene does — which is
//! what the preview stream and the snapshot tests care about.

use std::io::Cursor;

use image::{ImageBuffer, ImageFormat, Rgb};

use crate::scene::{ObjectKind, SceneModel};

// ── Constants ────────────────────────────────────────────────────

/// Smallest accepted render dimension.
pub const MIN_DIM: u32 = 16;

/// Largest accepted render dimension.
pub const MAX_DIM: u32 = 4096;

/// Render size when the host config does not say otherwise.
pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;

// ── ImageEncoding ────────────────────────────────────────────────

/// Raster container for a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageEncoding {
    #[default]
    Png,
    Jpeg,
}

impl ImageEncoding {
    /// Parses the `format` tag of a `get_viewport_image` command.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_uppercase().as_str() {
            "PNG" => Some(Self::Png),
            "JPEG" | "JPG" => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
        }
    }

    fn format(&self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
        }
    }
}

// ── ViewportRenderer ─────────────────────────────────────────────

/// An encoded capture plus its metadata.
#[derive(Debug, Clone)]
pub struct RenderedView {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub encoding: ImageEncoding,
}

/// Renders the scene into an encoded raster.
#[derive(Debug, Clone, Copy)]
pub struct ViewportRenderer {
    width: u32,
    height: u32,
}

impl Default for ViewportRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl ViewportRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.clamp(MIN_DIM, MAX_DIM),
            height: height.clamp(MIN_DIM, MAX_DIM),
        }
    }

    /// Renders `scene` at the requested size (falling back to the
    /// configured default) and encodes it.
    pub fn render(
        &self,
        scene: &SceneModel,
        width: Option<u32>,
        height: Option<u32>,
        encoding: ImageEncoding,
    ) -> Result<RenderedView, image::ImageError> {
        let width = width.unwrap_or(self.width).clamp(MIN_DIM, MAX_DIM);
        let height = height.unwrap_or(self.height).clamp(MIN_DIM, MAX_DIM);

        let mut img = ImageBuffer::from_fn(width, height, |_x, y| {
            // Sky fades into ground at the horizon line.
            let horizon = height / 2;
            if y < horizon {
                let t = y as f32 / horizon.max(1) as f32;
                Rgb([
                    (90.0 + 60.0 * t) as u8,
                    (140.0 + 50.0 * t) as u8,
                    (210.0 + 30.0 * t) as u8,
                ])
            } else {
                let t = (y - horizon) as f32 / (height - horizon).max(1) as f32;
                Rgb([
                    (70.0 - 25.0 * t) as u8,
                    (62.0 - 22.0 * t) as u8,
                    (58.0 - 20.0 * t) as u8,
                ])
            }
        });

        for object in scene.objects() {
            draw_marker(&mut img, object.kind, object.location, object.scale);
        }

        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), encoding.format())?;
        Ok(RenderedView {
            bytes,
            width,
            height,
            encoding,
        })
    }
}

/// Flat-shaded square marker for one object.
///
/// World space is treated as a 10×10 unit window centred on the
/// origin: x maps to screen x, z maps (inverted) to screen y.
fn draw_marker(
    img: &mut ImageBuffer<Rgb<u8>, Vec<u8>>,
    kind: ObjectKind,
    location: [f64; 3],
    scale: [f64; 3],
) {
    let (width, height) = img.dimensions();
    let u = ((location[0] + 5.0) / 10.0).clamp(0.0, 1.0);
    let v = (1.0 - (location[2] + 5.0) / 10.0).clamp(0.0, 1.0);
    let cx = (u * (width - 1) as f64) as i64;
    let cy = (v * (height - 1) as f64) as i64;

    let extent = (scale[0].abs().max(0.1) * width as f64 * 0.03)
        .clamp(2.0, width as f64 / 4.0) as i64;
    let color = match kind {
        ObjectKind::Cube => Rgb([200, 200, 205]),
        ObjectKind::Sphere => Rgb([120, 160, 255]),
        ObjectKind::Plane => Rgb([110, 190, 120]),
        ObjectKind::Light => Rgb([255, 230, 120]),
        ObjectKind::Camera => Rgb([40, 40, 48]),
    };

    for dy in -extent..=extent {
        for dx in -extent..=extent {
            let x = cx + dx;
            let y = cy + dy;
            if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
