//! Math types, glam re-exports, and the small set of 2D helpers the tile
//! layer needs on top of glam.
//!
//! We re-export [glam](https://docs.rs/glam) types so users don't need to
//! depend on it directly. Length, distance, normalization and dot products
//! come straight from [`Vec2`]; this module adds tolerance comparison, a few
//! named helpers, and a segment intersection test.
//!
//! ## Segment Intersection
//!
//! Two segments `a→c` and `p→r` are written parametrically:
//!
//! ```text
//!   a + λ(c − a) = p + γ(r − p)
//!
//!   det = (c.x − a.x)(r.y − p.y) − (r.x − p.x)(c.y − a.y)
//!   λ   = ((r.y − p.y)(r.x − a.x) + (p.x − r.x)(r.y − a.y)) / det
//!   γ   = ((a.y − c.y)(r.x − a.x) + (c.x − a.x)(r.y − a.y)) / det
//! ```
//!
//! The segments cross when both parameters lie strictly inside `(0, 1)`.
//! Touching at an endpoint or running parallel (`det == 0`) is reported as
//! no intersection.

use serde::{Deserialize, Serialize};

pub use glam::{Mat4, Vec2, Vec3};

/// Default tolerance for [`approx_eq`].
pub const EPSILON: f32 = 0.00001;

/// Component-wise comparison within [`EPSILON`].
pub fn approx_eq(a: Vec2, b: Vec2) -> bool {
    approx_eq_within(a, b, EPSILON)
}

/// Component-wise comparison within an explicit threshold.
pub fn approx_eq_within(a: Vec2, b: Vec2, threshold: f32) -> bool {
    (a.x - b.x).abs() <= threshold && (a.y - b.y).abs() <= threshold
}

/// Unit vector pointing along `a - b`. Zero when the points coincide.
pub fn direction(a: Vec2, b: Vec2) -> Vec2 {
    (a - b).normalize_or_zero()
}

/// Linear interpolation from `a` (t = 0) to `b` (t = 1).
pub fn mix(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a.lerp(b, t)
}

/// Intersection point of segments `p0→p1` and `p2→p3`, if they cross.
pub fn line_intersection(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2) -> Option<Vec2> {
    let (a, c, p, r) = (p0, p1, p2, p3);
    let det = (c.x - a.x) * (r.y - p.y) - (r.x - p.x) * (c.y - a.y);
    if det == 0.0 {
        return None;
    }

    let lambda = ((r.y - p.y) * (r.x - a.x) + (p.x - r.x) * (r.y - a.y)) / det;
    let gamma = ((a.y - c.y) * (r.x - a.x) + (c.x - a.x) * (r.y - a.y)) / det;
    let inside = |t: f32| 0.0 < t && t < 1.0;
    if inside(lambda) && inside(gamma) {
        Some(a + (c - a) * lambda)
    } else {
        None
    }
}

/// A normalized rectangle within a texture (UV space, 0.0–1.0).
///
/// Used to select a sub-region of an atlas for rendering, for example a
/// single tile from a sprite sheet. Coordinates are in UV space where (0,0)
/// is the top-left corner and (1,1) is the bottom-right corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    #[serde(rename = "minTex", with = "xy")]
    pub min: Vec2,
    #[serde(rename = "maxTex", with = "xy")]
    pub max: Vec2,
}

impl Rect {
    /// The full texture (0,0) to (1,1).
    pub const FULL: Self = Self {
        min: Vec2::ZERO,
        max: Vec2::ONE,
    };

    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Build from pixel coordinates and texture dimensions.
    pub fn from_pixels(x: f32, y: f32, w: f32, h: f32, tex_w: f32, tex_h: f32) -> Self {
        Self {
            min: Vec2::new(x / tex_w, y / tex_h),
            max: Vec2::new((x + w) / tex_w, (y + h) / tex_h),
        }
    }

    /// Extent in UV units.
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Extent in pixels for an atlas of the given size.
    pub fn pixel_size(&self, atlas: Vec2) -> Vec2 {
        self.size() * atlas
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self::FULL
    }
}

/// Serde adapter for `{ "x": .., "y": .. }` objects.
///
/// glam's own serde support writes vectors as `[x, y]` arrays; asset files
/// use named fields.
pub mod xy {
    use glam::Vec2;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Xy {
        x: f32,
        y: f32,
    }

    pub fn serialize<S: Serializer>(value: &Vec2, serializer: S) -> Result<S::Ok, S::Error> {
        Xy { x: value.x, y: value.y }.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec2, D::Error> {
        let Xy { x, y } = Xy::deserialize(deserializer)?;
        Ok(Vec2::new(x, y))
    }
}
