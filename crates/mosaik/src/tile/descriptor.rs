//! Level data for one tile.

use serde::{Deserialize, Serialize};

use crate::math::{xy, Vec2};

/// Where a tile goes and which sub-image it shows.
///
/// ```json
/// { "id": "gate", "image": "stone", "pos": { "x": 64, "y": 0 }, "size": { "x": 32, "y": 32 } }
/// ```
///
/// `pos` is the tile's top-left corner; `size` is its on-screen size in
/// pixels. Without an `id` the manager generates one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub image: String,
    #[serde(with = "xy")]
    pub pos: Vec2,
    #[serde(with = "xy")]
    pub size: Vec2,
}

impl TileDescriptor {
    pub fn new(image: impl Into<String>, pos: Vec2, size: Vec2) -> Self {
        Self {
            id: None,
            image: image.into(),
            pos,
            size,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Parse a JSON array of descriptors.
    pub fn list_from_json(text: &str) -> serde_json::Result<Vec<Self>> {
        serde_json::from_str(text)
    }
}
