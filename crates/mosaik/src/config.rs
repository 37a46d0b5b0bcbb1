//! Tile layer configuration.
//!
//! The placement constants every tile receives (depth, corner offsets) and
//! the file extensions appended to a tile-sheet base URL. Defaults match the
//! stock background layer; a JSON file can override any subset:
//!
//! ```json
//! { "depth": 0.5, "imageExtension": "jpg" }
//! ```

use serde::{Deserialize, Serialize};

/// Placement and asset-naming settings for a tile layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TileLayerConfig {
    /// Z value written into every tile vertex. Advisory only: the wgpu
    /// sprite pipeline has no depth buffer, so tiles layer in creation
    /// (slot) order regardless of depth.
    pub depth: f32,
    /// Horizontal offset in half-extent units. `1.0` puts the tile's left
    /// edge at its position.
    pub left_offset: f32,
    /// Vertical offset in half-extent units. `-1.0` puts the tile's top edge
    /// at its position.
    pub top_offset: f32,
    pub image_extension: String,
    pub metadata_extension: String,
}

impl Default for TileLayerConfig {
    fn default() -> Self {
        Self {
            depth: 0.8,
            left_offset: 1.0,
            top_offset: -1.0,
            image_extension: "png".into(),
            metadata_extension: "json".into(),
        }
    }
}

impl TileLayerConfig {
    /// Parse a config, filling unspecified fields with defaults.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn image_url(&self, base: &str) -> String {
        format!("{base}.{}", self.image_extension)
    }

    pub fn metadata_url(&self, base: &str) -> String {
        format!("{base}.{}", self.metadata_extension)
    }
}
