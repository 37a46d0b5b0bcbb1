//! Sprite-sheet metadata: sub-image names mapped to atlas rectangles.
//!
//! ```json
//! {
//!   "grass": { "minTex": { "x": 0.0, "y": 0.0 }, "maxTex": { "x": 0.5, "y": 0.5 } },
//!   "water": { "minTex": { "x": 0.5, "y": 0.0 }, "maxTex": { "x": 1.0, "y": 0.5 } }
//! }
//! ```

use std::collections::HashMap;

use crate::math::Rect;

/// Immutable name → UV rect table loaded alongside an atlas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpriteSheet {
    frames: HashMap<String, Rect>,
}

impl SpriteSheet {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let frames: HashMap<String, Rect> = serde_json::from_str(text)?;
        Ok(Self { frames })
    }

    pub fn from_frames<I, S>(frames: I) -> Self
    where
        I: IntoIterator<Item = (S, Rect)>,
        S: Into<String>,
    {
        Self {
            frames: frames.into_iter().map(|(name, rect)| (name.into(), rect)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Rect> {
        self.frames.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Sub-image names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.frames.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
