//! # Asset Sources — Where Atlases and Sheets Come From
//!
//! The tile layer needs two things per tile sheet: an image (the atlas) and
//! a text file (the sprite-sheet JSON). Both arrive through an
//! [`AssetSource`], whose methods are `async` so a source backed by the
//! network or a background loader fits the same seam as one reading from
//! disk.
//!
//! ```text
//!   TileManager::load_texture(source, device, "levels/forest")
//!        │
//!        ├── source.load_image("levels/forest.png").await ─► DecodedImage
//!        └── source.load_file("levels/forest.json").await ─► String
//! ```
//!
//! ## Failure Model
//!
//! A source answers `None` when it cannot produce the asset and logs why
//! (file missing, undecodable PNG). The caller turns `None` into a typed
//! [`AssetError`](crate::error::AssetError) and reports it; the source
//! itself never panics.
//!
//! ## Sources
//!
//! - [`FileAssetSource`] reads relative to a root directory and decodes with
//!   the `image` crate.
//! - [`MemoryAssetSource`] serves images and files registered up front, for
//!   tests and tools that build levels in code.

use std::collections::HashMap;
use std::path::PathBuf;

/// Tightly packed RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    /// Decode PNG/JPEG bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        Ok(Self::from_rgba8(image::load_from_memory(bytes)?.to_rgba8()))
    }

    /// An image filled with one color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            width,
            height,
            rgba: rgba.repeat(width as usize * height as usize),
        }
    }

    fn from_rgba8(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            rgba: img.into_raw(),
        }
    }
}

/// Asynchronous provider of images and text files, addressed by URL.
#[allow(async_fn_in_trait)]
pub trait AssetSource {
    async fn load_image(&self, url: &str) -> Option<DecodedImage>;
    async fn load_file(&self, url: &str) -> Option<String>;
}

/// Loads assets from a directory on disk.
#[derive(Debug, Clone)]
pub struct FileAssetSource {
    root: PathBuf,
}

impl FileAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl AssetSource for FileAssetSource {
    async fn load_image(&self, url: &str) -> Option<DecodedImage> {
        let path = self.root.join(url);
        match image::open(&path) {
            Ok(img) => Some(DecodedImage::from_rgba8(img.to_rgba8())),
            Err(e) => {
                log::error!("Failed to load image '{}': {e}", path.display());
                None
            }
        }
    }

    async fn load_file(&self, url: &str) -> Option<String> {
        let path = self.root.join(url);
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                log::error!("Failed to read '{}': {e}", path.display());
                None
            }
        }
    }
}

/// Serves assets registered ahead of time.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetSource {
    images: HashMap<String, DecodedImage>,
    files: HashMap<String, String>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_image(&mut self, url: impl Into<String>, image: DecodedImage) -> &mut Self {
        self.images.insert(url.into(), image);
        self
    }

    /// Register encoded image bytes, decoding them now.
    pub fn insert_image_bytes(
        &mut self,
        url: impl Into<String>,
        bytes: &[u8],
    ) -> Result<&mut Self, image::ImageError> {
        let image = DecodedImage::decode(bytes)?;
        Ok(self.insert_image(url, image))
    }

    pub fn insert_file(&mut self, url: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.files.insert(url.into(), text.into());
        self
    }
}

impl AssetSource for MemoryAssetSource {
    async fn load_image(&self, url: &str) -> Option<DecodedImage> {
        let image = self.images.get(url).cloned();
        if image.is_none() {
            log::error!("No image registered at '{url}'");
        }
        image
    }

    async fn load_file(&self, url: &str) -> Option<String> {
        let text = self.files.get(url).cloned();
        if text.is_none() {
            log::error!("No file registered at '{url}'");
        }
        text
    }
}
