//! The atlas texture a collection samples from.

use crate::asset::DecodedImage;
use crate::math::Vec2;
use crate::render::{GpuDevice, TextureId};

/// A GPU texture plus the pixel size needed to turn UV rects into pixels.
#[derive(Debug)]
pub struct Texture {
    label: String,
    id: Option<TextureId>,
    width: u32,
    height: u32,
}

impl Texture {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: None,
            width: 0,
            height: 0,
        }
    }

    /// Upload `image`, replacing any previous contents.
    pub fn upload(&mut self, device: &mut dyn GpuDevice, image: &DecodedImage) {
        self.dispose(device);
        self.id = Some(device.create_texture(&self.label, image.width, image.height, &image.rgba));
        self.width = image.width;
        self.height = image.height;
    }

    pub fn dispose(&mut self, device: &mut dyn GpuDevice) {
        if let Some(id) = self.id.take() {
            device.delete_texture(id);
        }
        self.width = 0;
        self.height = 0;
    }

    pub fn id(&self) -> Option<TextureId> {
        self.id
    }

    pub fn is_loaded(&self) -> bool {
        self.id.is_some()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessDevice;

    #[test]
    fn upload_replaces_previous_texture() {
        let mut device = HeadlessDevice::new();
        let mut texture = Texture::new("atlas");
        texture.upload(&mut device, &DecodedImage::solid(4, 2, [0, 0, 0, 255]));
        let first = texture.id();
        texture.upload(&mut device, &DecodedImage::solid(8, 8, [0, 0, 0, 255]));

        assert_ne!(texture.id(), first);
        assert_eq!(texture.size(), Vec2::new(8.0, 8.0));
        assert_eq!(device.live_textures(), 1);

        texture.dispose(&mut device);
        texture.dispose(&mut device);
        assert!(!texture.is_loaded());
        assert_eq!(device.live_textures(), 0);
        assert_eq!(device.stats().errors, 0);
    }
}
