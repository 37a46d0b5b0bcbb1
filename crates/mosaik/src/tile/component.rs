//! A placed tile: one sprite controller configured from a descriptor.

use crate::config::TileLayerConfig;
use crate::error::SpriteError;
use crate::sprite::SpriteInstanceController;

use super::descriptor::TileDescriptor;

#[derive(Debug)]
pub struct TileImageComponent {
    sprite: SpriteInstanceController,
}

impl TileImageComponent {
    pub fn new(sprite: SpriteInstanceController) -> Self {
        Self { sprite }
    }

    /// Apply the descriptor's image, position and size, and the layer's
    /// depth and offsets. Size becomes a scale relative to the sub-image's
    /// pixel size.
    pub fn initialize(
        &mut self,
        descriptor: &TileDescriptor,
        config: &TileLayerConfig,
    ) -> Result<(), SpriteError> {
        let sprite = &mut self.sprite;
        sprite.set_sprite_image(&descriptor.image)?;

        let (width, height) = (sprite.width(), sprite.height());
        if width <= 0.0 || height <= 0.0 {
            log::warn!(
                "Tile `{}` uses zero-sized image `{}`; keeping unit scale",
                sprite.id(),
                descriptor.image
            );
        } else {
            sprite.set_x_scale(descriptor.size.x / width)?;
            sprite.set_y_scale(descriptor.size.y / height)?;
        }

        sprite.set_depth(config.depth)?;
        sprite.set_left_offset(config.left_offset)?;
        sprite.set_top_offset(config.top_offset)?;
        sprite.set_left(descriptor.pos.x)?;
        sprite.set_top(descriptor.pos.y)?;
        Ok(())
    }

    pub fn id(&self) -> &str {
        self.sprite.id()
    }

    pub fn sprite(&self) -> &SpriteInstanceController {
        &self.sprite
    }

    pub fn update(&mut self, dt: f32) {
        self.sprite.update(dt);
    }

    pub fn dispose(&mut self) {
        self.sprite.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::DecodedImage;
    use crate::math::{Rect, Vec2};
    use crate::render::HeadlessDevice;
    use crate::sprite::{SpriteInstanceCollection, SpriteSheet, Texture};

    #[test]
    fn initialize_converts_size_to_scale() {
        let mut device = HeadlessDevice::new();
        let mut texture = Texture::new("atlas");
        texture.upload(&mut device, &DecodedImage::solid(64, 64, [0; 4]));
        let collection = SpriteInstanceCollection::shared();
        collection.borrow_mut().initialize(
            &texture,
            SpriteSheet::from_frames([("grass", Rect::new(Vec2::ZERO, Vec2::splat(0.5)))]),
        );

        let sprite = SpriteInstanceController::new("t", collection.clone()).unwrap();
        let mut tile = TileImageComponent::new(sprite);
        let descriptor = TileDescriptor::new("grass", Vec2::new(5.0, 6.0), Vec2::new(64.0, 16.0));
        tile.initialize(&descriptor, &TileLayerConfig::default()).unwrap();

        let s = tile.sprite();
        assert_eq!((s.x_scale(), s.y_scale()), (2.0, 0.5));
        assert_eq!((s.left(), s.top()), (5.0, 6.0));
        assert_eq!(s.depth(), 0.8);
        assert_eq!((s.left_offset(), s.top_offset()), (1.0, -1.0));

        tile.dispose();
        assert!(collection.borrow().is_empty());
    }
}
