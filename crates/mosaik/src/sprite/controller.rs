//! Single-owner handle to one sprite in a shared collection.
//!
//! A controller holds no sprite state of its own: setters forward to the
//! collection (which marks the slot dirty), getters read back from it.
//! Creating a controller registers its id; disposing or dropping it
//! releases the slot.

use crate::error::SpriteError;
use crate::math::Vec2;

use super::collection::{SharedCollection, SpriteInstance, SpriteInstanceCollection};

pub struct SpriteInstanceController {
    id: String,
    collection: SharedCollection,
    disposed: bool,
}

impl SpriteInstanceController {
    /// Register `id` in `collection` and return its controller.
    pub fn new(id: impl Into<String>, collection: SharedCollection) -> Result<Self, SpriteError> {
        let id = id.into();
        collection.borrow_mut().register(&id)?;
        Ok(Self {
            id,
            collection,
            disposed: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn collection(&self) -> &SharedCollection {
        &self.collection
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn with<R>(
        &self,
        apply: impl FnOnce(&mut SpriteInstanceCollection, &str) -> Result<R, SpriteError>,
    ) -> Result<R, SpriteError> {
        if self.disposed {
            return Err(SpriteError::UnknownInstance(self.id.clone()));
        }
        apply(&mut self.collection.borrow_mut(), &self.id)
    }

    fn read<T: Default>(&self, get: impl FnOnce(&SpriteInstance) -> T) -> T {
        self.collection
            .borrow()
            .instance(&self.id)
            .map(get)
            .unwrap_or_default()
    }

    pub fn set_sprite_image(&mut self, name: &str) -> Result<(), SpriteError> {
        self.with(|c, id| c.set_image(id, name))
    }

    pub fn set_position(&mut self, position: Vec2) -> Result<(), SpriteError> {
        self.with(|c, id| c.set_position(id, position))
    }

    pub fn set_left(&mut self, left: f32) -> Result<(), SpriteError> {
        self.with(|c, id| c.set_left(id, left))
    }

    pub fn set_top(&mut self, top: f32) -> Result<(), SpriteError> {
        self.with(|c, id| c.set_top(id, top))
    }

    pub fn set_x_scale(&mut self, x_scale: f32) -> Result<(), SpriteError> {
        self.with(|c, id| c.set_x_scale(id, x_scale))
    }

    pub fn set_y_scale(&mut self, y_scale: f32) -> Result<(), SpriteError> {
        self.with(|c, id| c.set_y_scale(id, y_scale))
    }

    pub fn set_depth(&mut self, depth: f32) -> Result<(), SpriteError> {
        self.with(|c, id| c.set_depth(id, depth))
    }

    pub fn set_left_offset(&mut self, offset: f32) -> Result<(), SpriteError> {
        self.with(|c, id| c.set_left_offset(id, offset))
    }

    pub fn set_top_offset(&mut self, offset: f32) -> Result<(), SpriteError> {
        self.with(|c, id| c.set_top_offset(id, offset))
    }

    pub fn sprite_image(&self) -> Option<String> {
        self.read(|s| s.image.clone())
    }

    pub fn left(&self) -> f32 {
        self.read(|s| s.position.x)
    }

    pub fn top(&self) -> f32 {
        self.read(|s| s.position.y)
    }

    pub fn x_scale(&self) -> f32 {
        self.read(|s| s.scale.x)
    }

    pub fn y_scale(&self) -> f32 {
        self.read(|s| s.scale.y)
    }

    pub fn depth(&self) -> f32 {
        self.read(|s| s.depth)
    }

    pub fn left_offset(&self) -> f32 {
        self.read(|s| s.offset.x)
    }

    pub fn top_offset(&self) -> f32 {
        self.read(|s| s.offset.y)
    }

    /// Pixel width of the current sub-image, unscaled. Zero without one.
    pub fn width(&self) -> f32 {
        self.frame_size().x
    }

    /// Pixel height of the current sub-image, unscaled. Zero without one.
    pub fn height(&self) -> f32 {
        self.frame_size().y
    }

    fn frame_size(&self) -> Vec2 {
        self.collection
            .borrow()
            .frame_size(&self.id)
            .unwrap_or(Vec2::ZERO)
    }

    /// Per-frame hook. Changes reach the GPU through the collection's own
    /// update, so there is nothing to flush here.
    pub fn update(&mut self, _dt: f32) {}

    /// Release the slot. Later calls do nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        match self.collection.try_borrow_mut() {
            Ok(mut collection) => {
                if let Err(e) = collection.release(&self.id) {
                    log::warn!("Releasing sprite `{}`: {e}", self.id);
                }
            }
            Err(_) => log::error!(
                "Sprite `{}` not released: collection is borrowed",
                self.id
            ),
        }
    }
}

impl Drop for SpriteInstanceController {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for SpriteInstanceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpriteInstanceController")
            .field("id", &self.id)
            .field("disposed", &self.disposed)
            .finish()
    }
}
