//! Sprite batching: atlas, sheet metadata, the instance collection and the
//! per-sprite controllers that drive it.
//!
//! ```text
//!   Texture + SpriteSheet ──initialize──► SpriteInstanceCollection
//!                                             ▲   (Rc<RefCell<_>>)
//!         SpriteInstanceController ───────────┤
//!         SpriteInstanceController ───────────┘
//! ```

pub mod collection;
pub mod controller;
pub mod sheet;
pub mod texture;

pub use collection::{
    RenderStats, SharedCollection, SpriteInstance, SpriteInstanceCollection, MAX_INSTANCES,
};
pub use controller::SpriteInstanceController;
pub use sheet::SpriteSheet;
pub use texture::Texture;
