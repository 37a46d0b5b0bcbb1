//! Tile layers: level data in, one batched sprite collection out.
//!
//! A [`TileManager`] loads an atlas and its sheet, then turns each
//! [`TileDescriptor`] into a [`TileImageComponent`] backed by a sprite
//! controller in the manager's shared collection.

pub mod component;
pub mod descriptor;
pub mod manager;

pub use component::TileImageComponent;
pub use descriptor::TileDescriptor;
pub use manager::{TileManager, TileManagerState};
