//! # Mosaik — Batched Sprite Tiles
//!
//! Draws large numbers of tiles from one texture atlas with a single draw
//! call per layer. Tiles are described by level data, resolved against a
//! sprite-sheet JSON, and packed into one vertex buffer that is only
//! re-uploaded where something changed.
//!
//! ```text
//!   AssetSource ──► TileManager ──► SpriteInstanceCollection ──► GpuDevice
//!   (png + json)     │  tiles          dirty runs → sub-uploads    headless
//!                    └─ TileImageComponent → SpriteInstanceController  or wgpu
//! ```
//!
//! Start with `use mosaik::prelude::*`.

pub mod asset;
pub mod config;
pub mod diag;
pub mod error;
pub mod geometry;
pub mod math;
pub mod notify;
pub mod prelude;
pub mod render;
pub mod sprite;
pub mod tile;
