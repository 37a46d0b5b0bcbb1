//! Error types for asset loading, sprite bookkeeping, and tile creation.

use thiserror::Error;

use crate::tile::TileManagerState;

/// A tile sheet could not be brought in.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("image `{0}` could not be loaded")]
    MissingImage(String),

    #[error("sprite sheet `{0}` could not be loaded")]
    MissingSheet(String),

    #[error("sprite sheet `{url}` is malformed")]
    MalformedSheet {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("current sheet is still used by {0} tile(s); dispose them before loading another")]
    TilesLive(usize),

    #[error("tile manager has been disposed")]
    Disposed,
}

/// Sprite-collection bookkeeping failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteError {
    #[error("sprite collection has no atlas yet")]
    NotInitialized,

    #[error("no sprite instance with id `{0}`")]
    UnknownInstance(String),

    #[error("sprite instance id `{0}` is already registered")]
    DuplicateInstance(String),

    #[error("sprite sheet has no sub-image named `{0}`")]
    UnknownSubImage(String),

    #[error("sprite collection is full ({0} instances)")]
    CapacityExceeded(usize),
}

/// Tile creation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileError {
    #[error("tile manager is not ready (state: {0:?})")]
    NotReady(TileManagerState),

    #[error(transparent)]
    Sprite(#[from] SpriteError),
}
