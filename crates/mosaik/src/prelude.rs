//! Common imports for building a tile layer.

pub use crate::asset::{AssetSource, DecodedImage, FileAssetSource, MemoryAssetSource};
pub use crate::config::TileLayerConfig;
pub use crate::diag::{init_logging, DiagnosticsSink, LogSink, LoggingConfig, MemorySink, Severity};
pub use crate::error::{AssetError, SpriteError, TileError};
pub use crate::math::{Rect, Vec2, Vec3};
pub use crate::notify::{Notification, NotificationBus, NotificationKind};
pub use crate::render::{GpuDevice, HeadlessDevice};
#[cfg(feature = "wgpu")]
pub use crate::render::WgpuDevice;
pub use crate::sprite::{SpriteInstanceCollection, SpriteInstanceController, SpriteSheet, Texture};
pub use crate::tile::{TileDescriptor, TileImageComponent, TileManager, TileManagerState};
