//! # Tile Manager — From Level Data to One Draw Call
//!
//! The manager owns a tile layer end to end: the atlas texture, the sprite
//! collection every tile is batched into, and one [`TileImageComponent`]
//! per placed tile.
//!
//! ```text
//!   Unloaded ──load_texture──► Loading ──ok──► Ready ──update──► Active
//!      ▲                          │                                 │
//!      └────────── failed ────────┘                                 │
//!                                                 dispose_resources ▼
//!                                                               Disposed
//! ```
//!
//! Tiles can only be created once the atlas and its sheet are in (`Ready`
//! or `Active`), because placement needs each sub-image's pixel size.
//!
//! ## Per Frame
//!
//! `update` ticks every component, then updates the collection exactly once,
//! so a thousand tiles cost one rebuild-and-upload pass, not a thousand.
//! `draw` issues the collection's single draw call.
//!
//! ## Failures
//!
//! Nothing here panics on bad data. Load failures and rejected tiles are
//! reported to the [`DiagnosticsSink`], announced on the notification bus
//! where relevant, and returned as errors the caller may ignore; the render
//! loop keeps running with whatever did load.

use std::rc::Rc;

use crate::asset::AssetSource;
use crate::config::TileLayerConfig;
use crate::diag::{DiagnosticsSink, LogSink, Severity};
use crate::error::{AssetError, TileError};
use crate::notify::{Notification, NotificationBus};
use crate::render::GpuDevice;
use crate::sprite::{
    SharedCollection, SpriteInstanceCollection, SpriteInstanceController, SpriteSheet, Texture,
};

use super::component::TileImageComponent;
use super::descriptor::TileDescriptor;

/// Lifecycle of a [`TileManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileManagerState {
    Unloaded,
    Loading,
    Ready,
    Active,
    Disposed,
}

/// Loads a tile sheet and keeps the layer's tiles batched in one collection.
pub struct TileManager {
    state: TileManagerState,
    config: TileLayerConfig,
    texture: Texture,
    sheet_url: Option<String>,
    collection: SharedCollection,
    tiles: Vec<TileImageComponent>,
    diagnostics: Rc<dyn DiagnosticsSink>,
    notifications: Option<Rc<NotificationBus>>,
    next_tile: u64,
}

impl TileManager {
    pub fn new(config: TileLayerConfig) -> Self {
        Self {
            state: TileManagerState::Unloaded,
            config,
            texture: Texture::new("tile atlas"),
            sheet_url: None,
            collection: SpriteInstanceCollection::shared(),
            tiles: Vec::new(),
            diagnostics: Rc::new(LogSink),
            notifications: None,
            next_tile: 0,
        }
    }

    /// Send reports to `sink` instead of the log.
    pub fn with_diagnostics(mut self, sink: Rc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    /// Post lifecycle notifications to `bus`.
    pub fn with_notifications(mut self, bus: Rc<NotificationBus>) -> Self {
        self.notifications = Some(bus);
        self
    }

    pub fn state(&self) -> TileManagerState {
        self.state
    }

    pub fn config(&self) -> &TileLayerConfig {
        &self.config
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// Base URL of the loaded sheet.
    pub fn sheet_url(&self) -> Option<&str> {
        self.sheet_url.as_deref()
    }

    pub fn collection(&self) -> &SharedCollection {
        &self.collection
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn tile_ids(&self) -> impl Iterator<Item = &str> {
        self.tiles.iter().map(TileImageComponent::id)
    }

    pub fn tile(&self, id: &str) -> Option<&TileImageComponent> {
        self.tiles.iter().find(|tile| tile.id() == id)
    }

    // ── Loading ──────────────────────────────────────────────────────────

    /// Fetch `<url>.png` and `<url>.json` (extensions from the config),
    /// upload the atlas and bind it to the collection.
    ///
    /// Live tiles are placed against the current sheet, so replacing it
    /// requires [`dispose`](Self::dispose) first; otherwise this fails with
    /// [`AssetError::TilesLive`] and the current atlas stays bound.
    pub async fn load_texture<S: AssetSource + ?Sized>(
        &mut self,
        source: &S,
        device: &mut dyn GpuDevice,
        url: &str,
    ) -> Result<(), AssetError> {
        if self.state == TileManagerState::Disposed {
            self.report(Severity::Error, &format!("cannot load '{url}': tile manager disposed"));
            return Err(AssetError::Disposed);
        }
        if !self.tiles.is_empty() {
            let (current, error) = (self.state, AssetError::TilesLive(self.tiles.len()));
            return Err(self.fail_load(url, current, error));
        }
        let previous = self.state;
        self.state = TileManagerState::Loading;
        log::info!("Loading tile sheet '{url}'");

        let image_url = self.config.image_url(url);
        let Some(image) = source.load_image(&image_url).await else {
            return Err(self.fail_load(url, previous, AssetError::MissingImage(image_url)));
        };

        let metadata_url = self.config.metadata_url(url);
        let Some(text) = source.load_file(&metadata_url).await else {
            return Err(self.fail_load(url, previous, AssetError::MissingSheet(metadata_url)));
        };
        let sheet = match SpriteSheet::from_json(&text) {
            Ok(sheet) => sheet,
            Err(source) => {
                let error = AssetError::MalformedSheet {
                    url: metadata_url,
                    source,
                };
                return Err(self.fail_load(url, previous, error));
            }
        };

        self.texture.upload(device, &image);
        self.collection.borrow_mut().initialize(&self.texture, sheet);
        self.sheet_url = Some(url.to_owned());
        self.state = TileManagerState::Ready;

        self.report(
            Severity::Info,
            &format!(
                "tile sheet '{url}' loaded ({}x{})",
                self.texture.width(),
                self.texture.height()
            ),
        );
        self.post(Notification::TileSheetLoaded {
            url: url.to_owned(),
        });
        Ok(())
    }

    fn fail_load(
        &mut self,
        url: &str,
        previous: TileManagerState,
        error: AssetError,
    ) -> AssetError {
        // A failed reload keeps the atlas that is already bound.
        self.state = if self.texture.is_loaded() {
            previous
        } else {
            TileManagerState::Unloaded
        };
        let reason = match std::error::Error::source(&error) {
            Some(cause) => format!("{error}: {cause}"),
            None => error.to_string(),
        };
        self.report(Severity::Error, &format!("tile sheet '{url}' failed: {reason}"));
        self.post(Notification::TileSheetFailed {
            url: url.to_owned(),
            reason,
        });
        error
    }

    // ── Tiles ────────────────────────────────────────────────────────────

    /// Place one tile. Returns its id.
    pub fn create_tile(&mut self, descriptor: &TileDescriptor) -> Result<String, TileError> {
        if !matches!(self.state, TileManagerState::Ready | TileManagerState::Active) {
            return Err(self.reject(&descriptor.image, TileError::NotReady(self.state)));
        }

        let id = match &descriptor.id {
            Some(id) => id.clone(),
            None => self.fresh_id(),
        };
        let sprite = match SpriteInstanceController::new(id.clone(), Rc::clone(&self.collection)) {
            Ok(sprite) => sprite,
            Err(e) => return Err(self.reject(&id, e.into())),
        };
        let mut tile = TileImageComponent::new(sprite);
        if let Err(e) = tile.initialize(descriptor, &self.config) {
            tile.dispose();
            return Err(self.reject(&id, e.into()));
        }

        self.tiles.push(tile);
        self.post(Notification::TileCreated { id: id.clone() });
        Ok(id)
    }

    /// Place every tile, skipping (and reporting) the ones that fail.
    /// Returns the ids created.
    pub fn create_tiles<'a>(
        &mut self,
        descriptors: impl IntoIterator<Item = &'a TileDescriptor>,
    ) -> Vec<String> {
        descriptors
            .into_iter()
            .filter_map(|descriptor| self.create_tile(descriptor).ok())
            .collect()
    }

    fn fresh_id(&mut self) -> String {
        loop {
            self.next_tile += 1;
            let id = format!("tile-{}", self.next_tile);
            if !self.collection.borrow().contains(&id) {
                return id;
            }
        }
    }

    fn reject(&self, what: &str, error: TileError) -> TileError {
        self.report(Severity::Error, &format!("tile `{what}` rejected: {error}"));
        error
    }

    // ── Per-frame work ───────────────────────────────────────────────────

    pub fn update(&mut self, device: &mut dyn GpuDevice, dt: f32) {
        if !matches!(self.state, TileManagerState::Ready | TileManagerState::Active) {
            return;
        }
        for tile in &mut self.tiles {
            tile.update(dt);
        }
        self.collection.borrow_mut().update(device, dt);
        self.state = TileManagerState::Active;
    }

    pub fn draw(&mut self, device: &mut dyn GpuDevice) {
        if self.state != TileManagerState::Active {
            return;
        }
        self.collection
            .borrow_mut()
            .draw(device, self.diagnostics.as_ref());
    }

    // ── Teardown ─────────────────────────────────────────────────────────

    /// Dispose every tile, freeing their slots. The atlas stays loaded, so
    /// a new set of tiles can be created right away.
    pub fn dispose(&mut self) {
        let tiles = std::mem::take(&mut self.tiles);
        let count = tiles.len();
        for mut tile in tiles {
            let id = tile.id().to_owned();
            tile.dispose();
            self.post(Notification::TileDisposed { id });
        }
        log::debug!("Disposed {count} tiles");
    }

    /// Release the collection's GPU buffers and the atlas texture. The
    /// manager cannot be used afterwards.
    pub fn dispose_resources(&mut self, device: &mut dyn GpuDevice) {
        if !self.tiles.is_empty() {
            self.dispose();
        }
        self.collection.borrow_mut().dispose(device);
        self.texture.dispose(device);
        self.state = TileManagerState::Disposed;
    }

    fn report(&self, severity: Severity, message: &str) {
        self.diagnostics.report(severity, message);
    }

    fn post(&self, notification: Notification) {
        if let Some(bus) = &self.notifications {
            bus.post(&notification);
        }
    }
}

impl Default for TileManager {
    fn default() -> Self {
        Self::new(TileLayerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::asset::{DecodedImage, MemoryAssetSource};
    use crate::diag::MemorySink;
    use crate::error::SpriteError;
    use crate::geometry::QuadVertex;
    use crate::math::{approx_eq, Rect, Vec2};
    use crate::notify::NotificationKind;
    use crate::render::HeadlessDevice;

    const SHEET: &str = r#"{
        "grass": { "minTex": { "x": 0.0, "y": 0.0 }, "maxTex": { "x": 0.5, "y": 0.5 } },
        "water": { "minTex": { "x": 0.5, "y": 0.0 }, "maxTex": { "x": 1.0, "y": 0.5 } }
    }"#;

    fn forest() -> MemoryAssetSource {
        let mut source = MemoryAssetSource::new();
        source
            .insert_image("forest.png", DecodedImage::solid(64, 64, [0, 128, 0, 255]))
            .insert_file("forest.json", SHEET);
        source
    }

    struct Harness {
        device: HeadlessDevice,
        sink: Rc<MemorySink>,
        bus: Rc<NotificationBus>,
        manager: TileManager,
    }

    impl Harness {
        fn new() -> Self {
            let sink = Rc::new(MemorySink::new());
            let bus = Rc::new(NotificationBus::new());
            let manager = TileManager::default()
                .with_diagnostics(sink.clone())
                .with_notifications(bus.clone());
            Self {
                device: HeadlessDevice::new(),
                sink,
                bus,
                manager,
            }
        }

        fn loaded() -> Self {
            let mut harness = Self::new();
            let source = forest();
            let load = harness
                .manager
                .load_texture(&source, &mut harness.device, "forest");
            pollster::block_on(load).unwrap();
            harness
        }

        fn record(&self, kind: NotificationKind) -> Rc<RefCell<Vec<Notification>>> {
            let seen = Rc::new(RefCell::new(Vec::new()));
            let out = seen.clone();
            self.bus
                .subscribe(kind, move |n| out.borrow_mut().push(n.clone()));
            seen
        }
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            self.manager.dispose_resources(&mut self.device);
        }
    }

    fn grass(x: f32, y: f32) -> TileDescriptor {
        TileDescriptor::new("grass", Vec2::new(x, y), Vec2::splat(32.0))
    }

    #[test]
    fn load_enters_ready_and_announces() {
        let mut h = Harness::new();
        let loaded = h.record(NotificationKind::TileSheetLoaded);
        assert_eq!(h.manager.state(), TileManagerState::Unloaded);

        pollster::block_on(h.manager.load_texture(&forest(), &mut h.device, "forest")).unwrap();

        assert_eq!(h.manager.state(), TileManagerState::Ready);
        assert_eq!(h.manager.sheet_url(), Some("forest"));
        assert_eq!(h.device.live_textures(), 1);
        assert_eq!(
            *loaded.borrow(),
            vec![Notification::TileSheetLoaded {
                url: "forest".into()
            }]
        );
        assert!(h.sink.contains(Severity::Info, "forest"));
    }

    #[test]
    fn grass_tile_end_to_end() {
        let mut h = Harness::loaded();
        let id = h.manager.create_tile(&grass(10.0, 20.0)).unwrap();
        h.manager.update(&mut h.device, 0.016);

        let collection = h.manager.collection().borrow();
        assert_eq!(collection.len(), 1);
        assert_eq!(
            collection.resolved_rect(&id),
            Some(Rect::new(Vec2::ZERO, Vec2::splat(0.5)))
        );
        let sprite = collection.instance(&id).unwrap();
        assert_eq!(sprite.position, Vec2::new(10.0, 20.0));
        assert_eq!(sprite.scale, Vec2::ONE);

        let vbo = collection.gpu_buffers().vertex_buffer().unwrap();
        let uploaded: Vec<QuadVertex> =
            bytemuck::pod_collect_to_vec(h.device.buffer_contents(vbo).unwrap());
        let quad = &uploaded[..4];
        assert!(approx_eq(quad[3].position(), Vec2::new(10.0, 20.0)));
        assert!(approx_eq(quad[2].position() - quad[0].position(), Vec2::splat(32.0)));
        assert_eq!(quad[0].depth(), 0.8);
    }

    #[test]
    fn thousand_tiles_one_update_pass_one_draw() {
        let mut h = Harness::loaded();
        let tiles: Vec<TileDescriptor> = (0..1000)
            .map(|i| grass((i % 40) as f32 * 32.0, (i / 40) as f32 * 32.0))
            .collect();
        assert_eq!(h.manager.create_tiles(&tiles).len(), 1000);

        h.manager.update(&mut h.device, 0.016);
        h.manager.draw(&mut h.device);

        let stats = h.manager.collection().borrow().stats();
        assert_eq!(stats.update_passes, 1);
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(h.device.stats().full_uploads, 2);
        assert_eq!(h.device.draws().len(), 1);
        assert_eq!(h.device.draws()[0].index_count, 6000);
        assert_eq!(h.device.stats().errors, 0);
        assert_eq!(h.manager.state(), TileManagerState::Active);
    }

    #[test]
    fn idle_frame_uploads_nothing() {
        let mut h = Harness::loaded();
        h.manager.create_tiles(&[grass(0.0, 0.0), grass(32.0, 0.0)]);
        h.manager.update(&mut h.device, 0.016);
        h.device.reset_stats();

        h.manager.update(&mut h.device, 0.016);
        assert_eq!(h.device.stats().uploads(), 0);
    }

    #[test]
    fn create_before_load_is_rejected() {
        let mut h = Harness::new();
        let result = h.manager.create_tile(&grass(0.0, 0.0));
        assert_eq!(result, Err(TileError::NotReady(TileManagerState::Unloaded)));
        assert_eq!(h.sink.count(Severity::Error), 1);
        assert_eq!(h.manager.tile_count(), 0);
    }

    #[test]
    fn missing_image_fails_and_stays_unloaded() {
        let mut h = Harness::new();
        let failed = h.record(NotificationKind::TileSheetFailed);
        let mut source = MemoryAssetSource::new();
        source.insert_file("forest.json", SHEET);

        let result = pollster::block_on(h.manager.load_texture(&source, &mut h.device, "forest"));

        assert!(matches!(result, Err(AssetError::MissingImage(url)) if url == "forest.png"));
        assert_eq!(h.manager.state(), TileManagerState::Unloaded);
        assert_eq!(failed.borrow().len(), 1);
        assert!(h.sink.contains(Severity::Error, "forest.png"));
        assert_eq!(h.device.live_textures(), 0);
    }

    #[test]
    fn missing_or_malformed_metadata_fails() {
        let mut h = Harness::new();
        let mut source = MemoryAssetSource::new();
        source.insert_image("forest.png", DecodedImage::solid(2, 2, [0; 4]));
        let result = pollster::block_on(h.manager.load_texture(&source, &mut h.device, "forest"));
        assert!(matches!(result, Err(AssetError::MissingSheet(_))));

        source.insert_file("forest.json", "{ not json");
        let result = pollster::block_on(h.manager.load_texture(&source, &mut h.device, "forest"));
        assert!(matches!(result, Err(AssetError::MalformedSheet { .. })));
        assert_eq!(h.manager.state(), TileManagerState::Unloaded);
        assert_eq!(h.sink.count(Severity::Error), 2);
    }

    #[test]
    fn failed_reload_keeps_current_atlas() {
        let mut h = Harness::loaded();
        let empty = MemoryAssetSource::new();
        let result = pollster::block_on(h.manager.load_texture(&empty, &mut h.device, "desert"));

        assert!(result.is_err());
        assert_eq!(h.manager.state(), TileManagerState::Ready);
        assert!(h.manager.create_tile(&grass(0.0, 0.0)).is_ok());
    }

    #[test]
    fn reload_with_live_tiles_is_rejected() {
        let mut h = Harness::loaded();
        let failed = h.record(NotificationKind::TileSheetFailed);
        let id = h.manager.create_tile(&grass(10.0, 20.0)).unwrap();
        h.manager.update(&mut h.device, 0.016);

        let mut desert = MemoryAssetSource::new();
        desert
            .insert_image("desert.png", DecodedImage::solid(32, 32, [200, 180, 90, 255]))
            .insert_file(
                "desert.json",
                r#"{ "sand": { "minTex": { "x": 0, "y": 0 }, "maxTex": { "x": 1, "y": 1 } } }"#,
            );
        let result = pollster::block_on(h.manager.load_texture(&desert, &mut h.device, "desert"));

        assert!(matches!(result, Err(AssetError::TilesLive(1))));
        assert_eq!(h.manager.state(), TileManagerState::Active);
        assert_eq!(h.manager.sheet_url(), Some("forest"));
        assert_eq!(failed.borrow().len(), 1);
        assert!(h.sink.contains(Severity::Error, "desert"));

        h.manager.update(&mut h.device, 0.016);
        let collection = h.manager.collection().borrow();
        let quad = collection.quad_vertices(&id).unwrap();
        assert!(approx_eq(quad[2].position() - quad[0].position(), Vec2::splat(32.0)));
        drop(collection);

        h.manager.dispose();
        pollster::block_on(h.manager.load_texture(&desert, &mut h.device, "desert")).unwrap();
        assert_eq!(h.manager.sheet_url(), Some("desert"));
        assert!(h.manager.create_tile(&grass(0.0, 0.0)).is_err());
        let sand = TileDescriptor::new("sand", Vec2::ZERO, Vec2::splat(32.0));
        assert!(h.manager.create_tile(&sand).is_ok());
    }

    #[test]
    fn generated_ids_are_unique() {
        let mut h = Harness::loaded();
        let explicit = h.manager.create_tile(&grass(0.0, 0.0).with_id("tile-1")).unwrap();
        let generated = h.manager.create_tile(&grass(0.0, 0.0)).unwrap();
        let another = h.manager.create_tile(&grass(0.0, 0.0)).unwrap();

        assert_eq!(explicit, "tile-1");
        assert_eq!(generated, "tile-2");
        assert_eq!(another, "tile-3");
        assert_eq!(
            h.manager.create_tile(&grass(0.0, 0.0).with_id("tile-2")),
            Err(TileError::Sprite(SpriteError::DuplicateInstance("tile-2".into())))
        );
        assert_eq!(h.manager.tile_ids().collect::<Vec<_>>(), vec!["tile-1", "tile-2", "tile-3"]);
    }

    #[test]
    fn unknown_image_leaves_no_slot_behind() {
        let mut h = Harness::loaded();
        let lava = TileDescriptor::new("lava", Vec2::ZERO, Vec2::splat(32.0));

        assert_eq!(
            h.manager.create_tile(&lava),
            Err(TileError::Sprite(SpriteError::UnknownSubImage("lava".into())))
        );
        assert_eq!(h.manager.tile_count(), 0);
        assert!(h.manager.collection().borrow().is_empty());
        assert!(h.sink.contains(Severity::Error, "lava"));

        let created = h.manager.create_tiles(&[grass(0.0, 0.0), lava, grass(32.0, 0.0)]);
        assert_eq!(created.len(), 2);
    }

    #[test]
    fn dispose_then_recreate_reuses_slots() {
        let mut h = Harness::loaded();
        let disposed = h.record(NotificationKind::TileDisposed);
        let level: Vec<TileDescriptor> = (0..3).map(|i| grass(i as f32 * 32.0, 0.0)).collect();

        h.manager.create_tiles(&level);
        h.manager.update(&mut h.device, 0.016);
        h.manager.dispose();
        assert_eq!(disposed.borrow().len(), 3);
        assert!(h.manager.collection().borrow().is_empty());

        h.manager.create_tiles(&level);
        h.manager.update(&mut h.device, 0.016);
        let collection = h.manager.collection().borrow();
        assert_eq!(collection.len(), 3);
        assert_eq!(collection.slot_count(), 3);
        assert_eq!(collection.stats().reallocations, 1);
    }

    #[test]
    fn dispose_resources_releases_gpu_objects() {
        let mut h = Harness::loaded();
        h.manager.create_tiles(&[grass(0.0, 0.0)]);
        h.manager.update(&mut h.device, 0.016);
        assert_eq!(h.device.live_buffers(), 2);

        h.manager.dispose_resources(&mut h.device);
        h.manager.dispose_resources(&mut h.device);

        assert_eq!(h.manager.state(), TileManagerState::Disposed);
        assert_eq!(h.device.live_buffers(), 0);
        assert_eq!(h.device.live_vertex_arrays(), 0);
        assert_eq!(h.device.live_textures(), 0);
        assert_eq!(h.device.stats().errors, 0);

        let reload = pollster::block_on(h.manager.load_texture(&forest(), &mut h.device, "forest"));
        assert!(matches!(reload, Err(AssetError::Disposed)));
    }

    #[test]
    fn update_and_draw_before_load_do_nothing() {
        let mut h = Harness::new();
        h.manager.update(&mut h.device, 0.016);
        h.manager.draw(&mut h.device);
        assert_eq!(h.manager.collection().borrow().stats().update_passes, 0);
        assert_eq!(h.device.stats().draw_calls, 0);
        assert!(h.sink.entries().is_empty());
    }
}
