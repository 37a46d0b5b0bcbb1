//! # Sprite Instance Collection — Many Sprites, One Buffer Pair
//!
//! A level can hold thousands of tiles, all cut from the same atlas. Drawing
//! each as its own quad buffer would cost thousands of buffer binds and draw
//! calls per frame. The collection instead packs every sprite into *one*
//! vertex buffer and *one* index buffer and draws them with a single call.
//!
//! ## Slots
//!
//! ```text
//!   slots:   [ grass-1 ][ water-2 ][  free   ][ grass-4 ]
//!   dirty:   [    .    ][    x    ][    x    ][    .    ]
//!   free:    { 2 }            (min-heap, lowest slot reused first)
//!   lookup:  "grass-1" → 0, "water-2" → 1, "grass-4" → 3
//!
//!   vertex buffer: 4 vertices per slot, slot i at bytes [i*80, i*80 + 80)
//!   index buffer:  6 indices per slot, pattern 0 1 3 1 2 3 offset by 4i
//! ```
//!
//! Registering an id takes the lowest free slot before growing the slot
//! table, so churn (tiles created and disposed every level) never grows the
//! buffers past the peak live count. A released slot is zeroed: its four
//! corners collapse to the origin and the GPU rasterizes nothing.
//!
//! ## Dirty Tracking
//!
//! Mutators only record intent: they update the CPU-side instance and set
//! the slot's dirty flag. [`update`](SpriteInstanceCollection::update), run
//! once per frame, rebuilds the vertices of dirty slots and uploads them:
//!
//! - when the slot table outgrew the GPU buffers (or nothing is allocated
//!   yet), capacity doubles to the next power of two and both buffers are
//!   re-uploaded in full;
//! - otherwise each contiguous run of dirty slots becomes one `buffer_sub_data`
//!   call.
//!
//! A frame where nothing changed uploads nothing.
//!
//! ## Vertex Placement
//!
//! Transforms are applied on the CPU (the shader only does view-projection):
//!
//! ```text
//!   frame_px    = (max_tex - min_tex) * atlas_size
//!   half_extent = frame_px * scale / 2
//!   corner_i    = position + (QUAD_CORNERS[i] + offset) * half_extent
//!   z           = depth
//! ```
//!
//! Offsets are in half-extent units: `(1, -1)` moves the quad right and down
//! by half its size, so its top-left corner lands on `position`.
//!
//! ## Comparison
//!
//! - **Immediate batching** (collect every sprite each frame, upload all):
//!   simpler, but pays the full upload every frame even for a static level.
//! - **GPU instancing**: one unit quad plus a per-instance buffer. Fewer
//!   bytes per sprite, but needs a shader that reads instance attributes;
//!   the fixed position+UV layout here keeps the shader trivial.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::rc::Rc;

use bytemuck::Zeroable;

use crate::diag::{DiagnosticsSink, Severity};
use crate::error::SpriteError;
use crate::geometry::{
    describe_quad_layout, placed_quad, quad_indices, GpuBuffers, GrowableStorage, QuadVertex,
    INDICES_PER_QUAD, VERTICES_PER_QUAD,
};
use crate::math::{Rect, Vec2};
use crate::render::{BufferTarget, BufferUsage, GpuDevice, TextureId};

use super::sheet::SpriteSheet;
use super::texture::Texture;

/// u16 indices address at most 65,536 vertices.
pub const MAX_INSTANCES: usize = (u16::MAX as usize + 1) / VERTICES_PER_QUAD;

const MIN_SLOT_CAPACITY: usize = 16;

const QUAD_BYTES: u64 = QuadVertex::STRIDE as u64 * VERTICES_PER_QUAD as u64;

/// Shared handle controllers hold on their collection.
pub type SharedCollection = Rc<RefCell<SpriteInstanceCollection>>;

/// Per-sprite state stored in a slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteInstance {
    pub id: String,
    /// Sub-image name in the atlas' sprite sheet.
    pub image: Option<String>,
    pub position: Vec2,
    pub scale: Vec2,
    pub depth: f32,
    /// `(left, top)` offset in half-extent units.
    pub offset: Vec2,
}

impl SpriteInstance {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            image: None,
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            depth: 0.0,
            offset: Vec2::ZERO,
        }
    }
}

/// Counters for the upload and draw work a collection has issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub update_passes: u64,
    /// `buffer_data` plus `buffer_sub_data` calls.
    pub uploads: u64,
    pub bytes_uploaded: u64,
    pub draw_calls: u64,
    /// Full re-uploads caused by capacity growth.
    pub reallocations: u64,
}

#[derive(Debug)]
struct Atlas {
    texture: Option<TextureId>,
    size: Vec2,
    sheet: SpriteSheet,
}

/// Batches every sprite cut from one atlas into a single buffer pair.
#[derive(Debug, Default)]
pub struct SpriteInstanceCollection {
    atlas: Option<Atlas>,
    slots: Vec<Option<SpriteInstance>>,
    lookup: HashMap<String, usize>,
    free: BinaryHeap<Reverse<usize>>,
    dirty: Vec<bool>,
    dirty_count: usize,
    vertices: GrowableStorage<QuadVertex>,
    indices: GrowableStorage<u16>,
    buffers: GpuBuffers,
    /// Slot capacity of the current GPU buffers.
    gpu_slots: usize,
    stats: RenderStats,
}

impl SpriteInstanceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedCollection {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Bind the atlas and its sheet. Every live slot is re-resolved on the
    /// next update.
    pub fn initialize(&mut self, texture: &Texture, sheet: SpriteSheet) {
        if !texture.is_loaded() {
            log::warn!(
                "Sprite collection initialized with texture `{}` that has no GPU data",
                texture.label()
            );
        }
        log::debug!(
            "Sprite collection bound to `{}` ({}x{}, {} frames)",
            texture.label(),
            texture.width(),
            texture.height(),
            sheet.len()
        );
        self.atlas = Some(Atlas {
            texture: texture.id(),
            size: texture.size(),
            sheet,
        });
        self.mark_all_dirty();
    }

    pub fn is_initialized(&self) -> bool {
        self.atlas.is_some()
    }

    pub fn sheet(&self) -> Option<&SpriteSheet> {
        self.atlas.as_ref().map(|a| &a.sheet)
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.atlas.as_ref().and_then(|a| a.texture)
    }

    // ── Registration ─────────────────────────────────────────────────────

    /// Allocate a slot for `id`. Returns the slot index.
    pub fn register(&mut self, id: &str) -> Result<usize, SpriteError> {
        if self.atlas.is_none() {
            return Err(SpriteError::NotInitialized);
        }
        if self.lookup.contains_key(id) {
            return Err(SpriteError::DuplicateInstance(id.to_owned()));
        }

        let slot = match self.free.pop() {
            Some(Reverse(slot)) => slot,
            None => {
                if self.slots.len() >= MAX_INSTANCES {
                    return Err(SpriteError::CapacityExceeded(MAX_INSTANCES));
                }
                self.slots.push(None);
                self.dirty.push(false);
                self.slots.len() - 1
            }
        };

        self.slots[slot] = Some(SpriteInstance::new(id));
        self.lookup.insert(id.to_owned(), slot);
        self.mark_dirty(slot);
        Ok(slot)
    }

    /// Free `id`'s slot. Its quad is cleared on the next update.
    pub fn release(&mut self, id: &str) -> Result<(), SpriteError> {
        let slot = self
            .lookup
            .remove(id)
            .ok_or_else(|| SpriteError::UnknownInstance(id.to_owned()))?;
        self.slots[slot] = None;
        self.free.push(Reverse(slot));
        self.mark_dirty(slot);
        Ok(())
    }

    // ── Mutation ─────────────────────────────────────────────────────────

    /// Show sub-image `image`. Fails without touching the slot if the sheet
    /// has no such name.
    pub fn set_image(&mut self, id: &str, image: &str) -> Result<(), SpriteError> {
        self.slot_of(id)?;
        let atlas = self.atlas.as_ref().ok_or(SpriteError::NotInitialized)?;
        if !atlas.sheet.contains(image) {
            return Err(SpriteError::UnknownSubImage(image.to_owned()));
        }
        self.modify(id, |sprite| sprite.image = Some(image.to_owned()))
    }

    pub fn set_position(&mut self, id: &str, position: Vec2) -> Result<(), SpriteError> {
        self.modify(id, |sprite| sprite.position = position)
    }

    pub fn set_left(&mut self, id: &str, left: f32) -> Result<(), SpriteError> {
        self.modify(id, |sprite| sprite.position.x = left)
    }

    pub fn set_top(&mut self, id: &str, top: f32) -> Result<(), SpriteError> {
        self.modify(id, |sprite| sprite.position.y = top)
    }

    pub fn set_scale(&mut self, id: &str, scale: Vec2) -> Result<(), SpriteError> {
        self.modify(id, |sprite| sprite.scale = scale)
    }

    pub fn set_x_scale(&mut self, id: &str, x_scale: f32) -> Result<(), SpriteError> {
        self.modify(id, |sprite| sprite.scale.x = x_scale)
    }

    pub fn set_y_scale(&mut self, id: &str, y_scale: f32) -> Result<(), SpriteError> {
        self.modify(id, |sprite| sprite.scale.y = y_scale)
    }

    pub fn set_depth(&mut self, id: &str, depth: f32) -> Result<(), SpriteError> {
        self.modify(id, |sprite| sprite.depth = depth)
    }

    pub fn set_left_offset(&mut self, id: &str, offset: f32) -> Result<(), SpriteError> {
        self.modify(id, |sprite| sprite.offset.x = offset)
    }

    pub fn set_top_offset(&mut self, id: &str, offset: f32) -> Result<(), SpriteError> {
        self.modify(id, |sprite| sprite.offset.y = offset)
    }

    fn slot_of(&self, id: &str) -> Result<usize, SpriteError> {
        self.lookup
            .get(id)
            .copied()
            .ok_or_else(|| SpriteError::UnknownInstance(id.to_owned()))
    }

    fn modify(
        &mut self,
        id: &str,
        apply: impl FnOnce(&mut SpriteInstance),
    ) -> Result<(), SpriteError> {
        let slot = self.slot_of(id)?;
        if let Some(sprite) = self.slots[slot].as_mut() {
            apply(sprite);
        }
        self.mark_dirty(slot);
        Ok(())
    }

    fn mark_dirty(&mut self, slot: usize) {
        if !self.dirty[slot] {
            self.dirty[slot] = true;
            self.dirty_count += 1;
        }
    }

    fn mark_all_dirty(&mut self) {
        self.dirty.fill(true);
        self.dirty_count = self.dirty.len();
    }

    // ── Per-frame work ───────────────────────────────────────────────────

    /// Rebuild dirty slots and push them to the GPU.
    pub fn update(&mut self, device: &mut dyn GpuDevice, _dt: f32) {
        self.stats.update_passes += 1;

        let slot_count = self.slots.len();
        if slot_count == 0 {
            return;
        }
        let grow = !self.buffers.is_allocated() || slot_count > self.gpu_slots;
        if !grow && self.dirty_count == 0 {
            return;
        }

        if grow {
            let capacity = slot_count
                .next_power_of_two()
                .clamp(MIN_SLOT_CAPACITY, MAX_INSTANCES);
            self.vertices.set_len(capacity * VERTICES_PER_QUAD);
            self.indices.set_len(capacity * INDICES_PER_QUAD);
            for (quad, chunk) in self
                .indices
                .as_mut_slice()
                .chunks_exact_mut(INDICES_PER_QUAD)
                .enumerate()
            {
                chunk.copy_from_slice(&quad_indices((quad * VERTICES_PER_QUAD) as u16));
            }
            self.gpu_slots = capacity;
        }

        self.rebuild_dirty();

        if grow {
            self.upload_all(device);
        } else {
            self.upload_dirty_runs(device);
        }

        self.dirty.fill(false);
        self.dirty_count = 0;
    }

    fn rebuild_dirty(&mut self) {
        let atlas = self.atlas.as_ref();
        let vertices = self.vertices.as_mut_slice();
        for (slot, _) in self.dirty.iter().enumerate().filter(|(_, dirty)| **dirty) {
            let quad = build_quad(atlas, self.slots[slot].as_ref());
            let start = slot * VERTICES_PER_QUAD;
            vertices[start..start + VERTICES_PER_QUAD].copy_from_slice(&quad);
        }
    }

    fn upload_all(&mut self, device: &mut dyn GpuDevice) {
        if !self.buffers.is_allocated() {
            self.buffers = GpuBuffers::allocate(device);
        }
        let GpuBuffers::Allocated {
            vertex_array,
            vertex_buffer,
            index_buffer,
        } = self.buffers
        else {
            return;
        };

        let vertex_bytes: &[u8] = bytemuck::cast_slice(self.vertices.as_slice());
        let index_bytes: &[u8] = bytemuck::cast_slice(self.indices.as_slice());

        device.bind_vertex_array(Some(vertex_array));
        device.bind_buffer(BufferTarget::Vertex, Some(vertex_buffer));
        device.buffer_data(BufferTarget::Vertex, vertex_bytes, BufferUsage::Dynamic);
        describe_quad_layout(device);
        device.bind_buffer(BufferTarget::Index, Some(index_buffer));
        device.buffer_data(BufferTarget::Index, index_bytes, BufferUsage::Static);
        device.bind_vertex_array(None);

        self.stats.uploads += 2;
        self.stats.bytes_uploaded += (vertex_bytes.len() + index_bytes.len()) as u64;
        self.stats.reallocations += 1;
        log::debug!(
            "Sprite collection reallocated for {} slots ({} live)",
            self.gpu_slots,
            self.lookup.len()
        );
    }

    fn upload_dirty_runs(&mut self, device: &mut dyn GpuDevice) {
        let Some(vertex_buffer) = self.buffers.vertex_buffer() else {
            return;
        };
        device.bind_buffer(BufferTarget::Vertex, Some(vertex_buffer));

        let vertices = self.vertices.as_slice();
        let mut slot = 0;
        while slot < self.slots.len() {
            if !self.dirty[slot] {
                slot += 1;
                continue;
            }
            let start = slot;
            while slot < self.slots.len() && self.dirty[slot] {
                slot += 1;
            }
            let bytes: &[u8] = bytemuck::cast_slice(
                &vertices[start * VERTICES_PER_QUAD..slot * VERTICES_PER_QUAD],
            );
            device.buffer_sub_data(BufferTarget::Vertex, start as u64 * QUAD_BYTES, bytes);
            self.stats.uploads += 1;
            self.stats.bytes_uploaded += bytes.len() as u64;
        }
    }

    /// One indexed draw covering every uploaded slot, in slot order.
    pub fn draw(&mut self, device: &mut dyn GpuDevice, diag: &dyn DiagnosticsSink) {
        if self.slots.is_empty() {
            return;
        }
        let Some(vertex_array) = self.buffers.vertex_array() else {
            diag.report(
                Severity::Error,
                "sprite collection drawn before its first update",
            );
            return;
        };

        let quads = self.slots.len().min(self.gpu_slots);
        device.bind_texture(self.texture());
        device.bind_vertex_array(Some(vertex_array));
        device.draw_indexed((quads * INDICES_PER_QUAD) as u32, 0);
        device.bind_vertex_array(None);
        self.stats.draw_calls += 1;
    }

    /// Release the GPU buffers. Instances survive and are re-uploaded by
    /// the next update.
    pub fn dispose(&mut self, device: &mut dyn GpuDevice) {
        self.buffers.release(device);
        self.gpu_slots = 0;
        self.vertices.reset();
        self.indices.reset();
        self.mark_all_dirty();
    }

    // ── Inspection ───────────────────────────────────────────────────────

    /// Live instances.
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Slots ever allocated, live or free.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty_count
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lookup.contains_key(id)
    }

    pub fn slot(&self, id: &str) -> Option<usize> {
        self.lookup.get(id).copied()
    }

    pub fn instance(&self, id: &str) -> Option<&SpriteInstance> {
        self.slot(id).and_then(|slot| self.slots[slot].as_ref())
    }

    /// Ids of live instances in slot order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().flatten().map(|sprite| sprite.id.as_str())
    }

    /// Atlas rect of the instance's current image.
    pub fn resolved_rect(&self, id: &str) -> Option<Rect> {
        let atlas = self.atlas.as_ref()?;
        let image = self.instance(id)?.image.as_deref()?;
        atlas.sheet.get(image)
    }

    /// Pixel size of the instance's current image, before scaling.
    pub fn frame_size(&self, id: &str) -> Option<Vec2> {
        let atlas = self.atlas.as_ref()?;
        Some(self.resolved_rect(id)?.pixel_size(atlas.size))
    }

    /// World-space corners the instance would upload right now.
    pub fn quad_vertices(&self, id: &str) -> Option<[QuadVertex; VERTICES_PER_QUAD]> {
        let sprite = self.instance(id)?;
        Some(build_quad(self.atlas.as_ref(), Some(sprite)))
    }

    pub fn gpu_buffers(&self) -> GpuBuffers {
        self.buffers
    }

    /// Slot capacity of the GPU buffers (zero when unallocated).
    pub fn gpu_capacity(&self) -> usize {
        self.gpu_slots
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }
}

impl Drop for SpriteInstanceCollection {
    fn drop(&mut self) {
        if self.buffers.is_allocated() {
            log::warn!(
                "SpriteInstanceCollection dropped with GPU buffers allocated; call dispose first"
            );
        }
    }
}

/// Corners for one slot. Empty slots and instances without an image
/// collapse to a zeroed quad.
fn build_quad(
    atlas: Option<&Atlas>,
    sprite: Option<&SpriteInstance>,
) -> [QuadVertex; VERTICES_PER_QUAD] {
    let empty = [QuadVertex::zeroed(); VERTICES_PER_QUAD];
    let (Some(atlas), Some(sprite)) = (atlas, sprite) else {
        return empty;
    };
    let Some(rect) = sprite.image.as_deref().and_then(|name| atlas.sheet.get(name)) else {
        return empty;
    };
    let half_extent = rect.pixel_size(atlas.size) * sprite.scale * 0.5;
    placed_quad(rect, sprite.position, half_extent, sprite.offset, sprite.depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::DecodedImage;
    use crate::diag::MemorySink;
    use crate::math::approx_eq;
    use crate::render::HeadlessDevice;

    fn sheet() -> SpriteSheet {
        SpriteSheet::from_frames([
            ("grass", Rect::new(Vec2::ZERO, Vec2::splat(0.5))),
            ("water", Rect::new(Vec2::new(0.5, 0.0), Vec2::new(1.0, 0.5))),
        ])
    }

    fn setup() -> (HeadlessDevice, Texture, SpriteInstanceCollection) {
        let mut device = HeadlessDevice::new();
        let mut texture = Texture::new("atlas");
        texture.upload(&mut device, &DecodedImage::solid(64, 64, [255; 4]));
        let mut collection = SpriteInstanceCollection::new();
        collection.initialize(&texture, sheet());
        (device, texture, collection)
    }

    fn uploaded(
        device: &HeadlessDevice,
        collection: &SpriteInstanceCollection,
        slot: usize,
    ) -> Vec<QuadVertex> {
        let vbo = collection.gpu_buffers().vertex_buffer().unwrap();
        let all: Vec<QuadVertex> =
            bytemuck::pod_collect_to_vec(device.buffer_contents(vbo).unwrap());
        all[slot * 4..slot * 4 + 4].to_vec()
    }

    #[test]
    fn register_requires_atlas() {
        let mut collection = SpriteInstanceCollection::new();
        assert_eq!(collection.register("a"), Err(SpriteError::NotInitialized));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let (mut device, _texture, mut collection) = setup();
        collection.register("a").unwrap();
        assert_eq!(
            collection.register("a"),
            Err(SpriteError::DuplicateInstance("a".into()))
        );
        assert_eq!(collection.len(), 1);
        collection.dispose(&mut device);
    }

    #[test]
    fn unknown_image_leaves_slot_unchanged() {
        let (_device, _texture, mut collection) = setup();
        collection.register("a").unwrap();
        collection.set_image("a", "grass").unwrap();

        assert_eq!(
            collection.set_image("a", "lava"),
            Err(SpriteError::UnknownSubImage("lava".into()))
        );
        assert_eq!(collection.instance("a").unwrap().image.as_deref(), Some("grass"));
    }

    #[test]
    fn mutating_unknown_instance_fails() {
        let (_device, _texture, mut collection) = setup();
        assert_eq!(
            collection.set_left("ghost", 1.0),
            Err(SpriteError::UnknownInstance("ghost".into()))
        );
        assert_eq!(
            collection.release("ghost"),
            Err(SpriteError::UnknownInstance("ghost".into()))
        );
    }

    #[test]
    fn freed_slots_are_reused_lowest_first() {
        let (_device, _texture, mut collection) = setup();
        for id in ["a", "b", "c"] {
            collection.register(id).unwrap();
        }
        collection.release("c").unwrap();
        collection.release("a").unwrap();

        assert_eq!(collection.register("d"), Ok(0));
        assert_eq!(collection.register("e"), Ok(2));
        assert_eq!(collection.slot_count(), 3);
        assert_eq!(collection.ids().collect::<Vec<_>>(), vec!["d", "b", "e"]);
    }

    #[test]
    fn churn_keeps_slot_count_bounded() {
        let (mut device, _texture, mut collection) = setup();
        for round in 0..100 {
            let id = format!("tile-{round}");
            collection.register(&id).unwrap();
            collection.update(&mut device, 0.016);
            collection.release(&id).unwrap();
        }
        assert_eq!(collection.slot_count(), 1);
        assert_eq!(collection.stats().reallocations, 1);
        collection.dispose(&mut device);
    }

    #[test]
    fn placement_uses_frame_size_scale_and_offset() {
        let (mut device, _texture, mut collection) = setup();
        collection.register("t").unwrap();
        collection.set_image("t", "grass").unwrap();
        collection.set_position("t", Vec2::new(10.0, 20.0)).unwrap();
        collection.set_left_offset("t", 1.0).unwrap();
        collection.set_top_offset("t", -1.0).unwrap();
        collection.set_depth("t", 0.8).unwrap();
        collection.update(&mut device, 0.016);

        let quad = uploaded(&device, &collection, 0);
        assert!(approx_eq(quad[3].position(), Vec2::new(10.0, 20.0)));
        assert!(approx_eq(quad[1].position(), Vec2::new(42.0, -12.0)));
        assert_eq!(quad[0].uv, [0.0, 0.5]);
        assert_eq!(quad[2].uv, [0.5, 0.0]);
        assert!(quad.iter().all(|v| v.depth() == 0.8));
        assert_eq!(Some(quad.as_slice()), collection.quad_vertices("t").as_ref().map(|q| &q[..]));
        collection.dispose(&mut device);
    }

    #[test]
    fn scale_multiplies_frame_size() {
        let (_device, _texture, mut collection) = setup();
        collection.register("t").unwrap();
        collection.set_image("t", "water").unwrap();
        collection.set_scale("t", Vec2::new(2.0, 0.5)).unwrap();

        assert_eq!(collection.frame_size("t"), Some(Vec2::new(32.0, 32.0)));
        let quad = collection.quad_vertices("t").unwrap();
        let extent = quad[2].position() - quad[0].position();
        assert!(approx_eq(extent, Vec2::new(64.0, 16.0)));
    }

    #[test]
    fn instance_without_image_is_an_empty_quad() {
        let (_device, _texture, mut collection) = setup();
        collection.register("t").unwrap();
        collection.set_left("t", 100.0).unwrap();
        let quad = collection.quad_vertices("t").unwrap();
        assert!(quad.iter().all(|v| *v == QuadVertex::zeroed()));
    }

    #[test]
    fn unchanged_frame_uploads_nothing() {
        let (mut device, _texture, mut collection) = setup();
        for i in 0..50 {
            let id = format!("t{i}");
            collection.register(&id).unwrap();
            collection.set_image(&id, "grass").unwrap();
        }
        collection.update(&mut device, 0.016);
        assert_eq!(device.stats().full_uploads, 2);

        device.reset_stats();
        collection.update(&mut device, 0.016);
        assert_eq!(device.stats().uploads(), 0);
        assert_eq!(collection.stats().update_passes, 2);
        collection.dispose(&mut device);
    }

    #[test]
    fn contiguous_dirty_slots_upload_as_runs() {
        let (mut device, _texture, mut collection) = setup();
        for id in ["a", "b", "c", "d"] {
            collection.register(id).unwrap();
            collection.set_image(id, "grass").unwrap();
        }
        collection.update(&mut device, 0.016);
        device.reset_stats();

        collection.set_left("a", 5.0).unwrap();
        collection.set_left("b", 5.0).unwrap();
        collection.set_left("d", 5.0).unwrap();
        assert_eq!(collection.dirty_count(), 3);
        collection.update(&mut device, 0.016);

        assert_eq!(device.stats().sub_uploads, 2);
        assert_eq!(device.stats().full_uploads, 0);
        assert_eq!(device.stats().bytes_uploaded, 3 * QUAD_BYTES);
        assert_eq!(collection.dirty_count(), 0);
        collection.dispose(&mut device);
    }

    #[test]
    fn released_slot_is_cleared_on_gpu() {
        let (mut device, _texture, mut collection) = setup();
        collection.register("a").unwrap();
        collection.set_image("a", "grass").unwrap();
        collection.update(&mut device, 0.016);
        assert_ne!(uploaded(&device, &collection, 0)[2], QuadVertex::zeroed());

        collection.release("a").unwrap();
        collection.update(&mut device, 0.016);
        assert!(uploaded(&device, &collection, 0).iter().all(|v| *v == QuadVertex::zeroed()));
        collection.dispose(&mut device);
    }

    #[test]
    fn growth_past_capacity_reallocates() {
        let (mut device, _texture, mut collection) = setup();
        for i in 0..MIN_SLOT_CAPACITY {
            collection.register(&format!("t{i}")).unwrap();
        }
        collection.update(&mut device, 0.016);
        assert_eq!(collection.gpu_capacity(), MIN_SLOT_CAPACITY);

        collection.register("one-more").unwrap();
        collection.update(&mut device, 0.016);
        assert_eq!(collection.gpu_capacity(), MIN_SLOT_CAPACITY * 2);
        assert_eq!(collection.stats().reallocations, 2);
        assert_eq!(device.live_buffers(), 2, "buffers are reused, not recreated");
        collection.dispose(&mut device);
    }

    #[test]
    fn draw_is_one_call_with_atlas_bound() {
        let (mut device, texture, mut collection) = setup();
        let sink = MemorySink::new();
        for id in ["a", "b", "c"] {
            collection.register(id).unwrap();
        }
        collection.update(&mut device, 0.016);
        collection.draw(&mut device, &sink);

        assert_eq!(device.draws().len(), 1);
        assert_eq!(device.draws()[0].texture, texture.id());
        assert_eq!(device.draws()[0].index_count, 18);
        assert_eq!(collection.stats().draw_calls, 1);
        assert_eq!(device.stats().errors, 0);
        assert!(sink.entries().is_empty());
        collection.dispose(&mut device);
    }

    #[test]
    fn draw_before_update_reports() {
        let (mut device, _texture, mut collection) = setup();
        let sink = MemorySink::new();
        collection.register("a").unwrap();
        collection.draw(&mut device, &sink);

        assert_eq!(sink.count(Severity::Error), 1);
        assert_eq!(device.stats().draw_calls, 0);
    }

    #[test]
    fn dispose_then_update_reuploads_everything() {
        let (mut device, _texture, mut collection) = setup();
        collection.register("a").unwrap();
        collection.set_image("a", "water").unwrap();
        collection.update(&mut device, 0.016);

        collection.dispose(&mut device);
        collection.dispose(&mut device);
        assert_eq!(device.live_buffers(), 0);
        assert!(!collection.gpu_buffers().is_allocated());
        assert_eq!(collection.len(), 1);

        collection.update(&mut device, 0.016);
        assert!(collection.gpu_buffers().is_allocated());
        assert_eq!(uploaded(&device, &collection, 0)[3].uv, [0.5, 0.0]);
        assert_eq!(device.stats().errors, 0);
        collection.dispose(&mut device);
    }
}
