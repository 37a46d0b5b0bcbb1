//! Headless device — an in-memory [`GpuDevice`] that records instead of
//! rendering.
//!
//! Buffers keep their bytes, vertex arrays keep their layouts, and every
//! upload and draw is counted. Misuse (uploading with nothing bound, writing
//! past the end of a buffer, drawing without an index buffer) is logged and
//! tallied in [`DeviceStats::errors`] rather than panicking, so tests can
//! assert a sequence of calls was clean.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::device::{
    BufferId, BufferTarget, BufferUsage, GpuDevice, HandleAllocator, TextureId, VertexArrayId,
    VertexAttribute,
};

/// Counters accumulated since creation or the last [`HeadlessDevice::reset_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// `buffer_data` calls.
    pub full_uploads: u64,
    /// `buffer_sub_data` calls.
    pub sub_uploads: u64,
    pub bytes_uploaded: u64,
    pub draw_calls: u64,
    /// Calls rejected as invalid.
    pub errors: u64,
}

impl DeviceStats {
    pub fn uploads(&self) -> u64 {
        self.full_uploads + self.sub_uploads
    }
}

/// A recorded `draw_indexed` call with the state it was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub vertex_array: VertexArrayId,
    pub texture: Option<TextureId>,
    pub index_count: u32,
    pub first_index: u32,
}

#[derive(Debug, Default)]
struct BufferState {
    data: Vec<u8>,
    usage: Option<BufferUsage>,
}

#[derive(Debug, Default)]
struct ArrayState {
    index_buffer: Option<BufferId>,
    attributes: BTreeMap<u32, (VertexAttribute, BufferId)>,
    enabled: BTreeSet<u32>,
}

#[derive(Debug)]
struct TextureState {
    label: String,
    width: u32,
    height: u32,
}

/// Recording GPU device for tests and tooling.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    handles: HandleAllocator,
    buffers: HashMap<BufferId, BufferState>,
    arrays: HashMap<VertexArrayId, ArrayState>,
    textures: HashMap<TextureId, TextureState>,
    bound_array: Option<VertexArrayId>,
    bound_vertex: Option<BufferId>,
    /// Index binding used while no vertex array is bound.
    loose_index: Option<BufferId>,
    bound_texture: Option<TextureId>,
    stats: DeviceStats,
    draws: Vec<DrawCall>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    /// Zero the counters and forget recorded draws. Objects stay alive.
    pub fn reset_stats(&mut self) {
        self.stats = DeviceStats::default();
        self.draws.clear();
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.arrays.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn is_live_buffer(&self, buffer: BufferId) -> bool {
        self.buffers.contains_key(&buffer)
    }

    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    pub fn buffer_usage(&self, buffer: BufferId) -> Option<BufferUsage> {
        self.buffers.get(&buffer).and_then(|b| b.usage)
    }

    pub fn index_buffer(&self, array: VertexArrayId) -> Option<BufferId> {
        self.arrays.get(&array).and_then(|a| a.index_buffer)
    }

    /// Attribute layout of a vertex array, ordered by slot.
    pub fn attributes(&self, array: VertexArrayId) -> Vec<VertexAttribute> {
        self.arrays
            .get(&array)
            .map(|a| a.attributes.values().map(|(attr, _)| *attr).collect())
            .unwrap_or_default()
    }

    /// Buffer an attribute slot reads from.
    pub fn attribute_buffer(&self, array: VertexArrayId, slot: u32) -> Option<BufferId> {
        self.arrays
            .get(&array)
            .and_then(|a| a.attributes.get(&slot))
            .map(|(_, buffer)| *buffer)
    }

    pub fn enabled_attributes(&self, array: VertexArrayId) -> Vec<u32> {
        self.arrays
            .get(&array)
            .map(|a| a.enabled.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&texture).map(|t| (t.width, t.height))
    }

    pub fn texture_label(&self, texture: TextureId) -> Option<&str> {
        self.textures.get(&texture).map(|t| t.label.as_str())
    }

    fn fault(&mut self, message: String) {
        self.stats.errors += 1;
        log::error!("headless device: {message}");
    }

    fn bound(&self, target: BufferTarget) -> Option<BufferId> {
        match target {
            BufferTarget::Vertex => self.bound_vertex,
            BufferTarget::Index => match self.bound_array {
                Some(array) => self.arrays.get(&array).and_then(|a| a.index_buffer),
                None => self.loose_index,
            },
        }
    }

    fn bound_buffer_mut(&mut self, target: BufferTarget) -> Option<&mut BufferState> {
        let id = self.bound(target)?;
        self.buffers.get_mut(&id)
    }
}

impl GpuDevice for HeadlessDevice {
    fn create_buffer(&mut self) -> BufferId {
        let id = BufferId::new(self.handles.next());
        self.buffers.insert(id, BufferState::default());
        id
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_none() {
            self.fault(format!("delete of unknown buffer {}", buffer.get()));
            return;
        }
        if self.bound_vertex == Some(buffer) {
            self.bound_vertex = None;
        }
        if self.loose_index == Some(buffer) {
            self.loose_index = None;
        }
        if let Some(array) = self.bound_array.and_then(|a| self.arrays.get_mut(&a)) {
            if array.index_buffer == Some(buffer) {
                array.index_buffer = None;
            }
        }
    }

    fn create_vertex_array(&mut self) -> VertexArrayId {
        let id = VertexArrayId::new(self.handles.next());
        self.arrays.insert(id, ArrayState::default());
        id
    }

    fn delete_vertex_array(&mut self, array: VertexArrayId) {
        if self.arrays.remove(&array).is_none() {
            self.fault(format!("delete of unknown vertex array {}", array.get()));
            return;
        }
        if self.bound_array == Some(array) {
            self.bound_array = None;
        }
    }

    fn bind_vertex_array(&mut self, array: Option<VertexArrayId>) {
        if let Some(id) = array {
            if !self.arrays.contains_key(&id) {
                self.fault(format!("bind of unknown vertex array {}", id.get()));
                return;
            }
        }
        self.bound_array = array;
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) {
        if let Some(id) = buffer {
            if !self.buffers.contains_key(&id) {
                self.fault(format!("bind of unknown buffer {}", id.get()));
                return;
            }
        }
        match target {
            BufferTarget::Vertex => self.bound_vertex = buffer,
            BufferTarget::Index => match self.bound_array.and_then(|a| self.arrays.get_mut(&a)) {
                Some(array) => array.index_buffer = buffer,
                None => self.loose_index = buffer,
            },
        }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let Some(state) = self.bound_buffer_mut(target) else {
            self.fault(format!("buffer_data with no {target:?} buffer bound"));
            return;
        };
        state.data.clear();
        state.data.extend_from_slice(data);
        state.usage = Some(usage);
        self.stats.full_uploads += 1;
        self.stats.bytes_uploaded += data.len() as u64;
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: u64, data: &[u8]) {
        let Some(state) = self.bound_buffer_mut(target) else {
            self.fault(format!("buffer_sub_data with no {target:?} buffer bound"));
            return;
        };
        let start = offset as usize;
        let end = start + data.len();
        if end > state.data.len() {
            let len = state.data.len();
            self.fault(format!(
                "buffer_sub_data range {start}..{end} exceeds buffer of {len} bytes"
            ));
            return;
        }
        state.data[start..end].copy_from_slice(data);
        self.stats.sub_uploads += 1;
        self.stats.bytes_uploaded += data.len() as u64;
    }

    fn vertex_attrib_pointer(&mut self, attribute: VertexAttribute) {
        let Some(buffer) = self.bound_vertex else {
            let slot = attribute.slot;
            self.fault(format!("attribute {slot} described with no vertex buffer bound"));
            return;
        };
        let Some(array) = self.bound_array.and_then(|a| self.arrays.get_mut(&a)) else {
            let slot = attribute.slot;
            self.fault(format!("attribute {slot} described with no vertex array bound"));
            return;
        };
        array.attributes.insert(attribute.slot, (attribute, buffer));
    }

    fn enable_vertex_attrib(&mut self, slot: u32) {
        match self.bound_array.and_then(|a| self.arrays.get_mut(&a)) {
            Some(array) => {
                array.enabled.insert(slot);
            }
            None => self.fault(format!("enable of attribute {slot} with no vertex array bound")),
        }
    }

    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> TextureId {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            self.fault(format!(
                "texture `{label}` given {} bytes, expected {expected}",
                rgba.len()
            ));
        }
        let id = TextureId::new(self.handles.next());
        self.textures.insert(
            id,
            TextureState {
                label: label.to_owned(),
                width,
                height,
            },
        );
        id
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_none() {
            self.fault(format!("delete of unknown texture {}", texture.get()));
            return;
        }
        if self.bound_texture == Some(texture) {
            self.bound_texture = None;
        }
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        if let Some(id) = texture {
            if !self.textures.contains_key(&id) {
                self.fault(format!("bind of unknown texture {}", id.get()));
                return;
            }
        }
        self.bound_texture = texture;
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32) {
        let Some(vertex_array) = self.bound_array else {
            self.fault("draw with no vertex array bound".into());
            return;
        };
        let Some(index_len) = self
            .bound(BufferTarget::Index)
            .and_then(|id| self.buffers.get(&id))
            .map(|b| b.data.len() / 2)
        else {
            self.fault("draw with no index buffer".into());
            return;
        };
        let Some(last) = first_index.checked_add(index_count) else {
            self.fault(format!(
                "draw of {index_count} indices from {first_index} overflows the index range"
            ));
            return;
        };
        if last as usize > index_len {
            self.fault(format!(
                "draw of {index_count} indices from {first_index} exceeds {index_len} indices"
            ));
            return;
        }
        self.stats.draw_calls += 1;
        self.draws.push(DrawCall {
            vertex_array,
            texture: self.bound_texture,
            index_count,
            first_index,
        });
    }
}
