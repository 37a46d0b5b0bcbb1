//! # Quad Buffer — One Textured Quad on the GPU
//!
//! The smallest drawable unit: a vertex array, a vertex buffer holding the
//! four corners, and an index buffer holding the two triangles. Used
//! directly for full-screen or one-off quads, and as the building block the
//! sprite collection generalizes to many quads per buffer pair.
//!
//! ## Lifecycle
//!
//! ```text
//!   Unallocated ──set_buffers / create_buffer──► Allocated { vao, vbo, ibo }
//!        ▲                                              │
//!        └──────────────────── dispose ─────────────────┘
//! ```
//!
//! The three handles live in one [`GpuBuffers`] value, so "some buffers
//! created, others not" cannot be represented. `dispose` is idempotent and
//! a disposed buffer can be filled again.

use crate::diag::{DiagnosticsSink, Severity};
use crate::math::Rect;
use crate::render::{BufferId, BufferTarget, BufferUsage, GpuDevice, VertexArrayId};

use super::quad::{unit_quad, QuadVertex, INDICES_PER_QUAD, QUAD_INDICES, VERTICES_PER_QUAD};
use super::storage::GrowableStorage;

/// The GPU objects behind one batch of quads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuBuffers {
    #[default]
    Unallocated,
    Allocated {
        vertex_array: VertexArrayId,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
    },
}

impl GpuBuffers {
    pub fn allocate(device: &mut dyn GpuDevice) -> Self {
        GpuBuffers::Allocated {
            vertex_array: device.create_vertex_array(),
            vertex_buffer: device.create_buffer(),
            index_buffer: device.create_buffer(),
        }
    }

    pub fn is_allocated(&self) -> bool {
        matches!(self, GpuBuffers::Allocated { .. })
    }

    pub fn vertex_array(&self) -> Option<VertexArrayId> {
        match *self {
            GpuBuffers::Allocated { vertex_array, .. } => Some(vertex_array),
            GpuBuffers::Unallocated => None,
        }
    }

    pub fn vertex_buffer(&self) -> Option<BufferId> {
        match *self {
            GpuBuffers::Allocated { vertex_buffer, .. } => Some(vertex_buffer),
            GpuBuffers::Unallocated => None,
        }
    }

    pub fn index_buffer(&self) -> Option<BufferId> {
        match *self {
            GpuBuffers::Allocated { index_buffer, .. } => Some(index_buffer),
            GpuBuffers::Unallocated => None,
        }
    }

    /// Delete every handle and return to `Unallocated`. No-op when already
    /// unallocated.
    pub fn release(&mut self, device: &mut dyn GpuDevice) {
        if let GpuBuffers::Allocated {
            vertex_array,
            vertex_buffer,
            index_buffer,
        } = std::mem::take(self)
        {
            device.delete_buffer(vertex_buffer);
            device.delete_buffer(index_buffer);
            device.delete_vertex_array(vertex_array);
        }
    }
}

/// Describe the [`QuadVertex`] layout for the bound vertex array and
/// vertex buffer, and enable both slots.
pub fn describe_quad_layout(device: &mut dyn GpuDevice) {
    for attribute in QuadVertex::ATTRIBUTES {
        device.vertex_attrib_pointer(attribute);
        device.enable_vertex_attrib(attribute.slot);
    }
}

/// A single textured quad.
#[derive(Debug, Default)]
pub struct QuadBuffer {
    buffers: GpuBuffers,
    vertices: GrowableStorage<QuadVertex>,
    indices: GrowableStorage<u16>,
    index_count: u32,
}

impl QuadBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any existing objects and allocate a fresh set.
    pub fn create_buffer(&mut self, device: &mut dyn GpuDevice) {
        self.buffers.release(device);
        self.buffers = GpuBuffers::allocate(device);
        self.index_count = 0;
    }

    /// Write the quad for `quad`'s UV rect and upload it with `usage`.
    /// Allocates GPU objects on first use.
    pub fn set_buffers(&mut self, device: &mut dyn GpuDevice, quad: Rect, usage: BufferUsage) {
        if !self.buffers.is_allocated() {
            self.create_buffer(device);
        }
        let GpuBuffers::Allocated {
            vertex_array,
            vertex_buffer,
            index_buffer,
        } = self.buffers
        else {
            return;
        };

        self.vertices.set_len(VERTICES_PER_QUAD);
        self.vertices.as_mut_slice().copy_from_slice(&unit_quad(quad));
        self.indices.set_len(INDICES_PER_QUAD);
        self.indices.as_mut_slice().copy_from_slice(&QUAD_INDICES);

        device.bind_vertex_array(Some(vertex_array));
        device.bind_buffer(BufferTarget::Vertex, Some(vertex_buffer));
        device.buffer_data(
            BufferTarget::Vertex,
            bytemuck::cast_slice(self.vertices.as_slice()),
            usage,
        );
        describe_quad_layout(device);
        device.bind_buffer(BufferTarget::Index, Some(index_buffer));
        device.buffer_data(
            BufferTarget::Index,
            bytemuck::cast_slice(self.indices.as_slice()),
            usage,
        );
        device.bind_vertex_array(None);

        self.index_count = INDICES_PER_QUAD as u32;
    }

    /// Bind the vertex array for drawing. Reports and returns false if the
    /// buffers were never created.
    pub fn enable(&self, device: &mut dyn GpuDevice, diag: &dyn DiagnosticsSink) -> bool {
        match self.buffers.vertex_array() {
            Some(vertex_array) => {
                device.bind_vertex_array(Some(vertex_array));
                true
            }
            None => {
                diag.report(Severity::Error, "quad buffer enabled before its buffers were created");
                false
            }
        }
    }

    /// Empty buffers (created but never filled) are bound but not drawn.
    pub fn draw(&self, device: &mut dyn GpuDevice, diag: &dyn DiagnosticsSink) {
        if self.enable(device, diag) && self.index_count > 0 {
            device.draw_indexed(self.index_count, 0);
        }
    }

    /// Delete GPU objects and empty the CPU mirror. Safe to call repeatedly.
    pub fn dispose(&mut self, device: &mut dyn GpuDevice) {
        self.buffers.release(device);
        self.vertices.reset();
        self.indices.reset();
        self.index_count = 0;
    }

    pub fn is_allocated(&self) -> bool {
        self.buffers.is_allocated()
    }

    pub fn buffers(&self) -> GpuBuffers {
        self.buffers
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn vertices(&self) -> &[QuadVertex] {
        self.vertices.as_slice()
    }

    pub fn indices(&self) -> &[u16] {
        self.indices.as_slice()
    }

    pub fn vertex_capacity(&self) -> usize {
        self.vertices.capacity()
    }
}

impl Drop for QuadBuffer {
    fn drop(&mut self) {
        if self.buffers.is_allocated() {
            log::warn!("QuadBuffer dropped with GPU buffers still allocated; call dispose first");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::MemorySink;
    use crate::render::HeadlessDevice;

    fn uploaded_vertices(device: &HeadlessDevice, buffer: BufferId) -> Vec<QuadVertex> {
        bytemuck::pod_collect_to_vec(device.buffer_contents(buffer).unwrap())
    }

    #[test]
    fn full_rect_uploads_unit_square() {
        let mut device = HeadlessDevice::new();
        let mut quad = QuadBuffer::new();
        quad.set_buffers(&mut device, Rect::FULL, BufferUsage::Static);

        let vbo = quad.buffers().vertex_buffer().unwrap();
        let ibo = quad.buffers().index_buffer().unwrap();
        let vertices = uploaded_vertices(&device, vbo);
        let uvs: Vec<[f32; 2]> = vertices.iter().map(|v| v.uv).collect();
        assert_eq!(uvs, vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]);

        let indices: Vec<u16> = bytemuck::pod_collect_to_vec(device.buffer_contents(ibo).unwrap());
        assert_eq!(indices, QUAD_INDICES);
        assert!(indices.iter().all(|&i| (i as usize) < VERTICES_PER_QUAD));
        assert_eq!(device.buffer_usage(vbo), Some(BufferUsage::Static));
        assert_eq!(quad.index_count(), 6);

        quad.dispose(&mut device);
    }

    #[test]
    fn layout_is_described_on_vertex_array() {
        let mut device = HeadlessDevice::new();
        let mut quad = QuadBuffer::new();
        quad.set_buffers(&mut device, Rect::FULL, BufferUsage::Dynamic);

        let vao = quad.buffers().vertex_array().unwrap();
        assert_eq!(device.attributes(vao), QuadVertex::ATTRIBUTES.to_vec());
        assert_eq!(device.enabled_attributes(vao), vec![0, 1]);
        assert_eq!(device.index_buffer(vao), quad.buffers().index_buffer());
        assert_eq!(device.stats().errors, 0);

        quad.dispose(&mut device);
    }

    #[test]
    fn dispose_twice_is_a_no_op() {
        let mut device = HeadlessDevice::new();
        let mut quad = QuadBuffer::new();
        quad.set_buffers(&mut device, Rect::FULL, BufferUsage::Static);

        quad.dispose(&mut device);
        quad.dispose(&mut device);

        assert!(!quad.is_allocated());
        assert_eq!(device.live_buffers(), 0);
        assert_eq!(device.live_vertex_arrays(), 0);
        assert_eq!(device.stats().errors, 0);
        assert!(quad.vertices().is_empty());
    }

    #[test]
    fn set_buffers_after_dispose_recreates_handles() {
        let mut device = HeadlessDevice::new();
        let sink = MemorySink::new();
        let mut quad = QuadBuffer::new();
        quad.set_buffers(&mut device, Rect::FULL, BufferUsage::Static);
        let first = quad.buffers();
        quad.dispose(&mut device);

        quad.set_buffers(&mut device, Rect::FULL, BufferUsage::Static);
        assert!(quad.is_allocated());
        assert_ne!(quad.buffers(), first);
        assert_eq!(device.live_buffers(), 2);

        quad.draw(&mut device, &sink);
        assert_eq!(device.stats().draw_calls, 1);
        assert_eq!(device.stats().errors, 0);
        assert!(sink.entries().is_empty());

        quad.dispose(&mut device);
    }

    #[test]
    fn create_buffer_replaces_existing_allocation() {
        let mut device = HeadlessDevice::new();
        let mut quad = QuadBuffer::new();
        quad.create_buffer(&mut device);
        quad.create_buffer(&mut device);
        assert_eq!(device.live_buffers(), 2);
        assert_eq!(device.live_vertex_arrays(), 1);
        quad.dispose(&mut device);
    }

    #[test]
    fn enable_before_set_buffers_reports() {
        let mut device = HeadlessDevice::new();
        let sink = MemorySink::new();
        let quad = QuadBuffer::new();

        assert!(!quad.enable(&mut device, &sink));
        quad.draw(&mut device, &sink);

        assert_eq!(sink.count(Severity::Error), 2);
        assert_eq!(device.stats().draw_calls, 0);
    }

    #[test]
    fn enable_after_create_buffer_binds_without_drawing() {
        let mut device = HeadlessDevice::new();
        let sink = MemorySink::new();
        let mut quad = QuadBuffer::new();
        quad.create_buffer(&mut device);

        assert!(quad.enable(&mut device, &sink));
        quad.draw(&mut device, &sink);
        assert!(sink.entries().is_empty());
        assert_eq!(device.stats().draw_calls, 0);
        assert_eq!(device.stats().errors, 0);

        quad.set_buffers(&mut device, Rect::FULL, BufferUsage::Static);
        quad.draw(&mut device, &sink);
        assert_eq!(device.stats().draw_calls, 1);

        quad.dispose(&mut device);
    }

    #[test]
    fn storage_capacity_is_monotonic() {
        let mut device = HeadlessDevice::new();
        let mut quad = QuadBuffer::new();
        quad.set_buffers(&mut device, Rect::FULL, BufferUsage::Dynamic);
        let capacity = quad.vertex_capacity();
        quad.set_buffers(&mut device, Rect::FULL, BufferUsage::Dynamic);
        assert!(quad.vertex_capacity() >= capacity);
        assert_eq!(device.live_buffers(), 2);
        quad.dispose(&mut device);
    }
}
