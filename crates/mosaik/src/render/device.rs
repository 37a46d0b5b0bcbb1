//! # Device — The GPU Calls the Tile Layer Needs
//!
//! [`GpuDevice`] is deliberately close to the OpenGL ES buffer API, because
//! that is the shape of the work: allocate a few objects, bind one, upload
//! bytes into whatever is bound, describe how vertices are laid out, draw.
//!
//! ```text
//!   create_vertex_array ─► bind_vertex_array(Some(vao))
//!   create_buffer ───────► bind_buffer(Vertex, vbo) ─► buffer_data(Vertex, ..)
//!                          vertex_attrib_pointer(..)   (captures vbo into vao)
//!                          enable_vertex_attrib(slot)
//!   create_buffer ───────► bind_buffer(Index, ibo)     (recorded in vao)
//!                          buffer_data(Index, ..)
//!   ...
//!   bind_texture(Some(tex)) ─► bind_vertex_array(Some(vao)) ─► draw_indexed(n, 0)
//! ```
//!
//! ## Binding Rules
//!
//! - The [`BufferTarget::Vertex`] binding is global. `vertex_attrib_pointer`
//!   snapshots it into the bound vertex array.
//! - The [`BufferTarget::Index`] binding belongs to the bound vertex array,
//!   so binding a vertex array also restores its index buffer.
//! - Uploads go to whatever buffer is bound to the given target.
//!
//! Handles are non-zero integers so `Option<BufferId>` costs nothing and a
//! zeroed handle is never valid.
//!
//! ## Comparison
//!
//! - **OpenGL / WebGL**: the same calls with `GLuint` names and global state.
//! - **wgpu**: no bind-to-edit state; buffers are written through the queue
//!   and bound per render pass. [`WgpuDevice`](super::WgpuDevice) bridges the
//!   two by tracking the GL-style bindings itself.

use std::num::NonZeroU32;

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(NonZeroU32);

        impl $name {
            pub const fn new(raw: NonZeroU32) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u32 {
                self.0.get()
            }
        }
    };
}

gpu_handle!(
    /// A vertex or index buffer object.
    BufferId
);
gpu_handle!(
    /// A vertex array object: attribute layout plus index buffer binding.
    VertexArrayId
);
gpu_handle!(
    /// A sampled 2D texture.
    TextureId
);

/// Which binding point a buffer operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
}

/// Upload-frequency hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Written once, drawn many times.
    Static,
    /// Rewritten (fully or in ranges) between draws.
    Dynamic,
}

/// Component type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AttributeType {
    Float32,
}

impl AttributeType {
    pub const fn size(self) -> u32 {
        match self {
            AttributeType::Float32 => 4,
        }
    }
}

/// One entry of a vertex layout, as passed to `vertex_attrib_pointer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader input location.
    pub slot: u32,
    pub components: u32,
    pub ty: AttributeType,
    pub normalized: bool,
    /// Bytes between consecutive vertices.
    pub stride: u32,
    /// Byte offset of this attribute inside a vertex.
    pub offset: u32,
}

/// GL-shaped GPU primitives.
///
/// Operations on stale or unbound handles are reported through the `log`
/// facade and otherwise ignored; no method panics.
pub trait GpuDevice {
    fn create_buffer(&mut self) -> BufferId;
    fn delete_buffer(&mut self, buffer: BufferId);

    fn create_vertex_array(&mut self) -> VertexArrayId;
    fn delete_vertex_array(&mut self, array: VertexArrayId);
    fn bind_vertex_array(&mut self, array: Option<VertexArrayId>);

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>);
    /// Replace the whole contents of the buffer bound to `target`.
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    /// Overwrite `data.len()` bytes at `offset` in the buffer bound to
    /// `target`. The range must lie within the current contents.
    fn buffer_sub_data(&mut self, target: BufferTarget, offset: u64, data: &[u8]);

    /// Describe an attribute sourced from the currently bound vertex buffer.
    fn vertex_attrib_pointer(&mut self, attribute: VertexAttribute);
    fn enable_vertex_attrib(&mut self, slot: u32);

    /// Create a texture from tightly packed RGBA8 pixels.
    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> TextureId;
    fn delete_texture(&mut self, texture: TextureId);
    fn bind_texture(&mut self, texture: Option<TextureId>);

    /// Draw `index_count` u16 indices starting at `first_index` as a
    /// triangle list, using the bound vertex array and texture.
    fn draw_indexed(&mut self, index_count: u32, first_index: u32);
}

/// Hands out handles `1, 2, 3, ...` shared across all object kinds.
#[derive(Debug, Default)]
pub(crate) struct HandleAllocator {
    last: u32,
}

impl HandleAllocator {
    pub fn next(&mut self) -> NonZeroU32 {
        self.last = self.last.wrapping_add(1).max(1);
        NonZeroU32::new(self.last).unwrap_or(NonZeroU32::MIN)
    }
}
