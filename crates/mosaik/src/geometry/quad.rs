//! # Quad — Per-Corner Data Sent to the GPU
//!
//! Every tile is a quad: four vertices (the corners) and six indices (two
//! triangles). Each vertex carries a position and a texture coordinate (UV)
//! into the atlas. These are packed into a flat struct and uploaded to a GPU
//! buffer.
//!
//! ## Memory Layout
//!
//! The GPU reads vertex data as raw bytes at fixed offsets. `#[repr(C)]`
//! guarantees the Rust struct has the same layout a C compiler would
//! produce. The `bytemuck` traits `Pod` and `Zeroable` let us cast
//! `&[QuadVertex]` to `&[u8]` for upload without copies.
//!
//! ```text
//! QuadVertex (20 bytes per vertex)
//! ┌────────────────┬──────────────┐
//! │ position       │ uv           │
//! │ [f32; 3]       │ [f32; 2]     │
//! │ 12 bytes       │ 8 bytes      │
//! │ offset 0       │ offset 12    │
//! │ slot 0         │ slot 1       │
//! └────────────────┴──────────────┘
//! ```
//!
//! ## Corner Order and Winding
//!
//! ```text
//!   p3 (-1, 1) ──── p2 (1, 1)        uv: p3 (min.x, min.y)  p2 (max.x, min.y)
//!      │        ╲      │
//!      │          ╲    │                 p0 (min.x, max.y)  p1 (max.x, max.y)
//!   p0 (-1,-1) ──── p1 (1,-1)
//!
//!   indices: 0 1 3  1 2 3
//! ```
//!
//! Y points up in object space while V points down in the atlas, so the top
//! corners sample `min.y`. A zeroed quad has all four corners at the origin
//! and rasterizes to nothing; released sprite slots use that.
//!
//! ## Why Position Is World-Space
//!
//! Batched sprites have their corners transformed on the CPU (position,
//! scale, offset and depth applied) so that thousands of tiles share one
//! vertex buffer and one draw call. The shader only applies the camera
//! view-projection.

use bytemuck::{Pod, Zeroable};

use crate::math::{Rect, Vec2};
use crate::render::{AttributeType, VertexAttribute};

pub const VERTICES_PER_QUAD: usize = 4;
pub const INDICES_PER_QUAD: usize = 6;

/// Object-space corners `p0..p3`.
pub const QUAD_CORNERS: [Vec2; VERTICES_PER_QUAD] = [
    Vec2::new(-1.0, -1.0),
    Vec2::new(1.0, -1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(-1.0, 1.0),
];

pub const QUAD_INDICES: [u16; INDICES_PER_QUAD] = [0, 1, 3, 1, 2, 3];

/// Per-vertex data for quads.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl QuadVertex {
    pub const STRIDE: u32 = std::mem::size_of::<QuadVertex>() as u32;

    /// The layout handed to `vertex_attrib_pointer`, one entry per slot.
    pub const ATTRIBUTES: [VertexAttribute; 2] = [
        VertexAttribute {
            slot: 0,
            components: 3,
            ty: AttributeType::Float32,
            normalized: false,
            stride: Self::STRIDE,
            offset: 0,
        },
        VertexAttribute {
            slot: 1,
            components: 2,
            ty: AttributeType::Float32,
            normalized: false,
            stride: Self::STRIDE,
            offset: 12,
        },
    ];

    #[cfg(feature = "wgpu")]
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.position[0], self.position[1])
    }

    pub fn depth(&self) -> f32 {
        self.position[2]
    }

    pub fn uv(&self) -> Vec2 {
        Vec2::from(self.uv)
    }
}

/// UVs for `p0..p3`.
pub fn quad_uvs(rect: Rect) -> [[f32; 2]; VERTICES_PER_QUAD] {
    [
        [rect.min.x, rect.max.y],
        [rect.max.x, rect.max.y],
        [rect.max.x, rect.min.y],
        [rect.min.x, rect.min.y],
    ]
}

/// The object-space quad: corners at ±1, z = 0.
pub fn unit_quad(rect: Rect) -> [QuadVertex; VERTICES_PER_QUAD] {
    placed_quad(rect, Vec2::ZERO, Vec2::ONE, Vec2::ZERO, 0.0)
}

/// A quad transformed into world space.
///
/// Each corner lands at `center + (corner + offset) * half_extent`, so an
/// `offset` of `(1, -1)` shifts the quad until its top-left corner sits on
/// `center`.
pub fn placed_quad(
    rect: Rect,
    center: Vec2,
    half_extent: Vec2,
    offset: Vec2,
    depth: f32,
) -> [QuadVertex; VERTICES_PER_QUAD] {
    let uvs = quad_uvs(rect);
    std::array::from_fn(|i| {
        let p = center + (QUAD_CORNERS[i] + offset) * half_extent;
        QuadVertex {
            position: [p.x, p.y, depth],
            uv: uvs[i],
        }
    })
}

/// Index pattern for the quad whose first vertex is `base_vertex`.
pub fn quad_indices(base_vertex: u16) -> [u16; INDICES_PER_QUAD] {
    QUAD_INDICES.map(|i| base_vertex + i)
}
