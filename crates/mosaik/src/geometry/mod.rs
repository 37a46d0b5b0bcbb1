//! Quad geometry: vertex layout, CPU mirrors, and GPU buffer ownership.

pub mod buffer;
pub mod quad;
pub mod storage;

pub use buffer::{describe_quad_layout, GpuBuffers, QuadBuffer};
pub use quad::{
    placed_quad, quad_indices, quad_uvs, unit_quad, QuadVertex, INDICES_PER_QUAD, QUAD_CORNERS,
    QUAD_INDICES, VERTICES_PER_QUAD,
};
pub use storage::GrowableStorage;
