//! Rendering subsystem — a small GL-shaped device abstraction.
//!
//! The geometry and sprite layers talk to the GPU through [`GpuDevice`]: a
//! handful of buffer, vertex-array, texture and draw primitives with
//! bind-then-operate semantics. Two backends implement it:
//!
//! - [`HeadlessDevice`] records every call and keeps buffer contents in
//!   memory. Tests and tools use it to count uploads and inspect vertices.
//! - [`WgpuDevice`] (feature `wgpu`, on by default) maps the primitives onto
//!   wgpu buffers and a fixed sprite pipeline, then replays the recorded
//!   draws into a render pass.

pub mod device;
pub mod headless;
#[cfg(feature = "wgpu")]
pub mod wgpu_device;

pub use device::{
    AttributeType, BufferId, BufferTarget, BufferUsage, GpuDevice, TextureId, VertexArrayId,
    VertexAttribute,
};
pub use headless::{DeviceStats, DrawCall, HeadlessDevice};
#[cfg(feature = "wgpu")]
pub use wgpu_device::WgpuDevice;
