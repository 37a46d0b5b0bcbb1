//! # wgpu Backend — GL-Style Calls on a Modern API
//!
//! [`WgpuDevice`] implements [`GpuDevice`] on top of wgpu. It keeps the
//! GL-style binding state itself (bound vertex array, bound buffers, bound
//! texture) and translates each call:
//!
//! ```text
//! buffer_data(target, bytes, usage)   → create_buffer_init (VERTEX | INDEX,
//!                                       + COPY_DST when Dynamic)
//! buffer_sub_data(target, off, bytes) → queue.write_buffer (Dynamic)
//!                                       re-create from shadow copy (Static)
//! create_texture(..)                  → create_texture_with_data + bind group
//! draw_indexed(n, first)              → recorded, replayed by encode()
//! ```
//!
//! ## One Fixed Pipeline
//!
//! wgpu bakes the vertex layout into the render pipeline, so the device
//! builds exactly one: the sprite pipeline in `sprite.wgsl`, expecting
//! [`QuadVertex`] data (position at location 0, UV at location 1). A draw
//! whose vertex array describes any other layout is rejected with a log
//! message.
//!
//! ## Recording, Then Encoding
//!
//! A render pass only exists while the caller's frame is being encoded, but
//! the tile layer issues draws from its own update/draw cycle. `draw_indexed`
//! therefore records what to draw, and [`WgpuDevice::encode`] replays the
//! recorded draws into a pass. Buffers are resolved at encode time, so an
//! upload between draw and encode is visible in the frame.

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

use wgpu::util::DeviceExt;

use super::device::{
    BufferId, BufferTarget, BufferUsage, GpuDevice, HandleAllocator, TextureId, VertexArrayId,
    VertexAttribute,
};
use crate::geometry::QuadVertex;
use crate::math::Mat4;

/// Camera view-projection matrix uploaded as a uniform buffer.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
}

/// Pipeline, layouts and shared sampler for sprite quads.
struct SpritePipeline {
    pipeline: wgpu::RenderPipeline,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
}

impl SpritePipeline {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sprite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("sprite.wgsl").into()),
        });

        // Bind group layout 0: camera uniform
        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("camera bind group layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        // Bind group layout 1: atlas + sampler
        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("atlas bind group layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sprite pipeline layout"),
            bind_group_layouts: &[&camera_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sprite pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[QuadVertex::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera uniform buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera bind group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        // Tile atlases are pixel art; keep texels crisp.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("atlas sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            pipeline,
            texture_bind_group_layout,
            camera_buffer,
            camera_bind_group,
            sampler,
        }
    }

    fn texture_entry(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> TextureEntry {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            rgba,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        TextureEntry {
            texture,
            bind_group,
        }
    }
}

struct TextureEntry {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

#[derive(Default)]
struct BufferSlot {
    buffer: Option<wgpu::Buffer>,
    usage: Option<BufferUsage>,
    size: u64,
    /// Contents of static buffers, kept so ranged writes can rebuild them.
    shadow: Vec<u8>,
}

impl BufferSlot {
    fn upload(
        &mut self,
        device: &wgpu::Device,
        target: BufferTarget,
        data: &[u8],
        usage: BufferUsage,
    ) {
        let mut flags = match target {
            BufferTarget::Vertex => wgpu::BufferUsages::VERTEX,
            BufferTarget::Index => wgpu::BufferUsages::INDEX,
        };
        if usage == BufferUsage::Dynamic {
            flags |= wgpu::BufferUsages::COPY_DST;
        }

        if let Some(old) = self.buffer.take() {
            old.destroy();
        }
        self.buffer = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(match target {
                BufferTarget::Vertex => "quad vertex buffer",
                BufferTarget::Index => "quad index buffer",
            }),
            contents: data,
            usage: flags,
        }));
        self.usage = Some(usage);
        self.size = data.len() as u64;
        self.shadow.clear();
        if usage == BufferUsage::Static {
            self.shadow.extend_from_slice(data);
        }
    }
}

#[derive(Default)]
struct ArrayBinding {
    index_buffer: Option<BufferId>,
    attributes: Vec<(VertexAttribute, BufferId)>,
    enabled: BTreeSet<u32>,
}

impl ArrayBinding {
    /// The vertex buffer feeding the sprite pipeline, if this array's
    /// layout matches [`QuadVertex`].
    fn quad_source(&self) -> Option<BufferId> {
        let mut source = None;
        for expected in QuadVertex::ATTRIBUTES {
            let (attribute, buffer) = self
                .attributes
                .iter()
                .find(|(a, _)| a.slot == expected.slot)?;
            if *attribute != expected || !self.enabled.contains(&expected.slot) {
                return None;
            }
            match source {
                None => source = Some(*buffer),
                Some(existing) if existing != *buffer => return None,
                Some(_) => {}
            }
        }
        source
    }
}

struct PendingDraw {
    vertex_buffer: BufferId,
    index_buffer: BufferId,
    texture: Option<TextureId>,
    indices: Range<u32>,
}

/// [`GpuDevice`] backed by wgpu.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: SpritePipeline,
    white: TextureEntry,
    handles: HandleAllocator,
    buffers: HashMap<BufferId, BufferSlot>,
    arrays: HashMap<VertexArrayId, ArrayBinding>,
    textures: HashMap<TextureId, TextureEntry>,
    bound_array: Option<VertexArrayId>,
    bound_vertex: Option<BufferId>,
    loose_index: Option<BufferId>,
    bound_texture: Option<TextureId>,
    pending: Vec<PendingDraw>,
}

impl WgpuDevice {
    /// Build the sprite pipeline for render targets of `format`.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let pipeline = SpritePipeline::new(&device, format);
        let white =
            pipeline.texture_entry(&device, &queue, "white 1x1", 1, 1, &[255, 255, 255, 255]);
        Self {
            device,
            queue,
            pipeline,
            white,
            handles: HandleAllocator::default(),
            buffers: HashMap::new(),
            arrays: HashMap::new(),
            textures: HashMap::new(),
            bound_array: None,
            bound_vertex: None,
            loose_index: None,
            bound_texture: None,
            pending: Vec::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Upload the camera matrix used by every sprite draw.
    pub fn set_view_projection(&self, view_proj: Mat4) {
        let uniform = CameraUniform {
            view_proj: view_proj.to_cols_array_2d(),
        };
        self.queue
            .write_buffer(&self.pipeline.camera_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    /// Number of draws recorded since the last [`encode`](Self::encode).
    pub fn pending_draws(&self) -> usize {
        self.pending.len()
    }

    /// Replay recorded draws into `pass` and clear the queue.
    pub fn encode(&mut self, pass: &mut wgpu::RenderPass<'_>) {
        if self.pending.is_empty() {
            return;
        }
        pass.set_pipeline(&self.pipeline.pipeline);
        pass.set_bind_group(0, &self.pipeline.camera_bind_group, &[]);

        for draw in self.pending.drain(..) {
            let vertex = self
                .buffers
                .get(&draw.vertex_buffer)
                .and_then(|slot| slot.buffer.as_ref());
            let index = self
                .buffers
                .get(&draw.index_buffer)
                .and_then(|slot| slot.buffer.as_ref());
            let (Some(vertex), Some(index)) = (vertex, index) else {
                log::warn!("Skipping draw: buffer deleted before encode");
                continue;
            };
            let bind_group = draw
                .texture
                .and_then(|t| self.textures.get(&t))
                .map_or(&self.white.bind_group, |entry| &entry.bind_group);

            pass.set_bind_group(1, bind_group, &[]);
            pass.set_vertex_buffer(0, vertex.slice(..));
            pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(draw.indices, 0, 0..1);
        }
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
}

impl GpuDevice for WgpuDevice {
    fn create_buffer(&mut self) -> BufferId {
        let id = BufferId::new(self.handles.next());
        self.buffers.insert(id, BufferSlot::default());
        id
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        match self.buffers.remove(&buffer) {
            Some(slot) => {
                if let Some(gpu) = slot.buffer {
                    gpu.destroy();
                }
            }
            None => {
                log::error!("delete of unknown buffer {}", buffer.get());
                return;
            }
        }
        if self.bound_vertex == Some(buffer) {
            self.bound_vertex = None;
        }
        if self.loose_index == Some(buffer) {
            self.loose_index = None;
        }
    }

    fn create_vertex_array(&mut self) -> VertexArrayId {
        let id = VertexArrayId::new(self.handles.next());
        self.arrays.insert(id, ArrayBinding::default());
        id
    }

    fn delete_vertex_array(&mut self, array: VertexArrayId) {
        if self.arrays.remove(&array).is_none() {
            log::error!("delete of unknown vertex array {}", array.get());
        }
        if self.bound_array == Some(array) {
            self.bound_array = None;
        }
    }

    fn bind_vertex_array(&mut self, array: Option<VertexArrayId>) {
        if let Some(id) = array.filter(|id| !self.arrays.contains_key(id)) {
            log::error!("bind of unknown vertex array {}", id.get());
            return;
        }
        self.bound_array = array;
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) {
        if let Some(id) = buffer.filter(|id| !self.buffers.contains_key(id)) {
            log::error!("bind of unknown buffer {}", id.get());
            return;
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
        let Some(slot) = self.bound(target).and_then(|id| self.buffers.get_mut(&id)) else {
            log::error!("buffer_data with no {target:?} buffer bound");
            return;
        };
        slot.upload(&self.device, target, data, usage);
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: u64, data: &[u8]) {
        let Some(slot) = self.bound(target).and_then(|id| self.buffers.get_mut(&id)) else {
            log::error!("buffer_sub_data with no {target:?} buffer bound");
            return;
        };
        let end = offset + data.len() as u64;
        if end > slot.size {
            log::error!(
                "buffer_sub_data range {offset}..{end} exceeds buffer of {} bytes",
                slot.size
            );
            return;
        }
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0
            || data.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT != 0
        {
            log::error!("buffer_sub_data range {offset}..{end} is not 4-byte aligned");
            return;
        }

        match slot.usage {
            Some(BufferUsage::Dynamic) => {
                if let Some(buffer) = &slot.buffer {
                    self.queue.write_buffer(buffer, offset, data);
                }
            }
            Some(BufferUsage::Static) => {
                let mut contents = std::mem::take(&mut slot.shadow);
                contents[offset as usize..end as usize].copy_from_slice(data);
                slot.upload(&self.device, target, &contents, BufferUsage::Static);
            }
            None => log::error!("buffer_sub_data on a buffer with no contents"),
        }
    }

    fn vertex_attrib_pointer(&mut self, attribute: VertexAttribute) {
        let Some(buffer) = self.bound_vertex else {
            log::error!("attribute {} described with no vertex buffer bound", attribute.slot);
            return;
        };
        let Some(array) = self.bound_array.and_then(|a| self.arrays.get_mut(&a)) else {
            log::error!("attribute {} described with no vertex array bound", attribute.slot);
            return;
        };
        array.attributes.retain(|(a, _)| a.slot != attribute.slot);
        array.attributes.push((attribute, buffer));
    }

    fn enable_vertex_attrib(&mut self, slot: u32) {
        match self.bound_array.and_then(|a| self.arrays.get_mut(&a)) {
            Some(array) => {
                array.enabled.insert(slot);
            }
            None => log::error!("enable of attribute {slot} with no vertex array bound"),
        }
    }

    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> TextureId {
        let id = TextureId::new(self.handles.next());
        let expected = width as usize * height as usize * 4;
        let entry = if rgba.len() == expected && width > 0 && height > 0 {
            self.pipeline
                .texture_entry(&self.device, &self.queue, label, width, height, rgba)
        } else {
            log::error!(
                "texture `{label}` given {} bytes for {width}x{height}; using white",
                rgba.len()
            );
            self.pipeline
                .texture_entry(&self.device, &self.queue, label, 1, 1, &[255, 255, 255, 255])
        };
        self.textures.insert(id, entry);
        id
    }

    fn delete_texture(&mut self, texture: TextureId) {
        match self.textures.remove(&texture) {
            Some(entry) => entry.texture.destroy(),
            None => log::error!("delete of unknown texture {}", texture.get()),
        }
        if self.bound_texture == Some(texture) {
            self.bound_texture = None;
        }
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        if let Some(id) = texture.filter(|id| !self.textures.contains_key(id)) {
            log::error!("bind of unknown texture {}", id.get());
            return;
        }
        self.bound_texture = texture;
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32) {
        let Some(array) = self.bound_array.and_then(|a| self.arrays.get(&a)) else {
            log::error!("draw with no vertex array bound");
            return;
        };
        let Some(vertex_buffer) = array.quad_source() else {
            log::error!("draw with a vertex layout the sprite pipeline cannot read");
            return;
        };
        let Some(index_buffer) = array.index_buffer else {
            log::error!("draw with no index buffer");
            return;
        };
        let Some(last) = first_index.checked_add(index_count) else {
            log::error!("draw of {index_count} indices from {first_index} overflows u32");
            return;
        };
        self.pending.push(PendingDraw {
            vertex_buffer,
            index_buffer,
            texture: self.bound_texture,
            indices: first_index..last,
        });
    }
}
