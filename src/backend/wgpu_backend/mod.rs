//! wgpu backend implementation
//!
//! Realizes the handle registry against a real device. No window or surface
//! is involved; passes render into offscreen targets, which is all the
//! material core needs.
//!
//! Uniform blocks live in one shared ring buffer bound with dynamic offsets;
//! every `apply_uniform_block` call takes a fresh 256-byte-aligned slot so
//! draws recorded earlier in the frame keep the values they were issued with.
//! Render pass commands are buffered and replayed at `end_pass`, since a
//! `wgpu::RenderPass` borrows the encoder for its whole lifetime.

use std::collections::HashMap;
use std::num::NonZeroU64;

use crate::backend::traits::*;
use crate::backend::types::*;

/// Capacity of the per-frame uniform ring buffer.
const UNIFORM_RING_SIZE: u64 = 256 * 1024;

/// Alignment of uniform ring slots (`min_uniform_buffer_offset_alignment`
/// upper bound on mainstream hardware).
const UNIFORM_SLOT_ALIGN: u64 = 256;

/// Format used for offscreen color attachments.
const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Format used for the offscreen depth attachment.
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Buffered render pass command
#[derive(Debug, Clone)]
enum RenderCommand {
    SetPipeline(PipelineHandle),
    SetBindings(Bindings),
    SetUniform { stage: ShaderStage, slot: u32, ring_offset: u32 },
    Draw {
        elements: std::ops::Range<u32>,
        instances: std::ops::Range<u32>,
    },
}

/// Pending render pass with buffered commands
struct PendingRenderPass {
    descriptor: PassDescriptor,
    commands: Vec<RenderCommand>,
}

/// Everything created for one shader program.
struct ShaderEntry {
    module: wgpu::ShaderModule,
    descriptor: ShaderDescriptor,
    tex_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    /// Group 0: vertex-stage blocks in the ring buffer, dynamic offsets.
    vs_bind_group: wgpu::BindGroup,
    /// Group 1: fragment-stage blocks in the ring buffer, dynamic offsets.
    fs_bind_group: wgpu::BindGroup,
}

struct PipelineEntry {
    pipeline: wgpu::RenderPipeline,
    shader: ShaderHandle,
    index_type: IndexType,
}

/// One draw call resolved from the command stream.
struct ResolvedDraw {
    pipeline: u64,
    vs_offsets: Vec<u32>,
    fs_offsets: Vec<u32>,
    tex_group: usize,
    vertex_buffers: [BufferHandle; MAX_VERTEX_BUFFERS],
    index_buffer: BufferHandle,
    index_type: IndexType,
    elements: std::ops::Range<u32>,
    instances: std::ops::Range<u32>,
}

/// wgpu backend implementation
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    // Resource storage
    shaders: HashMap<u64, ShaderEntry>,
    pipelines: HashMap<u64, PipelineEntry>,
    images: HashMap<u64, wgpu::TextureView>,
    buffers: HashMap<u64, wgpu::Buffer>,

    // Handle counters
    next_shader_id: u64,
    next_pipeline_id: u64,
    next_image_id: u64,
    next_buffer_id: u64,

    // Shared resources
    sampler: wgpu::Sampler,
    uniform_ring: wgpu::Buffer,
    uniform_scratch: Vec<u8>,
    uniform_cursor: u64,

    // Frame state
    encoder: Option<wgpu::CommandEncoder>,
    pending_pass: Option<PendingRenderPass>,
}

impl WgpuBackend {
    /// Create a backend on the first available adapter.
    pub fn new() -> BackendResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .ok_or_else(|| {
            BackendError::InitializationFailed("no compatible GPU adapter".to_string())
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("vermilion device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
            },
            None,
        ))
        .map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        log::info!("WgpuBackend: using adapter {}", adapter.get_info().name);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shared linear sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniform_ring = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform ring"),
            size: UNIFORM_RING_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            device,
            queue,
            shaders: HashMap::new(),
            pipelines: HashMap::new(),
            images: HashMap::new(),
            buffers: HashMap::new(),
            next_shader_id: 1,
            next_pipeline_id: 1,
            next_image_id: 1,
            next_buffer_id: 1,
            sampler,
            uniform_ring,
            uniform_scratch: vec![0u8; UNIFORM_RING_SIZE as usize],
            uniform_cursor: 0,
            encoder: None,
            pending_pass: None,
        })
    }

    fn convert_texture_format(format: TextureFormat) -> wgpu::TextureFormat {
        match format {
            TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
        }
    }

    fn convert_vertex_format(format: VertexFormat) -> wgpu::VertexFormat {
        match format {
            VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
            VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
            VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
            VertexFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
        }
    }

    fn convert_compare_function(compare: CompareFunction) -> wgpu::CompareFunction {
        match compare {
            CompareFunction::Never => wgpu::CompareFunction::Never,
            CompareFunction::Less => wgpu::CompareFunction::Less,
            CompareFunction::Equal => wgpu::CompareFunction::Equal,
            CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
            CompareFunction::Greater => wgpu::CompareFunction::Greater,
            CompareFunction::NotEqual => wgpu::CompareFunction::NotEqual,
            CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
            CompareFunction::Always => wgpu::CompareFunction::Always,
        }
    }

    fn convert_buffer_usage(usage: BufferUsage) -> wgpu::BufferUsages {
        let mut result = wgpu::BufferUsages::empty();
        if usage.contains(BufferUsage::COPY_DST) {
            result |= wgpu::BufferUsages::COPY_DST;
        }
        if usage.contains(BufferUsage::VERTEX) {
            result |= wgpu::BufferUsages::VERTEX;
        }
        if usage.contains(BufferUsage::INDEX) {
            result |= wgpu::BufferUsages::INDEX;
        }
        if usage.contains(BufferUsage::UNIFORM) {
            result |= wgpu::BufferUsages::UNIFORM;
        }
        result
    }

    fn convert_texture_usage(usage: TextureUsage) -> wgpu::TextureUsages {
        let mut result = wgpu::TextureUsages::empty();
        if usage.contains(TextureUsage::COPY_DST) {
            result |= wgpu::TextureUsages::COPY_DST;
        }
        if usage.contains(TextureUsage::TEXTURE_BINDING) {
            result |= wgpu::TextureUsages::TEXTURE_BINDING;
        }
        if usage.contains(TextureUsage::RENDER_ATTACHMENT) {
            result |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }
        result
    }

    /// Bind group layout for one stage's uniform blocks (ring buffer slots
    /// bound with dynamic offsets, one binding per block).
    fn uniform_layout(
        &self,
        blocks: &[UniformBlockDesc],
        visibility: wgpu::ShaderStages,
    ) -> wgpu::BindGroupLayout {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = blocks
            .iter()
            .map(|block| wgpu::BindGroupLayoutEntry {
                binding: block.slot,
                visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(block.size as u64),
                },
                count: None,
            })
            .collect();
        self.device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: None,
                entries: &entries,
            })
    }

    /// Bind group over the uniform ring for one stage's blocks.
    fn uniform_bind_group(
        &self,
        layout: &wgpu::BindGroupLayout,
        blocks: &[UniformBlockDesc],
    ) -> wgpu::BindGroup {
        let entries: Vec<wgpu::BindGroupEntry> = blocks
            .iter()
            .map(|block| wgpu::BindGroupEntry {
                binding: block.slot,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &self.uniform_ring,
                    offset: 0,
                    size: NonZeroU64::new(block.size as u64),
                }),
            })
            .collect();
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout,
            entries: &entries,
        })
    }

    /// Texture bind group for the current fragment images.
    fn texture_bind_group(
        &self,
        entry: &ShaderEntry,
        bindings: &Bindings,
    ) -> BackendResult<wgpu::BindGroup> {
        let mut entries = Vec::new();
        for image_slot in &entry.descriptor.fragment.images {
            let handle = bindings.fragment_images[image_slot.slot as usize];
            let view = self
                .images
                .get(&handle.0)
                .ok_or(BackendError::InvalidHandle("image"))?;
            entries.push(wgpu::BindGroupEntry {
                binding: image_slot.slot * 2,
                resource: wgpu::BindingResource::TextureView(view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: image_slot.slot * 2 + 1,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            });
        }
        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: &entry.tex_layout,
            entries: &entries,
        }))
    }
}

impl GraphicsBackend for WgpuBackend {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::Wgpu
    }

    fn features(&self) -> BackendFeatures {
        BackendFeatures {
            // Multisampled offscreen targets are core wgpu functionality.
            msaa_render_targets: true,
        }
    }

    fn create_shader(&mut self, descriptor: &ShaderDescriptor) -> BackendResult<ShaderHandle> {
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(descriptor.label),
                source: wgpu::ShaderSource::Wgsl(descriptor.vertex.source.into()),
            });

        let vs_layout = self.uniform_layout(
            &descriptor.vertex.uniform_blocks,
            wgpu::ShaderStages::VERTEX,
        );
        let fs_layout = self.uniform_layout(
            &descriptor.fragment.uniform_blocks,
            wgpu::ShaderStages::FRAGMENT,
        );

        let mut tex_entries = Vec::new();
        for image_slot in &descriptor.fragment.images {
            tex_entries.push(wgpu::BindGroupLayoutEntry {
                binding: image_slot.slot * 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            tex_entries.push(wgpu::BindGroupLayoutEntry {
                binding: image_slot.slot * 2 + 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }
        let tex_layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: None,
                entries: &tex_entries,
            });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(descriptor.label),
                bind_group_layouts: &[&vs_layout, &fs_layout, &tex_layout],
                push_constant_ranges: &[],
            });

        let vs_bind_group = self.uniform_bind_group(&vs_layout, &descriptor.vertex.uniform_blocks);
        let fs_bind_group =
            self.uniform_bind_group(&fs_layout, &descriptor.fragment.uniform_blocks);

        let id = self.next_shader_id;
        self.next_shader_id += 1;
        self.shaders.insert(
            id,
            ShaderEntry {
                module,
                descriptor: descriptor.clone(),
                tex_layout,
                pipeline_layout,
                vs_bind_group,
                fs_bind_group,
            },
        );

        log::debug!("WgpuBackend: created shader '{}'", descriptor.label);
        Ok(ShaderHandle(id))
    }

    fn create_pipeline(
        &mut self,
        descriptor: &PipelineDescriptor,
    ) -> BackendResult<PipelineHandle> {
        let entry = self
            .shaders
            .get(&descriptor.shader.0)
            .ok_or(BackendError::InvalidHandle("shader"))?;

        let attributes: Vec<wgpu::VertexAttribute> = descriptor
            .layout
            .attributes
            .iter()
            .map(|a| wgpu::VertexAttribute {
                format: Self::convert_vertex_format(a.format),
                offset: a.offset,
                shader_location: a.slot,
            })
            .collect();
        let vertex_buffers = [wgpu::VertexBufferLayout {
            array_stride: descriptor.layout.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        }];

        let color_targets: Vec<Option<wgpu::ColorTargetState>> = (0..descriptor.color_count)
            .map(|_| {
                Some(wgpu::ColorTargetState {
                    format: COLOR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let is_strip = matches!(
            descriptor.primitive,
            PrimitiveTopology::LineStrip | PrimitiveTopology::TriangleStrip
        );
        let strip_index_format = match (is_strip, descriptor.index_type) {
            (true, IndexType::Uint16) => Some(wgpu::IndexFormat::Uint16),
            (true, IndexType::Uint32) => Some(wgpu::IndexFormat::Uint32),
            _ => None,
        };

        let primitive = wgpu::PrimitiveState {
            topology: match descriptor.primitive {
                PrimitiveTopology::PointList => wgpu::PrimitiveTopology::PointList,
                PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
                PrimitiveTopology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
                PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
                PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
            },
            strip_index_format,
            front_face: match descriptor.front_face {
                FrontFace::Ccw => wgpu::FrontFace::Ccw,
                FrontFace::Cw => wgpu::FrontFace::Cw,
            },
            cull_mode: match descriptor.cull_mode {
                CullMode::None => None,
                CullMode::Front => Some(wgpu::Face::Front),
                CullMode::Back => Some(wgpu::Face::Back),
            },
            ..Default::default()
        };

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(descriptor.label),
                layout: Some(&entry.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &entry.module,
                    entry_point: entry.descriptor.vertex.entry_point,
                    buffers: &vertex_buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &entry.module,
                    entry_point: entry.descriptor.fragment.entry_point,
                    targets: &color_targets,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive,
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: descriptor.depth.write_enabled,
                    depth_compare: Self::convert_compare_function(descriptor.depth.compare),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: descriptor.sample_count,
                    ..Default::default()
                },
                multiview: None,
            });

        let id = self.next_pipeline_id;
        self.next_pipeline_id += 1;
        self.pipelines.insert(
            id,
            PipelineEntry {
                pipeline,
                shader: descriptor.shader,
                index_type: descriptor.index_type,
            },
        );

        log::debug!(
            "WgpuBackend: created pipeline '{}' ({} color targets, {} samples)",
            descriptor.label,
            descriptor.color_count,
            descriptor.sample_count
        );
        Ok(PipelineHandle(id))
    }

    fn create_image(
        &mut self,
        descriptor: &ImageDescriptor,
        pixels: &[u8],
    ) -> BackendResult<ImageHandle> {
        let expected =
            (descriptor.width * descriptor.height * descriptor.format.bytes_per_pixel()) as usize;
        if pixels.len() != expected {
            return Err(BackendError::ImageCreationFailed(format!(
                "'{}': expected {} bytes of pixel data, got {}",
                descriptor.label,
                expected,
                pixels.len()
            )));
        }

        let size = wgpu::Extent3d {
            width: descriptor.width,
            height: descriptor.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(descriptor.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::convert_texture_format(descriptor.format),
            usage: Self::convert_texture_usage(descriptor.usage),
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(descriptor.width * descriptor.format.bytes_per_pixel()),
                rows_per_image: Some(descriptor.height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let id = self.next_image_id;
        self.next_image_id += 1;
        self.images.insert(id, view);
        Ok(ImageHandle(id))
    }

    fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle> {
        if !data.is_empty() && data.len() as u64 != descriptor.size {
            return Err(BackendError::BufferCreationFailed(format!(
                "'{}': initial data is {} bytes but the buffer is {}",
                descriptor.label,
                data.len(),
                descriptor.size
            )));
        }

        // wgpu requires COPY_DST alignment of 4 for buffer writes.
        let padded_size = (descriptor.size + 3) & !3;
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(descriptor.label),
            size: padded_size,
            usage: Self::convert_buffer_usage(descriptor.usage) | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        if !data.is_empty() {
            self.queue.write_buffer(&buffer, 0, data);
        }

        let id = self.next_buffer_id;
        self.next_buffer_id += 1;
        self.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }

    fn begin_pass(&mut self, descriptor: &PassDescriptor) {
        debug_assert!(self.pending_pass.is_none(), "begin_pass inside an open pass");
        self.pending_pass = Some(PendingRenderPass {
            descriptor: descriptor.clone(),
            commands: Vec::new(),
        });
    }

    fn apply_pipeline(&mut self, pipeline: PipelineHandle) {
        if let Some(pass) = &mut self.pending_pass {
            pass.commands.push(RenderCommand::SetPipeline(pipeline));
        }
    }

    fn apply_bindings(&mut self, bindings: &Bindings) {
        if let Some(pass) = &mut self.pending_pass {
            pass.commands.push(RenderCommand::SetBindings(*bindings));
        }
    }

    fn apply_uniform_block(&mut self, stage: ShaderStage, slot: u32, data: &[u8]) {
        debug_assert!(data.len() as u64 <= UNIFORM_SLOT_ALIGN * 4);
        let aligned = (data.len() as u64 + UNIFORM_SLOT_ALIGN - 1) & !(UNIFORM_SLOT_ALIGN - 1);
        if self.uniform_cursor + aligned > UNIFORM_RING_SIZE {
            log::warn!("WgpuBackend: uniform ring exhausted, wrapping");
            self.uniform_cursor = 0;
        }
        let offset = self.uniform_cursor;
        self.uniform_scratch[offset as usize..offset as usize + data.len()].copy_from_slice(data);
        self.uniform_cursor += aligned;

        if let Some(pass) = &mut self.pending_pass {
            pass.commands.push(RenderCommand::SetUniform {
                stage,
                slot,
                ring_offset: offset as u32,
            });
        }
    }

    fn draw(&mut self, elements: std::ops::Range<u32>, instances: std::ops::Range<u32>) {
        if let Some(pass) = &mut self.pending_pass {
            pass.commands.push(RenderCommand::Draw {
                elements,
                instances,
            });
        }
    }

    fn end_pass(&mut self) {
        let Some(pending) = self.pending_pass.take() else {
            debug_assert!(false, "end_pass without begin_pass");
            return;
        };

        // Flush this frame's uniform writes before the pass samples them.
        if self.uniform_cursor > 0 {
            self.queue.write_buffer(
                &self.uniform_ring,
                0,
                &self.uniform_scratch[..self.uniform_cursor as usize],
            );
        }

        // Resolve the command stream into draw calls and pre-create the
        // texture bind groups, since nothing can be created while the pass
        // borrows the encoder.
        let mut draws: Vec<ResolvedDraw> = Vec::new();
        let mut tex_groups: Vec<wgpu::BindGroup> = Vec::new();
        {
            let mut pipeline = PipelineHandle::INVALID;
            let mut bindings = Bindings::default();
            let mut offsets: HashMap<(ShaderStage, u32), u32> = HashMap::new();

            for command in &pending.commands {
                match command {
                    RenderCommand::SetPipeline(handle) => pipeline = *handle,
                    RenderCommand::SetBindings(b) => bindings = *b,
                    RenderCommand::SetUniform {
                        stage,
                        slot,
                        ring_offset,
                    } => {
                        offsets.insert((*stage, *slot), *ring_offset);
                    }
                    RenderCommand::Draw {
                        elements,
                        instances,
                    } => {
                        let Some(pipeline_entry) = self.pipelines.get(&pipeline.0) else {
                            log::error!("WgpuBackend: draw with invalid pipeline {pipeline:?}");
                            continue;
                        };
                        let shader = &self.shaders[&pipeline_entry.shader.0];

                        let collect = |stage: ShaderStage, blocks: &[UniformBlockDesc]| {
                            let mut sorted: Vec<&UniformBlockDesc> = blocks.iter().collect();
                            sorted.sort_by_key(|b| b.slot);
                            sorted
                                .iter()
                                .map(|b| offsets.get(&(stage, b.slot)).copied().unwrap_or(0))
                                .collect::<Vec<u32>>()
                        };

                        let tex_group = match self.texture_bind_group(shader, &bindings) {
                            Ok(group) => group,
                            Err(e) => {
                                log::error!("WgpuBackend: draw skipped: {e}");
                                continue;
                            }
                        };
                        tex_groups.push(tex_group);

                        draws.push(ResolvedDraw {
                            pipeline: pipeline.0,
                            vs_offsets: collect(
                                ShaderStage::Vertex,
                                &shader.descriptor.vertex.uniform_blocks,
                            ),
                            fs_offsets: collect(
                                ShaderStage::Fragment,
                                &shader.descriptor.fragment.uniform_blocks,
                            ),
                            tex_group: tex_groups.len() - 1,
                            vertex_buffers: bindings.vertex_buffers,
                            index_buffer: bindings.index_buffer,
                            index_type: pipeline_entry.index_type,
                            elements: elements.clone(),
                            instances: instances.clone(),
                        });
                    }
                }
            }
        }

        // Offscreen attachments.
        let descriptor = &pending.descriptor;
        let color_textures: Vec<wgpu::Texture> = (0..descriptor.color_count)
            .map(|i| {
                self.device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(if i == 0 { "pass color" } else { "pass aux color" }),
                    size: wgpu::Extent3d {
                        width: descriptor.width,
                        height: descriptor.height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: descriptor.sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format: COLOR_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
            })
            .collect();
        let color_views: Vec<wgpu::TextureView> = color_textures
            .iter()
            .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()))
            .collect();
        let depth_texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("pass depth"),
            size: wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: descriptor.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let clear = wgpu::Color {
            r: descriptor.clear_color[0] as f64,
            g: descriptor.clear_color[1] as f64,
            b: descriptor.clear_color[2] as f64,
            a: descriptor.clear_color[3] as f64,
        };
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = color_views
            .iter()
            .map(|view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect();

        let shaders = &self.shaders;
        let pipelines = &self.pipelines;
        let buffers = &self.buffers;
        let encoder = {
            if self.encoder.is_none() {
                self.encoder = Some(self.device.create_command_encoder(
                    &wgpu::CommandEncoderDescriptor {
                        label: Some("frame encoder"),
                    },
                ));
            }
            self.encoder.as_mut().unwrap()
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(descriptor.label),
                color_attachments: &color_attachments,
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in &draws {
                let pipeline_entry = &pipelines[&draw.pipeline];
                let shader = &shaders[&pipeline_entry.shader.0];

                pass.set_pipeline(&pipeline_entry.pipeline);
                pass.set_bind_group(0, &shader.vs_bind_group, &draw.vs_offsets);
                pass.set_bind_group(1, &shader.fs_bind_group, &draw.fs_offsets);
                pass.set_bind_group(2, &tex_groups[draw.tex_group], &[]);

                for (slot, handle) in draw.vertex_buffers.iter().enumerate() {
                    if let Some(buffer) = buffers.get(&handle.0) {
                        pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                    }
                }

                match draw.index_type {
                    IndexType::None => {
                        pass.draw(draw.elements.clone(), draw.instances.clone());
                    }
                    IndexType::Uint16 | IndexType::Uint32 => {
                        let Some(buffer) = buffers.get(&draw.index_buffer.0) else {
                            log::error!("WgpuBackend: indexed draw without index buffer");
                            continue;
                        };
                        let format = if draw.index_type == IndexType::Uint16 {
                            wgpu::IndexFormat::Uint16
                        } else {
                            wgpu::IndexFormat::Uint32
                        };
                        pass.set_index_buffer(buffer.slice(..), format);
                        pass.draw_indexed(draw.elements.clone(), 0, draw.instances.clone());
                    }
                }
            }
        }
    }

    fn commit(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
        self.uniform_cursor = 0;
    }
}
