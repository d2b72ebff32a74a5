//! Common types shared between backends
//!
//! The descriptor structs here are value objects: two descriptors that
//! compare equal describe the same backend object, which is what makes them
//! usable as cache keys. Everything derives `Eq` and `Hash` and contains no
//! floating-point fields.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::backend::traits::{BackendKind, BufferHandle, ImageHandle, ShaderHandle};

/// Maximum vertex buffer bind slots per draw.
pub const MAX_VERTEX_BUFFERS: usize = 4;

/// Maximum fragment-stage image bind slots per draw.
pub const MAX_FRAGMENT_IMAGES: usize = 8;

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Depth32Float,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::Depth32Float)
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Depth32Float => 4,
        }
    }
}

bitflags::bitflags! {
    /// Texture usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const COPY_DST = 1 << 0;
        const TEXTURE_BINDING = 1 << 1;
        const RENDER_ATTACHMENT = 1 << 2;
    }
}

bitflags::bitflags! {
    /// Buffer usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const COPY_DST = 1 << 0;
        const VERTEX = 1 << 1;
        const INDEX = 1 << 2;
        const UNIFORM = 1 << 3;
    }
}

/// Image descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageDescriptor {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl Default for ImageDescriptor {
    fn default() -> Self {
        Self {
            label: "",
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::TEXTURE_BINDING.union(TextureUsage::COPY_DST),
        }
    }
}

/// Buffer descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferDescriptor {
    pub label: &'static str,
    pub size: u64,
    pub usage: BufferUsage,
}

/// Vertex attribute format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Float32x4,
    /// Four 8-bit channels normalized to `[0, 1]`.
    Unorm8x4,
}

impl VertexFormat {
    pub fn size(&self) -> u64 {
        match self {
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
            VertexFormat::Unorm8x4 => 4,
        }
    }
}

/// One attribute inside a vertex buffer layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader attribute slot this feeds.
    pub slot: u32,
    pub format: VertexFormat,
    pub offset: u64,
}

/// Vertex buffer layout
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: Vec<VertexAttribute>,
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

/// Index element width, or no index buffer at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    None,
    Uint16,
    Uint32,
}

/// Front face winding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    Ccw,
    Cw,
}

/// Cull mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Compare function for depth testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Depth test state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub compare: CompareFunction,
    pub write_enabled: bool,
}

/// One uniform block a shader stage declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformBlockDesc {
    pub name: &'static str,
    pub slot: u32,
    /// Declared block size in bytes (a multiple of 16).
    pub size: u32,
}

/// One sampled image a shader stage declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageSlotDesc {
    pub name: &'static str,
    pub slot: u32,
}

/// One vertex attribute a shader declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeDesc {
    pub name: &'static str,
    pub slot: u32,
}

/// Per-stage half of a shader descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StageDesc {
    /// Compiled artifact text for this stage (opaque to the core).
    pub source: &'static str,
    pub entry_point: &'static str,
    pub uniform_blocks: Vec<UniformBlockDesc>,
    pub images: Vec<ImageSlotDesc>,
}

/// Structural description of a shader program.
///
/// Equivalence is full field-wise equality; the resource cache uses this as
/// its key, so construction must be deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderDescriptor {
    pub label: &'static str,
    pub backend: BackendKind,
    pub attributes: Vec<AttributeDesc>,
    pub vertex: StageDesc,
    pub fragment: StageDesc,
}

/// Structural description of a render pipeline.
///
/// Embeds the shader handle, so pipelines sharing a shader but differing in
/// layout, sample count or attachment count are distinct cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineDescriptor {
    pub label: &'static str,
    pub shader: ShaderHandle,
    pub layout: VertexLayout,
    pub primitive: PrimitiveTopology,
    pub index_type: IndexType,
    pub depth: DepthState,
    /// Number of color attachments the pipeline renders to.
    pub color_count: u32,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub sample_count: u32,
}

/// Offscreen render pass description.
#[derive(Debug, Clone, PartialEq)]
pub struct PassDescriptor {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub color_count: u32,
    pub sample_count: u32,
    pub clear_color: [f32; 4],
}

impl Default for PassDescriptor {
    fn default() -> Self {
        Self {
            label: "",
            width: 256,
            height: 256,
            color_count: 1,
            sample_count: 1,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Resource bindings for one draw.
///
/// Slots left at their default hold [`BufferHandle::INVALID`] /
/// [`ImageHandle::INVALID`] and must not be referenced by the bound shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bindings {
    pub vertex_buffers: [BufferHandle; MAX_VERTEX_BUFFERS],
    pub index_buffer: BufferHandle,
    pub fragment_images: [ImageHandle; MAX_FRAGMENT_IMAGES],
}

/// Standard vertex with position, color, normal, UV, and tangent
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub color: [u8; 4],
    pub normal: Vec3,
    pub uv: Vec2,
    pub tangent: Vec3,
}

impl Vertex {
    /// Byte offset of each field inside the interleaved buffer.
    pub const OFFSET_POSITION: u64 = 0;
    pub const OFFSET_COLOR: u64 = 12;
    pub const OFFSET_NORMAL: u64 = 16;
    pub const OFFSET_UV: u64 = 28;
    pub const OFFSET_TANGENT: u64 = 36;

    pub const STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;
}

static_assertions::const_assert_eq!(std::mem::size_of::<Vertex>(), 48);
