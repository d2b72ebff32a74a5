//! Vermilion - a PBR material renderer core
//!
//! The crate turns declarative shader and pipeline descriptors into GPU
//! backend handles exactly once, and maps logical PBR materials (textures +
//! scalar factors) onto the fixed binding slots and uniform-block layout the
//! compiled shader declares.
//!
//! # Architecture
//!
//! - [`backend`] - handle registry over a GPU API (headless always, wgpu
//!   behind the `wgpu-backend` feature); pure pass-through, no caching
//! - [`resources`] - the deduplicating descriptor cache, placeholder images
//!   and the [`PbrMaterial`] binding/uniform protocol
//! - [`shader`] - per-material-type reflection tables and uniform structs,
//!   with block sizes pinned at compile time
//!
//! # Example
//!
//! ```
//! use vermilion_render::{
//!     HeadlessBackend, IndexType, PbrMaterial, PrimitiveTopology, RenderConfig, ResourceManager,
//! };
//!
//! let mut rm = ResourceManager::new(HeadlessBackend::new()).unwrap();
//! let config = RenderConfig::default();
//!
//! let a = PbrMaterial::create(
//!     &mut rm,
//!     &config,
//!     PrimitiveTopology::TriangleList,
//!     IndexType::Uint16,
//! )
//! .unwrap();
//! let b = PbrMaterial::create(
//!     &mut rm,
//!     &config,
//!     PrimitiveTopology::TriangleList,
//!     IndexType::Uint16,
//! )
//! .unwrap();
//!
//! // Equivalent configurations share one backend pipeline.
//! assert_eq!(a.pipeline(), b.pipeline());
//! ```

pub mod backend;
pub mod resources;
pub mod shader;

pub use backend::headless::HeadlessBackend;
pub use backend::traits::{
    BackendError, BackendFeatures, BackendKind, BackendResult, BufferHandle, GraphicsBackend,
    ImageHandle, PipelineHandle, ShaderHandle, ShaderStage,
};
pub use backend::types::{
    Bindings, BufferDescriptor, BufferUsage, CompareFunction, CullMode, DepthState, FrontFace,
    ImageDescriptor, IndexType, PassDescriptor, PipelineDescriptor, PrimitiveTopology,
    ShaderDescriptor, TextureFormat, TextureUsage, Vertex, VertexAttribute, VertexFormat,
    VertexLayout,
};
pub use resources::{DefaultImage, FrameParams, PbrMaterial, ResourceManager, TextureData};

#[cfg(feature = "wgpu-backend")]
pub use backend::wgpu_backend::WgpuBackend;

/// Configuration for material and pipeline setup
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Requested MSAA sample count for offscreen targets.
    ///
    /// Clamped to 1 at material init when the backend cannot multisample
    /// render targets.
    pub msaa_samples: u32,
    /// Render to three color attachments instead of one.
    pub use_mrt: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            msaa_samples: 4,
            use_mrt: false,
        }
    }
}
