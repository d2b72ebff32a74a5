//! Core backend abstraction traits
//!
//! These traits define the interface the resource cache and materials use to
//! reach the underlying GPU API. The backend owns every created object; the
//! rest of the crate only ever holds handles.

use crate::backend::types::*;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to initialize backend: {0}")]
    InitializationFailed(String),
    #[error("Failed to create shader: {0}")]
    ShaderCreationFailed(String),
    #[error("Failed to create pipeline: {0}")]
    PipelineCreationFailed(String),
    #[error("Failed to create image: {0}")]
    ImageCreationFailed(String),
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Feature not supported: {0}")]
    FeatureNotSupported(String),
    #[error("Invalid {0} handle")]
    InvalidHandle(&'static str),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a compiled shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShaderHandle(pub(crate) u64);

/// Handle to a render pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PipelineHandle(pub(crate) u64);

/// Handle to a GPU image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageHandle(pub(crate) u64);

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferHandle(pub(crate) u64);

impl ShaderHandle {
    /// The reserved "not yet created" value.
    pub const INVALID: Self = Self(0);

    /// Whether this handle refers to a created backend object.
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl PipelineHandle {
    /// The reserved "not yet created" value.
    pub const INVALID: Self = Self(0);

    /// Whether this handle refers to a created backend object.
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl ImageHandle {
    /// The reserved "not yet created" value.
    pub const INVALID: Self = Self(0);

    /// Whether this handle refers to a created backend object.
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl BufferHandle {
    /// The reserved "not yet created" value.
    pub const INVALID: Self = Self(0);

    /// Whether this handle refers to a created backend object.
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

/// Which GPU API a backend drives.
///
/// Shader descriptors embed this so that a cache populated for one API is
/// never consulted for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// In-process registry without a GPU (tests, CI, tools).
    Headless,
    /// wgpu-backed device.
    Wgpu,
}

/// Capability flags queried by material setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendFeatures {
    /// Whether offscreen render targets can be multisampled.
    pub msaa_render_targets: bool,
}

impl Default for BackendFeatures {
    fn default() -> Self {
        Self {
            msaa_render_targets: true,
        }
    }
}

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Main graphics backend trait
///
/// Creation calls are fallible and report through [`BackendError`]; the
/// per-frame calls are infallible by contract (invalid handles there are
/// programming errors, checked with debug assertions).
///
/// All calls happen on the thread that owns the graphics context; the
/// `&mut self` receiver is the whole synchronization story.
pub trait GraphicsBackend {
    /// Which GPU API this backend drives.
    fn backend_kind(&self) -> BackendKind;

    /// Query capability flags.
    fn features(&self) -> BackendFeatures;

    // Resource creation

    /// Create a shader program from its structural descriptor.
    fn create_shader(&mut self, descriptor: &ShaderDescriptor) -> BackendResult<ShaderHandle>;

    /// Create a render pipeline from its structural descriptor.
    fn create_pipeline(&mut self, descriptor: &PipelineDescriptor)
        -> BackendResult<PipelineHandle>;

    /// Create an image with initial pixel contents.
    ///
    /// `pixels` must be exactly `width * height * bytes_per_pixel` long.
    fn create_image(
        &mut self,
        descriptor: &ImageDescriptor,
        pixels: &[u8],
    ) -> BackendResult<ImageHandle>;

    /// Create a buffer with initial contents.
    ///
    /// An empty `data` slice leaves the buffer zero-initialized at
    /// `descriptor.size`; otherwise `data.len()` must equal the size.
    fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle>;

    // Per-frame calls

    /// Begin an offscreen render pass.
    fn begin_pass(&mut self, descriptor: &PassDescriptor);

    /// Select the pipeline for subsequent draws.
    fn apply_pipeline(&mut self, pipeline: PipelineHandle);

    /// Bind vertex/index buffers and fragment images.
    fn apply_bindings(&mut self, bindings: &Bindings);

    /// Upload one uniform block to a stage slot.
    ///
    /// `data` must be exactly the byte size the bound shader declares for
    /// that slot; the crate enforces this at compile time for its own
    /// uniform structs.
    fn apply_uniform_block(&mut self, stage: ShaderStage, slot: u32, data: &[u8]);

    /// Draw a range of elements (indices when an index buffer is bound,
    /// vertices otherwise).
    fn draw(&mut self, elements: std::ops::Range<u32>, instances: std::ops::Range<u32>);

    /// End the current render pass.
    fn end_pass(&mut self);

    /// Submit the frame's recorded work.
    fn commit(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_handles() {
        assert!(!ShaderHandle::INVALID.is_valid());
        assert!(!PipelineHandle::default().is_valid());
        assert!(ImageHandle(7).is_valid());
    }

    #[test]
    fn test_error_display() {
        let err = BackendError::ShaderCreationFailed("compile error".to_string());
        assert_eq!(err.to_string(), "Failed to create shader: compile error");

        let err = BackendError::InvalidHandle("pipeline");
        assert_eq!(err.to_string(), "Invalid pipeline handle");
    }
}
