//! Headless registry backend.
//!
//! Assigns real handles and keeps full records of every creation and upload
//! without touching a GPU, so the resource cache and material protocol can
//! run (and be observed) in tests, CI and tools. Handle storage follows the
//! same `HashMap<u64, _>` + counter scheme the wgpu backend uses.

use std::collections::HashMap;

use crate::backend::traits::*;
use crate::backend::types::*;

/// One recorded uniform-block upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformUpload {
    pub stage: ShaderStage,
    pub slot: u32,
    pub bytes: Vec<u8>,
}

/// Headless registry backend.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    features: BackendFeatures,

    // Resource storage
    shaders: HashMap<u64, ShaderDescriptor>,
    pipelines: HashMap<u64, PipelineDescriptor>,
    images: HashMap<u64, ImageDescriptor>,
    buffers: HashMap<u64, BufferDescriptor>,

    // Handle counters (zero is the reserved invalid handle)
    next_shader_id: u64,
    next_pipeline_id: u64,
    next_image_id: u64,
    next_buffer_id: u64,

    // Backend-call counters, kept separate from the maps so tests can
    // distinguish "created again" from "looked up".
    shader_creations: usize,
    pipeline_creations: usize,
    image_creations: usize,

    // Scripted failures for exercising the non-memoization policy
    fail_next_shader: bool,
    fail_next_pipeline: bool,

    // Frame state
    in_pass: bool,
    current_pipeline: PipelineHandle,
    last_bindings: Option<Bindings>,
    uniform_uploads: Vec<UniformUpload>,
    draw_count: usize,
    frame_count: usize,
}

impl HeadlessBackend {
    /// Create a new headless backend with default capabilities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a headless backend with explicit capability flags.
    pub fn with_features(features: BackendFeatures) -> Self {
        Self {
            features,
            ..Self::default()
        }
    }

    /// Make the next `create_shader` call fail (test support).
    pub fn fail_next_shader_creation(&mut self) {
        self.fail_next_shader = true;
    }

    /// Make the next `create_pipeline` call fail (test support).
    pub fn fail_next_pipeline_creation(&mut self) {
        self.fail_next_pipeline = true;
    }

    /// Number of `create_shader` calls that reached the backend.
    pub fn shader_creations(&self) -> usize {
        self.shader_creations
    }

    /// Number of `create_pipeline` calls that reached the backend.
    pub fn pipeline_creations(&self) -> usize {
        self.pipeline_creations
    }

    /// Number of `create_image` calls that reached the backend.
    pub fn image_creations(&self) -> usize {
        self.image_creations
    }

    /// Descriptor a pipeline handle was created from.
    pub fn pipeline_descriptor(&self, pipeline: PipelineHandle) -> Option<&PipelineDescriptor> {
        self.pipelines.get(&pipeline.0)
    }

    /// Descriptor a shader handle was created from.
    pub fn shader_descriptor(&self, shader: ShaderHandle) -> Option<&ShaderDescriptor> {
        self.shaders.get(&shader.0)
    }

    /// Every uniform-block upload recorded since the last
    /// [`clear_records`](Self::clear_records), in call order.
    pub fn uniform_uploads(&self) -> &[UniformUpload] {
        &self.uniform_uploads
    }

    /// The bindings most recently applied.
    pub fn last_bindings(&self) -> Option<&Bindings> {
        self.last_bindings.as_ref()
    }

    /// Draws issued since construction.
    pub fn draw_count(&self) -> usize {
        self.draw_count
    }

    /// Frames committed since construction.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Forget recorded uploads and bindings (creation counters are kept).
    pub fn clear_records(&mut self) {
        self.uniform_uploads.clear();
        self.last_bindings = None;
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::Headless
    }

    fn features(&self) -> BackendFeatures {
        self.features
    }

    fn create_shader(&mut self, descriptor: &ShaderDescriptor) -> BackendResult<ShaderHandle> {
        self.shader_creations += 1;
        if self.fail_next_shader {
            self.fail_next_shader = false;
            return Err(BackendError::ShaderCreationFailed(format!(
                "scripted failure for '{}'",
                descriptor.label
            )));
        }

        self.next_shader_id += 1;
        let handle = ShaderHandle(self.next_shader_id);
        self.shaders.insert(handle.0, descriptor.clone());
        log::trace!(
            "HeadlessBackend: created shader '{}' -> {:?}",
            descriptor.label,
            handle
        );
        Ok(handle)
    }

    fn create_pipeline(
        &mut self,
        descriptor: &PipelineDescriptor,
    ) -> BackendResult<PipelineHandle> {
        self.pipeline_creations += 1;
        if self.fail_next_pipeline {
            self.fail_next_pipeline = false;
            return Err(BackendError::PipelineCreationFailed(format!(
                "scripted failure for '{}'",
                descriptor.label
            )));
        }
        if !self.shaders.contains_key(&descriptor.shader.0) {
            return Err(BackendError::PipelineCreationFailed(format!(
                "'{}' references unknown shader {:?}",
                descriptor.label, descriptor.shader
            )));
        }

        self.next_pipeline_id += 1;
        let handle = PipelineHandle(self.next_pipeline_id);
        self.pipelines.insert(handle.0, descriptor.clone());
        log::trace!(
            "HeadlessBackend: created pipeline '{}' ({} color targets, {} samples) -> {:?}",
            descriptor.label,
            descriptor.color_count,
            descriptor.sample_count,
            handle
        );
        Ok(handle)
    }

    fn create_image(
        &mut self,
        descriptor: &ImageDescriptor,
        pixels: &[u8],
    ) -> BackendResult<ImageHandle> {
        self.image_creations += 1;
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

        self.next_image_id += 1;
        let handle = ImageHandle(self.next_image_id);
        self.images.insert(handle.0, descriptor.clone());
        log::trace!(
            "HeadlessBackend: created image '{}' ({}x{}) -> {:?}",
            descriptor.label,
            descriptor.width,
            descriptor.height,
            handle
        );
        Ok(handle)
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

        self.next_buffer_id += 1;
        let handle = BufferHandle(self.next_buffer_id);
        self.buffers.insert(handle.0, descriptor.clone());
        log::trace!(
            "HeadlessBackend: created buffer '{}' (size {}) -> {:?}",
            descriptor.label,
            descriptor.size,
            handle
        );
        Ok(handle)
    }

    fn begin_pass(&mut self, descriptor: &PassDescriptor) {
        debug_assert!(!self.in_pass, "begin_pass inside an open pass");
        self.in_pass = true;
        log::trace!(
            "HeadlessBackend: begin pass '{}' ({}x{}, {} color targets)",
            descriptor.label,
            descriptor.width,
            descriptor.height,
            descriptor.color_count
        );
    }

    fn apply_pipeline(&mut self, pipeline: PipelineHandle) {
        debug_assert!(
            self.pipelines.contains_key(&pipeline.0),
            "apply_pipeline with unknown handle {pipeline:?}"
        );
        self.current_pipeline = pipeline;
    }

    fn apply_bindings(&mut self, bindings: &Bindings) {
        self.last_bindings = Some(*bindings);
    }

    fn apply_uniform_block(&mut self, stage: ShaderStage, slot: u32, data: &[u8]) {
        self.uniform_uploads.push(UniformUpload {
            stage,
            slot,
            bytes: data.to_vec(),
        });
    }

    fn draw(&mut self, elements: std::ops::Range<u32>, instances: std::ops::Range<u32>) {
        debug_assert!(self.in_pass, "draw outside a pass");
        debug_assert!(
            self.current_pipeline.is_valid(),
            "draw without an applied pipeline"
        );
        log::trace!(
            "HeadlessBackend: draw elements {:?} instances {:?}",
            elements,
            instances
        );
        self.draw_count += 1;
    }

    fn end_pass(&mut self) {
        debug_assert!(self.in_pass, "end_pass without begin_pass");
        self.in_pass = false;
    }

    fn commit(&mut self) {
        debug_assert!(!self.in_pass, "commit inside an open pass");
        self.frame_count += 1;
        log::trace!("HeadlessBackend: committed frame {}", self.frame_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::pbr;

    fn shader_handle(backend: &mut HeadlessBackend) -> ShaderHandle {
        backend
            .create_shader(&pbr::shader_descriptor(BackendKind::Headless, false))
            .unwrap()
    }

    #[test]
    fn test_handles_start_after_invalid() {
        let mut backend = HeadlessBackend::new();
        let shader = shader_handle(&mut backend);
        assert!(shader.is_valid());
        assert_eq!(shader, ShaderHandle(1));
    }

    #[test]
    fn test_every_creation_call_is_counted() {
        let mut backend = HeadlessBackend::new();
        let desc = pbr::shader_descriptor(BackendKind::Headless, false);
        backend.create_shader(&desc).unwrap();
        backend.create_shader(&desc).unwrap();
        // The registry never deduplicates; that is the cache's job.
        assert_eq!(backend.shader_creations(), 2);
    }

    #[test]
    fn test_pipeline_requires_known_shader() {
        let mut backend = HeadlessBackend::new();
        let shader = shader_handle(&mut backend);

        let mut desc = PipelineDescriptor {
            label: "test",
            shader,
            layout: VertexLayout {
                stride: Vertex::STRIDE,
                attributes: vec![],
            },
            primitive: PrimitiveTopology::TriangleList,
            index_type: IndexType::Uint16,
            depth: DepthState {
                compare: CompareFunction::LessEqual,
                write_enabled: true,
            },
            color_count: 1,
            cull_mode: CullMode::None,
            front_face: FrontFace::Ccw,
            sample_count: 1,
        };
        assert!(backend.create_pipeline(&desc).is_ok());

        desc.shader = ShaderHandle(99);
        assert!(matches!(
            backend.create_pipeline(&desc),
            Err(BackendError::PipelineCreationFailed(_))
        ));
    }

    #[test]
    fn test_image_pixel_size_is_validated() {
        let mut backend = HeadlessBackend::new();
        let desc = ImageDescriptor {
            label: "test",
            width: 2,
            height: 2,
            ..Default::default()
        };
        assert!(backend.create_image(&desc, &[0u8; 16]).is_ok());
        assert!(matches!(
            backend.create_image(&desc, &[0u8; 4]),
            Err(BackendError::ImageCreationFailed(_))
        ));
    }

    #[test]
    fn test_uniform_uploads_are_recorded_in_order() {
        let mut backend = HeadlessBackend::new();
        backend.apply_uniform_block(ShaderStage::Vertex, 0, &[1, 2, 3, 4]);
        backend.apply_uniform_block(ShaderStage::Fragment, 2, &[5, 6]);

        let uploads = backend.uniform_uploads();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].stage, ShaderStage::Vertex);
        assert_eq!(uploads[0].bytes, vec![1, 2, 3, 4]);
        assert_eq!(uploads[1].slot, 2);
    }
}
