//! Deduplicating GPU resource cache.
//!
//! The [`ResourceManager`] sits between material setup and the backend
//! registry. Shader and pipeline descriptors are looked up by structural
//! equality; each distinct descriptor reaches the backend at most once for
//! the manager's lifetime, and the returned handle stays valid just as long
//! (nothing is ever evicted).
//!
//! Sharing discipline is single-writer, same-thread: the manager is reached
//! through `&mut` on the thread that owns the graphics context, so no
//! locking is involved.

use std::collections::HashMap;

use crate::backend::traits::{
    BackendResult, GraphicsBackend, ImageHandle, PipelineHandle, ShaderHandle,
};
use crate::backend::types::{PipelineDescriptor, ShaderDescriptor};
use crate::resources::texture::TextureData;

/// The fixed set of placeholder images, created once at manager construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultImage {
    /// 1x1 opaque white (base color, metallic-roughness, occlusion).
    White,
    /// 1x1 opaque black (emissive).
    Black,
    /// 1x1 flat tangent-space normal.
    Normal,
    /// Magenta/black checkerboard for visibly missing textures.
    Checkerboard,
}

impl DefaultImage {
    const ALL: [DefaultImage; 4] = [
        DefaultImage::White,
        DefaultImage::Black,
        DefaultImage::Normal,
        DefaultImage::Checkerboard,
    ];

    fn index(self) -> usize {
        match self {
            DefaultImage::White => 0,
            DefaultImage::Black => 1,
            DefaultImage::Normal => 2,
            DefaultImage::Checkerboard => 3,
        }
    }

    fn data(self) -> TextureData {
        match self {
            DefaultImage::White => TextureData::white(),
            DefaultImage::Black => TextureData::black(),
            DefaultImage::Normal => TextureData::flat_normal(),
            DefaultImage::Checkerboard => {
                TextureData::checkerboard(16, [255, 0, 255, 255], [0, 0, 0, 255])
            }
        }
    }
}

/// Owns a backend and deduplicates shader/pipeline creation against it.
pub struct ResourceManager<B: GraphicsBackend> {
    backend: B,
    shaders: HashMap<ShaderDescriptor, ShaderHandle>,
    pipelines: HashMap<PipelineDescriptor, PipelineHandle>,
    default_images: [ImageHandle; DefaultImage::ALL.len()],
}

impl<B: GraphicsBackend> ResourceManager<B> {
    /// Create a manager, synchronously creating every [`DefaultImage`].
    ///
    /// # Errors
    ///
    /// Fails if any placeholder image cannot be created; material setup
    /// requires all of them, so a partially bootstrapped manager is not
    /// constructed.
    pub fn new(mut backend: B) -> BackendResult<Self> {
        let mut default_images = [ImageHandle::INVALID; DefaultImage::ALL.len()];
        for kind in DefaultImage::ALL {
            default_images[kind.index()] = kind.data().upload(&mut backend)?;
        }
        log::debug!(
            "ResourceManager: created {} default images",
            default_images.len()
        );

        Ok(Self {
            backend,
            shaders: HashMap::new(),
            pipelines: HashMap::new(),
            default_images,
        })
    }

    /// Look up or create the shader for a descriptor.
    ///
    /// Structurally equal descriptors return the same handle, and the
    /// backend sees at most one creation call per distinct descriptor.
    /// A failed creation is reported and *not* memoized; the next call with
    /// the same descriptor attempts creation again.
    pub fn get_or_create_shader(
        &mut self,
        descriptor: &ShaderDescriptor,
    ) -> BackendResult<ShaderHandle> {
        if let Some(&handle) = self.shaders.get(descriptor) {
            log::trace!(
                "ResourceManager: shader cache hit '{}' -> {:?}",
                descriptor.label,
                handle
            );
            return Ok(handle);
        }

        log::debug!("ResourceManager: shader cache miss '{}'", descriptor.label);
        let handle = self.backend.create_shader(descriptor).map_err(|e| {
            log::error!("ResourceManager: shader creation failed: {e}");
            e
        })?;
        self.shaders.insert(descriptor.clone(), handle);
        Ok(handle)
    }

    /// Look up or create the pipeline for a descriptor.
    ///
    /// Same contract as [`get_or_create_shader`](Self::get_or_create_shader),
    /// keyed on the pipeline descriptor (which embeds the shader handle).
    pub fn get_or_create_pipeline(
        &mut self,
        descriptor: &PipelineDescriptor,
    ) -> BackendResult<PipelineHandle> {
        if let Some(&handle) = self.pipelines.get(descriptor) {
            log::trace!(
                "ResourceManager: pipeline cache hit '{}' -> {:?}",
                descriptor.label,
                handle
            );
            return Ok(handle);
        }

        log::debug!(
            "ResourceManager: pipeline cache miss '{}'",
            descriptor.label
        );
        let handle = self.backend.create_pipeline(descriptor).map_err(|e| {
            log::error!("ResourceManager: pipeline creation failed: {e}");
            e
        })?;
        self.pipelines.insert(descriptor.clone(), handle);
        Ok(handle)
    }

    /// Pre-created placeholder image for the given kind.
    pub fn default_image(&self, kind: DefaultImage) -> ImageHandle {
        self.default_images[kind.index()]
    }

    /// Number of distinct shaders in the cache.
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    /// Number of distinct pipelines in the cache.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// The owned backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The owned backend, mutably (draw submission, asset uploads).
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::HeadlessBackend;
    use crate::backend::traits::BackendKind;
    use crate::shader::pbr;

    fn manager() -> ResourceManager<HeadlessBackend> {
        ResourceManager::new(HeadlessBackend::new()).unwrap()
    }

    #[test]
    fn test_bootstrap_creates_all_default_images() {
        let rm = manager();
        assert_eq!(rm.backend().image_creations(), DefaultImage::ALL.len());
        for kind in DefaultImage::ALL {
            assert!(rm.default_image(kind).is_valid());
        }
    }

    #[test]
    fn test_default_images_are_distinct() {
        let rm = manager();
        assert_ne!(
            rm.default_image(DefaultImage::White),
            rm.default_image(DefaultImage::Black)
        );
        assert_ne!(
            rm.default_image(DefaultImage::Normal),
            rm.default_image(DefaultImage::Checkerboard)
        );
    }

    #[test]
    fn test_default_image_is_idempotent() {
        let rm = manager();
        let first = rm.default_image(DefaultImage::White);
        let second = rm.default_image(DefaultImage::White);
        assert_eq!(first, second);
        // No backend calls beyond the bootstrap.
        assert_eq!(rm.backend().image_creations(), DefaultImage::ALL.len());
    }

    #[test]
    fn test_shader_dedup_by_structural_equality() {
        let mut rm = manager();
        let desc_a = pbr::shader_descriptor(BackendKind::Headless, false);
        let desc_b = pbr::shader_descriptor(BackendKind::Headless, false);

        let first = rm.get_or_create_shader(&desc_a).unwrap();
        let second = rm.get_or_create_shader(&desc_b).unwrap();

        assert_eq!(first, second);
        assert_eq!(rm.backend().shader_creations(), 1);
        assert_eq!(rm.shader_count(), 1);
    }

    #[test]
    fn test_distinct_shader_descriptors_create_twice() {
        let mut rm = manager();
        let plain = pbr::shader_descriptor(BackendKind::Headless, false);
        let mrt = pbr::shader_descriptor(BackendKind::Headless, true);

        let first = rm.get_or_create_shader(&plain).unwrap();
        let second = rm.get_or_create_shader(&mrt).unwrap();

        assert_ne!(first, second);
        assert_eq!(rm.backend().shader_creations(), 2);
    }

    #[test]
    fn test_failed_creation_is_not_memoized() {
        let mut rm = manager();
        let desc = pbr::shader_descriptor(BackendKind::Headless, false);

        rm.backend_mut().fail_next_shader_creation();
        assert!(rm.get_or_create_shader(&desc).is_err());
        assert_eq!(rm.shader_count(), 0);

        // The same descriptor re-attempts creation and succeeds.
        let handle = rm.get_or_create_shader(&desc).unwrap();
        assert!(handle.is_valid());
        assert_eq!(rm.backend().shader_creations(), 2);
    }
}
