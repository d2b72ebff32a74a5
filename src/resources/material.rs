//! PBR material
//!
//! A [`PbrMaterial`] bundles one cached pipeline handle with five texture
//! references and the scalar factors of the metallic-roughness model. Many
//! materials share the same pipeline through the resource cache; none of
//! them owns it.

use glam::{Mat4, Vec3, Vec4};

use crate::backend::traits::{
    BackendResult, GraphicsBackend, ImageHandle, PipelineHandle, ShaderStage,
};
use crate::backend::types::{
    Bindings, CompareFunction, CullMode, DepthState, FrontFace, IndexType, PipelineDescriptor,
    PrimitiveTopology, Vertex, VertexAttribute, VertexFormat, VertexLayout,
};
use crate::resources::manager::{DefaultImage, ResourceManager};
use crate::shader::pbr;
use crate::RenderConfig;

/// Per-frame parameters consumed by [`PbrMaterial::apply_uniforms`].
///
/// The light defaults to the standard scene light; callers that do not
/// manage lighting can leave it untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub light: pbr::LightParams,
    pub exposure: f32,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            light: pbr::LightParams::default(),
            exposure: 1.0,
        }
    }
}

/// A PBR material: one pipeline plus textures and factors.
///
/// Constructed in two phases, matching its failure contract: [`new`] yields
/// the degenerate-but-usable state (placeholder textures everywhere, invalid
/// pipeline), [`init`] completes it through the resource cache. A failed
/// `init` leaves the material degenerate rather than partially constructed.
///
/// [`new`]: PbrMaterial::new
/// [`init`]: PbrMaterial::init
#[derive(Debug, Clone)]
pub struct PbrMaterial {
    pipeline: PipelineHandle,
    pub tex_base_color: ImageHandle,
    pub tex_metallic_roughness: ImageHandle,
    pub tex_normal: ImageHandle,
    pub tex_occlusion: ImageHandle,
    pub tex_emissive: ImageHandle,
    /// Base color tint, 8 bits per channel.
    pub color: [u8; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub emissive_factor: Vec3,
}

impl PbrMaterial {
    /// Create a material in its degenerate state: placeholder textures,
    /// opaque white tint, default factors, no pipeline.
    pub fn new<B: GraphicsBackend>(rm: &ResourceManager<B>) -> Self {
        Self {
            pipeline: PipelineHandle::INVALID,
            tex_base_color: rm.default_image(DefaultImage::White),
            tex_metallic_roughness: rm.default_image(DefaultImage::White),
            tex_normal: rm.default_image(DefaultImage::Normal),
            tex_occlusion: rm.default_image(DefaultImage::White),
            tex_emissive: rm.default_image(DefaultImage::Black),
            color: [255, 255, 255, 255],
            metallic_factor: 0.0,
            roughness_factor: 0.5,
            emissive_factor: Vec3::ZERO,
        }
    }

    /// Build the shader and pipeline for this configuration and complete the
    /// material.
    ///
    /// Resets the texture slots to their placeholders and the tint to opaque
    /// white; assign real textures after `init`. The effective sample count
    /// is the configured one, or 1 when the backend cannot multisample
    /// render targets.
    ///
    /// # Errors
    ///
    /// Propagates backend creation failures; the material keeps its
    /// degenerate state in that case.
    pub fn init<B: GraphicsBackend>(
        &mut self,
        rm: &mut ResourceManager<B>,
        config: &RenderConfig,
        primitive: PrimitiveTopology,
        index_type: IndexType,
    ) -> BackendResult<()> {
        let shader_desc = pbr::shader_descriptor(rm.backend().backend_kind(), config.use_mrt);
        let shader = rm.get_or_create_shader(&shader_desc)?;

        let sample_count = if rm.backend().features().msaa_render_targets {
            config.msaa_samples
        } else {
            1
        };

        let pipeline_desc = PipelineDescriptor {
            label: "pbr pipeline",
            shader,
            layout: VertexLayout {
                stride: Vertex::STRIDE,
                attributes: vec![
                    VertexAttribute {
                        slot: pbr::ATTR_POSITION,
                        format: VertexFormat::Float32x3,
                        offset: Vertex::OFFSET_POSITION,
                    },
                    VertexAttribute {
                        slot: pbr::ATTR_COLOR0,
                        format: VertexFormat::Unorm8x4,
                        offset: Vertex::OFFSET_COLOR,
                    },
                    VertexAttribute {
                        slot: pbr::ATTR_NORMAL,
                        format: VertexFormat::Float32x3,
                        offset: Vertex::OFFSET_NORMAL,
                    },
                    VertexAttribute {
                        slot: pbr::ATTR_TEXCOORD0,
                        format: VertexFormat::Float32x2,
                        offset: Vertex::OFFSET_UV,
                    },
                    VertexAttribute {
                        slot: pbr::ATTR_TANGENT,
                        format: VertexFormat::Float32x3,
                        offset: Vertex::OFFSET_TANGENT,
                    },
                ],
            },
            primitive,
            index_type,
            depth: DepthState {
                compare: CompareFunction::LessEqual,
                write_enabled: true,
            },
            color_count: if config.use_mrt { 3 } else { 1 },
            cull_mode: CullMode::None,
            front_face: FrontFace::Ccw,
            sample_count,
        };
        self.pipeline = rm.get_or_create_pipeline(&pipeline_desc)?;

        self.tex_base_color = rm.default_image(DefaultImage::White);
        self.tex_metallic_roughness = rm.default_image(DefaultImage::White);
        self.tex_normal = rm.default_image(DefaultImage::Normal);
        self.tex_occlusion = rm.default_image(DefaultImage::White);
        self.tex_emissive = rm.default_image(DefaultImage::Black);
        self.color = [255, 255, 255, 255];
        Ok(())
    }

    /// One-call construction: [`new`](Self::new) followed by
    /// [`init`](Self::init).
    pub fn create<B: GraphicsBackend>(
        rm: &mut ResourceManager<B>,
        config: &RenderConfig,
        primitive: PrimitiveTopology,
        index_type: IndexType,
    ) -> BackendResult<Self> {
        let mut material = Self::new(rm);
        material.init(rm, config, primitive, index_type)?;
        Ok(material)
    }

    /// The cached pipeline handle (invalid until `init` succeeds).
    pub fn pipeline(&self) -> PipelineHandle {
        self.pipeline
    }

    /// Write the five texture handles into their fragment image slots.
    ///
    /// Pure mutation of `bindings`; no backend calls.
    pub fn update_bindings(&self, bindings: &mut Bindings) {
        bindings.fragment_images[pbr::SLOT_BASE_COLOR as usize] = self.tex_base_color;
        bindings.fragment_images[pbr::SLOT_METALLIC_ROUGHNESS as usize] =
            self.tex_metallic_roughness;
        bindings.fragment_images[pbr::SLOT_NORMAL as usize] = self.tex_normal;
        bindings.fragment_images[pbr::SLOT_OCCLUSION as usize] = self.tex_occlusion;
        bindings.fragment_images[pbr::SLOT_EMISSIVE as usize] = self.tex_emissive;
    }

    /// Upload the four uniform blocks for the next draw, in the fixed order
    /// the shader ABI expects: vertex transforms, light, material factors,
    /// texture parameters.
    pub fn apply_uniforms<B: GraphicsBackend>(&self, backend: &mut B, frame: &FrameParams) {
        let vs_params = pbr::VsParams {
            model: frame.model,
            view: frame.view,
            projection: frame.projection,
        };
        backend.apply_uniform_block(
            ShaderStage::Vertex,
            pbr::SLOT_VS_PARAMS,
            bytemuck::bytes_of(&vs_params),
        );

        backend.apply_uniform_block(
            ShaderStage::Fragment,
            pbr::SLOT_LIGHT_PARAMS,
            bytemuck::bytes_of(&frame.light),
        );

        let fs_params = pbr::FsParams::new(
            self.metallic_factor,
            self.roughness_factor,
            Vec4::new(
                self.color[0] as f32 / 255.0,
                self.color[1] as f32 / 255.0,
                self.color[2] as f32 / 255.0,
                self.color[3] as f32 / 255.0,
            ),
            frame.exposure,
        );
        backend.apply_uniform_block(
            ShaderStage::Fragment,
            pbr::SLOT_FS_PARAMS,
            bytemuck::bytes_of(&fs_params),
        );

        let texture_params = pbr::TextureParams::new(1.0, self.emissive_factor, 1.0, 1);
        backend.apply_uniform_block(
            ShaderStage::Fragment,
            pbr::SLOT_TEXTURE_PARAMS,
            bytemuck::bytes_of(&texture_params),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::HeadlessBackend;

    fn manager() -> ResourceManager<HeadlessBackend> {
        ResourceManager::new(HeadlessBackend::new()).unwrap()
    }

    #[test]
    fn test_new_material_is_degenerate_but_usable() {
        let rm = manager();
        let material = PbrMaterial::new(&rm);

        assert!(!material.pipeline().is_valid());
        assert_eq!(material.tex_base_color, rm.default_image(DefaultImage::White));
        assert_eq!(material.tex_normal, rm.default_image(DefaultImage::Normal));
        assert_eq!(material.tex_emissive, rm.default_image(DefaultImage::Black));
        assert_eq!(material.color, [255, 255, 255, 255]);
    }

    #[test]
    fn test_init_completes_the_material() {
        let mut rm = manager();
        let config = RenderConfig::default();
        let mut material = PbrMaterial::new(&rm);
        material
            .init(
                &mut rm,
                &config,
                PrimitiveTopology::TriangleList,
                IndexType::Uint16,
            )
            .unwrap();

        assert!(material.pipeline().is_valid());
        let descriptor = rm
            .backend()
            .pipeline_descriptor(material.pipeline())
            .unwrap();
        assert_eq!(descriptor.color_count, 1);
        assert_eq!(descriptor.cull_mode, CullMode::None);
        assert_eq!(descriptor.front_face, FrontFace::Ccw);
        assert_eq!(descriptor.depth.compare, CompareFunction::LessEqual);
        assert!(descriptor.depth.write_enabled);
    }

    #[test]
    fn test_failed_init_leaves_material_degenerate() {
        let mut rm = manager();
        let config = RenderConfig::default();
        let mut material = PbrMaterial::new(&rm);

        rm.backend_mut().fail_next_pipeline_creation();
        let result = material.init(
            &mut rm,
            &config,
            PrimitiveTopology::TriangleList,
            IndexType::Uint16,
        );

        assert!(result.is_err());
        assert!(!material.pipeline().is_valid());
        // Texture slots still hold the placeholders.
        assert_eq!(material.tex_base_color, rm.default_image(DefaultImage::White));
    }

    #[test]
    fn test_msaa_falls_back_without_backend_support() {
        use crate::backend::traits::BackendFeatures;

        let backend = HeadlessBackend::with_features(BackendFeatures {
            msaa_render_targets: false,
        });
        let mut rm = ResourceManager::new(backend).unwrap();
        let config = RenderConfig {
            msaa_samples: 4,
            ..Default::default()
        };

        let material = PbrMaterial::create(
            &mut rm,
            &config,
            PrimitiveTopology::TriangleList,
            IndexType::Uint16,
        )
        .unwrap();

        let descriptor = rm
            .backend()
            .pipeline_descriptor(material.pipeline())
            .unwrap();
        assert_eq!(descriptor.sample_count, 1);
    }

    #[test]
    fn test_update_bindings_writes_fixed_slot_order() {
        let mut rm = manager();
        let config = RenderConfig::default();
        let material = PbrMaterial::create(
            &mut rm,
            &config,
            PrimitiveTopology::TriangleList,
            IndexType::Uint16,
        )
        .unwrap();

        let mut bindings = Bindings::default();
        material.update_bindings(&mut bindings);

        assert_eq!(bindings.fragment_images[0], material.tex_base_color);
        assert_eq!(bindings.fragment_images[1], material.tex_metallic_roughness);
        assert_eq!(bindings.fragment_images[2], material.tex_normal);
        assert_eq!(bindings.fragment_images[3], material.tex_occlusion);
        assert_eq!(bindings.fragment_images[4], material.tex_emissive);
        // Untouched state stays untouched.
        assert!(!bindings.fragment_images[5].is_valid());
        assert!(!bindings.index_buffer.is_valid());
        assert!(bindings.vertex_buffers.iter().all(|b| !b.is_valid()));
    }

    #[test]
    fn test_apply_uniforms_upload_order_and_sizes() {
        let mut rm = manager();
        let config = RenderConfig::default();
        let material = PbrMaterial::create(
            &mut rm,
            &config,
            PrimitiveTopology::TriangleList,
            IndexType::Uint16,
        )
        .unwrap();

        material.apply_uniforms(rm.backend_mut(), &FrameParams::default());

        let uploads = rm.backend().uniform_uploads();
        assert_eq!(uploads.len(), 4);
        assert_eq!(uploads[0].stage, ShaderStage::Vertex);
        assert_eq!(uploads[0].slot, pbr::SLOT_VS_PARAMS);
        assert_eq!(uploads[0].bytes.len(), pbr::VS_PARAMS_SIZE as usize);
        assert_eq!(uploads[1].slot, pbr::SLOT_LIGHT_PARAMS);
        assert_eq!(uploads[1].bytes.len(), pbr::LIGHT_PARAMS_SIZE as usize);
        assert_eq!(uploads[2].slot, pbr::SLOT_FS_PARAMS);
        assert_eq!(uploads[2].bytes.len(), pbr::FS_PARAMS_SIZE as usize);
        assert_eq!(uploads[3].slot, pbr::SLOT_TEXTURE_PARAMS);
        assert_eq!(uploads[3].bytes.len(), pbr::TEXTURE_PARAMS_SIZE as usize);
    }

    #[test]
    fn test_tint_is_normalized_into_fs_params() {
        let mut rm = manager();
        let config = RenderConfig::default();
        let mut material = PbrMaterial::create(
            &mut rm,
            &config,
            PrimitiveTopology::TriangleList,
            IndexType::Uint16,
        )
        .unwrap();
        material.color = [255, 0, 51, 255];
        material.metallic_factor = 0.25;

        material.apply_uniforms(rm.backend_mut(), &FrameParams::default());

        let uploads = rm.backend().uniform_uploads();
        let fs_params: pbr::FsParams = bytemuck::pod_read_unaligned(&uploads[2].bytes);
        assert_eq!(fs_params.metallic_factor, 0.25);
        assert_eq!(fs_params.base_color_factor, Vec4::new(1.0, 0.0, 0.2, 1.0));
        assert_eq!(fs_params.exposure, 1.0);
    }
}
