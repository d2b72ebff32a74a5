//! Integration tests for the resource cache and the PBR material protocol.
//!
//! Everything runs on the headless backend, which records creation calls,
//! bindings and uniform uploads so the cache and binding contracts can be
//! observed from outside.

mod common;

use rstest::rstest;

use common::{default_material, test_manager};
use vermilion_render::shader::pbr;
use vermilion_render::{
    BackendKind, Bindings, BufferDescriptor, BufferUsage, CullMode, DefaultImage, FrameParams,
    GraphicsBackend, IndexType, PassDescriptor, PbrMaterial, PipelineDescriptor,
    PrimitiveTopology, RenderConfig, Vertex,
};

// ============================================================================
// Cache identity
// ============================================================================

/// Two materials with the same configuration share one pipeline and one
/// shader, created exactly once each.
#[test]
fn test_equivalent_materials_share_backend_objects() {
    let mut rm = test_manager();

    let first = default_material(&mut rm);
    let second = default_material(&mut rm);

    assert_eq!(first.pipeline(), second.pipeline());
    assert_eq!(rm.backend().shader_creations(), 1);
    assert_eq!(rm.backend().pipeline_creations(), 1);
    assert_eq!(rm.shader_count(), 1);
    assert_eq!(rm.pipeline_count(), 1);
}

/// Any single-field difference in the configuration produces a distinct
/// cached pipeline and a second backend creation.
#[rstest]
#[case::primitive(PrimitiveTopology::LineList, IndexType::Uint16, 4)]
#[case::index_type(PrimitiveTopology::TriangleList, IndexType::Uint32, 4)]
#[case::sample_count(PrimitiveTopology::TriangleList, IndexType::Uint16, 1)]
fn test_single_field_difference_is_a_distinct_pipeline(
    #[case] primitive: PrimitiveTopology,
    #[case] index_type: IndexType,
    #[case] msaa_samples: u32,
) {
    let mut rm = test_manager();

    let base = default_material(&mut rm);
    let variant = PbrMaterial::create(
        &mut rm,
        &RenderConfig {
            msaa_samples,
            use_mrt: false,
        },
        primitive,
        index_type,
    )
    .unwrap();

    assert_ne!(base.pipeline(), variant.pipeline());
    assert_eq!(rm.backend().pipeline_creations(), 2);
    // Both variants still share the one shader.
    assert_eq!(rm.backend().shader_creations(), 1);
}

/// Raw descriptor-level dedup: a cloned descriptor hits the cache, a
/// mutated one misses it.
#[test]
fn test_pipeline_descriptor_equality_drives_the_cache() {
    let mut rm = test_manager();
    let material = default_material(&mut rm);

    let descriptor: PipelineDescriptor = rm
        .backend()
        .pipeline_descriptor(material.pipeline())
        .unwrap()
        .clone();

    let same = rm.get_or_create_pipeline(&descriptor).unwrap();
    assert_eq!(same, material.pipeline());
    assert_eq!(rm.backend().pipeline_creations(), 1);

    let mut culled = descriptor;
    culled.cull_mode = CullMode::Back;
    let different = rm.get_or_create_pipeline(&culled).unwrap();
    assert_ne!(different, material.pipeline());
    assert_eq!(rm.backend().pipeline_creations(), 2);
}

/// MRT configuration: one color target without it, three with it, and the
/// two pipelines are distinct cache entries.
#[test]
fn test_mrt_selects_color_count() {
    let mut rm = test_manager();

    let plain = default_material(&mut rm);
    let mrt = PbrMaterial::create(
        &mut rm,
        &RenderConfig {
            use_mrt: true,
            ..Default::default()
        },
        PrimitiveTopology::TriangleList,
        IndexType::Uint16,
    )
    .unwrap();

    let plain_desc = rm.backend().pipeline_descriptor(plain.pipeline()).unwrap();
    assert_eq!(plain_desc.color_count, 1);

    let mrt_desc = rm.backend().pipeline_descriptor(mrt.pipeline()).unwrap();
    assert_eq!(mrt_desc.color_count, 3);

    assert_ne!(plain.pipeline(), mrt.pipeline());
}

/// The shader descriptor embeds the backend kind, so construction is pinned
/// to the backend the manager owns.
#[test]
fn test_shader_descriptor_carries_backend_kind() {
    let mut rm = test_manager();
    let material = default_material(&mut rm);

    let pipeline_desc = rm
        .backend()
        .pipeline_descriptor(material.pipeline())
        .unwrap();
    let shader_desc = rm
        .backend()
        .shader_descriptor(pipeline_desc.shader)
        .unwrap();
    assert_eq!(shader_desc.backend, BackendKind::Headless);
    assert_eq!(shader_desc.attributes.len(), 5);
}

// ============================================================================
// Default images
// ============================================================================

#[test]
fn test_default_images_survive_material_churn() {
    let mut rm = test_manager();
    let before = rm.default_image(DefaultImage::Normal);

    for _ in 0..8 {
        default_material(&mut rm);
    }

    // Same handle, no additional image creations.
    assert_eq!(rm.default_image(DefaultImage::Normal), before);
    assert_eq!(rm.backend().image_creations(), 4);
}

#[test]
fn test_fresh_material_uses_placeholders_and_white_tint() {
    let mut rm = test_manager();
    let material = default_material(&mut rm);

    assert_eq!(
        material.tex_base_color,
        rm.default_image(DefaultImage::White)
    );
    assert_eq!(
        material.tex_metallic_roughness,
        rm.default_image(DefaultImage::White)
    );
    assert_eq!(material.tex_normal, rm.default_image(DefaultImage::Normal));
    assert_eq!(
        material.tex_occlusion,
        rm.default_image(DefaultImage::White)
    );
    assert_eq!(material.tex_emissive, rm.default_image(DefaultImage::Black));
    assert_eq!(material.color, [255, 255, 255, 255]);
}

// ============================================================================
// Binding and uniform protocol
// ============================================================================

#[test]
fn test_update_bindings_only_touches_the_five_image_slots() {
    let mut rm = test_manager();
    let material = default_material(&mut rm);

    let mut bindings = Bindings::default();
    let sentinel_buffer = rm
        .backend_mut()
        .create_buffer(
            &BufferDescriptor {
                label: "sentinel",
                size: 64,
                usage: BufferUsage::VERTEX,
            },
            &[],
        )
        .unwrap();
    bindings.vertex_buffers[0] = sentinel_buffer;

    material.update_bindings(&mut bindings);

    assert_eq!(bindings.fragment_images[0], material.tex_base_color);
    assert_eq!(bindings.fragment_images[4], material.tex_emissive);
    // Slots beyond the material's five are untouched, as is the geometry.
    assert!(!bindings.fragment_images[5].is_valid());
    assert_eq!(bindings.vertex_buffers[0], sentinel_buffer);
}

/// Uniform upload is deterministic: unchanged inputs produce byte-identical
/// blocks on every call.
#[test]
fn test_apply_uniforms_is_deterministic() {
    let mut rm = test_manager();
    let mut material = default_material(&mut rm);
    material.metallic_factor = 0.75;
    material.roughness_factor = 0.2;
    material.color = [128, 64, 32, 255];

    let frame = FrameParams::default();
    material.apply_uniforms(rm.backend_mut(), &frame);
    material.apply_uniforms(rm.backend_mut(), &frame);

    let uploads = rm.backend().uniform_uploads();
    assert_eq!(uploads.len(), 8);
    for i in 0..4 {
        assert_eq!(uploads[i].stage, uploads[i + 4].stage);
        assert_eq!(uploads[i].slot, uploads[i + 4].slot);
        assert_eq!(uploads[i].bytes, uploads[i + 4].bytes);
    }
}

#[test]
fn test_default_light_block_bytes() {
    let mut rm = test_manager();
    let material = default_material(&mut rm);

    material.apply_uniforms(rm.backend_mut(), &FrameParams::default());

    let uploads = rm.backend().uniform_uploads();
    let light: pbr::LightParams = bytemuck::pod_read_unaligned(&uploads[1].bytes);
    assert_eq!(light, pbr::LightParams::default());
}

// ============================================================================
// Frame smoke test
// ============================================================================

/// The whole flow: cache, bindings, uniforms and a committed frame.
#[test]
fn test_full_frame_on_headless_backend() {
    let mut rm = test_manager();
    let material = default_material(&mut rm);

    let vertex_buffer = rm
        .backend_mut()
        .create_buffer(
            &BufferDescriptor {
                label: "vertices",
                size: 3 * Vertex::STRIDE,
                usage: BufferUsage::VERTEX,
            },
            &[],
        )
        .unwrap();

    let backend = rm.backend_mut();
    backend.begin_pass(&PassDescriptor {
        label: "smoke",
        ..Default::default()
    });
    backend.apply_pipeline(material.pipeline());

    let mut bindings = Bindings::default();
    bindings.vertex_buffers[0] = vertex_buffer;
    material.update_bindings(&mut bindings);
    backend.apply_bindings(&bindings);
    material.apply_uniforms(backend, &FrameParams::default());

    backend.draw(0..3, 0..1);
    backend.end_pass();
    backend.commit();

    assert_eq!(backend.draw_count(), 1);
    assert_eq!(backend.frame_count(), 1);
    assert_eq!(backend.last_bindings().unwrap(), &bindings);
}
