//! End-to-end PBR material flow on the headless backend.
//!
//! Creates two materials that share one cached pipeline, uploads a textured
//! quad, and records a frame. Run with `RUST_LOG=trace` to watch the cache
//! and the backend registry at work.

use glam::{Mat4, Vec2, Vec3};
use vermilion_render::{
    Bindings, BufferDescriptor, BufferUsage, FrameParams, GraphicsBackend, HeadlessBackend,
    IndexType, PassDescriptor, PbrMaterial, PrimitiveTopology, RenderConfig, ResourceManager,
    Vertex,
};

fn quad_vertices() -> Vec<Vertex> {
    let corners = [
        (Vec3::new(-1.0, -1.0, 0.0), Vec2::new(0.0, 1.0)),
        (Vec3::new(1.0, -1.0, 0.0), Vec2::new(1.0, 1.0)),
        (Vec3::new(1.0, 1.0, 0.0), Vec2::new(1.0, 0.0)),
        (Vec3::new(-1.0, 1.0, 0.0), Vec2::new(0.0, 0.0)),
    ];
    corners
        .into_iter()
        .map(|(position, uv)| Vertex {
            position,
            color: [255, 255, 255, 255],
            normal: Vec3::Z,
            uv,
            tangent: Vec3::X,
        })
        .collect()
}

fn main() {
    env_logger::init();

    let mut rm = ResourceManager::new(HeadlessBackend::new()).expect("resource manager bootstrap");
    let config = RenderConfig::default();

    let mut gold = PbrMaterial::create(
        &mut rm,
        &config,
        PrimitiveTopology::TriangleList,
        IndexType::Uint16,
    )
    .expect("gold material");
    gold.metallic_factor = 1.0;
    gold.roughness_factor = 0.3;
    gold.color = [255, 196, 86, 255];

    let mut rubber = PbrMaterial::create(
        &mut rm,
        &config,
        PrimitiveTopology::TriangleList,
        IndexType::Uint16,
    )
    .expect("rubber material");
    rubber.roughness_factor = 0.9;
    rubber.color = [40, 40, 48, 255];

    println!(
        "materials share pipeline: {} ({:?})",
        gold.pipeline() == rubber.pipeline(),
        gold.pipeline()
    );
    println!(
        "cache: {} shader(s), {} pipeline(s) after two materials",
        rm.shader_count(),
        rm.pipeline_count()
    );

    // Geometry
    let vertices = quad_vertices();
    let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);
    let vertex_buffer = rm
        .backend_mut()
        .create_buffer(
            &BufferDescriptor {
                label: "quad vertices",
                size: vertex_bytes.len() as u64,
                usage: BufferUsage::VERTEX | BufferUsage::COPY_DST,
            },
            vertex_bytes,
        )
        .expect("vertex buffer");

    let indices: [u16; 6] = [0, 1, 2, 0, 2, 3];
    let index_bytes: &[u8] = bytemuck::cast_slice(&indices);
    let index_buffer = rm
        .backend_mut()
        .create_buffer(
            &BufferDescriptor {
                label: "quad indices",
                size: index_bytes.len() as u64,
                usage: BufferUsage::INDEX | BufferUsage::COPY_DST,
            },
            index_bytes,
        )
        .expect("index buffer");

    // One frame
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO, Vec3::Y);
    let projection = Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.1, 100.0);

    let backend = rm.backend_mut();
    backend.begin_pass(&PassDescriptor {
        label: "demo pass",
        width: 512,
        height: 512,
        sample_count: config.msaa_samples,
        ..Default::default()
    });

    for (i, material) in [&gold, &rubber].into_iter().enumerate() {
        backend.apply_pipeline(material.pipeline());

        let mut bindings = Bindings::default();
        bindings.vertex_buffers[0] = vertex_buffer;
        bindings.index_buffer = index_buffer;
        material.update_bindings(&mut bindings);
        backend.apply_bindings(&bindings);

        let model = Mat4::from_translation(Vec3::new(i as f32 * 2.2 - 1.1, 0.0, 0.0))
            * Mat4::from_scale(Vec3::splat(0.9));
        material.apply_uniforms(
            backend,
            &FrameParams {
                model,
                view,
                projection,
                ..Default::default()
            },
        );

        backend.draw(0..indices.len() as u32, 0..1);
    }

    backend.end_pass();
    backend.commit();

    println!(
        "frame committed: {} draws, {} uniform uploads",
        backend.draw_count(),
        backend.uniform_uploads().len()
    );
}
