//! Common utilities for the material integration tests.

use vermilion_render::{
    HeadlessBackend, IndexType, PbrMaterial, PrimitiveTopology, RenderConfig, ResourceManager,
};

/// Resource manager over a fresh headless backend.
pub fn test_manager() -> ResourceManager<HeadlessBackend> {
    let _ = env_logger::builder().is_test(true).try_init();
    ResourceManager::new(HeadlessBackend::new()).expect("headless bootstrap cannot fail")
}

/// A material initialized with the default configuration.
pub fn default_material(rm: &mut ResourceManager<HeadlessBackend>) -> PbrMaterial {
    PbrMaterial::create(
        rm,
        &RenderConfig::default(),
        PrimitiveTopology::TriangleList,
        IndexType::Uint16,
    )
    .expect("material init on headless backend")
}
