//! Resource management
//!
//! The deduplicating cache over backend creation calls, the placeholder
//! textures it bootstraps, and the PBR material built on top of both.

mod manager;
mod material;
mod texture;

pub use manager::{DefaultImage, ResourceManager};
pub use material::{FrameParams, PbrMaterial};
pub use texture::TextureData;
