//! Reflection table and uniform blocks for the PBR shader.
//!
//! Slot indices and block sizes below mirror the compiled artifact in
//! `pbr.wgsl`. Descriptor construction reads only this table plus the
//! caller's runtime configuration, so identical inputs always produce
//! identical descriptors — the property the equality-keyed resource cache
//! relies on.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use static_assertions::{const_assert, const_assert_eq};

use crate::backend::traits::BackendKind;
use crate::backend::types::{
    AttributeDesc, ImageSlotDesc, ShaderDescriptor, StageDesc, UniformBlockDesc,
    MAX_FRAGMENT_IMAGES,
};

/// The compiled shader artifact consumed by GPU backends.
pub const SOURCE: &str = include_str!("pbr.wgsl");

// Vertex attribute slots
pub const ATTR_POSITION: u32 = 0;
pub const ATTR_COLOR0: u32 = 1;
pub const ATTR_NORMAL: u32 = 2;
pub const ATTR_TEXCOORD0: u32 = 3;
pub const ATTR_TANGENT: u32 = 4;

// Vertex-stage uniform block slots
pub const SLOT_VS_PARAMS: u32 = 0;

// Fragment-stage uniform block slots
pub const SLOT_LIGHT_PARAMS: u32 = 0;
pub const SLOT_FS_PARAMS: u32 = 1;
pub const SLOT_TEXTURE_PARAMS: u32 = 2;

// Fragment-stage image slots, in material binding order
pub const SLOT_BASE_COLOR: u32 = 0;
pub const SLOT_METALLIC_ROUGHNESS: u32 = 1;
pub const SLOT_NORMAL: u32 = 2;
pub const SLOT_OCCLUSION: u32 = 3;
pub const SLOT_EMISSIVE: u32 = 4;

/// Number of sampled images the fragment stage declares.
pub const FRAGMENT_IMAGE_COUNT: usize = 5;

const_assert!(FRAGMENT_IMAGE_COUNT <= MAX_FRAGMENT_IMAGES);

// Declared uniform block sizes in bytes (std140, 16-byte aligned)
pub const VS_PARAMS_SIZE: u32 = 192;
pub const LIGHT_PARAMS_SIZE: u32 = 64;
pub const FS_PARAMS_SIZE: u32 = 48;
pub const TEXTURE_PARAMS_SIZE: u32 = 48;

/// Vertex-stage transform block.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VsParams {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

/// Fragment-stage scene light block.
///
/// `Default` is the standard scene light: a white point light above and to
/// the side of the origin.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightParams {
    pub position: Vec3,
    pub intensity: f32,
    pub range: f32,
    _pad0: [f32; 3],
    pub color: Vec3,
    _pad1: f32,
    pub direction: Vec3,
    _pad2: f32,
}

impl LightParams {
    pub fn new(position: Vec3, intensity: f32, range: f32, color: Vec3, direction: Vec3) -> Self {
        Self {
            position,
            intensity,
            range,
            _pad0: [0.0; 3],
            color,
            _pad1: 0.0,
            direction,
            _pad2: 0.0,
        }
    }
}

impl Default for LightParams {
    fn default() -> Self {
        Self::new(
            Vec3::new(15.0, 10.0, 10.0),
            1.0,
            200.0,
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-0.739_9, 0.198_3, -0.642_8),
        )
    }
}

/// Fragment-stage material factor block.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FsParams {
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    _pad0: [f32; 2],
    pub base_color_factor: Vec4,
    pub exposure: f32,
    _pad1: [f32; 3],
}

impl FsParams {
    pub fn new(metallic_factor: f32, roughness_factor: f32, base_color_factor: Vec4, exposure: f32) -> Self {
        Self {
            metallic_factor,
            roughness_factor,
            _pad0: [0.0; 2],
            base_color_factor,
            exposure,
            _pad1: [0.0; 3],
        }
    }
}

/// Fragment-stage texture parameter block.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TextureParams {
    pub normal_scale: f32,
    _pad0: [f32; 3],
    pub emissive_factor: Vec3,
    pub occlusion_strength: f32,
    pub mip_count: i32,
    _pad1: [f32; 3],
}

impl TextureParams {
    pub fn new(
        normal_scale: f32,
        emissive_factor: Vec3,
        occlusion_strength: f32,
        mip_count: i32,
    ) -> Self {
        Self {
            normal_scale,
            _pad0: [0.0; 3],
            emissive_factor,
            occlusion_strength,
            mip_count,
            _pad1: [0.0; 3],
        }
    }
}

// A size mismatch here silently corrupts GPU memory at runtime, so it is a
// compile error instead.
const_assert_eq!(std::mem::size_of::<VsParams>(), VS_PARAMS_SIZE as usize);
const_assert_eq!(std::mem::size_of::<LightParams>(), LIGHT_PARAMS_SIZE as usize);
const_assert_eq!(std::mem::size_of::<FsParams>(), FS_PARAMS_SIZE as usize);
const_assert_eq!(std::mem::size_of::<TextureParams>(), TEXTURE_PARAMS_SIZE as usize);
const_assert_eq!(VS_PARAMS_SIZE % 16, 0);
const_assert_eq!(LIGHT_PARAMS_SIZE % 16, 0);
const_assert_eq!(FS_PARAMS_SIZE % 16, 0);
const_assert_eq!(TEXTURE_PARAMS_SIZE % 16, 0);

/// Build the PBR shader descriptor for a backend.
///
/// The MRT variant differs only in its fragment entry point (three color
/// outputs instead of one); that single field difference makes it a distinct
/// cache entry, which is exactly right since it is a distinct backend object.
pub fn shader_descriptor(backend: BackendKind, use_mrt: bool) -> ShaderDescriptor {
    ShaderDescriptor {
        label: "pbr",
        backend,
        attributes: vec![
            AttributeDesc {
                name: "a_position",
                slot: ATTR_POSITION,
            },
            AttributeDesc {
                name: "a_color",
                slot: ATTR_COLOR0,
            },
            AttributeDesc {
                name: "a_normal",
                slot: ATTR_NORMAL,
            },
            AttributeDesc {
                name: "a_uv",
                slot: ATTR_TEXCOORD0,
            },
            AttributeDesc {
                name: "a_tangent",
                slot: ATTR_TANGENT,
            },
        ],
        vertex: StageDesc {
            source: SOURCE,
            entry_point: "vs_main",
            uniform_blocks: vec![UniformBlockDesc {
                name: "vs_params",
                slot: SLOT_VS_PARAMS,
                size: VS_PARAMS_SIZE,
            }],
            images: vec![],
        },
        fragment: StageDesc {
            source: SOURCE,
            entry_point: if use_mrt { "fs_main_mrt" } else { "fs_main" },
            uniform_blocks: vec![
                UniformBlockDesc {
                    name: "light_params",
                    slot: SLOT_LIGHT_PARAMS,
                    size: LIGHT_PARAMS_SIZE,
                },
                UniformBlockDesc {
                    name: "fs_params",
                    slot: SLOT_FS_PARAMS,
                    size: FS_PARAMS_SIZE,
                },
                UniformBlockDesc {
                    name: "texture_params",
                    slot: SLOT_TEXTURE_PARAMS,
                    size: TEXTURE_PARAMS_SIZE,
                },
            ],
            images: vec![
                ImageSlotDesc {
                    name: "base_color_tex",
                    slot: SLOT_BASE_COLOR,
                },
                ImageSlotDesc {
                    name: "metallic_roughness_tex",
                    slot: SLOT_METALLIC_ROUGHNESS,
                },
                ImageSlotDesc {
                    name: "normal_tex",
                    slot: SLOT_NORMAL,
                },
                ImageSlotDesc {
                    name: "occlusion_tex",
                    slot: SLOT_OCCLUSION,
                },
                ImageSlotDesc {
                    name: "emissive_tex",
                    slot: SLOT_EMISSIVE,
                },
            ],
        },
    }
}
