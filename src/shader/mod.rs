//! Shader ABI tables.
//!
//! Each material type gets one submodule holding the reflection data of its
//! compiled shader: attribute slots, uniform block slots and byte sizes, and
//! image slots, plus the host-side uniform structs. The tables stand in for
//! the output of an offline shader-compilation step; the shader source text
//! itself is carried as an opaque artifact for backends that compile at
//! runtime.
//!
//! The one hard rule in this module: a host uniform struct and the block the
//! shader declares must agree byte for byte. That is enforced with
//! compile-time size assertions next to each struct, never at runtime.

pub mod pbr;
