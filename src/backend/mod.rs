//! GPU backend abstraction layer.
//!
//! This module provides a trait-based abstraction for GPU backends. The
//! backend is a pure handle registry: it creates objects on demand and
//! executes per-frame calls, but never caches or deduplicates anything —
//! that is the resource manager's job.
//!
//! # Available Backends
//!
//! - [`headless::HeadlessBackend`] (always available): records creations and
//!   uploads without a GPU, for tests, CI and tools
//! - `wgpu-backend` feature: [`wgpu_backend::WgpuBackend`], offscreen
//!   rendering on a real device via wgpu

pub mod headless;
pub mod traits;
pub mod types;

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_backend;
