//! track-ngin
//!
//! A renderer for replaying vehicle trajectories in a static 3D world. The
//! world is described in XML markup (imported models, declarative shapes and
//! references to them), vehicles come from the caller through the
//! [`vehicle::Vehicle`] trait, and every frame is drawn with cascaded shadow
//! maps and back-to-front transparency on top of wgpu.
//!
//! High-level modules
//! - `camera`: camera trait and the default tracking camera
//! - `config`: JSON scene configuration
//! - `context`: the `GraphicsContext` trait between traversal and GPU
//! - `data_structures`: objects, materials, textures, registries, world graph
//! - `light`: directional light and shadow cascades
//! - `pipelines`: the wgpu implementation of `GraphicsContext`
//! - `render`: the `Renderable` trait and transparency ordering
//! - `resources`: model import, shape and world markup loading
//! - `scene`: per-frame orchestration
//! - `timeline`: playback state
//! - `vehicle`: the trait vehicles implement
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod light;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;
pub mod timeline;
pub mod vehicle;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;

/// Installs `env_logger` with a default filter of `warn`, overridable through
/// `RUST_LOG`. Calling it again only logs a warning.
pub fn init_logger() {
    let env = env_logger::Env::default().default_filter_or("warn");
    if let Err(e) = env_logger::Builder::from_env(env).try_init() {
        log::warn!("Logger already initialized: {}", e);
    }
}
