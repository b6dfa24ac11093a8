//! The narrow interface between scene traversal and the GPU.
//!
//! Everything that walks the scene (objects, the world graph, vehicles, the
//! skybox) talks to a `&mut dyn GraphicsContext` and never to a device
//! directly. [`crate::pipelines::WgpuContext`] is the wgpu implementation;
//! tests drive the same traversal through a recording implementation.

use cgmath::Matrix4;

use crate::{
    data_structures::{material::Material, mesh::DrawRange, object::Geometry},
    error::RenderError,
    light::{CascadeUniforms, CasterLight},
};

/// Opaque handle to geometry that lives on the GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryHandle(pub u64);

/// A render pass of one frame.
///
/// A frame is `NUM_CASCADES` shadow passes (one per cascade, depth only)
/// followed by one colour pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    Shadow { cascade: usize },
    Color,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    /// Lit, textured, shadow receiving.
    Object,
    /// Depth only, used for the cascade passes.
    ObjectShadow,
    Skybox,
}

/// Per-draw transform state.
///
/// In a shadow pass `view` carries the cascade's light-space matrix and
/// `projection` is the identity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatrixUniforms {
    pub model: Matrix4<f32>,
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
}

pub trait GraphicsContext {
    fn upload_geometry(
        &mut self,
        label: &str,
        geometry: &Geometry,
    ) -> Result<GeometryHandle, RenderError>;
    fn release_geometry(&mut self, handle: GeometryHandle);
    /// Drops every texture uploaded on behalf of a material.
    fn release_textures(&mut self);

    fn begin_pass(&mut self, pass: Pass);
    fn end_pass(&mut self);

    fn bind_shader(&mut self, shader: ShaderKind);
    fn bind_geometry(&mut self, handle: GeometryHandle);

    fn set_matrix_uniforms(&mut self, uniforms: &MatrixUniforms);
    /// `view` transforms the light direction into view space.
    fn set_light_uniforms(&mut self, light: &CasterLight, view: &Matrix4<f32>);
    fn set_cascade_uniforms(&mut self, cascades: &CascadeUniforms);
    fn set_material_uniforms(&mut self, material: &Material);

    /// Draws `range` of the bound geometry's index buffer with the current state.
    fn draw_elements(&mut self, range: DrawRange);
}
