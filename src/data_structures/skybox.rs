//! Background drawn behind everything else in the colour pass.
//!
//! A cube around the camera, drawn with the translation stripped from the
//! view matrix so it never comes closer. With a panorama the skybox shader
//! samples it as an equirectangular image, otherwise it shades a sky
//! gradient.

use std::path::Path;

use cgmath::{Matrix4, Vector4};

use crate::{
    context::{GeometryHandle, GraphicsContext, MatrixUniforms, ShaderKind},
    data_structures::{
        material::Material,
        mesh::DrawRange,
        object::Geometry,
        texture::{TextureKind, TextureRegistry},
    },
    error::RenderError,
    render::{FrameParams, Renderable},
    resources::mesh::append_box,
};

#[derive(Debug)]
pub struct Skybox {
    geometry: Option<Geometry>,
    handle: Option<GeometryHandle>,
    range: DrawRange,
    material: Material,
}

impl Skybox {
    pub fn new() -> Self {
        let mut geometry = Geometry::default();
        let range = append_box(&mut geometry, [-1.0; 3], [1.0; 3]);
        Self {
            geometry: Some(geometry),
            handle: None,
            range,
            material: Material::new("skybox"),
        }
    }

    /// Skybox sampling the equirectangular image at `path`.
    pub fn with_panorama(path: &Path, textures: &mut TextureRegistry) -> Self {
        let mut skybox = Self::new();
        skybox.material.diffuse_texture = Some(textures.load_texture(path, TextureKind::Skybox));
        skybox
    }

    pub fn has_panorama(&self) -> bool {
        self.material
            .diffuse_texture
            .as_ref()
            .is_some_and(|t| t.is_loaded())
    }

    pub fn is_initialized(&self) -> bool {
        self.handle.is_some()
    }
}

impl Default for Skybox {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderable for Skybox {
    fn initialize(&mut self, ctx: &mut dyn GraphicsContext) -> Result<(), RenderError> {
        if let Some(geometry) = self.geometry.take() {
            self.handle = Some(ctx.upload_geometry("skybox", &geometry)?);
        }
        Ok(())
    }

    fn render(
        &self,
        ctx: &mut dyn GraphicsContext,
        frame: &FrameParams,
        model: &Matrix4<f32>,
    ) -> Result<(), RenderError> {
        let Some(handle) = self.handle else {
            log::error!("The skybox must be initialized before it is rendered.");
            return Err(RenderError::NotInitialized("skybox".to_string()));
        };
        let mut view = frame.view;
        view.w = Vector4::new(0.0, 0.0, 0.0, 1.0);

        ctx.bind_shader(ShaderKind::Skybox);
        ctx.bind_geometry(handle);
        ctx.set_matrix_uniforms(&MatrixUniforms {
            model: *model,
            view,
            projection: frame.projection,
        });
        ctx.set_material_uniforms(&self.material);
        ctx.draw_elements(self.range);
        Ok(())
    }

    /// The sky casts no shadow.
    fn render_shadow(
        &self,
        _ctx: &mut dyn GraphicsContext,
        _light_space: &Matrix4<f32>,
        _model: &Matrix4<f32>,
    ) -> Result<(), RenderError> {
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut dyn GraphicsContext) {
        if let Some(handle) = self.handle.take() {
            ctx.release_geometry(handle);
        }
    }
}

