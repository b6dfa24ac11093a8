use std::rc::Rc;

use cgmath::Vector3;

use crate::data_structures::texture::Texture;

/// Phong material shared between meshes.
#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub shininess: f32,
    pub alpha: f32,
    pub height_scale: f32,
    pub diffuse_texture: Option<Rc<Texture>>,
    pub normal_texture: Option<Rc<Texture>>,
    pub bump_texture: Option<Rc<Texture>>,
}

impl Material {
    /// Plain grey, fully opaque, untextured.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ambient: Vector3::new(0.2, 0.2, 0.2),
            diffuse: Vector3::new(0.8, 0.8, 0.8),
            specular: Vector3::new(0.0, 0.0, 0.0),
            shininess: 1.0,
            alpha: 1.0,
            height_scale: 0.0,
            diffuse_texture: None,
            normal_texture: None,
            bump_texture: None,
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.alpha >= 1.0
    }
}
