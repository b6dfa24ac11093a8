use std::rc::Rc;

use crate::{context::GraphicsContext, data_structures::material::Material};

/// A contiguous slice of an object's index buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawRange {
    pub offset: u32,
    pub count: u32,
}

impl DrawRange {
    pub fn end(&self) -> u32 {
        self.offset + self.count
    }
}

#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub range: DrawRange,
    pub material: Rc<Material>,
}

impl Mesh {
    pub fn new(name: impl Into<String>, range: DrawRange, material: Rc<Material>) -> Self {
        Self {
            name: name.into(),
            range,
            material,
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.material.is_opaque()
    }

    /// Issues the draw. Depth-only passes skip the material upload.
    pub fn draw(&self, ctx: &mut dyn GraphicsContext, with_material: bool) {
        if with_material {
            ctx.set_material_uniforms(&self.material);
        }
        ctx.draw_elements(self.range);
    }
}
