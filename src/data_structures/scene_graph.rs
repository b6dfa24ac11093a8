//! The world graph.
//!
//! World nodes come from the scene markup. Each node caches its world matrix
//! when it is created and references objects by [`ObjectId`]. During a frame
//! the cached matrix is passed along with each draw, so the same object can
//! appear under many nodes without being mutated.

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    context::GraphicsContext,
    data_structures::registry::{ObjectId, ObjectRegistry},
    error::RenderError,
    render::{FrameParams, Renderable},
};

#[derive(Clone, Debug, PartialEq)]
pub struct WorldNode {
    local: Matrix4<f32>,
    world: Matrix4<f32>,
    objects: Vec<ObjectId>,
    children: Vec<WorldNode>,
}

impl Default for WorldNode {
    fn default() -> Self {
        Self::root()
    }
}

impl WorldNode {
    pub fn root() -> Self {
        Self::new(&Matrix4::identity(), Matrix4::identity())
    }

    /// The world matrix is fixed here: `parent_world * local`.
    pub fn new(parent_world: &Matrix4<f32>, local: Matrix4<f32>) -> Self {
        Self {
            local,
            world: parent_world * local,
            objects: Vec::new(),
            children: Vec::new(),
        }
    }

    /// A node positioned relative to this one, not yet attached.
    pub fn child(&self, local: Matrix4<f32>) -> Self {
        Self::new(&self.world, local)
    }

    pub fn add_child(&mut self, child: WorldNode) {
        self.children.push(child);
    }

    pub fn add_object(&mut self, id: ObjectId) {
        self.objects.push(id);
    }

    pub fn world_matrix(&self) -> &Matrix4<f32> {
        &self.world
    }

    pub fn local_matrix(&self) -> &Matrix4<f32> {
        &self.local
    }

    pub fn objects(&self) -> &[ObjectId] {
        &self.objects
    }

    pub fn children(&self) -> &[WorldNode] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.children.iter().all(WorldNode::is_empty)
    }

    /// Every (object, world matrix) placement in draw order.
    pub fn placements(&self) -> Vec<(ObjectId, Matrix4<f32>)> {
        let mut out: Vec<_> = self.objects.iter().map(|id| (*id, self.world)).collect();
        for child in &self.children {
            out.extend(child.placements());
        }
        out
    }

    pub fn render(
        &self,
        ctx: &mut dyn GraphicsContext,
        objects: &ObjectRegistry,
        frame: &FrameParams,
    ) -> Result<(), RenderError> {
        for id in &self.objects {
            if let Some(object) = objects.get(*id) {
                object.render(ctx, frame, &self.world)?;
            }
        }
        for child in &self.children {
            child.render(ctx, objects, frame)?;
        }
        Ok(())
    }

    pub fn render_shadow(
        &self,
        ctx: &mut dyn GraphicsContext,
        objects: &ObjectRegistry,
        light_space: &Matrix4<f32>,
    ) -> Result<(), RenderError> {
        for id in &self.objects {
            if let Some(object) = objects.get(*id) {
                object.render_shadow(ctx, light_space, &self.world)?;
            }
        }
        for child in &self.children {
            child.render_shadow(ctx, objects, light_space)?;
        }
        Ok(())
    }
}
