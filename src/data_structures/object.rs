//! Rigid, hierarchical models.
//!
//! An [`Object`] owns one shared set of vertex buffers ([`Geometry`]) and a
//! tree of [`ObjectNode`]s. Each node holds a local transform and meshes that
//! index into the shared buffers. Drawing walks the tree depth first,
//! composing transforms on the way down; opaque meshes are drawn as they are
//! reached and transparent ones are sorted back to front and drawn last.

use std::rc::Rc;

use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector4};

use crate::{
    context::{GeometryHandle, GraphicsContext, MatrixUniforms, ShaderKind},
    data_structures::mesh::Mesh,
    error::{LoadError, RenderError},
    render::{FrameParams, Renderable, TransparentQueue},
};

/// CPU side vertex and index data of an object.
///
/// All per-vertex arrays have the same length except the UV channels: a
/// channel only receives data from the meshes that provide it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uv_channels: Vec<Vec<[f32; 2]>>,
    pub tangents: Vec<[f32; 3]>,
    pub bitangents: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Texture coordinate of `vertex` in channel 0, zero when absent.
    pub fn uv(&self, vertex: usize) -> [f32; 2] {
        self.uv_channels
            .first()
            .and_then(|channel| channel.get(vertex))
            .copied()
            .unwrap_or([0.0, 0.0])
    }

    /// Nothing to draw: no positions or no triangles.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        let n = self.positions.len();
        for (attribute, len) in [
            ("normals", self.normals.len()),
            ("tangents", self.tangents.len()),
            ("bitangents", self.bitangents.len()),
        ] {
            if len != n {
                return Err(LoadError::Geometry(format!(
                    "{} {} for {} positions",
                    len, attribute, n
                )));
            }
        }
        if let Some(channel) = self.uv_channels.iter().find(|c| c.len() > n) {
            return Err(LoadError::Geometry(format!(
                "uv channel with {} entries for {} positions",
                channel.len(),
                n
            )));
        }
        if self.indices.len() % 3 != 0 {
            return Err(LoadError::Geometry(format!(
                "{} indices do not form triangles",
                self.indices.len()
            )));
        }
        if let Some(i) = self.indices.iter().find(|i| **i as usize >= n) {
            return Err(LoadError::Geometry(format!(
                "index {} out of range for {} positions",
                i, n
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct ObjectNode {
    pub name: String,
    pub transform: Matrix4<f32>,
    pub meshes: Vec<Rc<Mesh>>,
    pub children: Vec<ObjectNode>,
}

impl ObjectNode {
    pub fn new(name: impl Into<String>, transform: Matrix4<f32>) -> Self {
        Self {
            name: name.into(),
            transform,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Number of meshes in this subtree.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len() + self.children.iter().map(|c| c.mesh_count()).sum::<usize>()
    }

    fn draw<'a>(
        &'a self,
        ctx: &mut dyn GraphicsContext,
        mode: &DrawMode,
        parent: &Matrix4<f32>,
        deferred: &mut TransparentQueue<(Matrix4<f32>, &'a Mesh)>,
    ) {
        let model = parent * self.transform;
        ctx.set_matrix_uniforms(&mode.uniforms(model));

        for mesh in &self.meshes {
            if mesh.is_opaque() {
                mesh.draw(ctx, mode.with_material());
            } else {
                let position = (model * Vector4::new(0.0, 0.0, 0.0, 1.0)).truncate();
                let distance = (position - mode.camera_position()).magnitude();
                deferred.push(distance, (model, mesh.as_ref()));
            }
        }

        for child in &self.children {
            child.draw(ctx, mode, &model, deferred);
        }
    }
}

enum DrawMode<'f> {
    Color {
        frame: &'f FrameParams<'f>,
        camera: cgmath::Vector3<f32>,
    },
    Shadow {
        light_space: Matrix4<f32>,
    },
}

impl<'f> DrawMode<'f> {
    fn color(frame: &'f FrameParams<'f>) -> Self {
        // camera position is the translation of the inverse view
        let camera = frame
            .view
            .invert()
            .map(|inv| inv.w.truncate())
            .unwrap_or_else(|| cgmath::Vector3::new(0.0, 0.0, 0.0));
        DrawMode::Color { frame, camera }
    }

    fn uniforms(&self, model: Matrix4<f32>) -> MatrixUniforms {
        match self {
            DrawMode::Color { frame, .. } => MatrixUniforms {
                model,
                view: frame.view,
                projection: frame.projection,
            },
            DrawMode::Shadow { light_space } => MatrixUniforms {
                model,
                view: *light_space,
                projection: Matrix4::identity(),
            },
        }
    }

    fn with_material(&self) -> bool {
        matches!(self, DrawMode::Color { .. })
    }

    fn camera_position(&self) -> cgmath::Vector3<f32> {
        match self {
            DrawMode::Color { camera, .. } => *camera,
            DrawMode::Shadow { .. } => cgmath::Vector3::new(0.0, 0.0, 0.0),
        }
    }
}

#[derive(Debug)]
enum ObjectState {
    /// Loading failed. Every operation is a silent no-op.
    Failed,
    Loaded(Geometry),
    Ready(GeometryHandle),
    Released,
}

#[derive(Debug)]
pub struct Object {
    name: String,
    root: ObjectNode,
    state: ObjectState,
}

impl Object {
    /// Checks the buffers before accepting them.
    pub fn new(name: impl Into<String>, root: ObjectNode, geometry: Geometry) -> Result<Self, LoadError> {
        geometry.validate()?;
        Ok(Self {
            name: name.into(),
            root,
            state: ObjectState::Loaded(geometry),
        })
    }

    /// An object whose load failed. It stays in the scene but draws nothing.
    pub fn failed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: ObjectNode::new("", Matrix4::identity()),
            state: ObjectState::Failed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &ObjectNode {
        &self.root
    }

    pub fn mesh_count(&self) -> usize {
        self.root.mesh_count()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, ObjectState::Failed)
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, ObjectState::Ready(_))
    }

    /// CPU geometry, only available until [`Renderable::initialize`] uploads it.
    pub fn geometry(&self) -> Option<&Geometry> {
        match &self.state {
            ObjectState::Loaded(geometry) => Some(geometry),
            _ => None,
        }
    }

    fn draw(
        &self,
        ctx: &mut dyn GraphicsContext,
        shader: ShaderKind,
        mode: DrawMode,
        model: &Matrix4<f32>,
    ) -> Result<(), RenderError> {
        let handle = match self.state {
            ObjectState::Failed => return Ok(()),
            ObjectState::Ready(handle) => handle,
            ObjectState::Loaded(_) | ObjectState::Released => {
                log::error!(
                    "Object {} must be initialized before it is rendered.",
                    self.name
                );
                return Err(RenderError::NotInitialized(self.name.clone()));
            }
        };

        ctx.bind_shader(shader);
        if let DrawMode::Color { frame, .. } = &mode {
            ctx.set_light_uniforms(frame.light, &frame.view);
            ctx.set_cascade_uniforms(frame.cascades);
        }
        ctx.bind_geometry(handle);

        let mut deferred = TransparentQueue::new();
        self.root.draw(ctx, &mode, model, &mut deferred);

        for (_, (model, mesh)) in deferred.drain() {
            ctx.set_matrix_uniforms(&mode.uniforms(model));
            mesh.draw(ctx, mode.with_material());
        }
        Ok(())
    }
}

impl Renderable for Object {
    fn initialize(&mut self, ctx: &mut dyn GraphicsContext) -> Result<(), RenderError> {
        match &self.state {
            ObjectState::Failed => {
                log::debug!("Skipping initialization of failed object {}.", self.name);
                Ok(())
            }
            ObjectState::Ready(_) => Ok(()),
            ObjectState::Released => Err(RenderError::Backend(format!(
                "object {} was already released",
                self.name
            ))),
            ObjectState::Loaded(geometry) if geometry.is_empty() => {
                log::warn!("Object {} has no triangles and is not drawn.", self.name);
                self.state = ObjectState::Failed;
                Ok(())
            }
            ObjectState::Loaded(geometry) => match ctx.upload_geometry(&self.name, geometry) {
                Ok(handle) => {
                    // the CPU copy is dropped with the Loaded state
                    self.state = ObjectState::Ready(handle);
                    Ok(())
                }
                Err(e) => {
                    self.state = ObjectState::Failed;
                    Err(e)
                }
            },
        }
    }

    fn render(
        &self,
        ctx: &mut dyn GraphicsContext,
        frame: &FrameParams,
        model: &Matrix4<f32>,
    ) -> Result<(), RenderError> {
        self.draw(ctx, ShaderKind::Object, DrawMode::color(frame), model)
    }

    fn render_shadow(
        &self,
        ctx: &mut dyn GraphicsContext,
        light_space: &Matrix4<f32>,
        model: &Matrix4<f32>,
    ) -> Result<(), RenderError> {
        self.draw(
            ctx,
            ShaderKind::ObjectShadow,
            DrawMode::Shadow {
                light_space: *light_space,
            },
            model,
        )
    }

    fn cleanup(&mut self, ctx: &mut dyn GraphicsContext) {
        if let ObjectState::Ready(handle) = self.state {
            ctx.release_geometry(handle);
            self.state = ObjectState::Released;
        }
    }
}
