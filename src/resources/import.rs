//! Builds [`Object`]s from imported model files.
//!
//! Format adapters (`obj`, `gltf`) translate a file into an [`ImportedScene`];
//! [`ObjectLoader`] turns that into engine data: materials with shared
//! textures, one set of object-wide buffers, meshes as index ranges and a
//! node tree mirroring the file's hierarchy.

use std::{
    path::{Path, PathBuf},
    rc::Rc,
};

use cgmath::{Matrix4, SquareMatrix, Vector3};
use image::RgbaImage;

use crate::{
    data_structures::{
        material::Material,
        mesh::{DrawRange, Mesh},
        object::{Geometry, Object, ObjectNode},
        texture::{TextureKind, TextureRegistry},
    },
    error::LoadError,
    resources::{gltf_scene, mesh, obj, texture::resolve},
};

#[derive(Clone, Debug, PartialEq)]
pub enum ShadingModel {
    Phong,
    Gouraud,
    /// Anything else the source declares, kept for diagnostics.
    Other(String),
}

impl ShadingModel {
    pub fn is_supported(&self) -> bool {
        matches!(self, ShadingModel::Phong | ShadingModel::Gouraud)
    }
}

#[derive(Clone, Debug)]
pub enum TextureSource {
    /// Path as written in the model file, relative to the texture folder.
    File(String),
    /// Pixels stored inside the model file. `key` must be unique per image.
    Embedded { key: String, image: Option<RgbaImage> },
}

#[derive(Clone, Debug)]
pub struct ImportedMaterial {
    pub name: String,
    pub shading: ShadingModel,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    pub opacity: f32,
    /// In source order. Only the first texture of each kind is used.
    pub textures: Vec<(TextureKind, TextureSource)>,
}

impl ImportedMaterial {
    pub fn new(name: impl Into<String>, shading: ShadingModel) -> Self {
        Self {
            name: name.into(),
            shading,
            ambient: [0.2; 3],
            diffuse: [0.8; 3],
            specular: [0.0; 3],
            shininess: 1.0,
            opacity: 1.0,
            textures: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    /// Empty when the source has none.
    pub normals: Vec<[f32; 3]>,
    pub uv_channels: Vec<Vec<[f32; 2]>>,
    /// Faces of any arity. Only triangles are kept.
    pub faces: Vec<Vec<u32>>,
    pub tangents: Option<Vec<[f32; 3]>>,
    pub bitangents: Option<Vec<[f32; 3]>>,
    pub material_index: usize,
}

#[derive(Clone, Debug)]
pub struct ImportedNode {
    pub name: String,
    pub transform: Matrix4<f32>,
    pub meshes: Vec<usize>,
    pub children: Vec<ImportedNode>,
}

impl ImportedNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Matrix4::identity(),
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ImportedScene {
    pub materials: Vec<ImportedMaterial>,
    pub meshes: Vec<ImportedMesh>,
    pub root: Option<ImportedNode>,
    pub light_count: usize,
}

enum Source {
    File(PathBuf),
    Imported(ImportedScene),
}

/// One-shot builder for an [`Object`] from an external model.
pub struct ObjectLoader {
    name: String,
    source: Source,
    texture_dir: PathBuf,
}

impl ObjectLoader {
    /// `texture_dir` is where the model's texture references are resolved.
    /// An empty path means the directory of the model file.
    pub fn new(path: impl Into<PathBuf>, texture_dir: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut texture_dir = texture_dir.into();
        if texture_dir.as_os_str().is_empty() {
            texture_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            source: Source::File(path),
            texture_dir,
        }
    }

    /// Builds from an already imported scene.
    pub fn from_imported(
        name: impl Into<String>,
        scene: ImportedScene,
        texture_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            source: Source::Imported(scene),
            texture_dir: texture_dir.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn build(self, textures: &mut TextureRegistry) -> Result<Object, LoadError> {
        let (scene, origin) = match self.source {
            Source::File(path) => {
                if !path.is_file() {
                    log::warn!("Model file {:?} does not exist.", path);
                    return Err(LoadError::MissingFile(path));
                }
                (import_file(&path)?, path)
            }
            Source::Imported(scene) => (scene, PathBuf::from(&self.name)),
        };

        if !self.texture_dir.as_os_str().is_empty() && !self.texture_dir.is_dir() {
            log::warn!(
                "Texture folder {:?} of {:?} does not exist.",
                self.texture_dir,
                origin
            );
        }
        if scene.meshes.is_empty() {
            log::warn!("Model {:?} contains no meshes.", origin);
            return Err(LoadError::NoMeshes(origin));
        }
        let Some(root) = scene.root.as_ref() else {
            log::warn!("Model {:?} has no root node.", origin);
            return Err(LoadError::NoRootNode(origin));
        };
        if scene.light_count > 0 {
            log::debug!(
                "Ignoring {} light(s) declared in {:?}.",
                scene.light_count,
                origin
            );
        }

        let materials: Vec<Rc<Material>> = scene
            .materials
            .iter()
            .map(|m| Rc::new(build_material(m, &self.texture_dir, textures)))
            .collect();

        let mut geometry = Geometry::default();
        let meshes: Vec<Rc<Mesh>> = scene
            .meshes
            .iter()
            .map(|m| Rc::new(append_mesh(&mut geometry, m, &materials)))
            .collect();

        let root = build_node(root, &meshes, &origin);
        Object::new(self.name, root, geometry)
    }
}

/// Picks the adapter from the file extension.
pub fn import_file(path: &Path) -> Result<ImportedScene, LoadError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "obj" => obj::import(path),
        "gltf" | "glb" => gltf_scene::import(path),
        _ => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    }
}

pub fn build_material(
    imported: &ImportedMaterial,
    texture_dir: &Path,
    textures: &mut TextureRegistry,
) -> Material {
    let mut material = Material::new(imported.name.clone());
    if !imported.shading.is_supported() {
        log::debug!(
            "Material {:?} uses unsupported shading {:?}, using defaults.",
            imported.name,
            imported.shading
        );
        return material;
    }
    material.ambient = Vector3::from(imported.ambient);
    material.diffuse = Vector3::from(imported.diffuse);
    material.specular = Vector3::from(imported.specular);
    material.shininess = imported.shininess;
    material.alpha = imported.opacity;

    let mut load = |kind: TextureKind| {
        imported
            .textures
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, source)| match source {
                TextureSource::File(reference) => {
                    textures.load_texture(&resolve(texture_dir, reference), kind)
                }
                TextureSource::Embedded { key, image } => {
                    textures.insert_decoded(key.as_str(), kind, image.clone())
                }
            })
    };
    material.diffuse_texture = load(TextureKind::Diffuse);
    material.normal_texture = load(TextureKind::Normal);
    material
}

/// Appends one mesh to the object-wide buffers.
///
/// Indices are offset by the vertex count before the mesh. UV channels the
/// object has not seen yet are created empty, so meshes appended earlier
/// contribute nothing to them.
pub fn append_mesh(
    geometry: &mut Geometry,
    imported: &ImportedMesh,
    materials: &[Rc<Material>],
) -> Mesh {
    let offset = geometry.indices.len() as u32;
    let vertex_offset = geometry.positions.len() as u32;
    let vertex_count = imported.positions.len();

    let mut triangles = Vec::with_capacity(imported.faces.len() * 3);
    for face in &imported.faces {
        if face.len() != 3 {
            log::debug!(
                "Mesh {:?}: ignoring face with {} indices.",
                imported.name,
                face.len()
            );
            continue;
        }
        triangles.extend_from_slice(face);
    }

    geometry.positions.extend_from_slice(&imported.positions);
    if imported.normals.len() == vertex_count {
        geometry.normals.extend_from_slice(&imported.normals);
    } else {
        geometry
            .normals
            .extend(mesh::smooth_normals(&imported.positions, &triangles));
    }

    if geometry.uv_channels.len() < imported.uv_channels.len() {
        geometry
            .uv_channels
            .resize_with(imported.uv_channels.len(), Vec::new);
    }
    for (channel, uvs) in imported.uv_channels.iter().enumerate() {
        geometry.uv_channels[channel].extend_from_slice(uvs);
    }

    geometry
        .indices
        .extend(triangles.iter().map(|i| i + vertex_offset));

    match (&imported.tangents, &imported.bitangents) {
        (Some(t), Some(b)) if t.len() == vertex_count && b.len() == vertex_count => {
            geometry.tangents.extend_from_slice(t);
            geometry.bitangents.extend_from_slice(b);
        }
        _ => {
            let uvs = imported.uv_channels.first().map(Vec::as_slice).unwrap_or(&[]);
            let (t, b) = mesh::compute_tangents(&imported.positions, uvs, &triangles);
            geometry.tangents.extend(t);
            geometry.bitangents.extend(b);
        }
    }

    let material = materials
        .get(imported.material_index)
        .cloned()
        .unwrap_or_else(|| Rc::new(Material::new("default")));
    Mesh::new(
        imported.name.clone(),
        DrawRange {
            offset,
            count: geometry.indices.len() as u32 - offset,
        },
        material,
    )
}

fn build_node(imported: &ImportedNode, meshes: &[Rc<Mesh>], origin: &Path) -> ObjectNode {
    let mut node = ObjectNode::new(imported.name.clone(), imported.transform);
    for index in &imported.meshes {
        match meshes.get(*index) {
            Some(mesh) => node.meshes.push(mesh.clone()),
            None => log::warn!(
                "Node {:?} of {:?} references missing mesh {}.",
                imported.name,
                origin,
                index
            ),
        }
    }
    node.children = imported
        .children
        .iter()
        .map(|child| build_node(child, meshes, origin))
        .collect();
    node
}
