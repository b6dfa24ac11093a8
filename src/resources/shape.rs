//! Objects described inline in the scene markup.
//!
//! ```xml
//! <shape name="ground">
//!   <material name="grass" diffuseColor="0.3 0.6 0.2">
//!     <texture url="grass.png" type="diffuse"/>
//!   </material>
//!   <node name="root" translation="0 0 0">
//!     <plane name="floor" material="grass" longAxis="50 0 0" latAxis="0 50 0" textureSize="5"/>
//!   </node>
//! </shape>
//! ```
//!
//! Materials come first, then exactly one root node. Primitives append to
//! one object-wide set of buffers, like meshes of an imported model.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};

use cgmath::{InnerSpace, Vector3};
use roxmltree::Node;

use crate::{
    data_structures::{
        material::Material,
        mesh::{DrawRange, Mesh},
        object::{Geometry, Object, ObjectNode},
        texture::{TextureKind, TextureRegistry},
    },
    error::LoadError,
    resources::{
        markup::{elements, f32_attr, name_attr, transform_attr, vec3_attr},
        mesh::compute_tangents,
        texture::resolve,
    },
};

const DEFAULT_AMBIENT: f32 = 0.5;
const MALFORMED_AMBIENT: f32 = 0.8;

pub struct ShapeLoader<'a, 'input> {
    element: Node<'a, 'input>,
    base_dir: PathBuf,
}

impl<'a, 'input> ShapeLoader<'a, 'input> {
    pub fn new(element: Node<'a, 'input>) -> Self {
        Self {
            element,
            base_dir: PathBuf::new(),
        }
    }

    /// Directory that relative texture urls are resolved against.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn build(self, textures: &mut TextureRegistry) -> Result<Object, LoadError> {
        let name = name_attr(&self.element, "name").unwrap_or("shape").to_string();
        let mut materials: HashMap<String, Rc<Material>> = HashMap::new();
        let mut root = None;

        for child in elements(self.element) {
            match child.tag_name().name() {
                "material" if root.is_none() => {
                    if let Some(material) = parse_material(&child, &self.base_dir, textures) {
                        materials.insert(material.name.clone(), Rc::new(material));
                    }
                }
                "node" if root.is_none() => root = Some(child),
                other => {
                    log::warn!("<shape name=\"{}\">: unexpected <{}>.", name, other);
                    return Err(LoadError::Schema(format!(
                        "<shape name=\"{}\"> has an unexpected <{}>",
                        name, other
                    )));
                }
            }
        }
        let Some(root) = root else {
            return Err(LoadError::Schema(format!(
                "<shape name=\"{}\"> has no root <node>",
                name
            )));
        };

        let mut geometry = Geometry::default();
        geometry.uv_channels.push(Vec::new());
        let root = process_node(&root, &materials, &mut geometry);
        Object::new(name, root, geometry)
    }
}

fn parse_material(node: &Node, base_dir: &Path, textures: &mut TextureRegistry) -> Option<Material> {
    let Some(name) = name_attr(node, "name") else {
        log::warn!("<material> without a name is ignored.");
        return None;
    };
    let mut material = Material::new(name);

    material.ambient = match node.attribute("ambientColor") {
        None => Vector3::new(DEFAULT_AMBIENT, DEFAULT_AMBIENT, DEFAULT_AMBIENT),
        Some(_) => vec3_attr(
            node,
            "ambientColor",
            Vector3::new(MALFORMED_AMBIENT, MALFORMED_AMBIENT, MALFORMED_AMBIENT),
        ),
    };
    material.diffuse = vec3_attr(node, "diffuseColor", Vector3::new(0.8, 0.8, 0.8));
    material.specular = vec3_attr(node, "specularColor", Vector3::new(0.2, 0.2, 0.2));
    material.shininess = f32_attr(node, "shininess", 0.2);
    material.alpha = f32_attr(node, "alpha", 1.0);
    material.height_scale = f32_attr(node, "heightScale", 0.1);

    for texture in elements(*node).filter(|n| n.tag_name().name() == "texture") {
        let Some(url) = name_attr(&texture, "url") else {
            log::warn!("<texture> of material {:?} has no url.", name);
            continue;
        };
        let kind = match texture.attribute("type").unwrap_or("diffuse") {
            "diffuse" => TextureKind::Diffuse,
            "normal" => TextureKind::Normal,
            "bump" => TextureKind::Bump,
            other => {
                log::warn!(
                    "Unknown texture type {:?} in material {:?}, treated as diffuse.",
                    other,
                    name
                );
                TextureKind::Diffuse
            }
        };
        let handle = textures.load_texture(&resolve(base_dir, url), kind);
        match kind {
            TextureKind::Normal => material.normal_texture = Some(handle),
            TextureKind::Bump => material.bump_texture = Some(handle),
            _ => material.diffuse_texture = Some(handle),
        }
    }
    Some(material)
}

fn process_node(
    node: &Node,
    materials: &HashMap<String, Rc<Material>>,
    geometry: &mut Geometry,
) -> ObjectNode {
    let mut object_node = ObjectNode::new(
        node.attribute("name").unwrap_or_default(),
        transform_attr(node),
    );
    let first_vertex = geometry.positions.len();
    let first_index = geometry.indices.len();

    let mut children = elements(*node).peekable();
    while let Some(child) = children.next_if(|c| c.tag_name().name() != "node") {
        match child.tag_name().name() {
            "plane" => {
                if let Some(mesh) = append_plane(&child, materials, geometry) {
                    object_node.meshes.push(Rc::new(mesh));
                }
            }
            other => {
                log::warn!("Unknown primitive <{}>, remaining primitives are ignored.", other);
                break;
            }
        }
    }

    derive_tangents(geometry, first_vertex, first_index);

    for child in elements(*node).filter(|c| c.tag_name().name() == "node") {
        object_node
            .children
            .push(process_node(&child, materials, geometry));
    }
    object_node
}

/// Tangent basis of the triangles appended since `first_index`.
fn derive_tangents(geometry: &mut Geometry, first_vertex: usize, first_index: usize) {
    let local: Vec<u32> = geometry.indices[first_index..]
        .iter()
        .map(|i| i - first_vertex as u32)
        .collect();
    let uvs = geometry.uv_channels[0].get(first_vertex..).unwrap_or(&[]);
    let (tangents, bitangents) = compute_tangents(&geometry.positions[first_vertex..], uvs, &local);
    geometry.tangents.extend(tangents);
    geometry.bitangents.extend(bitangents);
}

/// A rectangle spanned by two half-axes around `origin`.
fn append_plane(
    node: &Node,
    materials: &HashMap<String, Rc<Material>>,
    geometry: &mut Geometry,
) -> Option<Mesh> {
    let Some(name) = name_attr(node, "name") else {
        log::warn!("<plane> without a name is ignored.");
        return None;
    };
    let material = match node.attribute("material").and_then(|m| materials.get(m)) {
        Some(material) => material.clone(),
        None => {
            log::debug!("Plane {:?} uses the default material.", name);
            Rc::new(Material::new("default"))
        }
    };

    let origin = vec3_attr(node, "origin", Vector3::new(0.0, 0.0, 0.0));
    let long_axis = vec3_attr(node, "longAxis", Vector3::new(50.0, 0.0, 0.0));
    let lat_axis = vec3_attr(node, "latAxis", Vector3::new(0.0, 50.0, 0.0));
    let texture_size = f32_attr(node, "textureSize", 5.0);

    let length = long_axis.magnitude() * 2.0;
    let width = lat_axis.magnitude() * 2.0;
    let u = width / texture_size;
    let v = length / texture_size;

    let corners = [
        origin - lat_axis - long_axis,
        origin + lat_axis - long_axis,
        origin - lat_axis + long_axis,
        origin + lat_axis + long_axis,
    ];
    let uvs = [[0.0, 0.0], [u, 0.0], [0.0, v], [u, v]];
    let normal: [f32; 3] = long_axis.cross(lat_axis).normalize().into();

    let base = geometry.positions.len() as u32;
    for (corner, uv) in corners.iter().zip(uvs) {
        geometry.positions.push((*corner).into());
        geometry.normals.push(normal);
        geometry.uv_channels[0].push(uv);
    }

    let offset = geometry.indices.len() as u32;
    geometry
        .indices
        .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 1, base + 3]);

    Some(Mesh::new(name, DrawRange { offset, count: 6 }, material))
}
