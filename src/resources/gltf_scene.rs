//! glTF 2.0 adapter.
//!
//! Every primitive becomes one imported mesh; a glTF mesh maps to the list of
//! its primitives. The default scene (or the first one) becomes the root node
//! and the node hierarchy is mirrored below it. Metallic-roughness materials
//! are approximated with Phong parameters.

use std::path::Path;

use cgmath::{InnerSpace, Matrix4, Vector3, Vector4};
use image::RgbaImage;

use crate::{
    data_structures::texture::TextureKind,
    error::LoadError,
    resources::import::{
        ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene, ShadingModel, TextureSource,
    },
};

pub fn import(path: &Path) -> Result<ImportedScene, LoadError> {
    let (document, buffers, images) = gltf::import(path)?;

    let materials = document
        .materials()
        .map(|m| convert_material(path, &m, &images))
        .collect();

    // glTF mesh index -> imported mesh indices (one per primitive)
    let mut primitive_map: Vec<Vec<usize>> = Vec::new();
    let mut meshes = Vec::new();
    for mesh in document.meshes() {
        let mut indices = Vec::new();
        for primitive in mesh.primitives() {
            indices.push(meshes.len());
            meshes.push(convert_primitive(&mesh, &primitive, &buffers));
        }
        primitive_map.push(indices);
    }

    let scene = document.default_scene().or_else(|| document.scenes().next());
    let root = scene.map(|scene| {
        let mut root = ImportedNode::new(scene.name().unwrap_or("root"));
        root.children = scene
            .nodes()
            .map(|node| convert_node(&node, &primitive_map))
            .collect();
        root
    });

    // punctual lights are an extension the importer does not enable
    Ok(ImportedScene {
        materials,
        meshes,
        root,
        light_count: 0,
    })
}

fn convert_node(node: &gltf::Node, primitive_map: &[Vec<usize>]) -> ImportedNode {
    let mut imported = ImportedNode::new(node.name().unwrap_or_default());
    imported.transform = Matrix4::from(node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        match primitive_map.get(mesh.index()) {
            Some(indices) => imported.meshes.extend_from_slice(indices),
            None => imported.meshes.push(usize::MAX),
        }
    }
    imported.children = node
        .children()
        .map(|child| convert_node(&child, primitive_map))
        .collect();
    imported
}

fn convert_primitive(
    mesh: &gltf::Mesh,
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
) -> ImportedMesh {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .map(|p| p.collect())
        .unwrap_or_default();
    let normals: Vec<[f32; 3]> = reader
        .read_normals()
        .map(|n| n.collect())
        .unwrap_or_default();

    let mut uv_channels = Vec::new();
    while let Some(coords) = reader.read_tex_coords(uv_channels.len() as u32) {
        // glTF puts the UV origin top-left
        uv_channels.push(
            coords
                .into_f32()
                .map(|[u, v]| [u, 1.0 - v])
                .collect::<Vec<_>>(),
        );
    }

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    let arity = match primitive.mode() {
        gltf::mesh::Mode::Points => 1,
        gltf::mesh::Mode::Lines | gltf::mesh::Mode::LineLoop | gltf::mesh::Mode::LineStrip => 2,
        gltf::mesh::Mode::Triangles => 3,
        mode => {
            log::debug!("Primitive mode {:?} of mesh {:?} is not supported.", mode, mesh.name());
            0
        }
    };
    let faces = if arity == 0 {
        Vec::new()
    } else {
        indices.chunks(arity).map(<[u32]>::to_vec).collect()
    };

    // glTF tangents are vec4, w holds the handedness of the bitangent
    let (tangents, bitangents) = match reader.read_tangents() {
        Some(tangents) if normals.len() == positions.len() => {
            let (t, b): (Vec<[f32; 3]>, Vec<[f32; 3]>) = tangents
                .zip(normals.iter())
                .map(|(tangent, normal)| -> ([f32; 3], [f32; 3]) {
                    let tangent: Vector4<f32> = tangent.into();
                    let normal: Vector3<f32> = (*normal).into();
                    let bitangent = normal.cross(tangent.truncate()) * tangent.w;
                    (
                        Into::<[f32; 3]>::into(tangent.truncate()),
                        Into::<[f32; 3]>::into(bitangent.normalize()),
                    )
                })
                .unzip();
            (Some(t), Some(b))
        }
        _ => (None, None),
    };

    ImportedMesh {
        name: mesh.name().unwrap_or("unknown_mesh").to_string(),
        positions,
        normals,
        uv_channels,
        faces,
        tangents,
        bitangents,
        material_index: primitive.material().index().unwrap_or(usize::MAX),
    }
}

fn convert_material(
    path: &Path,
    material: &gltf::Material,
    images: &[gltf::image::Data],
) -> ImportedMaterial {
    let shading = if material.unlit() {
        ShadingModel::Other("unlit".to_string())
    } else {
        ShadingModel::Phong
    };
    let name = material
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("material{}", material.index().unwrap_or(0)));
    let mut imported = ImportedMaterial::new(name, shading);

    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, a] = pbr.base_color_factor();
    let gloss = 1.0 - pbr.roughness_factor();
    imported.diffuse = [r, g, b];
    imported.ambient = [r * 0.2, g * 0.2, b * 0.2];
    imported.specular = [gloss * 0.5; 3];
    imported.shininess = (gloss * 128.0).max(1.0);
    imported.opacity = match material.alpha_mode() {
        gltf::material::AlphaMode::Blend => a,
        _ => 1.0,
    };

    if let Some(info) = pbr.base_color_texture() {
        imported.textures.push((
            TextureKind::Diffuse,
            texture_source(path, &info.texture(), images),
        ));
    }
    if let Some(normal) = material.normal_texture() {
        imported.textures.push((
            TextureKind::Normal,
            texture_source(path, &normal.texture(), images),
        ));
    }
    imported
}

fn texture_source(path: &Path, texture: &gltf::Texture, images: &[gltf::image::Data]) -> TextureSource {
    let image = texture.source();
    match image.source() {
        gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => {
            TextureSource::File(uri.to_string())
        }
        _ => TextureSource::Embedded {
            key: format!("{}#image{}", path.display(), image.index()),
            image: images.get(image.index()).and_then(to_rgba),
        },
    }
}

fn to_rgba(data: &gltf::image::Data) -> Option<RgbaImage> {
    match data.format {
        gltf::image::Format::R8G8B8A8 => {
            RgbaImage::from_raw(data.width, data.height, data.pixels.clone())
        }
        gltf::image::Format::R8G8B8 => {
            let pixels = data
                .pixels
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect();
            RgbaImage::from_raw(data.width, data.height, pixels)
        }
        format => {
            log::warn!("Embedded image format {:?} is not supported.", format);
            None
        }
    }
}
