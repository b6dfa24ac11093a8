//! Wavefront OBJ/MTL adapter.
//!
//! OBJ has no node hierarchy: every model of the file becomes a mesh under a
//! single identity root. Normals are generated when the file has none and
//! tangents are always derived by the builder.

use std::path::Path;

use crate::{
    data_structures::texture::TextureKind,
    error::LoadError,
    resources::import::{
        ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene, ShadingModel, TextureSource,
    },
};

pub fn import(path: &Path) -> Result<ImportedScene, LoadError> {
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )?;
    let materials = materials.unwrap_or_else(|e| {
        log::warn!("Materials of {:?} could not be loaded: {}", path, e);
        Vec::new()
    });

    let mut root = ImportedNode::new(
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    let meshes: Vec<ImportedMesh> = models.iter().map(convert_mesh).collect();
    root.meshes = (0..meshes.len()).collect();

    Ok(ImportedScene {
        materials: materials.iter().map(convert_material).collect(),
        meshes,
        root: Some(root),
        light_count: 0,
    })
}

fn convert_mesh(model: &tobj::Model) -> ImportedMesh {
    let m = &model.mesh;
    let positions: Vec<[f32; 3]> = m
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect();
    let normals = if m.normals.len() == m.positions.len() {
        m.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect()
    } else {
        Vec::new()
    };
    let uv_channels = if m.texcoords.len() / 2 == positions.len() && !positions.is_empty() {
        vec![m.texcoords.chunks_exact(2).map(|t| [t[0], t[1]]).collect()]
    } else {
        Vec::new()
    };

    ImportedMesh {
        name: model.name.clone(),
        positions,
        normals,
        uv_channels,
        faces: m.indices.chunks(3).map(<[u32]>::to_vec).collect(),
        tangents: None,
        bitangents: None,
        // no material means an out of range index, i.e. the default material
        material_index: m.material_id.unwrap_or(usize::MAX),
    }
}

fn convert_material(m: &tobj::Material) -> ImportedMaterial {
    let shading = match m.illumination_model {
        None | Some(2) => ShadingModel::Phong,
        Some(0) | Some(1) => ShadingModel::Gouraud,
        Some(other) => ShadingModel::Other(format!("illum {}", other)),
    };
    let mut material = ImportedMaterial::new(m.name.clone(), shading);
    if let Some(ambient) = m.ambient {
        material.ambient = ambient;
    }
    if let Some(diffuse) = m.diffuse {
        material.diffuse = diffuse;
    }
    if let Some(specular) = m.specular {
        material.specular = specular;
    }
    if let Some(shininess) = m.shininess {
        material.shininess = shininess;
    }
    if let Some(dissolve) = m.dissolve {
        material.opacity = dissolve;
    }
    if let Some(diffuse) = &m.diffuse_texture {
        material
            .textures
            .push((TextureKind::Diffuse, TextureSource::File(diffuse.clone())));
    }
    if let Some(normal) = &m.normal_texture {
        material
            .textures
            .push((TextureKind::Normal, TextureSource::File(normal.clone())));
    }
    material
}
