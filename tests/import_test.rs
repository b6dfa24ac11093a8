use std::rc::Rc;

use cgmath::Vector3;
use track_ngin::{
    data_structures::texture::{TextureKind, TextureRegistry},
    error::LoadError,
    resources::import::{ObjectLoader, import_file},
};

use crate::common::test_utils::{QUAD_OBJ, assert_vec_close, temp_dir, write_file};

mod common;

const TWO_OBJECTS_OBJ: &str = "\
mtllib two.mtl
o red_part
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
usemtl red
f 1/1 2/2 3/3
o blue_part
v 0.0 0.0 1.0
v 1.0 0.0 1.0
v 1.0 1.0 1.0
v 0.0 1.0 1.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
usemtl blue
f 4/4 5/5 6/6 7/7
";

const TWO_OBJECTS_MTL: &str = "\
newmtl red
Ka 0.1 0.0 0.0
Kd 1.0 0.0 0.0
Ks 0.5 0.5 0.5
Ns 10.0
d 0.5
illum 2
map_Kd textures/shared.png

newmtl blue
Kd 0.0 0.0 1.0
map_Kd textures/shared.png
";

fn write_png(path: &std::path::Path) {
    image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]))
        .save(path)
        .unwrap();
}

#[test]
fn obj_models_should_become_meshes_under_one_root() {
    let dir = temp_dir("obj-two");
    std::fs::create_dir_all(dir.join("textures")).unwrap();
    write_png(&dir.join("textures/shared.png"));
    write_file(&dir, "two.mtl", TWO_OBJECTS_MTL);
    let obj = write_file(&dir, "two.obj", TWO_OBJECTS_OBJ);

    let mut textures = TextureRegistry::new();
    let object = ObjectLoader::new(&obj, "").build(&mut textures).unwrap();

    assert_eq!(object.name(), "two");
    let root = object.root();
    assert!(root.children.is_empty());
    assert_eq!(root.meshes.len(), 2);

    let red = &root.meshes[0];
    let blue = &root.meshes[1];
    assert_eq!(red.name, "red_part");
    assert_eq!(red.range.count, 3);
    assert_eq!(blue.range.offset, 3);
    // the quad is triangulated
    assert_eq!(blue.range.count, 6);

    assert_eq!(red.material.name, "red");
    assert_eq!(red.material.diffuse, Vector3::new(1.0, 0.0, 0.0));
    assert_eq!(red.material.shininess, 10.0);
    assert_eq!(red.material.alpha, 0.5);
    assert!(!red.is_opaque());
    assert!(blue.is_opaque());

    let red_texture = red.material.diffuse_texture.clone().unwrap();
    let blue_texture = blue.material.diffuse_texture.clone().unwrap();
    assert!(Rc::ptr_eq(&red_texture, &blue_texture));
    assert!(red_texture.is_loaded());
    assert_eq!(red_texture.kind, TextureKind::Diffuse);
    assert_eq!(textures.len(), 1);

    let geometry = object.geometry().unwrap();
    assert_eq!(geometry.vertex_count(), 7);
    geometry.validate().unwrap();
}

#[test]
fn texture_folder_should_override_the_model_directory() {
    let dir = temp_dir("obj-folder");
    std::fs::create_dir_all(dir.join("elsewhere/textures")).unwrap();
    write_png(&dir.join("elsewhere/textures/shared.png"));
    write_file(&dir, "two.mtl", TWO_OBJECTS_MTL);
    let obj = write_file(&dir, "two.obj", TWO_OBJECTS_OBJ);

    let mut textures = TextureRegistry::new();
    let object = ObjectLoader::new(&obj, dir.join("elsewhere"))
        .with_name("renamed")
        .build(&mut textures)
        .unwrap();

    assert_eq!(object.name(), "renamed");
    let texture = object.root().meshes[0].material.diffuse_texture.clone().unwrap();
    assert!(texture.is_loaded());
}

#[test]
fn unreadable_textures_should_be_registered_without_pixels() {
    let dir = temp_dir("obj-no-texture");
    write_file(&dir, "two.mtl", TWO_OBJECTS_MTL);
    let obj = write_file(&dir, "two.obj", TWO_OBJECTS_OBJ);

    let mut textures = TextureRegistry::new();
    let object = ObjectLoader::new(&obj, "").build(&mut textures).unwrap();

    let texture = object.root().meshes[0].material.diffuse_texture.clone().unwrap();
    assert!(!texture.is_loaded());
    assert_eq!(textures.len(), 1);
}

#[test]
fn obj_without_normals_or_materials_should_still_load() {
    let dir = temp_dir("obj-plain");
    let obj = write_file(
        &dir,
        "tri.obj",
        "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
    );
    let mut textures = TextureRegistry::new();
    let object = ObjectLoader::new(&obj, "").build(&mut textures).unwrap();

    let mesh = &object.root().meshes[0];
    assert_eq!(mesh.material.name, "default");
    let geometry = object.geometry().unwrap();
    assert_eq!(geometry.normals, vec![[0.0, 0.0, 1.0]; 3]);
    assert!(geometry.uv_channels.is_empty());
}

#[test]
fn quad_import_should_keep_uvs() {
    let dir = temp_dir("obj-quad");
    let obj = write_file(&dir, "quad.obj", QUAD_OBJ);
    let scene = import_file(&obj).unwrap();

    assert_eq!(scene.meshes.len(), 1);
    let mesh = &scene.meshes[0];
    assert_eq!(mesh.positions.len(), 4);
    assert_eq!(mesh.uv_channels.len(), 1);
    assert_eq!(mesh.faces.len(), 2);
    assert!(mesh.faces.iter().all(|f| f.len() == 3));
}

#[test]
fn gltf_hierarchy_and_materials_should_be_imported() {
    let dir = temp_dir("gltf");
    let mut bin = Vec::new();
    for p in [[0.0_f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
        for c in p {
            bin.extend_from_slice(&c.to_le_bytes());
        }
    }
    for i in [0_u16, 1, 2] {
        bin.extend_from_slice(&i.to_le_bytes());
    }
    bin.extend_from_slice(&[0, 0]);
    std::fs::write(dir.join("tri.bin"), &bin).unwrap();

    let gltf = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [
            {"name": "parent", "translation": [1.0, 0.0, 0.0], "children": [1]},
            {"name": "child", "mesh": 0}
        ],
        "meshes": [{"name": "tri", "primitives": [{"attributes": {"POSITION": 0}, "indices": 1, "material": 0}]}],
        "materials": [{
            "name": "paint",
            "pbrMetallicRoughness": {"baseColorFactor": [1.0, 0.0, 0.0, 0.5], "roughnessFactor": 1.0},
            "alphaMode": "BLEND"
        }],
        "buffers": [{"uri": "tri.bin", "byteLength": 44}],
        "bufferViews": [
            {"buffer": 0, "byteOffset": 0, "byteLength": 36},
            {"buffer": 0, "byteOffset": 36, "byteLength": 6}
        ],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
            {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
        ]
    }"#;
    let path = write_file(&dir, "tri.gltf", gltf);

    let mut textures = TextureRegistry::new();
    let object = ObjectLoader::new(&path, "").build(&mut textures).unwrap();

    assert_eq!(object.name(), "tri");
    let parent = &object.root().children[0];
    assert_eq!(parent.name, "parent");
    assert_vec_close(parent.transform.w.truncate(), Vector3::new(1.0, 0.0, 0.0));
    let child = &parent.children[0];
    assert_eq!(child.name, "child");
    assert_eq!(child.meshes.len(), 1);

    let mesh = &child.meshes[0];
    assert_eq!(mesh.name, "tri");
    assert_eq!(mesh.range.count, 3);
    assert_eq!(mesh.material.name, "paint");
    assert_eq!(mesh.material.diffuse, Vector3::new(1.0, 0.0, 0.0));
    assert_eq!(mesh.material.alpha, 0.5);

    let geometry = object.geometry().unwrap();
    assert_eq!(geometry.normals, vec![[0.0, 0.0, 1.0]; 3]);
}

#[test]
fn unsupported_and_missing_files_should_fail() {
    let dir = temp_dir("import-fail");
    let fbx = write_file(&dir, "car.fbx", "not really");
    let mut textures = TextureRegistry::new();

    assert!(matches!(
        ObjectLoader::new(&fbx, "").build(&mut textures),
        Err(LoadError::UnsupportedFormat(_))
    ));
    assert!(matches!(
        ObjectLoader::new(dir.join("gone.obj"), "").build(&mut textures),
        Err(LoadError::MissingFile(_))
    ));
}
