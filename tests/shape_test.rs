use cgmath::{Matrix4, Vector3};
use roxmltree::Document;
use track_ngin::{
    data_structures::{object::Object, texture::TextureRegistry},
    error::LoadError,
    resources::shape::ShapeLoader,
};

use crate::common::test_utils::{assert_close, assert_vec_close, temp_dir};

mod common;

fn build(markup: &str) -> Result<Object, LoadError> {
    let document = Document::parse(markup).unwrap();
    let mut textures = TextureRegistry::new();
    ShapeLoader::new(document.root_element()).build(&mut textures)
}

#[test]
fn plane_should_span_both_half_axes() {
    let object = build(
        r#"<shape name="floor">
             <material name="m"/>
             <node name="root">
               <plane name="p" material="m" origin="0 0 1" longAxis="2 0 0" latAxis="0 1 0" textureSize="1"/>
             </node>
           </shape>"#,
    )
    .unwrap();

    let geometry = object.geometry().unwrap();
    assert_eq!(
        geometry.positions,
        vec![
            [-2.0, -1.0, 1.0],
            [-2.0, 1.0, 1.0],
            [2.0, -1.0, 1.0],
            [2.0, 1.0, 1.0],
        ]
    );
    assert_eq!(
        geometry.uv_channels[0],
        vec![[0.0, 0.0], [2.0, 0.0], [0.0, 4.0], [2.0, 4.0]]
    );
    assert_eq!(geometry.indices, vec![0, 1, 2, 2, 1, 3]);
    assert!(geometry.normals.iter().all(|n| *n == [0.0, 0.0, 1.0]));

    for (t, b) in geometry.tangents.iter().zip(&geometry.bitangents) {
        assert_vec_close(Vector3::from(*t), Vector3::new(0.0, 1.0, 0.0));
        assert_vec_close(Vector3::from(*b), Vector3::new(1.0, 0.0, 0.0));
    }

    let mesh = &object.root().meshes[0];
    assert_eq!(mesh.name, "p");
    assert_eq!(mesh.range.offset, 0);
    assert_eq!(mesh.range.count, 6);
    assert_eq!(mesh.material.name, "m");
}

#[test]
fn plane_attributes_should_have_defaults() {
    let object = build(r#"<shape name="s"><node><plane name="p"/></node></shape>"#).unwrap();
    let geometry = object.geometry().unwrap();

    assert_eq!(geometry.positions[0], [-50.0, -50.0, 0.0]);
    assert_eq!(geometry.positions[3], [50.0, 50.0, 0.0]);
    assert_eq!(geometry.uv_channels[0][3], [20.0, 20.0]);
    // no material attribute means the default material
    assert_eq!(object.root().meshes[0].material.name, "default");
}

#[test]
fn material_attributes_should_fall_back_per_attribute() {
    let object = build(
        r#"<shape name="s">
             <material name="plain"/>
             <material name="broken" ambientColor="1 2" diffuseColor="x y z" shininess="shiny"/>
             <material name="explicit" ambientColor="0.1 0.2 0.3" diffuseColor="1 0 0"
                       specularColor="0 1 0" shininess="32" alpha="0.25" heightScale="0.05"/>
             <node>
               <plane name="a" material="plain"/>
               <plane name="b" material="broken"/>
               <plane name="c" material="explicit"/>
             </node>
           </shape>"#,
    )
    .unwrap();
    let meshes = &object.root().meshes;

    let plain = &meshes[0].material;
    assert_eq!(plain.ambient, Vector3::new(0.5, 0.5, 0.5));
    assert_eq!(plain.diffuse, Vector3::new(0.8, 0.8, 0.8));
    assert_eq!(plain.specular, Vector3::new(0.2, 0.2, 0.2));
    assert_close(plain.shininess, 0.2);
    assert_close(plain.alpha, 1.0);
    assert_close(plain.height_scale, 0.1);

    let broken = &meshes[1].material;
    assert_eq!(broken.ambient, Vector3::new(0.8, 0.8, 0.8));
    assert_eq!(broken.diffuse, Vector3::new(0.8, 0.8, 0.8));
    assert_close(broken.shininess, 0.2);

    let explicit = &meshes[2].material;
    assert_eq!(explicit.ambient, Vector3::new(0.1, 0.2, 0.3));
    assert_eq!(explicit.diffuse, Vector3::new(1.0, 0.0, 0.0));
    assert_eq!(explicit.specular, Vector3::new(0.0, 1.0, 0.0));
    assert_close(explicit.shininess, 32.0);
    assert_close(explicit.height_scale, 0.05);
    assert!(!meshes[2].is_opaque());
}

#[test]
fn textures_should_resolve_against_the_base_dir() {
    let dir = temp_dir("shape-textures");
    image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 0, 0, 255]))
        .save(dir.join("grass.png"))
        .unwrap();

    let document = Document::parse(
        r#"<shape name="s">
             <material name="m">
               <texture url="grass.png" type="diffuse"/>
               <texture url="normal.png" type="normal"/>
               <texture url="height.png" type="bump"/>
             </material>
             <material name="odd">
               <texture url="grass.png" type="glow"/>
             </material>
             <node><plane name="a" material="m"/><plane name="b" material="odd"/></node>
           </shape>"#,
    )
    .unwrap();
    let mut textures = TextureRegistry::new();
    let object = ShapeLoader::new(document.root_element())
        .with_base_dir(&dir)
        .build(&mut textures)
        .unwrap();

    let m = &object.root().meshes[0].material;
    assert!(m.diffuse_texture.as_ref().unwrap().is_loaded());
    assert!(!m.normal_texture.as_ref().unwrap().is_loaded());
    assert!(m.bump_texture.is_some());

    // unknown types are treated as diffuse and share the decoded image
    let odd = &object.root().meshes[1].material;
    assert!(std::rc::Rc::ptr_eq(
        odd.diffuse_texture.as_ref().unwrap(),
        m.diffuse_texture.as_ref().unwrap()
    ));
    assert_eq!(textures.len(), 3);
}

#[test]
fn nested_nodes_should_share_the_object_buffers() {
    let object = build(
        r#"<shape name="s">
             <node name="root">
               <plane name="floor" longAxis="1 0 0" latAxis="0 1 0"/>
               <node name="wall" translation="0 0 1">
                 <plane name="side" longAxis="1 0 0" latAxis="0 0 1"/>
               </node>
             </node>
           </shape>"#,
    )
    .unwrap();

    let root = object.root();
    assert_eq!(root.name, "root");
    let wall = &root.children[0];
    assert_eq!(wall.name, "wall");
    assert_eq!(
        wall.transform,
        Matrix4::from_translation(Vector3::new(0.0, 0.0, 1.0))
    );
    assert_eq!(wall.meshes[0].range.offset, 6);
    assert_eq!(object.mesh_count(), 2);

    let geometry = object.geometry().unwrap();
    assert_eq!(geometry.vertex_count(), 8);
    assert_eq!(&geometry.indices[6..], &[4, 5, 6, 6, 5, 7]);
    // long x lat = x cross z
    assert_eq!(geometry.normals[4], [0.0, -1.0, 0.0]);
    geometry.validate().unwrap();
}

#[test]
fn unusable_primitives_should_be_skipped() {
    let object = build(
        r#"<shape name="s">
             <node>
               <plane/>
               <plane name="kept" material="nonexistent"/>
               <sphere name="ball"/>
               <plane name="after_unknown"/>
             </node>
           </shape>"#,
    )
    .unwrap();

    let meshes = &object.root().meshes;
    assert_eq!(meshes.len(), 1);
    assert_eq!(meshes[0].name, "kept");
    assert_eq!(meshes[0].material.name, "default");
    assert_eq!(object.geometry().unwrap().vertex_count(), 4);
}

#[test]
fn shapes_without_a_single_root_node_should_be_rejected() {
    assert!(matches!(
        build(r#"<shape name="s"><material name="m"/></shape>"#),
        Err(LoadError::Schema(_))
    ));
    assert!(matches!(
        build(r#"<shape name="s"><node/><node/></shape>"#),
        Err(LoadError::Schema(_))
    ));
    assert!(matches!(
        build(r#"<shape name="s"><node/><material name="m"/></shape>"#),
        Err(LoadError::Schema(_))
    ));
}
