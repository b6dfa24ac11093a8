use cgmath::{Matrix4, SquareMatrix, Vector3};
use track_ngin::{
    data_structures::{registry::ObjectRegistry, texture::TextureRegistry},
    error::LoadError,
    resources::{
        markup::{parse_quaternion, parse_vec3, transform_attr},
        world::WorldLoader,
    },
};

use crate::common::test_utils::{QUAD_OBJ, assert_vec_close, temp_dir, write_file};

mod common;

const PLANE_SHAPE: &str = r#"
<shape name="A">
  <material name="stone" diffuseColor="0.5 0.5 0.5"/>
  <node name="root">
    <plane name="slab" material="stone" longAxis="1 0 0" latAxis="0 1 0"/>
  </node>
</shape>"#;

fn load(markup: &str) -> (Result<track_ngin::data_structures::scene_graph::WorldNode, LoadError>, ObjectRegistry) {
    let mut objects = ObjectRegistry::objects();
    let mut textures = TextureRegistry::new();
    let result = WorldLoader::new(&mut objects, &mut textures).load_str(markup, std::path::Path::new(""));
    (result, objects)
}

#[test]
fn reference_should_place_a_registered_object_again() {
    let markup = format!(
        r#"<world><group>
            <transform>{}</transform>
            <transform translation="1 0 0"><reference ref="A"/></transform>
        </group></world>"#,
        PLANE_SHAPE
    );
    let (world, objects) = load(&markup);
    let world = world.unwrap();

    assert_eq!(objects.len(), 1);
    let id = objects.id("A").unwrap();
    let placements = world.placements();
    assert_eq!(placements.len(), 2);
    assert_eq!(placements[0], (id, Matrix4::identity()));
    assert_eq!(placements[1].0, id);
    assert_vec_close(placements[1].1.w.truncate(), Vector3::new(1.0, 0.0, 0.0));
}

#[test]
fn nested_groups_should_compose_transforms() {
    let markup = format!(
        r#"<world><group>
            <transform translation="0 0 2">
              <group>
                <transform translation="3 0 0">{}</transform>
              </group>
            </transform>
        </group></world>"#,
        PLANE_SHAPE
    );
    let (world, _) = load(&markup);
    let placements = world.unwrap().placements();
    assert_eq!(placements.len(), 1);
    assert_vec_close(placements[0].1.w.truncate(), Vector3::new(3.0, 0.0, 2.0));
}

#[test]
fn duplicate_and_unnamed_objects_should_be_skipped() {
    let markup = format!(
        r#"<world><group>
            <transform>{shape}</transform>
            <transform translation="5 0 0">{shape}</transform>
            <transform><shape><node/></shape></transform>
        </group></world>"#,
        shape = PLANE_SHAPE
    );
    let (world, objects) = load(&markup);
    assert_eq!(objects.len(), 1);
    assert_eq!(world.unwrap().placements().len(), 1);
}

#[test]
fn unknown_references_should_be_ignored() {
    let (world, objects) = load(r#"<world><group><transform><reference ref="ghost"/></transform></group></world>"#);
    assert!(objects.is_empty());
    assert!(world.unwrap().is_empty());
}

#[test]
fn models_should_load_relative_to_the_world_file() {
    let dir = temp_dir("world-model");
    std::fs::create_dir_all(dir.join("models")).unwrap();
    write_file(&dir.join("models"), "quad.obj", QUAD_OBJ);
    let world_file = write_file(
        &dir,
        "world.xml",
        r#"<world><group>
            <transform scale="2 2 2"><model name="quad" url="models/quad.obj"/></transform>
            <transform><model name="missing" url="models/nothing.obj"/></transform>
        </group></world>"#,
    );

    let mut objects = ObjectRegistry::objects();
    let mut textures = TextureRegistry::new();
    let world = WorldLoader::new(&mut objects, &mut textures)
        .load_file(&world_file)
        .unwrap();

    assert_eq!(objects.len(), 1);
    assert!(objects.contains("quad"));
    assert!(!objects.contains("missing"));
    assert_eq!(objects.get_by_name("quad").unwrap().mesh_count(), 1);
    assert_eq!(world.placements().len(), 1);
}

#[test]
fn malformed_markup_should_be_rejected() {
    let (result, objects) = load("<world><group>");
    assert!(matches!(result, Err(LoadError::Markup(_))));
    assert!(objects.is_empty());
}

#[test]
fn documents_breaking_the_structure_should_be_rejected_as_a_whole() {
    let cases = [
        "<scene><group/></scene>",
        "<world/>",
        "<world><group/><group/></world>",
        r#"<world><group><transform><cube/></transform></group></world>"#,
        r#"<world><group><transform><model url=""/></transform></group></world>"#,
        r#"<world><group><transform><reference/></transform></group></world>"#,
        r#"<world><group><transform><shape name="s"><material name="m"/></shape></transform></group></world>"#,
        r#"<world><group><transform><shape name="s"><node/><material name="m"/></shape></transform></group></world>"#,
        r#"<world><group><transform><shape name="s"><node/><node/></shape></transform></group></world>"#,
    ];
    for markup in cases {
        let (result, objects) = load(markup);
        assert!(
            matches!(result, Err(LoadError::Schema(_))),
            "{} was accepted",
            markup
        );
        assert!(objects.is_empty());
    }
}

#[test]
fn empty_path_should_load_the_default_world() {
    let mut objects = ObjectRegistry::objects();
    let mut textures = TextureRegistry::new();
    let world = WorldLoader::new(&mut objects, &mut textures)
        .load_file(std::path::Path::new(""))
        .unwrap();
    assert!(objects.contains("ground"));
    assert_eq!(world.placements().len(), 1);
}

#[test]
fn missing_file_should_fall_back_to_the_default_world() {
    let dir = temp_dir("world-missing");
    let mut objects = ObjectRegistry::objects();
    let mut textures = TextureRegistry::new();
    let world = WorldLoader::new(&mut objects, &mut textures)
        .load_file(&dir.join("nope.xml"))
        .unwrap();
    assert!(objects.contains("ground"));
    assert!(!world.is_empty());
}

#[test]
fn attribute_values_should_parse_or_fall_back() {
    assert_eq!(parse_vec3("1 2.5 -3"), Some(Vector3::new(1.0, 2.5, -3.0)));
    assert_eq!(parse_vec3("  4\t5\n6 "), Some(Vector3::new(4.0, 5.0, 6.0)));
    assert_eq!(parse_vec3("1 2"), None);
    assert_eq!(parse_vec3("1 2 3 4"), None);
    assert_eq!(parse_vec3("1 two 3"), None);

    let q = parse_quaternion("0 0 1 0").unwrap();
    assert_eq!(q.s, 0.0);
    assert_eq!(q.v, Vector3::new(0.0, 0.0, 1.0));
    assert_eq!(parse_quaternion("0 0 1"), None);

    let document = roxmltree::Document::parse(
        r#"<t translation="oops" rotation="0 0 0 0" scale="2 2 2"/>"#,
    )
    .unwrap();
    let transform = transform_attr(&document.root_element());
    assert_eq!(transform, Matrix4::from_scale(2.0));
}

#[test]
fn rotation_should_be_scalar_last() {
    let document = roxmltree::Document::parse(
        r#"<t rotation="0 0 0.7071068 0.7071068"/>"#,
    )
    .unwrap();
    let transform = transform_attr(&document.root_element());
    // 90 degrees about z maps x onto y
    let x = transform * Vector3::unit_x().extend(0.0);
    assert_vec_close(x.truncate(), Vector3::new(0.0, 1.0, 0.0));
}
