//! Attribute parsing and structural validation for the scene markup.
//!
//! Attribute values are whitespace separated numbers. A value with the wrong
//! number of components or a non-numeric token is replaced by the attribute's
//! default rather than rejecting the element.

use cgmath::{InnerSpace, Matrix4, One, Quaternion, Vector3};
use roxmltree::Node;

use crate::error::LoadError;

fn parse_floats<const N: usize>(value: &str) -> Option<[f32; N]> {
    let mut out = [0.0; N];
    let mut tokens = value.split_whitespace();
    for slot in out.iter_mut() {
        *slot = tokens.next()?.parse().ok()?;
    }
    match tokens.next() {
        Some(_) => None,
        None => Some(out),
    }
}

pub fn parse_vec3(value: &str) -> Option<Vector3<f32>> {
    parse_floats::<3>(value).map(Vector3::from)
}

/// `"x y z w"` with the scalar part last.
pub fn parse_quaternion(value: &str) -> Option<Quaternion<f32>> {
    parse_floats::<4>(value).map(|[x, y, z, w]| Quaternion::new(w, x, y, z))
}

pub fn vec3_attr(node: &Node, name: &str, default: Vector3<f32>) -> Vector3<f32> {
    match node.attribute(name) {
        None => default,
        Some(value) => parse_vec3(value).unwrap_or_else(|| {
            log::warn!(
                "<{}> attribute {}=\"{}\" is not a 3D vector, using {:?}.",
                node.tag_name().name(),
                name,
                value,
                default
            );
            default
        }),
    }
}

pub fn f32_attr(node: &Node, name: &str, default: f32) -> f32 {
    match node.attribute(name) {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            log::warn!(
                "<{}> attribute {}=\"{}\" is not a number, using {}.",
                node.tag_name().name(),
                name,
                value,
                default
            );
            default
        }),
    }
}

/// Normalized rotation. Missing, malformed and zero quaternions are the identity.
pub fn rotation_attr(node: &Node, name: &str) -> Quaternion<f32> {
    let rotation = match node.attribute(name) {
        None => return Quaternion::one(),
        Some(value) => match parse_quaternion(value) {
            Some(q) => q,
            None => {
                log::warn!(
                    "<{}> attribute {}=\"{}\" is not a quaternion, using identity.",
                    node.tag_name().name(),
                    name,
                    value
                );
                return Quaternion::one();
            }
        },
    };
    if rotation.magnitude2() == 0.0 {
        Quaternion::one()
    } else {
        rotation.normalize()
    }
}

/// Local matrix from `translation`, `rotation` and `scale`, composed T * R * S.
pub fn transform_attr(node: &Node) -> Matrix4<f32> {
    let translation = vec3_attr(node, "translation", Vector3::new(0.0, 0.0, 0.0));
    let rotation = rotation_attr(node, "rotation");
    let scale = vec3_attr(node, "scale", Vector3::new(1.0, 1.0, 1.0));
    Matrix4::from_translation(translation)
        * Matrix4::from(rotation)
        * Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z)
}

/// Non-empty attribute or `None`.
pub fn name_attr<'a>(node: &Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute(name).map(str::trim).filter(|v| !v.is_empty())
}

pub fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

fn tag<'a>(node: &Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

fn schema_error(node: &Node, message: impl std::fmt::Display) -> LoadError {
    let pos = node.document().text_pos_at(node.range().start);
    LoadError::Schema(format!("{} at {}", message, pos))
}

fn expect_children(node: &Node, allowed: &[&str]) -> Result<(), LoadError> {
    for child in elements(*node) {
        if !allowed.contains(&tag(&child)) {
            return Err(schema_error(
                &child,
                format!("<{}> is not allowed inside <{}>", tag(&child), tag(node)),
            ));
        }
    }
    Ok(())
}

fn expect_attribute(node: &Node, attribute: &'static str) -> Result<(), LoadError> {
    match name_attr(node, attribute) {
        Some(_) => Ok(()),
        None => Err(schema_error(
            node,
            format!("<{}> requires the '{}' attribute", tag(node), attribute),
        )),
    }
}

/// Checks the structure of a `<world>` document.
///
/// ```text
/// world     := group
/// group     := transform*
/// transform := (model | shape | reference | group)*
/// model     := @url
/// reference := @ref
/// shape     := material* node
/// material  := @name texture*
/// texture   := @url
/// node      := plane* node*
/// ```
pub fn validate_world(document: &roxmltree::Document) -> Result<(), LoadError> {
    let world = document.root_element();
    if tag(&world) != "world" {
        return Err(schema_error(&world, format!("root element is <{}>, expected <world>", tag(&world))));
    }
    expect_children(&world, &["group"])?;
    let groups: Vec<_> = elements(world).collect();
    if groups.len() != 1 {
        return Err(schema_error(
            &world,
            format!("<world> needs exactly one <group>, found {}", groups.len()),
        ));
    }
    validate_group(&groups[0])
}

fn validate_group(group: &Node) -> Result<(), LoadError> {
    expect_children(group, &["transform"])?;
    for transform in elements(*group) {
        expect_children(&transform, &["model", "shape", "reference", "group"])?;
        for child in elements(transform) {
            match tag(&child) {
                "group" => validate_group(&child)?,
                "model" => expect_attribute(&child, "url")?,
                "reference" => expect_attribute(&child, "ref")?,
                "shape" => validate_shape(&child)?,
                _ => {}
            }
        }
    }
    Ok(())
}

pub fn validate_shape(shape: &Node) -> Result<(), LoadError> {
    expect_children(shape, &["material", "node"])?;
    let mut seen_node = false;
    for child in elements(*shape) {
        match tag(&child) {
            "material" => {
                if seen_node {
                    return Err(schema_error(&child, "<material> must come before <node>"));
                }
                expect_attribute(&child, "name")?;
                expect_children(&child, &["texture"])?;
                for texture in elements(child) {
                    expect_attribute(&texture, "url")?;
                }
            }
            _ => {
                if seen_node {
                    return Err(schema_error(&child, "<shape> has more than one root <node>"));
                }
                seen_node = true;
                validate_node(&child)?;
            }
        }
    }
    if !seen_node {
        return Err(schema_error(shape, "<shape> needs a root <node>"));
    }
    Ok(())
}

fn validate_node(node: &Node) -> Result<(), LoadError> {
    expect_children(node, &["plane", "node"])?;
    for child in elements(*node).filter(|c| tag(c) == "node") {
        validate_node(&child)?;
    }
    Ok(())
}
