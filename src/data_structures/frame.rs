//! The global reference frame: red X, green Y and blue Z axes at the origin.

use std::rc::Rc;

use cgmath::{Matrix4, SquareMatrix, Vector3};

use crate::{
    data_structures::{
        material::Material,
        mesh::Mesh,
        object::{Geometry, Object, ObjectNode},
    },
    error::LoadError,
    resources::mesh::append_box,
};

const AXIS_THICKNESS: f32 = 0.05;

/// Builds the three axes as one object, each `length` long.
pub fn global_frame(length: f32) -> Result<Object, LoadError> {
    let t = AXIS_THICKNESS;
    let axes = [
        ("x", [0.0, -t, -t], [length, t, t], Vector3::new(1.0, 0.0, 0.0)),
        ("y", [-t, 0.0, -t], [t, length, t], Vector3::new(0.0, 1.0, 0.0)),
        ("z", [-t, -t, 0.0], [t, t, length], Vector3::new(0.0, 0.0, 1.0)),
    ];

    let mut geometry = Geometry::default();
    let mut root = ObjectNode::new("frame", Matrix4::identity());
    for (name, min, max, color) in axes {
        let range = append_box(&mut geometry, min, max);
        let mut material = Material::new(format!("frame_{}", name));
        material.ambient = color * 0.5;
        material.diffuse = color;
        root.meshes.push(Rc::new(Mesh::new(name, range, Rc::new(material))));
    }
    Object::new("global_frame", root, geometry)
}
