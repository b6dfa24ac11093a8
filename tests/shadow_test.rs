use cgmath::{Matrix4, Point3, Vector3, Vector4};
use track_ngin::{
    camera::OPENGL_TO_WGPU_MATRIX,
    light::{CascadeUniforms, CasterLight, DEFAULT_CASCADE_SPLITS, NUM_CASCADES, cascade_clip_ends},
};

use crate::common::test_utils::{assert_close, assert_vec_close};

mod common;

fn camera() -> (Matrix4<f32>, Matrix4<f32>) {
    let view = Matrix4::look_at_rh(
        Point3::new(0.0, -10.0, 3.0),
        Point3::new(0.0, 0.0, 0.0),
        Vector3::unit_z(),
    );
    let projection = OPENGL_TO_WGPU_MATRIX * cgmath::perspective(cgmath::Deg(45.0), 1.5, 0.1, 500.0);
    (view, projection)
}

fn in_unit_box(clip: Vector4<f32>) -> bool {
    let ndc = clip.truncate() / clip.w;
    ndc.x.abs() <= 1.0 + 1e-3 && ndc.y.abs() <= 1.0 + 1e-3 && ndc.z >= -1e-3 && ndc.z <= 1.0 + 1e-3
}

#[test]
fn clip_ends_should_be_the_projected_split_depths() {
    let (_, projection) = camera();
    let ends = cascade_clip_ends(&projection, &DEFAULT_CASCADE_SPLITS);

    for (i, end) in ends.iter().enumerate() {
        let expected = (projection * Vector4::new(0.0, 0.0, DEFAULT_CASCADE_SPLITS[i + 1], 1.0)).z;
        assert_close(*end, expected);
    }
    assert!(ends[0] < ends[1] && ends[1] < ends[2]);
}

#[test]
fn each_cascade_should_enclose_its_frustum_slice() {
    let (view, projection) = camera();
    let light = CasterLight::new(Vector3::new(1.0, 1.0, 1.0), Vector3::new(0.3, 0.2, -1.0));
    let cascades = CascadeUniforms::new(&light, &view, &projection, &DEFAULT_CASCADE_SPLITS);

    assert_eq!(cascades.light_space.len(), NUM_CASCADES);
    assert_eq!(cascades.splits, DEFAULT_CASCADE_SPLITS);

    let inverse_view = cgmath::SquareMatrix::invert(&view).unwrap();
    for (i, light_space) in cascades.light_space.iter().enumerate() {
        // centre of the slice on the view axis
        let depth = (DEFAULT_CASCADE_SPLITS[i] + DEFAULT_CASCADE_SPLITS[i + 1]) / 2.0;
        let world = inverse_view * Vector4::new(0.0, 0.0, depth, 1.0);
        assert!(
            in_unit_box(light_space * world),
            "cascade {} misses its own slice",
            i
        );
    }
}

#[test]
fn light_parallel_to_up_should_still_produce_finite_matrices() {
    let (view, projection) = camera();
    let light = CasterLight::new(Vector3::new(1.0, 1.0, 1.0), Vector3::new(0.0, 0.0, -1.0));
    let matrices = light.light_space_matrices(&view, &projection, &DEFAULT_CASCADE_SPLITS);

    for matrix in matrices {
        let values: &[f32; 16] = matrix.as_ref();
        assert!(values.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn view_direction_should_ignore_translation() {
    let light = CasterLight::new(Vector3::new(1.0, 1.0, 1.0), Vector3::new(0.0, 0.0, -1.0));
    let view = Matrix4::from_translation(Vector3::new(10.0, 20.0, 30.0));
    assert_vec_close(light.view_direction(&view), Vector3::new(0.0, 0.0, -1.0));
}
