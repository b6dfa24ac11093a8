//! Directional light and cascaded shadow map setup.

use cgmath::{
    EuclideanSpace, InnerSpace, Matrix4, Point3, SquareMatrix, Vector3, Vector4, ortho,
};

use crate::camera::OPENGL_TO_WGPU_MATRIX;

pub const NUM_CASCADES: usize = 3;

/// View-space z of the cascade boundaries, near to far (negative forward).
pub type CascadeSplits = [f32; NUM_CASCADES + 1];

pub const DEFAULT_CASCADE_SPLITS: CascadeSplits = [-0.3, -10.0, -20.0, -35.0];

/// Light-space depth range is stretched by this factor so casters outside
/// the camera slice still land in the shadow map.
const Z_MULT: f32 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CasterLight {
    pub intensity: Vector3<f32>,
    /// World-space direction the light travels in.
    pub direction: Vector3<f32>,
}

impl Default for CasterLight {
    fn default() -> Self {
        Self {
            intensity: Vector3::new(1.0, 1.0, 1.0),
            direction: Vector3::new(1.0, -1.0, -1.0),
        }
    }
}

impl CasterLight {
    pub fn new(intensity: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            intensity,
            direction,
        }
    }

    pub fn view_direction(&self, view: &Matrix4<f32>) -> Vector3<f32> {
        (view * self.direction.extend(0.0)).truncate()
    }

    /// One light-space (projection * view) matrix per cascade.
    ///
    /// Each camera frustum slice between two consecutive splits is
    /// unprojected to world space, the light looks at its centroid and an
    /// orthographic box is fitted around the eight corners.
    pub fn light_space_matrices(
        &self,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
        splits: &CascadeSplits,
    ) -> [Matrix4<f32>; NUM_CASCADES] {
        let inv_view_proj = (projection * view).invert().unwrap_or_else(|| {
            log::warn!("Camera view-projection is singular, shadows fall back to identity.");
            Matrix4::identity()
        });
        let direction = if self.direction.magnitude2() > 0.0 {
            self.direction.normalize()
        } else {
            -Vector3::unit_z()
        };
        // look_at breaks down when the light is parallel to the up vector
        let up = if direction.z.abs() > 0.99 {
            Vector3::unit_y()
        } else {
            Vector3::unit_z()
        };

        std::array::from_fn(|i| {
            let near = ndc_depth(projection, splits[i]);
            let far = ndc_depth(projection, splits[i + 1]);
            let corners = frustum_corners(&inv_view_proj, near, far);
            let center = corners
                .iter()
                .fold(Vector3::new(0.0, 0.0, 0.0), |acc, c| acc + c.to_vec())
                / corners.len() as f32;
            let center = Point3::from_vec(center);

            let light_view = Matrix4::look_at_rh(center - direction, center, up);
            let mut min = Vector3::new(f32::MAX, f32::MAX, f32::MAX);
            let mut max = Vector3::new(f32::MIN, f32::MIN, f32::MIN);
            for corner in &corners {
                let p = (light_view * corner.to_homogeneous()).truncate();
                min = Vector3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
                max = Vector3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
            }
            min.z = if min.z < 0.0 { min.z * Z_MULT } else { min.z / Z_MULT };
            max.z = if max.z < 0.0 { max.z / Z_MULT } else { max.z * Z_MULT };

            // view space looks down -z: near plane is -max.z
            let light_projection = ortho(min.x, max.x, min.y, max.y, -max.z, -min.z);
            OPENGL_TO_WGPU_MATRIX * light_projection * light_view
        })
    }
}

/// Clip-space z of each cascade's far boundary.
pub fn cascade_clip_ends(
    projection: &Matrix4<f32>,
    splits: &CascadeSplits,
) -> [f32; NUM_CASCADES] {
    std::array::from_fn(|i| (projection * Vector4::new(0.0, 0.0, splits[i + 1], 1.0)).z)
}

fn ndc_depth(projection: &Matrix4<f32>, view_z: f32) -> f32 {
    let clip = projection * Vector4::new(0.0, 0.0, view_z, 1.0);
    clip.z / clip.w
}

fn frustum_corners(inv_view_proj: &Matrix4<f32>, near: f32, far: f32) -> [Point3<f32>; 8] {
    let mut corners = [Point3::new(0.0, 0.0, 0.0); 8];
    let mut i = 0;
    for z in [near, far] {
        for y in [-1.0, 1.0] {
            for x in [-1.0, 1.0] {
                let p = inv_view_proj * Vector4::new(x, y, z, 1.0);
                corners[i] = Point3::from_homogeneous(p);
                i += 1;
            }
        }
    }
    corners
}

/// Cascade data uploaded with every lit draw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CascadeUniforms {
    pub light_space: [Matrix4<f32>; NUM_CASCADES],
    pub splits: CascadeSplits,
    pub clip_ends: [f32; NUM_CASCADES],
}

impl Default for CascadeUniforms {
    fn default() -> Self {
        Self {
            light_space: [Matrix4::identity(); NUM_CASCADES],
            splits: DEFAULT_CASCADE_SPLITS,
            clip_ends: [0.0; NUM_CASCADES],
        }
    }
}

impl CascadeUniforms {
    pub fn new(
        light: &CasterLight,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
        splits: &CascadeSplits,
    ) -> Self {
        Self {
            light_space: light.light_space_matrices(view, projection, splits),
            splits: *splits,
            clip_ends: cascade_clip_ends(projection, splits),
        }
    }
}
