//! Cameras.
//!
//! The scene only needs the [`Camera`] trait. [`TrackingCamera`] is the
//! default implementation: it orbits a target that follows a vehicle, with a
//! user-controlled offset on top that input can pan and that can be reset.

use std::f32::consts::FRAC_PI_2;

use cgmath::{Deg, InnerSpace, Matrix4, Point3, Rad, Vector3, Zero, perspective};

use crate::{config::SceneConfig, vehicle::Position};

/// Converts OpenGL clip space (z in -1..1) to wgpu clip space (z in 0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

pub trait Camera {
    fn view_matrix(&self) -> Matrix4<f32>;
    fn projection_matrix(&self) -> Matrix4<f32>;
    /// Called once per frame with the followed vehicle's pose.
    fn track_object(&mut self, position: &Position);
    /// Applies input gathered since the last frame.
    fn process_input(&mut self) {}
    fn set_aspect_ratio(&mut self, aspect: f32);
    fn reset_target_offset(&mut self) {}
    fn is_offset(&self) -> bool {
        false
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    /// Field of view and clip planes from the scene config.
    pub fn from_config(config: &SceneConfig, width: u32, height: u32) -> Self {
        Self::new(width, height, Deg(config.fov_y_deg), config.z_near, config.z_far)
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Orbit camera around a tracked target. Z is up.
#[derive(Clone, Debug)]
pub struct TrackingCamera {
    pub projection: Projection,
    target: Point3<f32>,
    offset: Vector3<f32>,
    distance: f32,
    yaw: Rad<f32>,
    pitch: Rad<f32>,
    // accumulated between frames, consumed by process_input
    pending_yaw: f32,
    pending_pitch: f32,
    pending_zoom: f32,
    pending_pan: Vector3<f32>,
}

impl TrackingCamera {
    pub fn new(projection: Projection, distance: f32, yaw: Deg<f32>, pitch: Deg<f32>) -> Self {
        Self {
            projection,
            target: Point3::new(0.0, 0.0, 0.0),
            offset: Vector3::zero(),
            distance,
            yaw: yaw.into(),
            pitch: pitch.into(),
            pending_yaw: 0.0,
            pending_pitch: 0.0,
            pending_zoom: 0.0,
            pending_pan: Vector3::zero(),
        }
    }

    pub fn rotate(&mut self, dyaw: f32, dpitch: f32) {
        self.pending_yaw += dyaw;
        self.pending_pitch += dpitch;
    }

    pub fn zoom(&mut self, delta: f32) {
        self.pending_zoom += delta;
    }

    /// Moves the look-at point relative to the tracked target.
    pub fn pan(&mut self, delta: Vector3<f32>) {
        self.pending_pan += delta;
    }

    pub fn target(&self) -> Point3<f32> {
        self.target + self.offset
    }

    pub fn eye(&self) -> Point3<f32> {
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let dir = Vector3::new(cos_pitch * cos_yaw, cos_pitch * sin_yaw, sin_pitch);
        self.target() + dir * self.distance
    }
}

impl Camera for TrackingCamera {
    fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye(), self.target(), Vector3::unit_z())
    }

    fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection.calc_matrix()
    }

    fn track_object(&mut self, position: &Position) {
        self.target = Point3::new(
            position.translation.x,
            position.translation.y,
            position.translation.z,
        );
    }

    fn process_input(&mut self) {
        self.yaw += Rad(self.pending_yaw);
        self.pitch += Rad(self.pending_pitch);
        self.pitch = Rad(self.pitch.0.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));
        self.distance = (self.distance - self.pending_zoom).max(0.5);
        self.offset += self.pending_pan;

        self.pending_yaw = 0.0;
        self.pending_pitch = 0.0;
        self.pending_zoom = 0.0;
        self.pending_pan = Vector3::zero();
    }

    fn set_aspect_ratio(&mut self, aspect: f32) {
        self.projection.set_aspect(aspect);
    }

    fn reset_target_offset(&mut self) {
        self.offset = Vector3::zero();
    }

    fn is_offset(&self) -> bool {
        self.offset.magnitude2() > 0.0
    }
}
