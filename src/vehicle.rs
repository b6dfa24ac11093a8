//! The moving part of a scene.
//!
//! Vehicle dynamics and trajectories live outside this crate. The scene
//! drives anything implementing [`Vehicle`]: it advances it to the current
//! timestep, follows it with the camera and draws it in every pass.

use cgmath::{Matrix4, One, Quaternion, Vector3, Zero};

use crate::{context::GraphicsContext, error::RenderError, render::FrameParams};

/// Pose of a vehicle at some timestep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub translation: Vector3<f32>,
    pub rotation: Quaternion<f32>,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            translation: Vector3::zero(),
            rotation: Quaternion::one(),
        }
    }
}

impl Position {
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation) * Matrix4::from(self.rotation)
    }
}

pub trait Vehicle {
    fn initialize(&mut self, ctx: &mut dyn GraphicsContext) -> Result<(), RenderError>;

    /// Moves the vehicle (and its parts) to `timestep`.
    fn update_position(&mut self, timestep: f32);

    fn position(&self, timestep: f32) -> Position;

    fn first_timestep(&self) -> f32;
    fn final_timestep(&self) -> f32;

    fn render(
        &self,
        ctx: &mut dyn GraphicsContext,
        frame: &FrameParams,
    ) -> Result<(), RenderError>;

    fn render_shadow(
        &self,
        ctx: &mut dyn GraphicsContext,
        light_space: &Matrix4<f32>,
    ) -> Result<(), RenderError>;

    fn cleanup(&mut self, ctx: &mut dyn GraphicsContext);

    fn toggle_tire_force(&mut self) {}
}
