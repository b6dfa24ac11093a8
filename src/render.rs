//! Render composition.
//!
//! [`Renderable`] is the capability set shared by everything the scene can
//! draw: initialize once, draw in the colour pass, draw into a shadow cascade,
//! release. The model matrix is always an argument of the draw call, so one
//! instance can be drawn under any number of world transforms in a frame.
//!
//! [`TransparentQueue`] holds the meshes an object defers while its opaque
//! meshes are drawn and hands them back farthest first.

use std::{
    cmp::{Ordering, Reverse},
    collections::BTreeMap,
};

use cgmath::Matrix4;

use crate::{
    context::GraphicsContext,
    error::RenderError,
    light::{CascadeUniforms, CasterLight},
};

/// Per-frame camera and light state handed down the colour pass.
#[derive(Clone, Copy, Debug)]
pub struct FrameParams<'a> {
    pub light: &'a CasterLight,
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub cascades: &'a CascadeUniforms,
}

pub trait Renderable {
    /// Uploads GPU resources. Must be called before any draw.
    fn initialize(&mut self, ctx: &mut dyn GraphicsContext) -> Result<(), RenderError>;

    fn render(
        &self,
        ctx: &mut dyn GraphicsContext,
        frame: &FrameParams,
        model: &Matrix4<f32>,
    ) -> Result<(), RenderError>;

    /// Depth-only draw into the cascade described by `light_space`.
    fn render_shadow(
        &self,
        ctx: &mut dyn GraphicsContext,
        light_space: &Matrix4<f32>,
        model: &Matrix4<f32>,
    ) -> Result<(), RenderError>;

    fn cleanup(&mut self, ctx: &mut dyn GraphicsContext);
}

/// Camera distance with a total order so it can key a map.
#[derive(Clone, Copy, Debug)]
struct Distance(f32);

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Distance {}
impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Distance {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Deferred transparent draws, ordered back to front.
///
/// Entries at the same distance keep their insertion order.
pub struct TransparentQueue<T> {
    entries: BTreeMap<(Reverse<Distance>, usize), T>,
    seq: usize,
}

impl<T> TransparentQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            seq: 0,
        }
    }

    pub fn push(&mut self, distance: f32, item: T) {
        self.entries.insert((Reverse(Distance(distance)), self.seq), item);
        self.seq += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Farthest first.
    pub fn drain(self) -> impl Iterator<Item = (f32, T)> {
        self.entries
            .into_iter()
            .map(|((Reverse(Distance(distance)), _), item)| (distance, item))
    }
}

impl<T> Default for TransparentQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
