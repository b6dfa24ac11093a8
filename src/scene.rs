//! Scene orchestration.
//!
//! A [`Scene`] owns everything drawn in a frame: the world graph and the
//! registry of objects it places, the vehicles, the skybox, the global frame
//! and the light. Each frame it advances the timeline, moves the vehicles,
//! lets the camera follow one of them and renders every shadow cascade
//! before the colour pass.
//!
//! ```ignore
//! let mut scene = Scene::new(config, camera);
//! scene.add_vehicle("car", Box::new(car))?;
//! scene.initialize(&mut ctx)?;
//! loop {
//!     scene.tick(&mut ctx)?;
//! }
//! ```

use std::path::Path;

use cgmath::{Matrix4, SquareMatrix, Vector3};
use instant::{Duration, Instant};

use crate::{
    camera::Camera,
    config::SceneConfig,
    context::{GraphicsContext, Pass},
    data_structures::{
        frame::global_frame,
        object::Object,
        registry::{ObjectRegistry, RegistryId, VehicleRegistry},
        scene_graph::WorldNode,
        skybox::Skybox,
        texture::TextureRegistry,
    },
    error::{RegistryError, RenderError},
    light::{CascadeSplits, CascadeUniforms, CasterLight, NUM_CASCADES},
    render::{FrameParams, Renderable},
    resources::world::WorldLoader,
    timeline::Timeline,
    vehicle::{Position, Vehicle},
};

const GLOBAL_FRAME_LENGTH: f32 = 1.0;

pub struct Scene<C: Camera> {
    config: SceneConfig,
    camera: C,
    light: CasterLight,
    splits: CascadeSplits,
    cascades: CascadeUniforms,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,

    timeline: Timeline,
    snapshot_mode: bool,
    num_snapshot: u32,
    follow_vehicle: usize,
    show_global_frame: bool,

    textures: TextureRegistry,
    objects: ObjectRegistry,
    world: WorldNode,
    vehicles: VehicleRegistry,
    skybox: Skybox,
    frame: Option<Object>,

    initialized: bool,
    last_frame: Instant,
    frame_time: Duration,
}

impl<C: Camera> Scene<C> {
    pub fn new(config: SceneConfig, camera: C) -> Self {
        let mut textures = TextureRegistry::new();
        let skybox = match &config.skybox_panorama {
            Some(path) => Skybox::with_panorama(Path::new(path), &mut textures),
            None => Skybox::new(),
        };
        let frame = global_frame(GLOBAL_FRAME_LENGTH)
            .inspect_err(|e| log::warn!("The global frame could not be built: {}", e))
            .ok();
        let light = CasterLight::new(
            Vector3::from(config.light_intensity),
            Vector3::from(config.light_direction),
        );

        Self {
            camera,
            light,
            splits: config.cascade_splits,
            cascades: CascadeUniforms::default(),
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            timeline: Timeline::new(config.refresh_rate, config.time_rate, config.looping),
            snapshot_mode: config.snapshot_mode,
            num_snapshot: config.num_snapshot,
            follow_vehicle: config.follow_vehicle,
            show_global_frame: config.show_global_frame,
            textures,
            objects: ObjectRegistry::objects(),
            world: WorldNode::root(),
            vehicles: VehicleRegistry::vehicles(),
            skybox,
            frame,
            initialized: false,
            last_frame: Instant::now(),
            frame_time: Duration::ZERO,
            config,
        }
    }

    /// Registers a vehicle. Vehicles must be added before [`Scene::initialize`].
    pub fn add_vehicle(
        &mut self,
        name: impl Into<String>,
        vehicle: Box<dyn Vehicle>,
    ) -> Result<RegistryId, RegistryError> {
        self.vehicles.insert(name, vehicle)
    }

    /// Loads the world, uploads every object and vehicle and derives the
    /// timestep bounds from the vehicles.
    ///
    /// A world file that cannot be loaded leaves the environment empty; the
    /// vehicles are still shown.
    pub fn initialize(&mut self, ctx: &mut dyn GraphicsContext) -> Result<(), RenderError> {
        self.skybox.initialize(ctx)?;
        if let Some(frame) = &mut self.frame {
            frame.initialize(ctx)?;
        }

        let environment = Path::new(&self.config.environment_file);
        let mut loader = WorldLoader::new(&mut self.objects, &mut self.textures);
        self.world = loader.load_file(environment).unwrap_or_else(|e| {
            log::error!(
                "The environment {:?} could not be loaded, the scene stays empty: {}",
                environment,
                e
            );
            WorldNode::root()
        });

        self.objects.initialize_all(ctx);
        self.vehicles.initialize_all(ctx)?;

        let (first, last) = self.vehicles.timestep_bounds();
        self.timeline.set_bounds(first, last);
        self.initialized = true;
        log::debug!(
            "Scene initialized with {} object(s), {} vehicle(s), timesteps {}..{}",
            self.objects.len(),
            self.vehicles.len(),
            first,
            last
        );
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera
            .set_aspect_ratio(width as f32 / height.max(1) as f32);
    }

    /// Advances the timeline by one frame and returns the new timestep.
    pub fn update_timestep(&mut self) -> f32 {
        self.timeline.advance()
    }

    /// Moves the vehicles to the current timestep, follows the selected one
    /// with the camera and refreshes the view, projection and cascades.
    pub fn update(&mut self) {
        let timestep = self.timeline.timestep();
        for vehicle in self.vehicles.values_mut() {
            vehicle.update_position(timestep);
        }

        let position = self
            .vehicles
            .values()
            .nth(self.follow_vehicle)
            .map(|v| v.position(timestep))
            .unwrap_or_default();
        self.camera.track_object(&position);
        self.camera.process_input();

        self.view = self.camera.view_matrix();
        self.projection = self.camera.projection_matrix();
        self.cascades = CascadeUniforms::new(&self.light, &self.view, &self.projection, &self.splits);
    }

    /// All shadow cascades, then the colour pass.
    pub fn render_frame(&mut self, ctx: &mut dyn GraphicsContext) -> Result<(), RenderError> {
        if !self.initialized {
            log::error!("The scene must be initialized before it is rendered.");
            return Err(RenderError::NotInitialized("scene".to_string()));
        }
        for cascade in 0..NUM_CASCADES {
            ctx.begin_pass(Pass::Shadow { cascade });
            let result = self.render_shadow(ctx, cascade);
            ctx.end_pass();
            result?;
        }
        ctx.begin_pass(Pass::Color);
        let result = self.render(ctx);
        ctx.end_pass();
        result
    }

    /// Colour pass: skybox, world, vehicles and the optional global frame.
    pub fn render(&mut self, ctx: &mut dyn GraphicsContext) -> Result<(), RenderError> {
        let light = self.light;
        let cascades = self.cascades;
        let frame = FrameParams {
            light: &light,
            view: self.view,
            projection: self.projection,
            cascades: &cascades,
        };
        let identity = Matrix4::identity();

        self.skybox.render(ctx, &frame, &identity)?;
        self.world.render(ctx, &self.objects, &frame)?;

        let snapshots = self.snapshot_timesteps();
        for vehicle in self.vehicles.values_mut() {
            match &snapshots {
                Some(timesteps) => {
                    for timestep in timesteps {
                        vehicle.update_position(*timestep);
                        vehicle.render(ctx, &frame)?;
                    }
                }
                None => vehicle.render(ctx, &frame)?,
            }
        }

        if self.show_global_frame {
            if let Some(global_frame) = &self.frame {
                global_frame.render(ctx, &frame, &identity)?;
            }
        }
        Ok(())
    }

    /// Depth-only pass into `cascade`.
    pub fn render_shadow(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        cascade: usize,
    ) -> Result<(), RenderError> {
        let Some(light_space) = self.cascades.light_space.get(cascade).copied() else {
            log::error!("There is no shadow cascade {}.", cascade);
            return Err(RenderError::Backend(format!(
                "cascade {} out of range 0..{}",
                cascade, NUM_CASCADES
            )));
        };

        self.world.render_shadow(ctx, &self.objects, &light_space)?;

        let snapshots = self.snapshot_timesteps();
        for vehicle in self.vehicles.values_mut() {
            match &snapshots {
                Some(timesteps) => {
                    for timestep in timesteps {
                        vehicle.update_position(*timestep);
                        vehicle.render_shadow(ctx, &light_space)?;
                    }
                }
                None => vehicle.render_shadow(ctx, &light_space)?,
            }
        }
        Ok(())
    }

    /// One whole frame: timestep, update, render. Records the frame time.
    pub fn tick(&mut self, ctx: &mut dyn GraphicsContext) -> Result<(), RenderError> {
        self.update_timestep();
        self.update();
        let result = self.render_frame(ctx);
        self.frame_time = self.last_frame.elapsed();
        self.last_frame = Instant::now();
        result
    }

    /// Releases every GPU resource. The scene has to be initialized again
    /// before the next frame.
    pub fn cleanup(&mut self, ctx: &mut dyn GraphicsContext) {
        self.skybox.cleanup(ctx);
        if let Some(frame) = &mut self.frame {
            frame.cleanup(ctx);
        }
        self.objects.cleanup_all(ctx);
        self.vehicles.cleanup_all(ctx);
        self.textures.clear();
        ctx.release_textures();
        self.world = WorldNode::root();
        self.initialized = false;
    }

    fn snapshot_timesteps(&self) -> Option<Vec<f32>> {
        self.snapshot_mode
            .then(|| self.timeline.snapshots(self.num_snapshot).collect())
    }

    // Playback

    pub fn play_pause(&mut self) {
        self.timeline.play_pause();
    }

    pub fn is_paused(&self) -> bool {
        self.timeline.is_paused()
    }

    pub fn restart(&mut self) {
        self.timeline.restart();
    }

    pub fn go_end(&mut self) {
        self.timeline.go_end();
    }

    pub fn set_time_rate(&mut self, time_rate: f32) {
        self.timeline.set_time_rate(time_rate);
    }

    pub fn toggle_loop(&mut self) {
        self.timeline.toggle_loop();
    }

    pub fn set_timestep_from_slider(&mut self, position: f32) {
        self.timeline.set_from_slider(position);
    }

    pub fn timestep(&self) -> f32 {
        self.timeline.timestep()
    }

    pub fn first_timestep(&self) -> f32 {
        self.timeline.first()
    }

    pub fn final_timestep(&self) -> f32 {
        self.timeline.last()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    // Display options

    pub fn toggle_global_frame(&mut self) {
        self.show_global_frame = !self.show_global_frame;
    }

    pub fn toggle_snapshot_mode(&mut self) {
        self.snapshot_mode = !self.snapshot_mode;
    }

    pub fn is_snapshot_mode(&self) -> bool {
        self.snapshot_mode
    }

    pub fn set_num_snapshot(&mut self, num_snapshot: u32) {
        self.num_snapshot = num_snapshot;
    }

    /// Index in registration order. Out of range means the camera tracks the origin.
    pub fn set_followed_vehicle(&mut self, index: usize) {
        self.follow_vehicle = index;
    }

    pub fn reset_camera_offset(&mut self) {
        self.camera.reset_target_offset();
    }

    pub fn is_camera_offset(&self) -> bool {
        self.camera.is_offset()
    }

    pub fn toggle_tire_force(&mut self) {
        for vehicle in self.vehicles.values_mut() {
            vehicle.toggle_tire_force();
        }
    }

    // Accessors

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    pub fn light(&self) -> &CasterLight {
        &self.light
    }

    pub fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }

    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    pub fn world(&self) -> &WorldNode {
        &self.world
    }

    pub fn vehicles(&self) -> &VehicleRegistry {
        &self.vehicles
    }

    pub fn cascades(&self) -> &CascadeUniforms {
        &self.cascades
    }

    pub fn view(&self) -> &Matrix4<f32> {
        &self.view
    }

    pub fn projection(&self) -> &Matrix4<f32> {
        &self.projection
    }

    /// Position of the followed vehicle at the current timestep.
    pub fn followed_position(&self) -> Option<Position> {
        self.vehicles
            .values()
            .nth(self.follow_vehicle)
            .map(|v| v.position(self.timeline.timestep()))
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Duration of the last [`Scene::tick`].
    pub fn frame_time(&self) -> Duration {
        self.frame_time
    }
}
