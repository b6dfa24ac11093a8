use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
    sync::atomic::{AtomicUsize, Ordering},
};

use cgmath::{Matrix4, Point3, SquareMatrix, Vector3, Vector4};
use track_ngin::{
    camera::{Camera, OPENGL_TO_WGPU_MATRIX},
    context::{GeometryHandle, GraphicsContext, MatrixUniforms, Pass, ShaderKind},
    data_structures::{
        material::Material,
        mesh::{DrawRange, Mesh},
        object::{Geometry, Object, ObjectNode},
    },
    error::RenderError,
    light::{CascadeUniforms, CasterLight},
    render::{FrameParams, Renderable},
    resources::mesh::append_box,
    vehicle::{Position, Vehicle},
};

/// Every call a [`RecordingContext`] received, in order.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    Upload(String),
    Release(GeometryHandle),
    ReleaseTextures,
    BeginPass(Pass),
    EndPass,
    BindShader(ShaderKind),
    BindGeometry(GeometryHandle),
    Matrices(MatrixUniforms),
    Light,
    Cascades,
    Material(String),
    Draw(DrawRange),
}

/// State in effect when a draw was issued.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RecordedDraw {
    pub pass: Option<Pass>,
    pub shader: Option<ShaderKind>,
    pub geometry: Option<GeometryHandle>,
    pub range: DrawRange,
    pub model: Matrix4<f32>,
    pub view: Matrix4<f32>,
    pub material: Option<String>,
}

impl RecordedDraw {
    pub fn translation(&self) -> Vector3<f32> {
        self.model.w.truncate()
    }
}

/// A [`GraphicsContext`] without a GPU. It hands out geometry handles and
/// records everything else.
#[derive(Default)]
pub(crate) struct RecordingContext {
    pub calls: Vec<Call>,
    pub draws: Vec<RecordedDraw>,
    pub uploaded: Vec<(String, Geometry)>,
    pub fail_uploads: bool,
    pub(crate) next_handle: u64,
    pub(crate) pass: Option<Pass>,
    pub(crate) shader: Option<ShaderKind>,
    pub(crate) geometry: Option<GeometryHandle>,
    pub(crate) matrices: Option<MatrixUniforms>,
    pub(crate) material: Option<String>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draws_in(&self, pass: Pass) -> Vec<&RecordedDraw> {
        self.draws.iter().filter(|d| d.pass == Some(pass)).collect()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
        self.draws.clear();
    }
}

impl GraphicsContext for RecordingContext {
    fn upload_geometry(
        &mut self,
        label: &str,
        geometry: &Geometry,
    ) -> Result<GeometryHandle, RenderError> {
        if self.fail_uploads {
            return Err(RenderError::Backend(format!("upload of {} refused", label)));
        }
        self.calls.push(Call::Upload(label.to_string()));
        self.uploaded.push((label.to_string(), geometry.clone()));
        let handle = GeometryHandle(self.next_handle);
        self.next_handle += 1;
        Ok(handle)
    }

    fn release_geometry(&mut self, handle: GeometryHandle) {
        self.calls.push(Call::Release(handle));
    }

    fn release_textures(&mut self) {
        self.calls.push(Call::ReleaseTextures);
    }

    fn begin_pass(&mut self, pass: Pass) {
        self.pass = Some(pass);
        self.calls.push(Call::BeginPass(pass));
    }

    fn end_pass(&mut self) {
        self.pass = None;
        self.calls.push(Call::EndPass);
    }

    fn bind_shader(&mut self, shader: ShaderKind) {
        self.shader = Some(shader);
        self.calls.push(Call::BindShader(shader));
    }

    fn bind_geometry(&mut self, handle: GeometryHandle) {
        self.geometry = Some(handle);
        self.calls.push(Call::BindGeometry(handle));
    }

    fn set_matrix_uniforms(&mut self, uniforms: &MatrixUniforms) {
        self.matrices = Some(*uniforms);
        self.calls.push(Call::Matrices(*uniforms));
    }

    fn set_light_uniforms(&mut self, _light: &CasterLight, _view: &Matrix4<f32>) {
        self.calls.push(Call::Light);
    }

    fn set_cascade_uniforms(&mut self, _cascades: &CascadeUniforms) {
        self.calls.push(Call::Cascades);
    }

    fn set_material_uniforms(&mut self, material: &Material) {
        self.material = Some(material.name.clone());
        self.calls.push(Call::Material(material.name.clone()));
    }

    fn draw_elements(&mut self, range: DrawRange) {
        let matrices = self.matrices.unwrap_or(MatrixUniforms {
            model: Matrix4::identity(),
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
        });
        self.draws.push(RecordedDraw {
            pass: self.pass,
            shader: self.shader,
            geometry: self.geometry,
            range,
            model: matrices.model,
            view: matrices.view,
            material: self.material.clone(),
        });
        self.calls.push(Call::Draw(range));
    }
}

/// Frame state looking down the -Y axis from (0, 10, 0).
pub(crate) struct TestFrame {
    pub light: CasterLight,
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub cascades: CascadeUniforms,
}

impl TestFrame {
    pub fn new() -> Self {
        Self::looking_from(Point3::new(0.0, 10.0, 0.0))
    }

    pub fn looking_from(eye: Point3<f32>) -> Self {
        let view = Matrix4::look_at_rh(eye, Point3::new(0.0, 0.0, 0.0), Vector3::unit_z());
        let projection = OPENGL_TO_WGPU_MATRIX
            * cgmath::perspective(cgmath::Deg(45.0), 1.0, 0.1, 500.0);
        Self {
            light: CasterLight::default(),
            view,
            projection,
            cascades: CascadeUniforms::default(),
        }
    }

    pub fn params(&self) -> FrameParams<'_> {
        FrameParams {
            light: &self.light,
            view: self.view,
            projection: self.projection,
            cascades: &self.cascades,
        }
    }
}

/// One mesh per entry, each a small box at `x` with the given alpha, all
/// under the root node of one object.
pub(crate) fn boxes_object(name: &str, boxes: &[(&str, f32, f32)]) -> Object {
    let mut geometry = Geometry::default();
    let mut root = ObjectNode::new("root", Matrix4::identity());
    for (mesh_name, x, alpha) in boxes {
        let range = append_box(&mut geometry, [x - 0.5, -0.5, -0.5], [x + 0.5, 0.5, 0.5]);
        let mut material = Material::new(*mesh_name);
        material.alpha = *alpha;
        root.meshes.push(Rc::new(Mesh::new(*mesh_name, range, Rc::new(material))));
    }
    Object::new(name, root, geometry).expect("box geometry is valid")
}

/// Calls a vehicle received, shared with the test after the vehicle is boxed.
#[derive(Debug, Default)]
pub(crate) struct VehicleLog {
    pub initialized: usize,
    pub updates: Vec<f32>,
    pub renders: Vec<f32>,
    pub shadow_renders: Vec<f32>,
    pub cleanups: usize,
    pub tire_force: bool,
}

/// A vehicle driving along +X at one unit per timestep.
pub(crate) struct MockVehicle {
    pub first: f32,
    pub last: f32,
    timestep: f32,
    body: Object,
    pub log: Rc<RefCell<VehicleLog>>,
}

impl MockVehicle {
    pub fn new(first: f32, last: f32) -> (Self, Rc<RefCell<VehicleLog>>) {
        let log = Rc::new(RefCell::new(VehicleLog::default()));
        let vehicle = Self {
            first,
            last,
            timestep: first,
            body: boxes_object("body", &[("body", 0.0, 1.0)]),
            log: log.clone(),
        };
        (vehicle, log)
    }
}

impl Vehicle for MockVehicle {
    fn initialize(&mut self, ctx: &mut dyn GraphicsContext) -> Result<(), RenderError> {
        self.log.borrow_mut().initialized += 1;
        self.body.initialize(ctx)
    }

    fn update_position(&mut self, timestep: f32) {
        self.timestep = timestep;
        self.log.borrow_mut().updates.push(timestep);
    }

    fn position(&self, timestep: f32) -> Position {
        Position {
            translation: Vector3::new(timestep, 0.0, 0.0),
            ..Default::default()
        }
    }

    fn first_timestep(&self) -> f32 {
        self.first
    }

    fn final_timestep(&self) -> f32 {
        self.last
    }

    fn render(&self, ctx: &mut dyn GraphicsContext, frame: &FrameParams) -> Result<(), RenderError> {
        self.log.borrow_mut().renders.push(self.timestep);
        self.body
            .render(ctx, frame, &self.position(self.timestep).to_matrix())
    }

    fn render_shadow(
        &self,
        ctx: &mut dyn GraphicsContext,
        light_space: &Matrix4<f32>,
    ) -> Result<(), RenderError> {
        self.log.borrow_mut().shadow_renders.push(self.timestep);
        self.body
            .render_shadow(ctx, light_space, &self.position(self.timestep).to_matrix())
    }

    fn cleanup(&mut self, ctx: &mut dyn GraphicsContext) {
        self.log.borrow_mut().cleanups += 1;
        self.body.cleanup(ctx);
    }

    fn toggle_tire_force(&mut self) {
        let mut log = self.log.borrow_mut();
        log.tire_force = !log.tire_force;
    }
}

/// Camera that looks at whatever it tracks from a fixed offset.
#[derive(Debug, Default)]
pub(crate) struct MockCamera {
    pub tracked: Vec<Vector3<f32>>,
    pub inputs: usize,
    pub aspect: f32,
    pub offset: bool,
}

impl Camera for MockCamera {
    fn view_matrix(&self) -> Matrix4<f32> {
        let target = self.tracked.last().copied().unwrap_or(Vector3::new(0.0, 0.0, 0.0));
        let target = Point3::new(target.x, target.y, target.z);
        Matrix4::look_at_rh(target + Vector3::new(-10.0, 0.0, 5.0), target, Vector3::unit_z())
    }

    fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(cgmath::Deg(45.0), 1.0, 0.1, 500.0)
    }

    fn track_object(&mut self, position: &Position) {
        self.tracked.push(position.translation);
    }

    fn process_input(&mut self) {
        self.inputs += 1;
    }

    fn set_aspect_ratio(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    fn reset_target_offset(&mut self) {
        self.offset = false;
    }

    fn is_offset(&self) -> bool {
        self.offset
    }
}

/// A fresh, empty directory under the system temp dir.
pub(crate) fn temp_dir(name: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "track-ngin-{}-{}-{}",
        name,
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("temp dir can be created");
    dir
}

pub(crate) fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("fixture can be written");
    path
}

/// A unit quad in the XY plane with UVs, as OBJ.
pub(crate) const QUAD_OBJ: &str = "\
o quad
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
";

/// Camera position encoded in a view matrix.
pub(crate) fn camera_position(view: &Matrix4<f32>) -> Vector3<f32> {
    let inverse = view.invert().expect("view matrices are invertible");
    (inverse * Vector4::new(0.0, 0.0, 0.0, 1.0)).truncate()
}

pub(crate) fn assert_close(a: f32, b: f32) {
    assert!((a - b).abs() < 1e-4, "{} != {}", a, b);
}

pub(crate) fn assert_vec_close(a: Vector3<f32>, b: Vector3<f32>) {
    assert!(
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4 && (a.z - b.z).abs() < 1e-4,
        "{:?} != {:?}",
        a,
        b
    );
}
