//! The wgpu implementation of [`GraphicsContext`].
//!
//! [`WgpuContext`] records the calls of a frame per pass: every
//! `draw_elements` snapshots the current shader, geometry, uniforms and
//! material textures. [`WgpuContext::finish`] then writes all per-draw
//! uniforms into one buffer addressed by dynamic offsets and encodes the
//! shadow cascades and the colour pass.
//!
//! Geometry is uploaded once per object; textures are uploaded the first
//! time a draw uses them and are keyed by their registry id.

pub mod basic;
pub mod shadow;
pub mod skybox;
pub mod texture;
pub mod uniforms;
pub mod vertex;

use std::collections::HashMap;

use anyhow::Context as _;
use cgmath::Matrix4;
use wgpu::util::DeviceExt;

use crate::{
    context::{GeometryHandle, GraphicsContext, MatrixUniforms, Pass, ShaderKind},
    data_structures::{material::Material, mesh::DrawRange, object::Geometry, texture::Texture},
    error::RenderError,
    light::{CascadeUniforms, CasterLight},
    pipelines::{
        basic::mk_object_pipeline,
        shadow::mk_shadow_pipeline,
        skybox::mk_skybox_pipeline,
        texture::{GpuTexture, ShadowMap},
        uniforms::{DrawUniforms, material_layout, shadow_layout, uniforms_layout},
        vertex::interleave,
    },
};

struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

/// Texture ids of a material binding. `None` binds the default texture.
type MaterialKey = (Option<u32>, Option<u32>);

#[derive(Clone, Copy)]
struct RecordedDraw {
    shader: ShaderKind,
    geometry: GeometryHandle,
    range: DrawRange,
    uniforms: DrawUniforms,
    material: MaterialKey,
}

struct RecordedPass {
    pass: Pass,
    draws: Vec<RecordedDraw>,
}

struct Pipelines {
    object: wgpu::RenderPipeline,
    shadow: wgpu::RenderPipeline,
    skybox: wgpu::RenderPipeline,
}

struct Layouts {
    uniforms: wgpu::BindGroupLayout,
    material: wgpu::BindGroupLayout,
}

pub struct WgpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub color_format: wgpu::TextureFormat,
    pub clear_colour: wgpu::Color,

    layouts: Layouts,
    pipelines: Pipelines,
    shadow_map: ShadowMap,
    shadow_bind_group: wgpu::BindGroup,
    default_diffuse: GpuTexture,
    default_normal: GpuTexture,

    geometries: HashMap<GeometryHandle, GpuGeometry>,
    next_geometry: u64,
    textures: HashMap<u32, GpuTexture>,
    material_groups: HashMap<MaterialKey, wgpu::BindGroup>,

    passes: Vec<RecordedPass>,
    shader: ShaderKind,
    geometry: Option<GeometryHandle>,
    uniforms: DrawUniforms,
    material: MaterialKey,
}

impl WgpuContext {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, color_format: wgpu::TextureFormat) -> Self {
        let layouts = Layouts {
            uniforms: uniforms_layout(&device),
            material: material_layout(&device),
        };
        let shadow_layout = shadow_layout(&device);
        let pipelines = Pipelines {
            object: mk_object_pipeline(
                &device,
                color_format,
                &layouts.uniforms,
                &layouts.material,
                &shadow_layout,
            ),
            shadow: mk_shadow_pipeline(&device, &layouts.uniforms),
            skybox: mk_skybox_pipeline(&device, color_format, &layouts.uniforms, &layouts.material),
        };

        let shadow_map = ShadowMap::new(&device);
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &shadow_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.array_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&shadow_map.sampler),
                },
            ],
            label: Some("shadow_bind_group"),
        });

        let default_diffuse =
            GpuTexture::create_solid(&device, &queue, [255, 255, 255, 255], true, "default diffuse");
        let default_normal = GpuTexture::create_default_normal_map(&device, &queue);

        Self {
            device,
            queue,
            color_format,
            clear_colour: wgpu::Color {
                r: 0.1,
                g: 0.2,
                b: 0.3,
                a: 1.0,
            },
            layouts,
            pipelines,
            shadow_map,
            shadow_bind_group,
            default_diffuse,
            default_normal,
            geometries: HashMap::new(),
            next_geometry: 0,
            textures: HashMap::new(),
            material_groups: HashMap::new(),
            passes: Vec::new(),
            shader: ShaderKind::Object,
            geometry: None,
            uniforms: DrawUniforms::default(),
            material: (None, None),
        }
    }

    /// A context on its own device, without a surface. Used for offscreen
    /// rendering and tests.
    pub fn headless(color_format: wgpu::TextureFormat) -> anyhow::Result<Self> {
        futures::executor::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::PRIMARY,
                ..Default::default()
            });
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .context("no GPU adapter available")?;
            let (device, queue) = adapter
                .request_device(&wgpu::DeviceDescriptor {
                    label: Some("headless device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                    trace: wgpu::Trace::Off,
                    ..Default::default()
                })
                .await
                .context("could not create the GPU device")?;
            Ok::<_, anyhow::Error>(Self::new(device, queue, color_format))
        })
    }

    /// Number of draws recorded since the last [`WgpuContext::finish`].
    pub fn recorded_draws(&self) -> usize {
        self.passes.iter().map(|p| p.draws.len()).sum()
    }

    fn texture_id(&mut self, texture: Option<&Texture>) -> Option<u32> {
        let texture = texture?;
        if self.textures.contains_key(&texture.id) {
            return Some(texture.id);
        }
        let image = texture.image.as_ref()?;
        let label = texture.path.to_string_lossy();
        match GpuTexture::from_rgba(&self.device, &self.queue, image, &label, texture.kind.is_srgb()) {
            Ok(gpu) => {
                self.textures.insert(texture.id, gpu);
                Some(texture.id)
            }
            Err(e) => {
                log::warn!("Texture {:?} could not be uploaded: {:#}", texture.path, e);
                None
            }
        }
    }

    fn material_bind_group(&mut self, key: MaterialKey) -> &wgpu::BindGroup {
        let (diffuse, normal) = key;
        let diffuse = diffuse
            .and_then(|id| self.textures.get(&id))
            .unwrap_or(&self.default_diffuse);
        let normal = normal
            .and_then(|id| self.textures.get(&id))
            .unwrap_or(&self.default_normal);
        self.material_groups.entry(key).or_insert_with(|| {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &self.layouts.material,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&diffuse.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&diffuse.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&normal.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::Sampler(&normal.sampler),
                    },
                ],
                label: Some("material_bind_group"),
            })
        })
    }

    /// Encodes every recorded pass into `encoder` and clears the recording.
    ///
    /// `color` and `depth` are the colour pass targets; `depth` must use
    /// [`GpuTexture::DEPTH_FORMAT`].
    pub fn finish(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        color: &wgpu::TextureView,
        depth: &wgpu::TextureView,
    ) {
        let passes = std::mem::take(&mut self.passes);
        let draw_count: usize = passes.iter().map(|p| p.draws.len()).sum();
        if passes.is_empty() {
            return;
        }

        let alignment = self.device.limits().min_uniform_buffer_offset_alignment as usize;
        let size = std::mem::size_of::<DrawUniforms>();
        let stride = size.div_ceil(alignment) * alignment;
        let mut contents = vec![0u8; stride * draw_count.max(1)];
        for (i, draw) in passes.iter().flat_map(|p| p.draws.iter()).enumerate() {
            contents[i * stride..i * stride + size].copy_from_slice(bytemuck::bytes_of(&draw.uniforms));
        }
        let uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Draw Uniform Buffer"),
            contents: &contents,
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let uniform_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.layouts.uniforms,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(size as wgpu::BufferAddress),
                }),
            }],
            label: Some("draw_uniforms_bind_group"),
        });

        // bind groups have to exist before a pass borrows them
        let keys: Vec<MaterialKey> = passes
            .iter()
            .flat_map(|p| p.draws.iter())
            .filter(|d| d.shader != ShaderKind::ObjectShadow)
            .map(|d| d.material)
            .collect();
        for key in keys {
            self.material_bind_group(key);
        }

        let mut draw_index = 0;
        for recorded in &passes {
            let mut render_pass = match recorded.pass {
                Pass::Shadow { cascade } => {
                    let Some(layer) = self.shadow_map.layer_views.get(cascade) else {
                        log::error!("There is no shadow cascade {}.", cascade);
                        draw_index += recorded.draws.len();
                        continue;
                    };
                    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Shadow Pass"),
                        color_attachments: &[],
                        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                            view: layer,
                            depth_ops: Some(wgpu::Operations {
                                load: wgpu::LoadOp::Clear(1.0),
                                store: wgpu::StoreOp::Store,
                            }),
                            stencil_ops: None,
                        }),
                        occlusion_query_set: None,
                        timestamp_writes: None,
                    })
                }
                Pass::Color => encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: color,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.clear_colour),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: depth,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                }),
            };

            for draw in &recorded.draws {
                let offset = (draw_index * stride) as wgpu::DynamicOffset;
                draw_index += 1;
                let Some(geometry) = self.geometries.get(&draw.geometry) else {
                    log::warn!("Skipping a draw of released geometry {:?}.", draw.geometry);
                    continue;
                };
                let pipeline = match draw.shader {
                    ShaderKind::Object => &self.pipelines.object,
                    ShaderKind::ObjectShadow => &self.pipelines.shadow,
                    ShaderKind::Skybox => &self.pipelines.skybox,
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &uniform_bind_group, &[offset]);
                if draw.shader != ShaderKind::ObjectShadow {
                    if let Some(group) = self.material_groups.get(&draw.material) {
                        render_pass.set_bind_group(1, group, &[]);
                    }
                }
                if draw.shader == ShaderKind::Object {
                    render_pass.set_bind_group(2, &self.shadow_bind_group, &[]);
                }
                render_pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
                render_pass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(draw.range.offset..draw.range.end(), 0, 0..1);
            }
        }
    }

    /// Encodes and submits the recorded frame.
    pub fn submit(&mut self, color: &wgpu::TextureView, depth: &wgpu::TextureView) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        self.finish(&mut encoder, color, depth);
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Colour target matching the pipelines, for offscreen rendering.
    pub fn create_color_target(&self, width: u32, height: u32) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen colour target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.color_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }
}

impl GraphicsContext for WgpuContext {
    fn upload_geometry(
        &mut self,
        label: &str,
        geometry: &Geometry,
    ) -> Result<GeometryHandle, RenderError> {
        if geometry.positions.is_empty() || geometry.indices.is_empty() {
            return Err(RenderError::Backend(format!("object {} has no geometry", label)));
        }
        let vertices = interleave(geometry);
        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", label)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", label)),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let handle = GeometryHandle(self.next_geometry);
        self.next_geometry += 1;
        self.geometries.insert(
            handle,
            GpuGeometry {
                vertex_buffer,
                index_buffer,
            },
        );
        Ok(handle)
    }

    fn release_geometry(&mut self, handle: GeometryHandle) {
        if let Some(geometry) = self.geometries.remove(&handle) {
            geometry.vertex_buffer.destroy();
            geometry.index_buffer.destroy();
        }
    }

    fn release_textures(&mut self) {
        self.material_groups.clear();
        for (_, texture) in self.textures.drain() {
            texture.texture.destroy();
        }
    }

    fn begin_pass(&mut self, pass: Pass) {
        self.passes.push(RecordedPass {
            pass,
            draws: Vec::new(),
        });
    }

    fn end_pass(&mut self) {
        self.geometry = None;
    }

    fn bind_shader(&mut self, shader: ShaderKind) {
        self.shader = shader;
    }

    fn bind_geometry(&mut self, handle: GeometryHandle) {
        self.geometry = Some(handle);
    }

    fn set_matrix_uniforms(&mut self, uniforms: &MatrixUniforms) {
        self.uniforms.set_matrices(uniforms);
    }

    fn set_light_uniforms(&mut self, light: &CasterLight, view: &Matrix4<f32>) {
        self.uniforms.set_light(light, view);
    }

    fn set_cascade_uniforms(&mut self, cascades: &CascadeUniforms) {
        self.uniforms.set_cascades(cascades);
    }

    fn set_material_uniforms(&mut self, material: &Material) {
        let diffuse = self.texture_id(material.diffuse_texture.as_deref());
        let normal = self.texture_id(material.normal_texture.as_deref());
        self.uniforms
            .set_material(material, diffuse.is_some(), normal.is_some());
        self.material = (diffuse, normal);
    }

    fn draw_elements(&mut self, range: DrawRange) {
        let Some(geometry) = self.geometry else {
            log::warn!("draw_elements without bound geometry is ignored.");
            return;
        };
        let Some(pass) = self.passes.last_mut() else {
            log::warn!("draw_elements outside of a pass is ignored.");
            return;
        };
        pass.draws.push(RecordedDraw {
            shader: self.shader,
            geometry,
            range,
            uniforms: self.uniforms,
            material: self.material,
        });
    }
}
