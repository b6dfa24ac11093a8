use crate::pipelines::{texture::GpuTexture, vertex::ModelVertex};

/// Depth test of a pipeline.
#[derive(Clone, Copy, Debug)]
pub struct DepthTest {
    pub format: wgpu::TextureFormat,
    pub write: bool,
    pub compare: wgpu::CompareFunction,
}

impl DepthTest {
    pub fn standard() -> Self {
        Self {
            format: GpuTexture::DEPTH_FORMAT,
            write: true,
            compare: wgpu::CompareFunction::Less,
        }
    }
}

/// Lit, textured, shadow receiving. Blends by alpha so transparent meshes
/// drawn last composite over what is behind them.
pub fn mk_object_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    uniforms_layout: &wgpu::BindGroupLayout,
    material_layout: &wgpu::BindGroupLayout,
    shadow_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Object Pipeline Layout"),
        bind_group_layouts: &[uniforms_layout, material_layout, shadow_layout],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Object Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("object.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        "Object Pipeline",
        &render_pipeline_layout,
        Some(color_format),
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(DepthTest::standard()),
        Some(wgpu::Face::Back),
        &[ModelVertex::desc()],
        shader,
    )
}

/// Shared pipeline setup. A pipeline without `color_format` has no fragment
/// stage and only writes depth.
#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    color_format: Option<wgpu::TextureFormat>,
    blend: Option<wgpu::BlendState>,
    depth: Option<DepthTest>,
    cull_mode: Option<wgpu::Face>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);
    let targets = [color_format.map(|format| wgpu::ColorTargetState {
        format,
        blend,
        write_mask: wgpu::ColorWrites::ALL,
    })];

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: color_format.map(|_| wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth.map(|depth| wgpu::DepthStencilState {
            format: depth.format,
            depth_write_enabled: depth.write,
            depth_compare: depth.compare,
            stencil: wgpu::StencilState::default(),
            // slope scaled bias against shadow acne
            bias: if color_format.is_none() {
                wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                }
            } else {
                wgpu::DepthBiasState::default()
            },
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}
