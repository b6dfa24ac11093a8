use crate::pipelines::{
    basic::{DepthTest, mk_render_pipeline},
    texture::GpuTexture,
    vertex::ModelVertex,
};

/// The sky sits on the far plane: it is tested against but never writes depth.
pub fn mk_skybox_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    uniforms_layout: &wgpu::BindGroupLayout,
    material_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Skybox Pipeline Layout"),
        bind_group_layouts: &[uniforms_layout, material_layout],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Skybox Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("skybox.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        "Skybox Pipeline",
        &layout,
        Some(color_format),
        Some(wgpu::BlendState::REPLACE),
        Some(DepthTest {
            format: GpuTexture::DEPTH_FORMAT,
            write: false,
            compare: wgpu::CompareFunction::LessEqual,
        }),
        None,
        &[ModelVertex::desc()],
        shader,
    )
}
