use crate::pipelines::{
    basic::{DepthTest, mk_render_pipeline},
    vertex::ModelVertex,
};

/// Depth-only pipeline rendering one shadow cascade. The cascade's
/// light-space matrix arrives as the view matrix.
pub fn mk_shadow_pipeline(
    device: &wgpu::Device,
    uniforms_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Shadow Pipeline Layout"),
        bind_group_layouts: &[uniforms_layout],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Shadow Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shadow.wgsl").into()),
    };

    // no culling: thin geometry such as planes must still cast
    mk_render_pipeline(
        device,
        "Shadow Pipeline",
        &layout,
        None,
        None,
        Some(DepthTest::standard()),
        None,
        &[ModelVertex::desc()],
        shader,
    )
}
