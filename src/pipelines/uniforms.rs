//! Per-draw uniform block and the bind group layouts shared by the pipelines.
//!
//! Group 0 holds [`DrawUniforms`] behind a dynamic offset, group 1 the
//! material textures, group 2 the shadow map.

use cgmath::{Matrix, Matrix4, SquareMatrix};

use crate::{
    context::MatrixUniforms,
    data_structures::material::Material,
    light::{CascadeUniforms, CasterLight, NUM_CASCADES},
};

/// Mirrors `DrawUniforms` in the WGSL shaders. Every member is 16-byte aligned.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// Inverse transpose of `model`.
    pub normal: [[f32; 4]; 4],
    pub light_space: [[[f32; 4]; 4]; NUM_CASCADES],
    /// xyz: clip-space z where each cascade ends.
    pub cascade_ends: [f32; 4],
    /// View-space direction the light travels in.
    pub light_direction: [f32; 4],
    pub light_intensity: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    /// shininess, alpha, height scale, unused
    pub material: [f32; 4],
    /// has diffuse texture, has normal texture, unused, unused
    pub flags: [f32; 4],
}

impl Default for DrawUniforms {
    fn default() -> Self {
        let identity: [[f32; 4]; 4] = Matrix4::identity().into();
        Self {
            model: identity,
            view: identity,
            projection: identity,
            normal: identity,
            light_space: [identity; NUM_CASCADES],
            cascade_ends: [0.0; 4],
            light_direction: [0.0, 0.0, -1.0, 0.0],
            light_intensity: [1.0; 4],
            ambient: [0.2, 0.2, 0.2, 0.0],
            diffuse: [0.8, 0.8, 0.8, 0.0],
            specular: [0.0; 4],
            material: [1.0, 1.0, 0.0, 0.0],
            flags: [0.0; 4],
        }
    }
}

impl DrawUniforms {
    pub fn set_matrices(&mut self, uniforms: &MatrixUniforms) {
        self.model = uniforms.model.into();
        self.view = uniforms.view.into();
        self.projection = uniforms.projection.into();
        self.normal = uniforms
            .model
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or(uniforms.model)
            .into();
    }

    pub fn set_light(&mut self, light: &CasterLight, view: &Matrix4<f32>) {
        self.light_direction = light.view_direction(view).extend(0.0).into();
        self.light_intensity = light.intensity.extend(1.0).into();
    }

    pub fn set_cascades(&mut self, cascades: &CascadeUniforms) {
        self.light_space = cascades.light_space.map(Into::into);
        let [a, b, c] = cascades.clip_ends;
        self.cascade_ends = [a, b, c, 0.0];
    }

    /// `has_diffuse`/`has_normal` tell the shader whether the bound textures
    /// are the material's own or the defaults.
    pub fn set_material(&mut self, material: &Material, has_diffuse: bool, has_normal: bool) {
        self.ambient = material.ambient.extend(0.0).into();
        self.diffuse = material.diffuse.extend(0.0).into();
        self.specular = material.specular.extend(0.0).into();
        self.material = [
            material.shininess,
            material.alpha,
            material.height_scale,
            0.0,
        ];
        self.flags = [
            if has_diffuse { 1.0 } else { 0.0 },
            if has_normal { 1.0 } else { 0.0 },
            0.0,
            0.0,
        ];
    }
}

pub fn uniforms_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: wgpu::BufferSize::new(
                    std::mem::size_of::<DrawUniforms>() as wgpu::BufferAddress,
                ),
            },
            count: None,
        }],
        label: Some("draw_uniforms_bind_group_layout"),
    })
}

pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

pub fn shadow_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2Array,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("shadow_bind_group_layout"),
    })
}
