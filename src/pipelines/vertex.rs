use crate::data_structures::object::Geometry;

/// Interleaved vertex as the shaders read it.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl ModelVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x2,
        2 => Float32x3,
        3 => Float32x3,
        4 => Float32x3,
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Interleaves the object-wide buffers.
///
/// Texture coordinates come from channel 0 with a zero fallback. Geometry
/// keeps the UV origin bottom-left, wgpu samples top-left, so v is flipped
/// here. The bitangent is flipped with it to keep right-handed normal maps.
pub fn interleave(geometry: &Geometry) -> Vec<ModelVertex> {
    (0..geometry.vertex_count())
        .map(|i| {
            let [u, v] = geometry.uv(i);
            let [bx, by, bz] = geometry.bitangents.get(i).copied().unwrap_or_default();
            ModelVertex {
                position: geometry.positions[i],
                tex_coords: [u, 1.0 - v],
                normal: geometry.normals.get(i).copied().unwrap_or_default(),
                tangent: geometry.tangents.get(i).copied().unwrap_or_default(),
                bitangent: [-bx, -by, -bz],
            }
        })
        .collect()
}
