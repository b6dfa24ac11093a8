use cgmath::{InnerSpace, Vector2, Vector3};

use crate::data_structures::{mesh::DrawRange, object::Geometry};

/// Tangent and bitangent of one triangle, solved from its UV gradient.
///
/// Degenerate UVs (zero determinant) yield non-finite vectors.
pub fn triangle_basis(
    positions: [Vector3<f32>; 3],
    uvs: [Vector2<f32>; 3],
) -> (Vector3<f32>, Vector3<f32>) {
    let [pos0, pos1, pos2] = positions;
    let [uv0, uv1, uv2] = uvs;

    let delta_pos1 = pos1 - pos0;
    let delta_pos2 = pos2 - pos0;
    let delta_uv1 = uv1 - uv0;
    let delta_uv2 = uv2 - uv0;

    // delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
    // delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
    let r = 1.0 / (delta_uv1.x * delta_uv2.y - delta_uv2.x * delta_uv1.y);
    let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
    let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * r;
    (tangent.normalize(), bitangent.normalize())
}

/// Per-vertex tangents and bitangents for a triangle list.
///
/// `indices` are relative to `positions`. Every triangle writes its basis to
/// all three of its vertices, so a vertex shared by several triangles keeps
/// the basis of the last one. Vertices without UVs keep zero vectors.
pub fn compute_tangents(
    positions: &[[f32; 3]],
    uvs: &[[f32; 2]],
    indices: &[u32],
) -> (Vec<[f32; 3]>, Vec<[f32; 3]>) {
    let mut tangents = vec![[0.0; 3]; positions.len()];
    let mut bitangents = vec![[0.0; 3]; positions.len()];

    for c in indices.chunks_exact(3) {
        let [i0, i1, i2] = [c[0] as usize, c[1] as usize, c[2] as usize];
        let (Some(p0), Some(p1), Some(p2)) = (positions.get(i0), positions.get(i1), positions.get(i2))
        else {
            continue;
        };
        let (Some(uv0), Some(uv1), Some(uv2)) = (uvs.get(i0), uvs.get(i1), uvs.get(i2)) else {
            continue;
        };
        let (tangent, bitangent) = triangle_basis(
            [(*p0).into(), (*p1).into(), (*p2).into()],
            [(*uv0).into(), (*uv1).into(), (*uv2).into()],
        );
        for i in [i0, i1, i2] {
            tangents[i] = tangent.into();
            bitangents[i] = bitangent.into();
        }
    }
    (tangents, bitangents)
}

/// Area-weighted smooth normals, for sources that come without normals.
pub fn smooth_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vector3::new(0.0_f32, 0.0, 0.0); positions.len()];
    for c in indices.chunks_exact(3) {
        let [i0, i1, i2] = [c[0] as usize, c[1] as usize, c[2] as usize];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }
        let p0: Vector3<f32> = positions[i0].into();
        let p1: Vector3<f32> = positions[i1].into();
        let p2: Vector3<f32> = positions[i2].into();
        let face = (p1 - p0).cross(p2 - p0);
        normals[i0] += face;
        normals[i1] += face;
        normals[i2] += face;
    }
    normals
        .into_iter()
        .map(|n| {
            if n.magnitude2() > 0.0 {
                n.normalize().into()
            } else {
                [0.0, 0.0, 1.0]
            }
        })
        .collect()
}

/// Appends an axis-aligned box with outward faces and per-face UVs to
/// `geometry` and returns the index range it occupies.
pub fn append_box(geometry: &mut Geometry, min: [f32; 3], max: [f32; 3]) -> DrawRange {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;
    // (normal, four corners counter-clockwise seen from outside)
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        ([1.0, 0.0, 0.0], [[x1, y0, z0], [x1, y1, z0], [x1, y1, z1], [x1, y0, z1]]),
        ([-1.0, 0.0, 0.0], [[x0, y1, z0], [x0, y0, z0], [x0, y0, z1], [x0, y1, z1]]),
        ([0.0, 1.0, 0.0], [[x1, y1, z0], [x0, y1, z0], [x0, y1, z1], [x1, y1, z1]]),
        ([0.0, -1.0, 0.0], [[x0, y0, z0], [x1, y0, z0], [x1, y0, z1], [x0, y0, z1]]),
        ([0.0, 0.0, 1.0], [[x0, y0, z1], [x1, y0, z1], [x1, y1, z1], [x0, y1, z1]]),
        ([0.0, 0.0, -1.0], [[x0, y1, z0], [x1, y1, z0], [x1, y0, z0], [x0, y0, z0]]),
    ];
    let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

    if geometry.uv_channels.is_empty() {
        geometry.uv_channels.push(Vec::new());
    }
    let offset = geometry.indices.len() as u32;
    let first_vertex = geometry.positions.len();

    for (normal, corners) in faces {
        let base = geometry.positions.len() as u32;
        for (corner, uv) in corners.iter().zip(uvs) {
            geometry.positions.push(*corner);
            geometry.normals.push(normal);
            geometry.uv_channels[0].push(uv);
        }
        geometry
            .indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    let local: Vec<u32> = geometry.indices[offset as usize..]
        .iter()
        .map(|i| i - first_vertex as u32)
        .collect();
    let (tangents, bitangents) = compute_tangents(
        &geometry.positions[first_vertex..],
        geometry.uv_channels[0].get(first_vertex..).unwrap_or(&[]),
        &local,
    );
    geometry.tangents.extend(tangents);
    geometry.bitangents.extend(bitangents);

    DrawRange {
        offset,
        count: geometry.indices.len() as u32 - offset,
    }
}
