/// Triangle mesh generation for the loaded heightfield
use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};

use crate::engine::assets::heightfield::Heightfield;

#[derive(Component)]
pub struct TerrainMesh;

/// One vertex per height sample, two triangles per cell.
pub fn build_terrain_mesh(field: &Heightfield) -> Mesh {
    let min = field.min_corner();
    let max = field.max_corner();
    let extent = (max - min).max(Vec2::splat(f32::EPSILON));

    let mut positions = Vec::with_capacity(field.width * field.depth);
    let mut normals = Vec::with_capacity(field.width * field.depth);
    let mut uvs = Vec::with_capacity(field.width * field.depth);

    for row in 0..field.depth {
        for col in 0..field.width {
            let x = min.x + col as f32 * field.cell_size;
            let z = min.y + row as f32 * field.cell_size;
            positions.push([x, field.sample(col, row), z]);
            normals.push(field.normal_at(x, z).to_array());
            uvs.push([(x - min.x) / extent.x, (z - min.y) / extent.y]);
        }
    }

    let width = field.width as u32;
    let mut indices = Vec::with_capacity((field.width - 1) * (field.depth - 1) * 6);
    for row in 0..(field.depth as u32 - 1) {
        for col in 0..(width - 1) {
            let i = row * width + col;
            // Counter-clockwise seen from above.
            indices.extend_from_slice(&[i, i + width, i + 1]);
            indices.extend_from_slice(&[i + 1, i + width, i + width + 1]);
        }
    }

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_has_one_vertex_per_sample() {
        let field = Heightfield::flat(4, 3, 2.0, 1.0);
        let mesh = build_terrain_mesh(&field);
        assert_eq!(mesh.count_vertices(), 12);
        assert_eq!(mesh.indices().map(|i| i.len()), Some(3 * 2 * 6));
    }
}
