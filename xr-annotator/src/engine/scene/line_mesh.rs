use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};

use crate::objects::polyline::TubeGeometry;

/// Upload-ready mesh for an extruded line. Kept in the main world so the
/// mesh can be rebuilt each time a point is appended.
pub fn tube_mesh(geometry: &TubeGeometry) -> Mesh {
    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, geometry.positions.clone());
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, geometry.normals.clone());
    mesh.insert_indices(Indices::U32(geometry.indices.clone()));
    mesh
}

/// Tube over `points`, or `None` while fewer than two distinct points exist.
pub fn line_mesh(points: &[Vec3], thickness: f32) -> Option<Mesh> {
    TubeGeometry::build(points, thickness).map(|geometry| tube_mesh(&geometry))
}
