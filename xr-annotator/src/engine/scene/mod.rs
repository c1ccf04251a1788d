//! Terrain, annotation visuals and lighting.
//!
//! Everything placed on the terrain hangs off a single root entity whose
//! uniform scale is the terrain container scale.

/// Heightfield ray intersection and the terrain container transform.
pub mod terrain;

/// Render mesh generation for a heightfield.
pub mod terrain_mesh;

/// Tube meshes for polylines.
pub mod line_mesh;

/// Sun and ambient light, steered by the illumination sliders.
pub mod lighting;

/// ECS mirror of the object registry and the mode previews.
///
/// Drains registry change records each frame and spawns, restyles or
/// despawns entities to match.
pub mod visuals;
