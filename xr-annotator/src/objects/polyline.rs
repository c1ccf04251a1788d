use crate::objects::ray::ray_capsule_hit_t;
use bevy::prelude::*;
use constants::render_settings::{LINE_RADIAL_SEGMENTS, LINE_THICKNESS};
use std::f32::consts::{PI, TAU};

/// Triangle mesh data for an extruded line, independent of any render backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TubeGeometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl TubeGeometry {
    /// Extrude a regular polygon of radius `thickness` along `points`.
    /// Returns `None` for fewer than two distinct points.
    pub fn build(points: &[Vec3], thickness: f32) -> Option<Self> {
        let path = with_corner_points(points, thickness);
        if path.len() < 2 {
            return None;
        }

        let segments = LINE_RADIAL_SEGMENTS;
        let mut geometry = TubeGeometry::default();

        for (idx, center) in path.iter().enumerate() {
            let tangent = path_tangent(&path, idx);
            let (side, up) = cross_section_axes(tangent);

            for k in 0..segments {
                let angle = k as f32 * TAU / segments as f32;
                let radial = side * angle.cos() + up * angle.sin();
                geometry.positions.push((*center + radial * thickness).to_array());
                geometry.normals.push(radial.to_array());
            }
        }

        let ring = segments as u32;
        for ring_idx in 0..(path.len() as u32 - 1) {
            let base = ring_idx * ring;
            let next = base + ring;
            for k in 0..ring {
                let k1 = (k + 1) % ring;
                geometry
                    .indices
                    .extend_from_slice(&[base + k, next + k, base + k1]);
                geometry
                    .indices
                    .extend_from_slice(&[base + k1, next + k, next + k1]);
            }
        }

        // End caps.
        for (ring_idx, flip) in [(0usize, true), (path.len() - 1, false)] {
            let tangent = path_tangent(&path, ring_idx);
            let normal = if flip { -tangent } else { tangent };
            let cap_start = geometry.positions.len() as u32;

            for k in 0..segments {
                let source = ring_idx * segments + k;
                geometry.positions.push(geometry.positions[source]);
                geometry.normals.push(normal.to_array());
            }
            geometry.positions.push(path[ring_idx].to_array());
            geometry.normals.push(normal.to_array());
            let center = cap_start + ring;

            for k in 0..ring {
                let k1 = (k + 1) % ring;
                if flip {
                    geometry
                        .indices
                        .extend_from_slice(&[center, cap_start + k1, cap_start + k]);
                } else {
                    geometry
                        .indices
                        .extend_from_slice(&[center, cap_start + k, cap_start + k1]);
                }
            }
        }

        Some(geometry)
    }

}

/// Insert two extra points around each interior corner so the tube keeps its
/// thickness where the path bends.
fn with_corner_points(points: &[Vec3], thickness: f32) -> Vec<Vec3> {
    let mut deduped: Vec<Vec3> = Vec::with_capacity(points.len());
    for point in points {
        if deduped
            .last()
            .is_none_or(|last| last.distance_squared(*point) > 1e-10)
        {
            deduped.push(*point);
        }
    }

    if deduped.len() < 3 {
        return deduped;
    }

    let mut path = Vec::with_capacity(deduped.len() * 3);
    path.push(deduped[0]);

    for idx in 1..deduped.len() - 1 {
        let prev = deduped[idx - 1];
        let point = deduped[idx];
        let next = deduped[idx + 1];
        let v1 = point - prev;
        let v2 = next - point;
        let angle = PI - v1.angle_between(v2);

        if (PI - angle).abs() < 1e-4 {
            path.push(point);
            continue;
        }

        // Clamp so corner points never overshoot a neighbouring vertex.
        let limit = v1.length().min(v2.length()) * 0.5;
        let offset = (thickness / 2.0 / (angle / 2.0).tan()).min(limit);

        path.push(point - v1.normalize() * offset);
        path.push(point);
        path.push(point + v2.normalize() * offset);
    }

    path.push(deduped[deduped.len() - 1]);
    path
}

fn path_tangent(path: &[Vec3], idx: usize) -> Vec3 {
    let prev = path[idx.saturating_sub(1)];
    let next = path[(idx + 1).min(path.len() - 1)];
    let incoming = (path[idx] - prev).normalize_or_zero();
    let outgoing = (next - path[idx]).normalize_or_zero();
    let tangent = (incoming + outgoing).normalize_or_zero();
    if tangent == Vec3::ZERO {
        outgoing.try_normalize().unwrap_or(Vec3::X)
    } else {
        tangent
    }
}

fn cross_section_axes(tangent: Vec3) -> (Vec3, Vec3) {
    let reference = if tangent.dot(Vec3::Y).abs() > 0.99 {
        Vec3::X
    } else {
        Vec3::Y
    };
    let side = tangent.cross(reference).normalize();
    let up = side.cross(tangent).normalize();
    (side, up)
}

/// Trailing preview segment from the last committed point to the pointed location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentPlaceholder {
    pub start: Vec3,
    pub end: Vec3,
    pub enabled: bool,
}

/// Ordered list of terrain points drawn as a thick line.
#[derive(Debug, Clone)]
pub struct Polyline {
    points: Vec<Vec3>,
    color: Color,
    thickness: f32,
    geometry: Option<TubeGeometry>,
    placeholder: SegmentPlaceholder,
}

impl Polyline {
    pub fn new(color: Color) -> Self {
        Self::with_points(Vec::new(), color)
    }

    pub fn with_points(points: Vec<Vec3>, color: Color) -> Self {
        let last = points.last().copied().unwrap_or(Vec3::ZERO);
        let geometry = TubeGeometry::build(&points, LINE_THICKNESS);
        Self {
            points,
            color,
            thickness: LINE_THICKNESS,
            geometry,
            placeholder: SegmentPlaceholder {
                start: last,
                end: last,
                enabled: false,
            },
        }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn thickness(&self) -> f32 {
        self.thickness
    }

    /// Extruded geometry of the committed points, `None` until two points exist.
    pub fn geometry(&self) -> Option<&TubeGeometry> {
        self.geometry.as_ref()
    }

    /// Append a point, rebuild the tube and collapse the preview segment onto it.
    pub fn add_point(&mut self, point: Vec3) {
        self.points.push(point);
        self.geometry = TubeGeometry::build(&self.points, self.thickness);
        self.placeholder.start = point;
        self.placeholder.end = point;
    }

    pub fn enable_placeholder(&mut self) {
        self.placeholder.enabled = true;
    }

    pub fn disable_placeholder(&mut self) {
        self.placeholder.enabled = false;
    }

    /// Move the free end of the preview segment. Ignored until a point exists.
    pub fn update_placeholder(&mut self, preview: Vec3) {
        if self.points.is_empty() {
            return;
        }
        self.placeholder.end = preview;
    }

    pub fn placeholder(&self) -> SegmentPlaceholder {
        self.placeholder
    }

    /// Distance along the ray to the tube's hit surface.
    pub fn ray_hit(&self, ray: &Ray3d) -> Option<f32> {
        match self.points.as_slice() {
            [] => None,
            [single] => ray_capsule_hit_t(ray, *single, *single, self.thickness),
            points => points
                .windows(2)
                .filter_map(|pair| ray_capsule_hit_t(ray, pair[0], pair[1], self.thickness))
                .min_by(f32::total_cmp),
        }
    }
}
