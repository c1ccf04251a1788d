use crate::engine::assets::heightfield::Heightfield;
use crate::objects::ray::ray_aabb_span;
use bevy::prelude::*;
use constants::interaction::MIN_TERRAIN_SCALE;

const REFINE_ITERATIONS: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

/// Anything a ray can land on.
pub trait TerrainSurface {
    fn intersect(&self, ray: &Ray3d) -> Option<SurfaceHit>;
    fn height_at(&self, x: f32, z: f32) -> Option<f32>;
}

impl Heightfield {
    /// Central-difference normal at world `(x, z)`.
    pub fn normal_at(&self, x: f32, z: f32) -> Vec3 {
        let e = self.cell_size * 0.5;
        let h = |dx: f32, dz: f32| {
            self.sample_bilinear(x + dx, z + dz)
                .or_else(|| self.sample_bilinear(x, z))
                .unwrap_or(0.0)
        };
        let dhdx = (h(e, 0.0) - h(-e, 0.0)) / (2.0 * e);
        let dhdz = (h(0.0, e) - h(0.0, -e)) / (2.0 * e);
        Vec3::new(-dhdx, 1.0, -dhdz).normalize()
    }

    /// Signed height of `point` over the surface, clamped to the grid edges.
    fn height_above(&self, point: Vec3) -> f32 {
        let min = self.min_corner();
        let max = self.max_corner();
        let x = point.x.clamp(min.x, max.x);
        let z = point.z.clamp(min.y, max.y);
        point.y - self.sample_bilinear(x, z).unwrap_or(0.0)
    }
}

impl TerrainSurface for Heightfield {
    fn intersect(&self, ray: &Ray3d) -> Option<SurfaceHit> {
        let origin = ray.origin;
        let direction = *ray.direction;
        let (lo, hi) = self.height_range();
        let min = self.min_corner();
        let max = self.max_corner();
        let margin = self.cell_size;

        // Clip to the field's bounding box before marching.
        let (t_enter, t_exit) = ray_aabb_span(
            origin,
            direction,
            Vec3::new(min.x, lo - margin, min.y),
            Vec3::new(max.x, hi + margin, max.y),
        )?;
        if t_exit < 0.0 {
            return None;
        }

        let mut t = t_enter.max(0.0);
        if self.height_above(origin + direction * t) < 0.0 {
            // Starting underground.
            return None;
        }

        let step = self.cell_size * 0.5;
        while t < t_exit {
            let next_t = (t + step).min(t_exit);
            if self.height_above(origin + direction * next_t) <= 0.0 {
                let (mut low, mut high) = (t, next_t);
                for _ in 0..REFINE_ITERATIONS {
                    let mid = (low + high) * 0.5;
                    if self.height_above(origin + direction * mid) > 0.0 {
                        low = mid;
                    } else {
                        high = mid;
                    }
                }

                let distance = (low + high) * 0.5;
                let p = origin + direction * distance;
                let y = self.sample_bilinear(p.x, p.z).unwrap_or(p.y);
                let point = Vec3::new(p.x, y, p.z);
                return Some(SurfaceHit {
                    point,
                    normal: self.normal_at(point.x, point.z),
                    distance,
                });
            }
            t = next_t;
        }

        None
    }

    fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        self.sample_bilinear(x, z)
    }
}

/// Loaded terrain, in container-local space.
#[derive(Resource, Debug, Clone)]
pub struct Terrain {
    pub field: Heightfield,
}

impl TerrainSurface for Terrain {
    fn intersect(&self, ray: &Ray3d) -> Option<SurfaceHit> {
        self.field.intersect(ray)
    }

    fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        self.field.height_at(x, z)
    }
}

/// Uniform scale applied to the terrain and every placed object.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct TerrainContainer {
    scale: f32,
}

impl Default for TerrainContainer {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl TerrainContainer {
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale.max(MIN_TERRAIN_SCALE);
    }

    pub fn transform(&self) -> Transform {
        Transform::from_scale(Vec3::splat(self.scale))
    }

    /// World ray expressed in container space. Direction is unchanged by a
    /// uniform scale, distances shrink by the same factor.
    pub fn to_local_ray(&self, ray: &Ray3d) -> Ray3d {
        Ray3d::new(ray.origin / self.scale, ray.direction)
    }

    pub fn to_local(&self, point: Vec3) -> Vec3 {
        point / self.scale
    }

    pub fn to_world(&self, point: Vec3) -> Vec3 {
        point * self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn downward_ray_lands_on_flat_field() {
        let field = Heightfield::flat(65, 65, 2.0, 3.0);
        let ray = Ray3d::new(Vec3::new(10.0, 50.0, -5.0), Dir3::NEG_Y);
        let hit = field.intersect(&ray).unwrap();
        assert_approx_eq!(hit.point.x, 10.0, 1e-4);
        assert_approx_eq!(hit.point.y, 3.0, 1e-4);
        assert_approx_eq!(hit.point.z, -5.0, 1e-4);
        assert_approx_eq!(hit.distance, 47.0, 1e-3);
        assert!((hit.normal - Vec3::Y).length() < 1e-4);
    }

    #[test]
    fn oblique_ray_hits_slope() {
        // Plane y = 0.5 x.
        let field = Heightfield::from_fn(101, 101, 1.0, |x, _| 0.5 * x);
        let ray = Ray3d::new(
            Vec3::new(-20.0, 10.0, 0.0),
            Dir3::new(Vec3::new(1.0, -0.5, 0.0)).unwrap(),
        );
        let hit = field.intersect(&ray).unwrap();
        // y = 10 - 0.5 (x + 20) meets y = 0.5 x at the origin.
        assert_approx_eq!(hit.point.x, 0.0, 1e-3);
        assert_approx_eq!(hit.point.y, 0.0, 1e-3);
        let expected = Vec3::new(-0.5, 1.0, 0.0).normalize();
        assert!((hit.normal - expected).length() < 1e-3);
    }

    #[test]
    fn rays_that_miss_return_none() {
        let field = Heightfield::flat(9, 9, 1.0, 0.0);
        let up = Ray3d::new(Vec3::new(0.0, 5.0, 0.0), Dir3::Y);
        assert!(field.intersect(&up).is_none());

        let outside = Ray3d::new(Vec3::new(100.0, 5.0, 0.0), Dir3::NEG_Y);
        assert!(field.intersect(&outside).is_none());

        let below = Ray3d::new(Vec3::new(0.0, -5.0, 0.0), Dir3::NEG_Y);
        assert!(field.intersect(&below).is_none());
    }

    #[test]
    fn container_maps_rays_into_local_space() {
        let mut container = TerrainContainer::default();
        container.set_scale(0.5);
        let world = Ray3d::new(Vec3::new(2.0, 4.0, 6.0), Dir3::NEG_Y);
        let local = container.to_local_ray(&world);
        assert_eq!(local.origin, Vec3::new(4.0, 8.0, 12.0));
        assert_eq!(container.to_world(local.origin), world.origin);

        container.set_scale(0.0);
        assert_eq!(container.scale(), MIN_TERRAIN_SCALE);
    }
}
