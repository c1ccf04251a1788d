use bevy::prelude::*;

/// Ray against an oriented box given by a world transform and full size.
/// The returned distance is measured along the world ray.
pub fn ray_hits_obb(ray: &Ray3d, xf: &Transform, size: Vec3) -> Option<f32> {
    let inv = xf.compute_matrix().inverse();
    let o_local = inv.transform_point3(ray.origin);
    let d_local = inv.transform_vector3(*ray.direction);
    let he = size * 0.5;
    ray_aabb_hit_t(o_local, d_local, -he, he)
}

/// Slab-method ray-AABB intersection, returns the entry (or exit, when inside) distance.
pub fn ray_aabb_hit_t(ray_origin: Vec3, ray_direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let (tmin, tmax) = ray_aabb_span(ray_origin, ray_direction, min, max)?;
    if tmax < 0.0 {
        return None;
    }
    Some(if tmin >= 0.0 { tmin } else { tmax })
}

/// Parametric interval where the ray line overlaps the box, before clamping to `t >= 0`.
pub fn ray_aabb_span(
    ray_origin: Vec3,
    ray_direction: Vec3,
    min: Vec3,
    max: Vec3,
) -> Option<(f32, f32)> {
    let mut tmin = f32::NEG_INFINITY;
    let mut tmax = f32::INFINITY;

    for axis in 0..3 {
        let origin = ray_origin[axis];
        let direction = ray_direction[axis];

        if direction == 0.0 {
            // Parallel to this slab: either always inside or never.
            if origin < min[axis] || origin > max[axis] {
                return None;
            }
            continue;
        }

        let inv = 1.0 / direction;
        let mut t0 = (min[axis] - origin) * inv;
        let mut t1 = (max[axis] - origin) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }

        tmin = tmin.max(t0);
        tmax = tmax.min(t1);
        if tmin > tmax {
            return None;
        }
    }

    Some((tmin, tmax))
}

/// Nearest non-negative hit of a ray against a sphere.
pub fn ray_sphere_hit_t(ray: &Ray3d, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    let b = oc.dot(*ray.direction);
    let c = oc.length_squared() - radius * radius;
    let h = b * b - c;
    if h < 0.0 {
        return None;
    }

    let h = h.sqrt();
    [-b - h, -b + h].into_iter().find(|t| *t >= 0.0)
}

/// Nearest non-negative hit of a ray against the capsule swept by a sphere of
/// `radius` along segment `a..b`.
pub fn ray_capsule_hit_t(ray: &Ray3d, a: Vec3, b: Vec3, radius: f32) -> Option<f32> {
    let rd = *ray.direction;
    let ba = b - a;
    let oa = ray.origin - a;

    let baba = ba.dot(ba);
    let bard = ba.dot(rd);
    let baoa = ba.dot(oa);
    let rdoa = rd.dot(oa);
    let oaoa = oa.dot(oa);

    let mut best: Option<f32> = None;
    let mut keep = |t: f32| {
        if t >= 0.0 && best.is_none_or(|current| t < current) {
            best = Some(t);
        }
    };

    // Cylinder body, skipped for degenerate segments and rays parallel to the axis.
    let qa = baba - bard * bard;
    if baba > f32::EPSILON && qa.abs() > f32::EPSILON {
        let qb = baba * rdoa - baoa * bard;
        let qc = baba * oaoa - baoa * baoa - radius * radius * baba;
        let h = qb * qb - qa * qc;
        if h >= 0.0 {
            let h = h.sqrt();
            for t in [(-qb - h) / qa, (-qb + h) / qa] {
                let y = baoa + t * bard;
                if y > 0.0 && y < baba {
                    keep(t);
                }
            }
        }
    }

    for cap in [a, b] {
        if let Some(t) = ray_sphere_hit_t(ray, cap, radius) {
            keep(t);
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn ray(origin: Vec3, direction: Vec3) -> Ray3d {
        Ray3d::new(origin, Dir3::new(direction).unwrap())
    }

    #[test]
    fn aabb_hit_from_outside_returns_entry_distance() {
        let t = ray_aabb_hit_t(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, Vec3::splat(-1.0), Vec3::ONE);
        assert_approx_eq!(t.unwrap(), 4.0);
    }

    #[test]
    fn aabb_behind_ray_is_missed() {
        let t = ray_aabb_hit_t(Vec3::new(0.0, 0.0, 5.0), Vec3::Z, Vec3::splat(-1.0), Vec3::ONE);
        assert!(t.is_none());
    }

    #[test]
    fn axis_parallel_ray_outside_slab_is_missed() {
        let t = ray_aabb_hit_t(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z, Vec3::splat(-1.0), Vec3::ONE);
        assert!(t.is_none());
    }

    #[test]
    fn obb_hit_respects_rotation() {
        let xf = Transform::from_xyz(0.0, 0.0, -3.0)
            .with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_4));
        let t = ray_hits_obb(&ray(Vec3::ZERO, Vec3::NEG_Z), &xf, Vec3::new(1.0, 1.0, 0.0));
        assert_approx_eq!(t.unwrap(), 3.0, 1e-4);
    }

    #[test]
    fn capsule_body_hit_from_the_side() {
        let r = ray(Vec3::new(0.5, 5.0, 0.0), Vec3::NEG_Y);
        let t = ray_capsule_hit_t(&r, Vec3::ZERO, Vec3::X, 0.25).unwrap();
        assert_approx_eq!(t, 4.75, 1e-4);
    }

    #[test]
    fn capsule_cap_hit_along_axis() {
        let r = ray(Vec3::new(-5.0, 0.0, 0.0), Vec3::X);
        let t = ray_capsule_hit_t(&r, Vec3::ZERO, Vec3::X, 0.5).unwrap();
        assert_approx_eq!(t, 4.5, 1e-4);
    }

    #[test]
    fn capsule_miss() {
        let r = ray(Vec3::new(0.5, 5.0, 2.0), Vec3::NEG_Y);
        assert!(ray_capsule_hit_t(&r, Vec3::ZERO, Vec3::X, 0.25).is_none());
    }
}
