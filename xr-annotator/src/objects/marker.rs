use crate::objects::ray::ray_aabb_hit_t;
use bevy::prelude::*;
use constants::render_settings::{MARKER_HEIGHT, MARKER_HIT_HALF_EXTENTS};

/// Template for the next marker to be placed.
///
/// Each call to [`MarkerPrototype::instantiate`] yields a marker that owns its
/// own copy of every property, so later edits to the prototype or to other
/// markers never leak into placed ones.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerPrototype {
    color: Color,
    height: f32,
}

impl MarkerPrototype {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            height: MARKER_HEIGHT,
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn instantiate(&self, position: Vec3) -> Marker {
        Marker {
            position,
            color: self.color,
            height: self.height,
        }
    }
}

/// Flag planted on the terrain.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    position: Vec3,
    color: Color,
    height: f32,
}

impl Marker {
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Box around the pole and cloth, resting on the marker foot.
    pub fn hit_bounds(&self) -> (Vec3, Vec3) {
        let half = Vec3::from_array(MARKER_HIT_HALF_EXTENTS);
        let center = self.position + Vec3::Y * half.y;
        (center - half, center + half)
    }

    pub fn ray_hit(&self, ray: &Ray3d) -> Option<f32> {
        let (min, max) = self.hit_bounds();
        ray_aabb_hit_t(ray.origin, *ray.direction, min, max)
    }
}

/// Translucent preview shown where the next marker would land.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarkerPlaceholder {
    pub visible: bool,
    pub position: Vec3,
}

impl MarkerPlaceholder {
    pub fn show_at(&mut self, position: Vec3) {
        self.visible = true;
        self.position = position;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn instances_do_not_share_colour_with_prototype() {
        let mut prototype = MarkerPrototype::new(Color::srgb(1.0, 0.0, 0.0));
        let first = prototype.instantiate(Vec3::ZERO);
        prototype.set_color(Color::srgb(0.0, 0.0, 1.0));
        let second = prototype.instantiate(Vec3::X);

        assert_eq!(first.color(), Color::srgb(1.0, 0.0, 0.0));
        assert_eq!(second.color(), Color::srgb(0.0, 0.0, 1.0));
    }

    #[test]
    fn hit_box_sits_on_the_marker_foot() {
        let marker = MarkerPrototype::new(Color::WHITE).instantiate(Vec3::new(2.0, 5.0, 2.0));
        let (min, max) = marker.hit_bounds();
        assert_approx_eq!(min.y, 5.0, 1e-5);
        assert!(max.y > 5.0);

        let down = Ray3d::new(Vec3::new(2.0, 20.0, 2.0), Dir3::NEG_Y);
        assert!(marker.ray_hit(&down).is_some());
    }
}
