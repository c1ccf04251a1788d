use crate::objects::ray::ray_hits_obb;
use crate::objects::registry::ObjectId;
use bevy::prelude::*;
use constants::panel::{
    MENU_OFFSET, MENU_PANEL_DEPTH, MENU_PANEL_SIZE, MENU_SCALE, MENU_TILT_RADIANS,
    MINIMAP_DISTANCE, MINIMAP_INCLINATION_DEGREES, MINIMAP_VERTICAL_OFFSET, MINIMAP_WIDTH,
};

/// Menu pose relative to the grip it is attached to.
pub fn menu_local_transform() -> Transform {
    Transform::from_translation(Vec3::from_array(MENU_OFFSET))
        .with_rotation(Quat::from_rotation_x(MENU_TILT_RADIANS))
        .with_scale(Vec3::splat(MENU_SCALE))
}

/// Ray-testable slab in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelSurface {
    pub transform: Transform,
    pub size: Vec3,
}

impl PanelSurface {
    pub fn ray_hit(&self, ray: &Ray3d) -> Option<f32> {
        ray_hits_obb(ray, &self.transform, self.size)
    }
}

/// Menu carried on the off-hand grip.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HandMenu {
    attached_slot: Option<usize>,
    visible: bool,
}

impl HandMenu {
    pub fn attached_slot(&self) -> Option<usize> {
        self.attached_slot
    }

    pub fn attach(&mut self, slot: usize) {
        self.attached_slot = Some(slot);
    }

    pub fn detach(&mut self) {
        self.attached_slot = None;
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Flip visibility, returning the new value.
    pub fn toggle(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    /// World surface of the menu for a given grip pose. `None` while hidden.
    pub fn surface(&self, grip: &Transform) -> Option<PanelSurface> {
        if !self.visible {
            return None;
        }
        Some(PanelSurface {
            transform: grip.mul_transform(menu_local_transform()),
            size: Vec3::new(MENU_PANEL_SIZE, MENU_PANEL_SIZE, MENU_PANEL_DEPTH),
        })
    }
}

/// Mark drawn on the minimap board, in board coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum MinimapIcon {
    Flag { at: Vec2, color: Color },
    Line { points: Vec<Vec2>, color: Color },
}

/// Floating minimap board placed in front of the player on request.
///
/// Board coordinates are metres on the board face, centred on it, with +y
/// pointing toward terrain -z.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct MinimapPanel {
    pub visible: bool,
    pub transform: Transform,
    pub scale: f32,
    terrain_min: Vec2,
    terrain_max: Vec2,
    icons: Vec<(ObjectId, MinimapIcon)>,
    user_icon: Vec2,
}

impl Default for MinimapPanel {
    fn default() -> Self {
        Self {
            visible: false,
            transform: Transform::IDENTITY,
            scale: 1.0,
            terrain_min: Vec2::splat(-0.5),
            terrain_max: Vec2::splat(0.5),
            icons: Vec::new(),
            user_icon: Vec2::ZERO,
        }
    }
}

impl MinimapPanel {
    /// Move the board in front of the head, tilted back toward the viewer, and
    /// flip its visibility. `user` is the player in terrain space. Returns the
    /// new visibility.
    pub fn reposition(&mut self, head: &Transform, user: Vec3) -> bool {
        let mut facing = *head.forward();
        facing.y = 0.0;
        let facing = facing.try_normalize().unwrap_or(Vec3::NEG_Z);

        let mut position = head.translation + facing * MINIMAP_DISTANCE;
        position.y = head.translation.y + MINIMAP_VERTICAL_OFFSET;

        let yaw = -facing.z.atan2(facing.x) - std::f32::consts::FRAC_PI_2;
        let pitch = -MINIMAP_INCLINATION_DEGREES.to_radians();

        self.transform = Transform::from_translation(position)
            .with_rotation(Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0))
            .with_scale(Vec3::splat(self.scale));
        self.update_user_icon(user);
        self.visible = !self.visible;
        self.visible
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
        self.transform.scale = Vec3::splat(scale);
    }

    /// Terrain footprint (x/z corners) the board maps onto.
    pub fn fit_terrain(&mut self, min: Vec2, max: Vec2) {
        self.terrain_min = min;
        self.terrain_max = max;
    }

    /// Board extent: fixed width, height following the terrain aspect ratio.
    pub fn board_size(&self) -> Vec2 {
        let extent = self.terrain_max - self.terrain_min;
        if extent.x <= 0.0 {
            return Vec2::splat(MINIMAP_WIDTH);
        }
        Vec2::new(MINIMAP_WIDTH, MINIMAP_WIDTH * extent.y / extent.x)
    }

    /// Terrain-space point to board coordinates.
    pub fn terrain_to_board(&self, point: Vec3) -> Vec2 {
        let extent = (self.terrain_max - self.terrain_min).max(Vec2::splat(f32::EPSILON));
        let centre = (self.terrain_min + self.terrain_max) * 0.5;
        let board = self.board_size();
        Vec2::new(
            (point.x - centre.x) / extent.x * board.x,
            -(point.z - centre.y) / extent.y * board.y,
        )
    }

    pub fn icons(&self) -> &[(ObjectId, MinimapIcon)] {
        &self.icons
    }

    pub fn user_icon(&self) -> Vec2 {
        self.user_icon
    }

    pub fn update_user_icon(&mut self, user: Vec3) {
        self.user_icon = self.terrain_to_board(user);
    }

    pub fn add_flag_icon(&mut self, id: ObjectId, position: Vec3, color: Color) {
        let at = self.terrain_to_board(position);
        self.icons.push((id, MinimapIcon::Flag { at, color }));
    }

    pub fn add_line_icon(&mut self, id: ObjectId, points: &[Vec3], color: Color) {
        let points = points.iter().map(|p| self.terrain_to_board(*p)).collect();
        self.icons.push((id, MinimapIcon::Line { points, color }));
    }

    /// Drop the icon of a removed object. Returns `false` if it had none.
    pub fn remove_icon(&mut self, id: ObjectId) -> bool {
        let before = self.icons.len();
        self.icons.retain(|(icon_id, _)| *icon_id != id);
        self.icons.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn hidden_menu_has_no_surface() {
        let menu = HandMenu::default();
        assert!(menu.surface(&Transform::IDENTITY).is_none());
    }

    #[test]
    fn visible_menu_blocks_rays_through_its_face() {
        let mut menu = HandMenu::default();
        menu.attach(1);
        menu.toggle();
        let surface = menu.surface(&Transform::IDENTITY).unwrap();

        let center = surface.transform.translation;
        let ray = Ray3d::new(center + Vec3::new(0.0, 0.0, 1.0), Dir3::NEG_Z);
        assert!(surface.ray_hit(&ray).is_some());

        let aside = Ray3d::new(center + Vec3::new(2.0, 0.0, 1.0), Dir3::NEG_Z);
        assert!(surface.ray_hit(&aside).is_none());
    }

    #[test]
    fn minimap_sits_in_front_and_below_the_head() {
        let mut panel = MinimapPanel::default();
        let head = Transform::from_xyz(0.0, 1.7, 0.0);

        assert!(panel.reposition(&head, Vec3::ZERO));
        assert_approx_eq!(panel.transform.translation.z, -MINIMAP_DISTANCE, 1e-5);
        assert_approx_eq!(panel.transform.translation.y, 1.7 + MINIMAP_VERTICAL_OFFSET, 1e-5);

        // Facing -Z means no yaw; the board normal leans up toward the viewer.
        let normal = panel.transform.rotation * Vec3::Z;
        assert!(normal.z > 0.9);
        assert!(normal.y > 0.0);

        assert!(!panel.reposition(&head, Vec3::ZERO));
    }

    fn fitted_panel() -> MinimapPanel {
        let mut panel = MinimapPanel::default();
        // 200 x 100 terrain centred on the origin.
        panel.fit_terrain(Vec2::new(-100.0, -50.0), Vec2::new(100.0, 50.0));
        panel
    }

    #[test]
    fn board_follows_the_terrain_aspect_ratio() {
        let panel = fitted_panel();
        let size = panel.board_size();
        assert_approx_eq!(size.x, MINIMAP_WIDTH, 1e-6);
        assert_approx_eq!(size.y, MINIMAP_WIDTH * 0.5, 1e-6);

        let corner = panel.terrain_to_board(Vec3::new(100.0, 7.0, -50.0));
        assert_approx_eq!(corner.x, size.x * 0.5, 1e-5);
        assert_approx_eq!(corner.y, size.y * 0.5, 1e-5);
    }

    #[test]
    fn flag_and_line_icons_land_at_their_terrain_positions() {
        let mut panel = fitted_panel();
        panel.add_flag_icon(ObjectId(1), Vec3::new(50.0, 0.0, 0.0), Color::WHITE);
        panel.add_line_icon(
            ObjectId(2),
            &[Vec3::ZERO, Vec3::new(0.0, 0.0, 25.0)],
            Color::BLACK,
        );

        let icons = panel.icons();
        assert_eq!(icons.len(), 2);
        let MinimapIcon::Flag { at, .. } = &icons[0].1 else {
            panic!("expected a flag icon");
        };
        assert_approx_eq!(at.x, MINIMAP_WIDTH * 0.25, 1e-5);
        let MinimapIcon::Line { points, .. } = &icons[1].1 else {
            panic!("expected a line icon");
        };
        assert_eq!(points.len(), 2);
        assert!(points[1].y < 0.0);
    }

    #[test]
    fn removing_an_icon_leaves_the_others() {
        let mut panel = fitted_panel();
        panel.add_flag_icon(ObjectId(1), Vec3::ZERO, Color::WHITE);
        panel.add_flag_icon(ObjectId(2), Vec3::X, Color::WHITE);

        assert!(panel.remove_icon(ObjectId(1)));
        assert!(!panel.remove_icon(ObjectId(1)));
        assert_eq!(panel.icons().len(), 1);
        assert_eq!(panel.icons()[0].0, ObjectId(2));
    }

    #[test]
    fn reposition_moves_the_user_icon() {
        let mut panel = fitted_panel();
        panel.reposition(&Transform::IDENTITY, Vec3::new(-100.0, 0.0, 0.0));
        assert_approx_eq!(panel.user_icon().x, -MINIMAP_WIDTH * 0.5, 1e-5);
        assert_approx_eq!(panel.user_icon().y, 0.0, 1e-5);
    }
}
