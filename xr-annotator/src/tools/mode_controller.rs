use crate::engine::scene::terrain::{TerrainContainer, TerrainSurface};
use crate::objects::registry::{LineOutcome, ObjectId, SpatialObjectRegistry};
use crate::tools::interaction_mode::InteractionMode;
use crate::xr::hand_controller::{
    CastingSensor, HandSignal, HighlightLookup, SecondaryAction, SignalKind,
};
use bevy::prelude::*;
use constants::interaction::{ERASE_PULSE_INTENSITY, ERASE_PULSE_MILLIS, LINE_FLOAT_OFFSET};

/// Side effect of a hand signal that the mode controller cannot apply itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionEffect {
    /// Move the player feet to this world position.
    Teleport(Vec3),
    HapticPulse { intensity: f32, millis: u64 },
    ToggleMenu,
    RepositionPanel,
    ObjectsChanged,
    ObjectActivated(ObjectId),
}

/// What a mode switch did to the in-progress line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTransition {
    pub previous: InteractionMode,
    pub current: InteractionMode,
    pub line: LineOutcome,
}

impl ModeTransition {
    pub fn objects_changed(&self) -> bool {
        matches!(self.line, LineOutcome::Committed(_))
    }
}

/// Scene the mode handlers act on. Rays arrive in world space; the terrain and
/// the registry live in container space.
pub struct ModeScene<'a> {
    pub terrain: &'a dyn TerrainSurface,
    pub container: &'a TerrainContainer,
    pub registry: &'a mut SpatialObjectRegistry,
}

impl ModeScene<'_> {
    fn pointed_object(&self, world_ray: &Ray3d) -> Option<ObjectId> {
        let local = self.container.to_local_ray(world_ray);
        self.registry.nearest_hit(&local).map(|hit| hit.id)
    }
}

/// Highlight lookup for world rays against objects stored in container space.
pub struct ContainedObjects<'a> {
    pub registry: &'a SpatialObjectRegistry,
    pub container: &'a TerrainContainer,
}

impl HighlightLookup for ContainedObjects<'_> {
    fn highlighted_under(&self, ray: &Ray3d) -> Option<ObjectId> {
        let local = self.container.to_local_ray(ray);
        self.registry
            .nearest_hit(&local)
            .map(|hit| hit.id)
            .filter(|id| self.registry.is_highlighted(*id))
    }
}

/// Skilled-hand state sampled once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkilledFrame {
    pub hands_connected: bool,
    pub ray: Option<Ray3d>,
    pub trigger_held: bool,
}

/// Finite-state machine over [`InteractionMode`].
///
/// Previews are refreshed by [`update`](Self::update) every frame; commits come
/// in through [`handle_signal`](Self::handle_signal). Both only touch the
/// registry handed to them, so the same controller drives tests and the ECS.
#[derive(Resource, Debug, Clone, Default)]
pub struct InteractionModeController {
    mode: InteractionMode,
    erase_target: Option<ObjectId>,
    /// Orientation marker on the terrain, container space.
    area_marker: Option<(Vec3, Quat)>,
    /// Teleport preview, world space.
    navigation_marker: Option<Vec3>,
}

impl InteractionModeController {
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn erase_target(&self) -> Option<ObjectId> {
        self.erase_target
    }

    pub fn area_marker(&self) -> Option<(Vec3, Quat)> {
        self.area_marker
    }

    pub fn navigation_marker(&self) -> Option<Vec3> {
        self.navigation_marker
    }

    /// Switch mode, finalising whatever the previous mode left in flight.
    pub fn set_mode(
        &mut self,
        mode: InteractionMode,
        registry: &mut SpatialObjectRegistry,
    ) -> ModeTransition {
        registry.hide_marker_placeholder();
        let line = registry.finish_line();
        match line {
            LineOutcome::Committed(id) => info!("Polyline {} committed on mode change", id.0),
            LineOutcome::Discarded => info!("Discarded polyline with too few points"),
            LineOutcome::NoDraft => {}
        }

        self.erase_target = None;
        registry.clear_highlights();
        self.area_marker = None;
        self.navigation_marker = None;

        let previous = self.mode;
        self.mode = mode;
        info!("Interaction mode: {} -> {}", previous, mode);
        ModeTransition {
            previous,
            current: mode,
            line,
        }
    }

    /// Per-frame preview for the active mode.
    pub fn update(&mut self, frame: SkilledFrame, scene: &mut ModeScene) {
        self.area_marker = None;
        if !frame.hands_connected {
            return;
        }
        let Some(ray) = frame.ray else {
            return;
        };

        match self.mode {
            InteractionMode::Navigate => {}
            InteractionMode::AddPoint => {
                let local = scene.container.to_local_ray(&ray);
                match scene.terrain.intersect(&local) {
                    Some(hit) => scene.registry.show_marker_placeholder(hit.point),
                    None => scene.registry.hide_marker_placeholder(),
                }
            }
            InteractionMode::AddPolygon => self.project_polygon(&ray, scene),
            InteractionMode::Remove => self.project_erase(&ray, frame.trigger_held, scene),
        }
    }

    fn project_polygon(&mut self, ray: &Ray3d, scene: &mut ModeScene) {
        let local = scene.container.to_local_ray(ray);
        let Some(hit) = scene.terrain.intersect(&local) else {
            scene.registry.disable_draft_placeholder();
            return;
        };

        if scene.registry.has_draft() {
            scene.registry.enable_draft_placeholder();
            scene
                .registry
                .update_draft_placeholder(hit.point + Vec3::Y * LINE_FLOAT_OFFSET);
        } else {
            self.area_marker = Some((hit.point, Quat::from_rotation_arc(Vec3::Y, hit.normal)));
        }
    }

    fn project_erase(&mut self, ray: &Ray3d, trigger_held: bool, scene: &mut ModeScene) {
        if trigger_held {
            // Pointing away from the pinned object aborts the erase.
            if let Some(target) = self.erase_target {
                if scene.pointed_object(ray) != Some(target) {
                    scene.registry.set_highlight(target, false);
                    self.erase_target = None;
                }
            }
            return;
        }

        scene.registry.clear_highlights();
        if let Some(id) = scene.pointed_object(ray) {
            scene.registry.set_highlight(id, true);
        }
    }

    /// React to one hand signal. The signal's own mode stamp decides dispatch.
    pub fn handle_signal(
        &mut self,
        signal: &HandSignal,
        scene: &mut ModeScene,
    ) -> Vec<InteractionEffect> {
        let mut effects = Vec::new();

        match signal.kind {
            SignalKind::Casting {
                sensor: CastingSensor::Forward,
                ray,
            } if signal.skilled => {
                let local = scene.container.to_local_ray(&ray);
                self.navigation_marker = scene
                    .terrain
                    .intersect(&local)
                    .map(|hit| scene.container.to_world(hit.point));
            }
            SignalKind::Casting { .. } => {}
            SignalKind::RayCast {
                sensor: CastingSensor::Forward,
                ray,
            } => {
                if signal.skilled {
                    self.navigation_marker = None;
                    let local = scene.container.to_local_ray(&ray);
                    if let Some(hit) = scene.terrain.intersect(&local) {
                        effects.push(InteractionEffect::Teleport(
                            scene.container.to_world(hit.point),
                        ));
                    }
                }
            }
            SignalKind::RayCast {
                sensor: CastingSensor::Trigger,
                ray,
            } => self.cast_trigger(signal.mode, &ray, scene, &mut effects),
            SignalKind::TriggerDown { ray } => {
                if signal.mode == InteractionMode::Remove && signal.skilled {
                    self.erase_target = scene.pointed_object(&ray);
                }
            }
            SignalKind::TriggerUp { ray } => {
                if signal.mode == InteractionMode::Remove && signal.skilled {
                    self.cast_erase(&ray, scene, &mut effects);
                }
            }
            SignalKind::Secondary(action) => {
                if scene.registry.has_draft() {
                    if let LineOutcome::Committed(id) = scene.registry.finish_line() {
                        info!("Polyline {} committed", id.0);
                        effects.push(InteractionEffect::ObjectsChanged);
                    }
                } else {
                    effects.push(match action {
                        SecondaryAction::ToggleMenu => InteractionEffect::ToggleMenu,
                        SecondaryAction::RepositionPanel => InteractionEffect::RepositionPanel,
                    });
                }
            }
            SignalKind::Activate(id) => effects.push(InteractionEffect::ObjectActivated(id)),
        }

        effects
    }

    fn cast_trigger(
        &mut self,
        mode: InteractionMode,
        ray: &Ray3d,
        scene: &mut ModeScene,
        effects: &mut Vec<InteractionEffect>,
    ) {
        let local = scene.container.to_local_ray(ray);
        match mode {
            InteractionMode::AddPoint => {
                if let Some(hit) = scene.terrain.intersect(&local) {
                    let id = scene.registry.place_marker(hit.point);
                    scene.registry.clear_highlights();
                    info!("Marker {} placed at {:?}", id.0, hit.point);
                    effects.push(InteractionEffect::ObjectsChanged);
                }
            }
            InteractionMode::AddPolygon => {
                if let Some(hit) = scene.terrain.intersect(&local) {
                    scene
                        .registry
                        .append_line_point(hit.point + Vec3::Y * LINE_FLOAT_OFFSET);
                    scene.registry.disable_draft_placeholder();
                }
            }
            InteractionMode::Navigate | InteractionMode::Remove => {}
        }
    }

    fn cast_erase(
        &mut self,
        ray: &Ray3d,
        scene: &mut ModeScene,
        effects: &mut Vec<InteractionEffect>,
    ) {
        let Some(target) = self.erase_target.take() else {
            return;
        };

        if scene.pointed_object(ray) != Some(target) {
            scene.registry.set_highlight(target, false);
            return;
        }

        if let Some(removed) = scene.registry.remove(target) {
            info!("Removed {} {}", removed.kind.label(), target.0);
            effects.push(InteractionEffect::HapticPulse {
                intensity: ERASE_PULSE_INTENSITY,
                millis: ERASE_PULSE_MILLIS,
            });
            effects.push(InteractionEffect::ObjectsChanged);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::heightfield::Heightfield;
    use crate::objects::registry::PlacedKind;
    use crate::xr::gamepad_monitor::Handedness;
    use assert_approx_eq::assert_approx_eq;

    struct Fixture {
        terrain: Heightfield,
        container: TerrainContainer,
        registry: SpatialObjectRegistry,
        controller: InteractionModeController,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                terrain: Heightfield::flat(65, 65, 1.0, 0.0),
                container: TerrainContainer::default(),
                registry: SpatialObjectRegistry::new(Color::srgb(1.0, 0.0, 0.0)),
                controller: InteractionModeController::default(),
            }
        }

        fn set_mode(&mut self, mode: InteractionMode) -> ModeTransition {
            self.controller.set_mode(mode, &mut self.registry)
        }

        fn signal(&mut self, kind: SignalKind) -> Vec<InteractionEffect> {
            let signal = HandSignal {
                handedness: Handedness::Right,
                skilled: true,
                mode: self.controller.mode(),
                kind,
            };
            let mut scene = ModeScene {
                terrain: &self.terrain,
                container: &self.container,
                registry: &mut self.registry,
            };
            self.controller.handle_signal(&signal, &mut scene)
        }

        fn frame(&mut self, ray: Ray3d, trigger_held: bool) {
            let mut scene = ModeScene {
                terrain: &self.terrain,
                container: &self.container,
                registry: &mut self.registry,
            };
            let frame = SkilledFrame {
                hands_connected: true,
                ray: Some(ray),
                trigger_held,
            };
            self.controller.update(frame, &mut scene);
        }

        fn trigger_cast(&mut self, x: f32, z: f32) -> Vec<InteractionEffect> {
            self.signal(SignalKind::RayCast {
                sensor: CastingSensor::Trigger,
                ray: down_at(x, z),
            })
        }
    }

    fn down_at(x: f32, z: f32) -> Ray3d {
        Ray3d::new(Vec3::new(x, 20.0, z), Dir3::NEG_Y)
    }

    #[test]
    fn markers_and_polylines_end_to_end() {
        let mut fx = Fixture::new();
        fx.set_mode(InteractionMode::AddPoint);
        let effects = fx.trigger_cast(10.0, -5.0);
        assert_eq!(effects, vec![InteractionEffect::ObjectsChanged]);
        assert_eq!(fx.registry.len(), 1);
        let PlacedKind::Marker(marker) = &fx.registry.objects()[0].kind else {
            panic!("expected a marker");
        };
        let position = marker.position();
        assert_approx_eq!(position.x, 10.0, 1e-3);
        assert_approx_eq!(position.y, 0.0, 1e-3);
        assert_approx_eq!(position.z, -5.0, 1e-3);
        assert_eq!(marker.color(), fx.registry.active_color());

        fx.set_mode(InteractionMode::AddPolygon);
        for (x, z) in [(0.0, 0.0), (1.0, 0.0), (2.0, 1.0)] {
            assert!(fx.trigger_cast(x, z).is_empty());
        }
        let transition = fx.set_mode(InteractionMode::Navigate);
        assert!(transition.objects_changed());
        assert_eq!(fx.registry.len(), 2);
        assert!(!fx.registry.has_draft());

        let PlacedKind::Polyline(line) = &fx.registry.objects()[1].kind else {
            panic!("expected a polyline");
        };
        let expected = [
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(2.0, 1.0, 1.0),
        ];
        assert_eq!(line.len(), 3);
        for (point, expected) in line.points().iter().zip(expected) {
            assert!((*point - expected).length() < 1e-3);
        }
    }

    #[test]
    fn mode_change_discards_single_point_line() {
        let mut fx = Fixture::new();
        fx.set_mode(InteractionMode::AddPolygon);
        fx.trigger_cast(3.0, 3.0);
        assert!(fx.registry.has_draft());

        let transition = fx.set_mode(InteractionMode::AddPoint);
        assert_eq!(transition.line, LineOutcome::Discarded);
        assert!(fx.registry.is_empty());
        assert!(!fx.registry.has_draft());
    }

    #[test]
    fn mode_change_hides_marker_placeholder() {
        let mut fx = Fixture::new();
        fx.set_mode(InteractionMode::AddPoint);
        fx.frame(down_at(4.0, 4.0), false);
        assert!(fx.registry.marker_placeholder().visible);

        fx.set_mode(InteractionMode::Remove);
        assert!(!fx.registry.marker_placeholder().visible);
    }

    #[test]
    fn add_point_preview_follows_terrain_hits() {
        let mut fx = Fixture::new();
        fx.set_mode(InteractionMode::AddPoint);
        fx.frame(down_at(2.0, 2.0), false);
        assert!(fx.registry.marker_placeholder().visible);

        fx.frame(Ray3d::new(Vec3::new(2.0, 20.0, 2.0), Dir3::Y), false);
        assert!(!fx.registry.marker_placeholder().visible);
    }

    #[test]
    fn polygon_preview_shows_area_marker_until_a_line_starts() {
        let mut fx = Fixture::new();
        fx.set_mode(InteractionMode::AddPolygon);
        fx.frame(down_at(1.0, 1.0), false);
        let (position, rotation) = fx.controller.area_marker().unwrap();
        assert!((position - Vec3::new(1.0, 0.0, 1.0)).length() < 1e-3);
        assert!((rotation * Vec3::Y - Vec3::Y).length() < 1e-4);

        fx.trigger_cast(1.0, 1.0);
        fx.frame(down_at(5.0, 1.0), false);
        assert!(fx.controller.area_marker().is_none());
        let placeholder = fx.registry.draft().unwrap().placeholder();
        assert!(placeholder.enabled);
        assert_approx_eq!(placeholder.end.y, 1.0, 1e-3);
    }

    #[test]
    fn erase_removes_pinned_object_and_pulses() {
        let mut fx = Fixture::new();
        fx.set_mode(InteractionMode::AddPoint);
        fx.trigger_cast(0.0, 0.0);
        fx.set_mode(InteractionMode::Remove);

        let aim = Ray3d::new(Vec3::new(0.0, 0.5, 5.0), Dir3::NEG_Z);
        fx.frame(aim, false);
        let id = fx.registry.objects()[0].id;
        assert!(fx.registry.is_highlighted(id));

        fx.signal(SignalKind::TriggerDown { ray: aim });
        assert_eq!(fx.controller.erase_target(), Some(id));
        fx.frame(aim, true);

        let effects = fx.signal(SignalKind::TriggerUp { ray: aim });
        assert_eq!(
            effects,
            vec![
                InteractionEffect::HapticPulse {
                    intensity: ERASE_PULSE_INTENSITY,
                    millis: ERASE_PULSE_MILLIS,
                },
                InteractionEffect::ObjectsChanged,
            ]
        );
        assert!(fx.registry.is_empty());
    }

    #[test]
    fn pointing_away_while_held_aborts_erase() {
        let mut fx = Fixture::new();
        fx.set_mode(InteractionMode::AddPoint);
        fx.trigger_cast(0.0, 0.0);
        fx.set_mode(InteractionMode::Remove);

        let aim = Ray3d::new(Vec3::new(0.0, 0.5, 5.0), Dir3::NEG_Z);
        let away = Ray3d::new(Vec3::new(10.0, 0.5, 5.0), Dir3::NEG_Z);
        fx.frame(aim, false);
        fx.signal(SignalKind::TriggerDown { ray: aim });
        fx.frame(away, true);
        assert!(fx.controller.erase_target().is_none());
        assert!(fx.registry.highlighted().next().is_none());

        let effects = fx.signal(SignalKind::TriggerUp { ray: aim });
        assert!(effects.is_empty());
        assert_eq!(fx.registry.len(), 1);
    }

    #[test]
    fn forward_cast_teleports_in_any_mode() {
        let mut fx = Fixture::new();
        fx.container.set_scale(0.5);
        fx.set_mode(InteractionMode::Remove);

        let ray = Ray3d::new(Vec3::new(3.0, 10.0, 4.0), Dir3::NEG_Y);
        fx.signal(SignalKind::Casting {
            sensor: CastingSensor::Forward,
            ray,
        });
        assert!(fx.controller.navigation_marker().is_some());

        let effects = fx.signal(SignalKind::RayCast {
            sensor: CastingSensor::Forward,
            ray,
        });
        let [InteractionEffect::Teleport(target)] = effects.as_slice() else {
            panic!("expected a teleport, got {effects:?}");
        };
        assert!((*target - Vec3::new(3.0, 0.0, 4.0)).length() < 1e-3);
        assert!(fx.controller.navigation_marker().is_none());
    }

    #[test]
    fn secondary_finishes_line_before_panel_actions() {
        let mut fx = Fixture::new();
        fx.set_mode(InteractionMode::AddPolygon);
        fx.trigger_cast(0.0, 0.0);
        fx.trigger_cast(4.0, 0.0);

        let effects = fx.signal(SignalKind::Secondary(SecondaryAction::ToggleMenu));
        assert_eq!(effects, vec![InteractionEffect::ObjectsChanged]);
        assert_eq!(fx.registry.len(), 1);

        let effects = fx.signal(SignalKind::Secondary(SecondaryAction::RepositionPanel));
        assert_eq!(effects, vec![InteractionEffect::RepositionPanel]);
    }

    #[test]
    fn disconnected_hands_skip_previews() {
        let mut fx = Fixture::new();
        fx.set_mode(InteractionMode::AddPoint);
        let mut scene = ModeScene {
            terrain: &fx.terrain,
            container: &fx.container,
            registry: &mut fx.registry,
        };
        let frame = SkilledFrame {
            hands_connected: false,
            ray: Some(down_at(0.0, 0.0)),
            trigger_held: false,
        };
        fx.controller.update(frame, &mut scene);
        assert!(!fx.registry.marker_placeholder().visible);
    }
}
