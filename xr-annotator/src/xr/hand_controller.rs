use crate::objects::registry::ObjectId;
use crate::tools::interaction_mode::InteractionMode;
use crate::xr::gamepad_monitor::{
    ButtonName, GamepadMonitor, Handedness, MonitorEvent, RawGamepadSample, StickDirection,
};
use crate::xr::session::HapticPulseRequest;
use crate::xr::ui_panel::PanelSurface;
use bevy::prelude::*;

/// Which input started the current cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastingSensor {
    Forward,
    Trigger,
}

/// Mode-independent actions bound to the face buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecondaryAction {
    ToggleMenu,
    RepositionPanel,
}

/// Both hands share two outcomes across their face buttons.
const SECONDARY_ACTIONS: [(Handedness, ButtonName, SecondaryAction); 4] = [
    (Handedness::Right, ButtonName::ButtonA, SecondaryAction::ToggleMenu),
    (Handedness::Right, ButtonName::ButtonB, SecondaryAction::RepositionPanel),
    (Handedness::Left, ButtonName::ButtonX, SecondaryAction::ToggleMenu),
    (Handedness::Left, ButtonName::ButtonY, SecondaryAction::RepositionPanel),
];

pub fn secondary_action(handedness: Handedness, button: ButtonName) -> Option<SecondaryAction> {
    SECONDARY_ACTIONS
        .iter()
        .find(|(h, b, _)| *h == handedness && *b == button)
        .map(|(_, _, action)| *action)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalKind {
    TriggerDown { ray: Ray3d },
    TriggerUp { ray: Ray3d },
    /// Continuous preview while a cast is held.
    Casting { sensor: CastingSensor, ray: Ray3d },
    /// One-shot commit when the cast is released.
    RayCast { sensor: CastingSensor, ray: Ray3d },
    Secondary(SecondaryAction),
    Activate(ObjectId),
}

/// Notification from one hand, stamped with the mode at the time it fired.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct HandSignal {
    pub handedness: Handedness,
    pub skilled: bool,
    pub mode: InteractionMode,
    pub kind: SignalKind,
}

impl HandSignal {
    pub fn ray(&self) -> Option<Ray3d> {
        match self.kind {
            SignalKind::TriggerDown { ray }
            | SignalKind::TriggerUp { ray }
            | SignalKind::Casting { ray, .. }
            | SignalKind::RayCast { ray, .. } => Some(ray),
            SignalKind::Secondary(_) | SignalKind::Activate(_) => None,
        }
    }
}

/// Lookup of highlighted objects crossed by a ray.
pub trait HighlightLookup {
    fn highlighted_under(&self, ray: &Ray3d) -> Option<ObjectId>;
}

/// Per-frame inputs a hand needs from the rest of the scene. Rays passed to
/// `highlights` are in world space.
pub struct HandContext<'a> {
    pub mode: InteractionMode,
    pub panel: Option<PanelSurface>,
    pub highlights: &'a dyn HighlightLookup,
}

/// One physical controller.
#[derive(Debug, Clone)]
pub struct HandController {
    slot: usize,
    handedness: Option<Handedness>,
    connected: bool,
    skilled: bool,
    has_haptics: bool,
    monitor: Option<GamepadMonitor>,
    ray: Ray3d,
    grip: Transform,
    casting: Option<CastingSensor>,
}

impl HandController {
    pub fn new(slot: usize) -> Self {
        Self {
            slot,
            handedness: None,
            connected: false,
            skilled: false,
            has_haptics: false,
            monitor: None,
            ray: Ray3d::new(Vec3::ZERO, Dir3::NEG_Z),
            grip: Transform::IDENTITY,
            casting: None,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn handedness(&self) -> Option<Handedness> {
        self.handedness
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn skilled(&self) -> bool {
        self.skilled
    }

    pub fn set_skilled(&mut self, skilled: bool) {
        self.skilled = skilled;
    }

    pub fn ray(&self) -> Ray3d {
        self.ray
    }

    pub fn grip(&self) -> Transform {
        self.grip
    }

    pub fn casting(&self) -> Option<CastingSensor> {
        self.casting
    }

    pub fn is_down(&self, button: ButtonName) -> bool {
        self.monitor.as_ref().is_some_and(|m| m.is_down(button))
    }

    pub fn on_connected(&mut self, handedness: Handedness, has_haptics: bool) {
        self.connected = true;
        self.handedness = Some(handedness);
        self.has_haptics = has_haptics;
        self.monitor = Some(GamepadMonitor::new(handedness));
        self.casting = None;
    }

    /// Interaction state owned elsewhere (mode, draft line) is left alone.
    pub fn on_disconnected(&mut self) {
        self.connected = false;
        self.casting = None;
    }

    /// Refresh the world ray and grip from the latest poses.
    pub fn set_pose(&mut self, target_ray: &Transform, grip: &Transform) {
        let direction = Dir3::new(target_ray.rotation * Vec3::NEG_Z).unwrap_or(Dir3::NEG_Z);
        self.ray = Ray3d::new(target_ray.translation, direction);
        self.grip = *grip;
    }

    /// Vibration request, or `None` when the controller has no actuator.
    pub fn pulse(&self, intensity: f32, millis: u64) -> Option<HapticPulseRequest> {
        if !self.has_haptics || !self.connected {
            return None;
        }
        Some(HapticPulseRequest {
            handedness: self.handedness?,
            intensity: intensity.clamp(0.0, 1.0),
            millis,
        })
    }

    /// Poll the monitor and translate its events into hand signals.
    pub fn update(
        &mut self,
        sample: Option<&RawGamepadSample>,
        delta: f32,
        ctx: &HandContext,
    ) -> Vec<HandSignal> {
        let mut signals = Vec::new();
        let (Some(handedness), true) = (self.handedness, self.connected) else {
            return signals;
        };
        let Some(monitor) = self.monitor.as_mut() else {
            return signals;
        };

        let events = monitor.update(sample, delta);
        let mut emit = |kind: SignalKind, skilled: bool| {
            signals.push(HandSignal {
                handedness,
                skilled,
                mode: ctx.mode,
                kind,
            });
        };

        for event in events {
            match event {
                MonitorEvent::ButtonDown {
                    button: ButtonName::Trigger,
                    ..
                } => {
                    if !self.skilled {
                        continue;
                    }
                    if ctx.panel.is_some_and(|panel| panel.ray_hit(&self.ray).is_some()) {
                        continue;
                    }
                    if let Some(id) = ctx.highlights.highlighted_under(&self.ray) {
                        emit(SignalKind::Activate(id), self.skilled);
                    }
                    self.casting = Some(CastingSensor::Trigger);
                    emit(SignalKind::TriggerDown { ray: self.ray }, self.skilled);
                }
                MonitorEvent::ButtonUp {
                    button: ButtonName::Trigger,
                    ..
                } => {
                    if !self.skilled {
                        continue;
                    }
                    if let Some(sensor) = self.casting.take() {
                        emit(
                            SignalKind::RayCast {
                                sensor,
                                ray: self.ray,
                            },
                            self.skilled,
                        );
                    }
                    emit(SignalKind::TriggerUp { ray: self.ray }, self.skilled);
                }
                MonitorEvent::ButtonDown { button, .. } => {
                    if let Some(action) = secondary_action(handedness, button) {
                        emit(SignalKind::Secondary(action), self.skilled);
                    }
                }
                MonitorEvent::AxisDown {
                    direction: StickDirection::Forward,
                    ..
                } => {
                    self.casting = Some(CastingSensor::Forward);
                }
                MonitorEvent::AxisUp {
                    direction: StickDirection::Forward,
                    ..
                } => {
                    if let Some(sensor) = self.casting.take() {
                        emit(
                            SignalKind::RayCast {
                                sensor,
                                ray: self.ray,
                            },
                            self.skilled,
                        );
                    }
                }
                _ => {}
            }
        }

        if let Some(sensor) = self.casting {
            emit(
                SignalKind::Casting {
                    sensor,
                    ray: self.ray,
                },
                self.skilled,
            );
        }

        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xr::ui_panel::HandMenu;
    use constants::input::GAMEPAD_BUTTON_SLOTS;

    struct NoHighlights;

    impl HighlightLookup for NoHighlights {
        fn highlighted_under(&self, _ray: &Ray3d) -> Option<ObjectId> {
            None
        }
    }

    fn sample(pressed: &[usize], stick_y: f32) -> RawGamepadSample {
        let mut buttons = vec![false; GAMEPAD_BUTTON_SLOTS];
        for idx in pressed {
            buttons[*idx] = true;
        }
        RawGamepadSample {
            buttons,
            axes: vec![0.0, 0.0, 0.0, stick_y],
        }
    }

    fn ctx(highlights: &dyn HighlightLookup) -> HandContext<'_> {
        HandContext {
            mode: InteractionMode::AddPoint,
            panel: None,
            highlights,
        }
    }

    fn connected_hand(handedness: Handedness, skilled: bool) -> HandController {
        let mut hand = HandController::new(0);
        hand.on_connected(handedness, true);
        hand.set_skilled(skilled);
        hand
    }

    fn kinds(signals: &[HandSignal]) -> Vec<SignalKind> {
        signals.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn trigger_press_and_release_casts_once() {
        let mut hand = connected_hand(Handedness::Right, true);
        let none = NoHighlights;
        hand.update(Some(&sample(&[], 0.0)), 0.016, &ctx(&none));

        let down = hand.update(Some(&sample(&[0], 0.0)), 0.016, &ctx(&none));
        let ray = hand.ray();
        assert_eq!(
            kinds(&down),
            vec![
                SignalKind::TriggerDown { ray },
                SignalKind::Casting {
                    sensor: CastingSensor::Trigger,
                    ray
                }
            ]
        );

        let up = hand.update(Some(&sample(&[], 0.0)), 0.016, &ctx(&none));
        assert_eq!(
            kinds(&up),
            vec![
                SignalKind::RayCast {
                    sensor: CastingSensor::Trigger,
                    ray
                },
                SignalKind::TriggerUp { ray }
            ]
        );
        assert!(hand.casting().is_none());
    }

    #[test]
    fn unskilled_trigger_is_ignored() {
        let mut hand = connected_hand(Handedness::Left, false);
        let none = NoHighlights;
        hand.update(Some(&sample(&[], 0.0)), 0.016, &ctx(&none));
        assert!(hand.update(Some(&sample(&[0], 0.0)), 0.016, &ctx(&none)).is_empty());
        assert!(hand.update(Some(&sample(&[], 0.0)), 0.016, &ctx(&none)).is_empty());
    }

    #[test]
    fn trigger_on_visible_panel_is_swallowed() {
        let mut hand = connected_hand(Handedness::Right, true);
        let none = NoHighlights;
        let mut menu = HandMenu::default();
        menu.attach(1);
        menu.toggle();
        let grip = Transform::from_xyz(0.0, 0.0, -2.0);
        let panel = menu.surface(&grip);
        let center = panel.unwrap().transform.translation;
        hand.set_pose(&Transform::from_xyz(center.x, center.y, 0.0), &Transform::IDENTITY);

        let context = HandContext {
            mode: InteractionMode::AddPoint,
            panel,
            highlights: &none,
        };
        hand.update(Some(&sample(&[], 0.0)), 0.016, &context);
        let signals = hand.update(Some(&sample(&[0], 0.0)), 0.016, &context);
        assert!(signals.is_empty());
        assert!(hand.casting().is_none());
    }

    #[test]
    fn highlighted_object_is_activated_before_casting() {
        struct Always;
        impl HighlightLookup for Always {
            fn highlighted_under(&self, _ray: &Ray3d) -> Option<ObjectId> {
                Some(ObjectId(7))
            }
        }

        let mut hand = connected_hand(Handedness::Right, true);
        let always = Always;
        hand.update(Some(&sample(&[], 0.0)), 0.016, &ctx(&always));
        let signals = hand.update(Some(&sample(&[0], 0.0)), 0.016, &ctx(&always));
        assert_eq!(signals[0].kind, SignalKind::Activate(ObjectId(7)));
        assert!(matches!(signals[1].kind, SignalKind::TriggerDown { .. }));
    }

    #[test]
    fn forward_stick_casts_for_any_hand() {
        let mut hand = connected_hand(Handedness::Left, false);
        let none = NoHighlights;
        hand.update(Some(&sample(&[], 0.0)), 0.016, &ctx(&none));

        let held = hand.update(Some(&sample(&[], -0.9)), 0.016, &ctx(&none));
        assert!(matches!(
            held[0].kind,
            SignalKind::Casting {
                sensor: CastingSensor::Forward,
                ..
            }
        ));

        let released = hand.update(Some(&sample(&[], 0.0)), 0.016, &ctx(&none));
        assert_eq!(released.len(), 1);
        assert!(matches!(
            released[0].kind,
            SignalKind::RayCast {
                sensor: CastingSensor::Forward,
                ..
            }
        ));
        assert!(!released[0].skilled);
    }

    #[test]
    fn face_buttons_map_to_two_actions_per_hand() {
        let mut right = connected_hand(Handedness::Right, true);
        let none = NoHighlights;
        right.update(Some(&sample(&[], 0.0)), 0.016, &ctx(&none));
        let signals = right.update(Some(&sample(&[4, 5], 0.0)), 0.016, &ctx(&none));
        assert_eq!(
            kinds(&signals),
            vec![
                SignalKind::Secondary(SecondaryAction::ToggleMenu),
                SignalKind::Secondary(SecondaryAction::RepositionPanel)
            ]
        );

        assert_eq!(
            secondary_action(Handedness::Left, ButtonName::ButtonX),
            Some(SecondaryAction::ToggleMenu)
        );
        assert_eq!(secondary_action(Handedness::Left, ButtonName::ButtonA), None);
    }

    #[test]
    fn ray_follows_pose() {
        let mut hand = HandController::new(0);
        let pose = Transform::from_xyz(1.0, 2.0, 3.0)
            .with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        hand.set_pose(&pose, &Transform::IDENTITY);
        assert_eq!(hand.ray().origin, Vec3::new(1.0, 2.0, 3.0));
        assert!((*hand.ray().direction - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn pulse_needs_an_actuator() {
        let mut hand = HandController::new(0);
        hand.on_connected(Handedness::Right, false);
        assert!(hand.pulse(0.7, 200).is_none());

        hand.on_connected(Handedness::Right, true);
        let pulse = hand.pulse(0.7, 200).unwrap();
        assert_eq!(pulse.millis, 200);
    }

    #[test]
    fn disconnect_drops_casting_only() {
        let mut hand = connected_hand(Handedness::Right, true);
        let none = NoHighlights;
        hand.update(Some(&sample(&[], 0.0)), 0.016, &ctx(&none));
        hand.update(Some(&sample(&[0], 0.0)), 0.016, &ctx(&none));
        assert!(hand.casting().is_some());

        hand.on_disconnected();
        assert!(hand.casting().is_none());
        assert!(hand.skilled());
        assert!(hand.update(Some(&sample(&[], 0.0)), 0.016, &ctx(&none)).is_empty());
    }
}
