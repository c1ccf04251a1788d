use crate::engine::core::app_state::AppState;
use crate::engine::player::{Player, PlayerMoved};
use crate::engine::scene::terrain::{Terrain, TerrainContainer};
use crate::engine::settings::{SettingKey, Settings};
use crate::objects::export::ExportSnapshot;
use crate::objects::registry::{ObjectId, SpatialObjectRegistry};
use crate::tools::interaction_mode::InteractionMode;
use crate::tools::mode_controller::{
    ContainedObjects, InteractionEffect, InteractionModeController, ModeScene, SkilledFrame,
};
use crate::tools::palette::Palette;
use crate::xr::controllers_manager::ControllersManager;
use crate::xr::gamepad_monitor::{ButtonName, Handedness};
use crate::xr::hand_controller::{HandContext, HandSignal};
use crate::xr::input_plugin::XrInputSet;
use crate::xr::session::{
    HapticPulseRequest, XrControllerConnected, XrControllerDisconnected, XrFrameQueue,
    XrInputFrame,
};
use crate::xr::ui_panel::MinimapPanel;
use bevy::prelude::*;

/// Mode selection coming from the page or the hand menu.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ModeSelectRequest(pub InteractionMode);

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ColorSelectRequest(pub Color);

/// Recolour one committed object, typically after it was activated.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ObjectColorRequest {
    pub id: ObjectId,
    pub color: Color,
}

/// `None` flips the current handedness.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct HandednessToggleRequest(pub Option<Handedness>);

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct SettingChangeRequest {
    pub key: SettingKey,
    pub value: f32,
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ModeChanged(pub InteractionMode);

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ColorChanged(pub Color);

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct HandednessChanged(pub Handedness);

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct SettingChanged {
    pub key: SettingKey,
    pub value: f32,
}

/// Committed objects changed. Carries the full export snapshot.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct ObjectsChanged(pub ExportSnapshot);

/// A highlighted object was clicked with the trigger.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ObjectActivated(pub ObjectId);

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct MinimapToggled(pub bool);

/// Interaction stage, after raw input has been applied.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct InteractionSet;

pub struct InteractionPlugin;

impl Plugin for InteractionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<InteractionModeController>()
            .init_resource::<ControllersManager>()
            .init_resource::<SpatialObjectRegistry>()
            .init_resource::<TerrainContainer>()
            .init_resource::<MinimapPanel>()
            .init_resource::<Settings>()
            .init_resource::<Palette>()
            .add_event::<HandSignal>()
            .add_event::<ModeSelectRequest>()
            .add_event::<ColorSelectRequest>()
            .add_event::<ObjectColorRequest>()
            .add_event::<HandednessToggleRequest>()
            .add_event::<SettingChangeRequest>()
            .add_event::<ModeChanged>()
            .add_event::<ColorChanged>()
            .add_event::<HandednessChanged>()
            .add_event::<SettingChanged>()
            .add_event::<ObjectsChanged>()
            .add_event::<ObjectActivated>()
            .add_event::<MinimapToggled>()
            .add_event::<HapticPulseRequest>()
            .add_event::<PlayerMoved>()
            .add_systems(
                Update,
                (
                    handle_interaction_requests,
                    apply_setting_changes,
                    update_controllers,
                    dispatch_hand_signals,
                    update_mode_previews,
                )
                    .chain()
                    .in_set(InteractionSet)
                    .after(XrInputSet)
                    .run_if(in_state(AppState::Running)),
            );
    }
}

pub fn handle_interaction_requests(
    mut mode_requests: EventReader<ModeSelectRequest>,
    mut color_requests: EventReader<ColorSelectRequest>,
    mut object_colors: EventReader<ObjectColorRequest>,
    mut mode_controller: ResMut<InteractionModeController>,
    mut registry: ResMut<SpatialObjectRegistry>,
    mut mode_changed: EventWriter<ModeChanged>,
    mut color_changed: EventWriter<ColorChanged>,
    mut objects_changed: EventWriter<ObjectsChanged>,
) {
    for ModeSelectRequest(mode) in mode_requests.read() {
        let transition = mode_controller.set_mode(*mode, &mut registry);
        if transition.objects_changed() {
            objects_changed.write(ObjectsChanged(registry.export_snapshot()));
        }
        mode_changed.write(ModeChanged(transition.current));
    }

    for ColorSelectRequest(color) in color_requests.read() {
        registry.set_active_color(*color);
        color_changed.write(ColorChanged(*color));
    }

    for request in object_colors.read() {
        if registry.set_object_color(request.id, request.color) {
            objects_changed.write(ObjectsChanged(registry.export_snapshot()));
        } else {
            warn!("Cannot recolour unknown object {}", request.id.0);
        }
    }
}

/// Validate slider values and push them to whatever they drive. The sun
/// follows through change detection on [`Settings`].
pub fn apply_setting_changes(
    mut requests: EventReader<SettingChangeRequest>,
    mut settings: ResMut<Settings>,
    mut container: ResMut<TerrainContainer>,
    mut minimap: ResMut<MinimapPanel>,
    mut player: ResMut<Player>,
    mut changed: EventWriter<SettingChanged>,
    mut moved: EventWriter<PlayerMoved>,
) {
    for request in requests.read() {
        if let Err(e) = settings.set(request.key, request.value) {
            warn!("Rejected setting change: {}", e);
            continue;
        }

        match request.key {
            SettingKey::TerrainScale => container.set_scale(settings.terrain_scale_factor()),
            SettingKey::MinimapScale => minimap.set_scale(request.value),
            SettingKey::HeightOffset => match player.set_height_offset(request.value) {
                Ok(event) => {
                    moved.write(event);
                }
                // Applied on the next teleport once the session is live.
                Err(e) => debug!("Height offset stored: {}", e),
            },
            SettingKey::SunPhi | SettingKey::SunTheta => {}
        }
        changed.write(SettingChanged {
            key: request.key,
            value: request.value,
        });
    }
}

/// Connection edges, handedness swaps, poses and button polling for both hands.
/// Each queued frame is polled in arrival order so no button edge is skipped.
pub fn update_controllers(
    frame: Res<XrInputFrame>,
    mut queue: ResMut<XrFrameQueue>,
    time: Res<Time>,
    player: Res<Player>,
    mode_controller: Res<InteractionModeController>,
    registry: Res<SpatialObjectRegistry>,
    container: Res<TerrainContainer>,
    mut controllers: ResMut<ControllersManager>,
    mut connected: EventReader<XrControllerConnected>,
    mut disconnected: EventReader<XrControllerDisconnected>,
    mut toggles: EventReader<HandednessToggleRequest>,
    mut signals: EventWriter<HandSignal>,
    mut handedness_changed: EventWriter<HandednessChanged>,
) {
    for event in disconnected.read() {
        controllers.on_disconnected(event.slot);
    }
    for event in connected.read() {
        controllers.on_connected(event.slot, event.handedness, event.has_haptics);
    }
    for HandednessToggleRequest(requested) in toggles.read() {
        let handedness = controllers.toggle_handedness(*requested);
        handedness_changed.write(HandednessChanged(handedness));
    }

    let samples = queue.drain_or(&frame);
    let delta = time.delta_secs() / samples.len() as f32;
    let rig = player.rig_transform();
    let highlights = ContainedObjects {
        registry: &registry,
        container: &container,
    };

    for sample in &samples {
        controllers.refresh_poses(sample, &rig);
        let ctx = HandContext {
            mode: mode_controller.mode(),
            panel: controllers.menu_surface(),
            highlights: &highlights,
        };
        for signal in controllers.update(sample, delta, &ctx) {
            signals.write(signal);
        }
    }
}

/// Feed hand signals to the mode controller and apply what comes back.
pub fn dispatch_hand_signals(
    mut signals: EventReader<HandSignal>,
    terrain: Res<Terrain>,
    container: Res<TerrainContainer>,
    frame: Res<XrInputFrame>,
    mut mode_controller: ResMut<InteractionModeController>,
    mut registry: ResMut<SpatialObjectRegistry>,
    mut controllers: ResMut<ControllersManager>,
    mut player: ResMut<Player>,
    mut minimap: ResMut<MinimapPanel>,
    mut haptics: EventWriter<HapticPulseRequest>,
    mut moved: EventWriter<PlayerMoved>,
    mut objects_changed: EventWriter<ObjectsChanged>,
    mut activated: EventWriter<ObjectActivated>,
    mut minimap_toggled: EventWriter<MinimapToggled>,
) {
    for signal in signals.read() {
        let mut scene = ModeScene {
            terrain: &*terrain,
            container: &container,
            registry: &mut registry,
        };
        let effects = mode_controller.handle_signal(signal, &mut scene);

        for effect in effects {
            match effect {
                InteractionEffect::Teleport(target) => match player.teleport(Some(target)) {
                    Ok(event) => {
                        info!("Teleported to {:?}", target);
                        moved.write(event);
                    }
                    Err(e) => error!("Teleport failed: {}", e),
                },
                InteractionEffect::HapticPulse { intensity, millis } => {
                    if let Some(request) = controllers.pulse(signal.handedness, intensity, millis)
                    {
                        haptics.write(request);
                    }
                }
                InteractionEffect::ToggleMenu => {
                    controllers.menu_mut().toggle();
                }
                InteractionEffect::RepositionPanel => {
                    let head = player
                        .rig_transform()
                        .mul_transform(frame.head.to_transform());
                    let user = container.to_local(player.world_position());
                    let visible = minimap.reposition(&head, user);
                    minimap_toggled.write(MinimapToggled(visible));
                }
                InteractionEffect::ObjectsChanged => {
                    objects_changed.write(ObjectsChanged(registry.export_snapshot()));
                }
                InteractionEffect::ObjectActivated(id) => {
                    activated.write(ObjectActivated(id));
                }
            }
        }
    }
}

/// Per-frame previews driven by the skilled hand.
pub fn update_mode_previews(
    controllers: Res<ControllersManager>,
    terrain: Res<Terrain>,
    container: Res<TerrainContainer>,
    mut mode_controller: ResMut<InteractionModeController>,
    mut registry: ResMut<SpatialObjectRegistry>,
) {
    let skilled = controllers.skilled_hand();
    let frame = SkilledFrame {
        hands_connected: controllers.connected(),
        ray: skilled.map(|hand| hand.ray()),
        trigger_held: skilled.is_some_and(|hand| hand.is_down(ButtonName::Trigger)),
    };
    let mut scene = ModeScene {
        terrain: &*terrain,
        container: &container,
        registry: &mut registry,
    };
    mode_controller.update(frame, &mut scene);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::heightfield::Heightfield;
    use crate::objects::registry::PlacedKind;
    use crate::xr::gamepad_monitor::RawGamepadSample;
    use crate::xr::input_plugin::XrInputPlugin;
    use crate::xr::session::{ControllerFrame, PoseRecord, XrFrameReceived, XrInputSource};
    use assert_approx_eq::assert_approx_eq;
    use bevy::state::app::StatesPlugin;
    use constants::input::GAMEPAD_BUTTON_SLOTS;
    use std::f32::consts::FRAC_PI_2;

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin))
            .insert_state(AppState::Running)
            .add_plugins((XrInputPlugin, InteractionPlugin))
            .insert_resource(Terrain {
                field: Heightfield::flat(65, 65, 1.0, 0.0),
            })
            .insert_resource(SpatialObjectRegistry::new(Color::srgb(1.0, 0.0, 0.0)))
            .insert_resource(Player::default());
        app
    }

    /// Both hands hovering 20 m up at (10, -5), pointing straight down.
    fn pointing_down(trigger: bool) -> XrFrameReceived {
        let pose = PoseRecord::from_transform(
            &Transform::from_xyz(10.0, 20.0, -5.0).with_rotation(Quat::from_rotation_x(-FRAC_PI_2)),
        );
        let hand = |handedness, pressed| {
            let mut buttons = vec![false; GAMEPAD_BUTTON_SLOTS];
            buttons[0] = pressed;
            Some(ControllerFrame {
                handedness,
                target_ray: pose,
                grip: pose,
                gamepad: RawGamepadSample {
                    buttons,
                    axes: vec![0.0; 4],
                },
                has_haptics: true,
            })
        };
        XrFrameReceived(XrInputFrame {
            source: XrInputSource::Page,
            head: PoseRecord::default(),
            controllers: [hand(Handedness::Left, false), hand(Handedness::Right, trigger)],
        })
    }

    fn step(app: &mut App, frame: XrFrameReceived) {
        app.world_mut().send_event(frame);
        app.update();
    }

    #[test]
    fn trigger_click_places_marker_under_the_skilled_hand() {
        let mut app = test_app();
        app.world_mut()
            .send_event(ModeSelectRequest(InteractionMode::AddPoint));
        step(&mut app, pointing_down(false));
        assert!(app.world().resource::<ControllersManager>().connected());
        assert_eq!(
            app.world().resource::<InteractionModeController>().mode(),
            InteractionMode::AddPoint
        );

        step(&mut app, pointing_down(true));
        step(&mut app, pointing_down(false));

        let registry = app.world().resource::<SpatialObjectRegistry>();
        assert_eq!(registry.len(), 1);
        let PlacedKind::Marker(marker) = &registry.objects()[0].kind else {
            panic!("expected a marker");
        };
        assert_approx_eq!(marker.position().x, 10.0, 1e-3);
        assert_approx_eq!(marker.position().y, 0.0, 1e-3);
        assert_approx_eq!(marker.position().z, -5.0, 1e-3);
    }

    #[test]
    fn press_and_release_between_updates_still_place_a_marker() {
        let mut app = test_app();
        app.world_mut()
            .send_event(ModeSelectRequest(InteractionMode::AddPoint));
        step(&mut app, pointing_down(false));

        app.world_mut().send_event(pointing_down(true));
        app.world_mut().send_event(pointing_down(false));
        app.update();

        assert_eq!(app.world().resource::<SpatialObjectRegistry>().len(), 1);
    }

    #[test]
    fn recolouring_a_placed_marker_leaves_later_ones_alone() {
        let mut app = test_app();
        let (first, second) = {
            let mut registry = app.world_mut().resource_mut::<SpatialObjectRegistry>();
            (
                registry.place_marker(Vec3::ZERO),
                registry.place_marker(Vec3::X),
            )
        };
        let green = Color::srgb(0.0, 1.0, 0.0);
        app.world_mut().send_event(ObjectColorRequest {
            id: first,
            color: green,
        });
        app.update();

        let registry = app.world().resource::<SpatialObjectRegistry>();
        assert_eq!(registry.get(first).unwrap().color(), green);
        assert_eq!(
            registry.get(second).unwrap().color(),
            Color::srgb(1.0, 0.0, 0.0)
        );
    }

    #[test]
    fn out_of_range_setting_is_rejected() {
        let mut app = test_app();
        app.world_mut().send_event(SettingChangeRequest {
            key: SettingKey::MinimapScale,
            value: 9.0,
        });
        app.world_mut().send_event(SettingChangeRequest {
            key: SettingKey::TerrainScale,
            value: 50.0,
        });
        app.update();

        assert_eq!(app.world().resource::<Settings>().minimap_scale, 1.0);
        assert_approx_eq!(app.world().resource::<TerrainContainer>().scale(), 0.25, 1e-6);
    }

    #[test]
    fn handedness_toggle_moves_the_skill() {
        let mut app = test_app();
        step(&mut app, pointing_down(false));
        app.world_mut().send_event(HandednessToggleRequest(None));
        app.update();

        let controllers = app.world().resource::<ControllersManager>();
        assert_eq!(controllers.user_handedness(), Handedness::Left);
        assert!(controllers.left().unwrap().skilled());
    }
}
