use crate::engine::core::app_state::AppState;
use crate::engine::player::{Player, PlayerMoved};
use crate::xr::gamepad_bridge::{rumble_haptic_pulses, sample_gamepad_input};
use crate::xr::session::{
    ConnectionTracker, HapticPulseRequest, XrControllerConnected, XrControllerDisconnected,
    XrFrameQueue, XrFrameReceived, XrInputFrame, XrSessionStarted,
};
use bevy::input::gamepad::GamepadRumbleRequest;
use bevy::prelude::*;

/// Ordering of the raw input stage relative to the interaction systems.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct XrInputSet;

pub struct XrInputPlugin;

impl Plugin for XrInputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<XrInputFrame>()
            .init_resource::<XrFrameQueue>()
            .init_resource::<ConnectionTracker>()
            .add_event::<XrFrameReceived>()
            .add_event::<XrSessionStarted>()
            .add_event::<XrControllerConnected>()
            .add_event::<XrControllerDisconnected>()
            .add_event::<HapticPulseRequest>()
            .add_event::<GamepadRumbleRequest>()
            .add_event::<PlayerMoved>()
            .add_systems(
                Update,
                (
                    sample_gamepad_input,
                    apply_input_frames,
                    track_controller_connections,
                    start_player_session,
                )
                    .chain()
                    .in_set(XrInputSet)
                    .run_if(in_state(AppState::Running)),
            )
            .add_systems(
                Update,
                rumble_haptic_pulses.run_if(in_state(AppState::Running)),
            );
    }
}

/// Queue every received frame for button polling and expose the newest one
/// for poses and connection tracking.
pub fn apply_input_frames(
    mut received: EventReader<XrFrameReceived>,
    mut queue: ResMut<XrFrameQueue>,
    mut frame: ResMut<XrInputFrame>,
) {
    let mut latest = None;
    for XrFrameReceived(sample) in received.read() {
        queue.push(sample.clone());
        latest = Some(sample);
    }
    if let Some(latest) = latest {
        *frame = latest.clone();
    }
}

pub fn track_controller_connections(
    frame: Res<XrInputFrame>,
    mut tracker: ResMut<ConnectionTracker>,
    mut connected: EventWriter<XrControllerConnected>,
    mut disconnected: EventWriter<XrControllerDisconnected>,
) {
    if !frame.is_changed() {
        return;
    }
    let (lost, found) = tracker.diff(&frame);
    for event in lost {
        info!("Controller slot {} disconnected", event.slot);
        disconnected.write(event);
    }
    for event in found {
        info!(
            "Controller slot {} connected ({})",
            event.slot,
            event.handedness.as_str()
        );
        connected.write(event);
    }
}

pub fn start_player_session(
    mut started: EventReader<XrSessionStarted>,
    player: Option<ResMut<Player>>,
    mut moved: EventWriter<PlayerMoved>,
) {
    if started.is_empty() {
        return;
    }
    started.clear();
    let Some(mut player) = player else {
        warn!("Session started before the player was created");
        return;
    };
    if player.session_started() {
        return;
    }
    match player.start_session() {
        Ok(event) => {
            println!("✓ XR session started");
            moved.write(event);
        }
        Err(e) => error!("Failed to start session: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xr::session::XrInputSource;
    use bevy::state::app::StatesPlugin;

    fn frame_from(source: XrInputSource) -> XrFrameReceived {
        XrFrameReceived(XrInputFrame {
            source,
            ..default()
        })
    }

    #[test]
    fn frames_between_updates_are_all_queued() {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin))
            .insert_state(AppState::Running)
            .add_plugins(XrInputPlugin);

        app.world_mut().send_event(frame_from(XrInputSource::Page));
        app.world_mut().send_event(frame_from(XrInputSource::Gamepad));
        app.update();

        let latest = app.world().resource::<XrInputFrame>().clone();
        assert_eq!(latest.source, XrInputSource::Gamepad);

        let mut queue = app.world_mut().resource_mut::<XrFrameQueue>();
        let drained: Vec<_> = queue.drain_or(&latest).iter().map(|f| f.source).collect();
        assert_eq!(drained, vec![XrInputSource::Page, XrInputSource::Gamepad]);

        // Nothing new: the latest frame is polled again.
        let again: Vec<_> = queue.drain_or(&latest).iter().map(|f| f.source).collect();
        assert_eq!(again, vec![XrInputSource::Gamepad]);
    }
}
