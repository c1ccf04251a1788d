//! Desktop and browser gamepad standing in for a pair of XR controllers.
//!
//! The left half of the pad is the left controller and the right half the
//! right controller. The D-pad turns the head so the pointers can be aimed.
use crate::xr::gamepad_monitor::{Handedness, RawGamepadSample};
use crate::xr::session::{
    ControllerFrame, HapticPulseRequest, PoseRecord, XrFrameReceived, XrInputFrame,
    XrInputSource, XrSessionStarted,
};
use bevy::input::gamepad::{GamepadRumbleIntensity, GamepadRumbleRequest};
use bevy::prelude::*;
use constants::input::{GAMEPAD_BUTTON_SLOTS, THUMBSTICK_X_AXIS, THUMBSTICK_Y_AXIS};
use std::time::Duration;

/// Pad buttons feeding xr-standard slots 0..6. Slot 2 (touchpad) is unused.
const RIGHT_PAD: [Option<GamepadButton>; 6] = [
    Some(GamepadButton::RightTrigger2),
    Some(GamepadButton::RightTrigger),
    None,
    Some(GamepadButton::RightThumb),
    Some(GamepadButton::South),
    Some(GamepadButton::East),
];

const LEFT_PAD: [Option<GamepadButton>; 6] = [
    Some(GamepadButton::LeftTrigger2),
    Some(GamepadButton::LeftTrigger),
    None,
    Some(GamepadButton::LeftThumb),
    Some(GamepadButton::West),
    Some(GamepadButton::North),
];

/// Hands hang below and in front of the head, tilted down a little.
const HAND_OFFSET: Vec3 = Vec3::new(0.2, -0.3, -0.3);
const HAND_PITCH: f32 = -0.35;
const TURN_SPEED: f32 = 1.5;

#[derive(Default)]
pub struct HeadAim {
    yaw: f32,
    pitch: f32,
}

/// Pack one half of the pad into an xr-standard sample. XR sticks report
/// forward as negative Y, pads as positive, so Y is inverted.
pub fn hand_sample(pressed: [bool; 6], stick: Vec2) -> RawGamepadSample {
    let mut buttons = vec![false; GAMEPAD_BUTTON_SLOTS];
    buttons[..pressed.len()].copy_from_slice(&pressed);

    let mut axes = vec![0.0; THUMBSTICK_Y_AXIS + 1];
    axes[THUMBSTICK_X_AXIS] = stick.x;
    axes[THUMBSTICK_Y_AXIS] = -stick.y;
    RawGamepadSample { buttons, axes }
}

fn read_half(gamepad: &Gamepad, layout: &[Option<GamepadButton>; 6]) -> [bool; 6] {
    let mut pressed = [false; 6];
    for (slot, button) in layout.iter().enumerate() {
        pressed[slot] = button.is_some_and(|b| gamepad.pressed(b));
    }
    pressed
}

fn hand_pose(head: &Transform, handedness: Handedness) -> PoseRecord {
    let side = match handedness {
        Handedness::Left => -1.0,
        Handedness::Right => 1.0,
    };
    let local = Transform::from_translation(HAND_OFFSET * Vec3::new(side, 1.0, 1.0))
        .with_rotation(Quat::from_rotation_x(HAND_PITCH));
    PoseRecord::from_transform(&head.mul_transform(local))
}

/// Turn the first connected gamepad into an input frame. Skipped while the
/// hosting page is forwarding real XR frames.
pub fn sample_gamepad_input(
    gamepads: Query<&Gamepad>,
    current: Res<XrInputFrame>,
    time: Res<Time>,
    mut aim: Local<HeadAim>,
    mut started: Local<bool>,
    mut frames: EventWriter<XrFrameReceived>,
    mut sessions: EventWriter<XrSessionStarted>,
) {
    if current.source == XrInputSource::Page {
        return;
    }
    let Some(gamepad) = gamepads.iter().next() else {
        return;
    };

    let turn = TURN_SPEED * time.delta_secs();
    if gamepad.pressed(GamepadButton::DPadLeft) {
        aim.yaw += turn;
    }
    if gamepad.pressed(GamepadButton::DPadRight) {
        aim.yaw -= turn;
    }
    if gamepad.pressed(GamepadButton::DPadUp) {
        aim.pitch = (aim.pitch + turn).min(1.2);
    }
    if gamepad.pressed(GamepadButton::DPadDown) {
        aim.pitch = (aim.pitch - turn).max(-1.2);
    }

    // Tracking space starts at the eyes, so the head stays at the origin.
    let head = Transform::from_rotation(Quat::from_euler(EulerRot::YXZ, aim.yaw, aim.pitch, 0.0));

    let controllers = [Handedness::Left, Handedness::Right].map(|handedness| {
        let (layout, stick) = match handedness {
            Handedness::Left => (&LEFT_PAD, gamepad.left_stick()),
            Handedness::Right => (&RIGHT_PAD, gamepad.right_stick()),
        };
        let pose = hand_pose(&head, handedness);
        Some(ControllerFrame {
            handedness,
            target_ray: pose,
            grip: pose,
            gamepad: hand_sample(read_half(gamepad, layout), stick),
            has_haptics: true,
        })
    });

    frames.write(XrFrameReceived(XrInputFrame {
        source: XrInputSource::Gamepad,
        head: PoseRecord::from_transform(&head),
        controllers,
    }));

    if !*started {
        *started = true;
        info!("Gamepad detected, starting session");
        sessions.write(XrSessionStarted);
    }
}

/// Haptic requests become rumble on the pad. Page-driven sessions are
/// notified over RPC instead.
pub fn rumble_haptic_pulses(
    mut requests: EventReader<HapticPulseRequest>,
    frame: Res<XrInputFrame>,
    gamepads: Query<Entity, With<Gamepad>>,
    mut rumble: EventWriter<GamepadRumbleRequest>,
) {
    for request in requests.read() {
        if frame.source != XrInputSource::Gamepad {
            continue;
        }
        let Some(gamepad) = gamepads.iter().next() else {
            continue;
        };
        rumble.write(GamepadRumbleRequest::Add {
            gamepad,
            duration: Duration::from_millis(request.millis),
            intensity: GamepadRumbleIntensity::strong_motor(request.intensity),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_half_maps_to_xr_standard_layout() {
        let sample = hand_sample([true, false, false, false, true, false], Vec2::new(0.5, 0.9));
        assert_eq!(sample.buttons.len(), GAMEPAD_BUTTON_SLOTS);
        assert!(sample.buttons[0] && sample.buttons[4]);
        assert!(!sample.buttons[5]);
        assert_eq!(sample.axes[THUMBSTICK_X_AXIS], 0.5);
        assert_eq!(sample.axes[THUMBSTICK_Y_AXIS], -0.9);
    }

    #[test]
    fn hands_sit_either_side_of_the_head() {
        let head = Transform::from_xyz(0.0, 1.6, 0.0);
        let left = hand_pose(&head, Handedness::Left).to_transform();
        let right = hand_pose(&head, Handedness::Right).to_transform();
        assert!(left.translation.x < 0.0 && right.translation.x > 0.0);
        assert!((left.translation.y - 1.3).abs() < 1e-5);
    }
}
