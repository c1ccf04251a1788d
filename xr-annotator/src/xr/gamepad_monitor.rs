use bevy::prelude::*;
use constants::input::{
    AXES_DEAD_ZONE, GAMEPAD_BUTTON_SLOTS, HOLD_REPEAT_INTERVAL, HOLD_THRESHOLD, THUMBSTICK_X_AXIS,
    THUMBSTICK_Y_AXIS,
};
use serde::{Deserialize, Serialize};

/// Physical side of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    #[default]
    Right,
}

impl Handedness {
    pub fn opposite(self) -> Self {
        match self {
            Handedness::Left => Handedness::Right,
            Handedness::Right => Handedness::Left,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Handedness::Left => "left",
            Handedness::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonName {
    Trigger,
    Grip,
    Joystick,
    ButtonX,
    ButtonY,
    ButtonA,
    ButtonB,
}

const LEFT_BUTTONS: [Option<ButtonName>; GAMEPAD_BUTTON_SLOTS] = [
    Some(ButtonName::Trigger),
    Some(ButtonName::Grip),
    None,
    Some(ButtonName::Joystick),
    Some(ButtonName::ButtonX),
    Some(ButtonName::ButtonY),
    None,
    None,
];

const RIGHT_BUTTONS: [Option<ButtonName>; GAMEPAD_BUTTON_SLOTS] = [
    Some(ButtonName::Trigger),
    Some(ButtonName::Grip),
    None,
    Some(ButtonName::Joystick),
    Some(ButtonName::ButtonA),
    Some(ButtonName::ButtonB),
    None,
    None,
];

/// Name of the button in `slot` for the given hand, if the slot is mapped.
pub fn button_name(handedness: Handedness, slot: usize) -> Option<ButtonName> {
    let table = match handedness {
        Handedness::Left => &LEFT_BUTTONS,
        Handedness::Right => &RIGHT_BUTTONS,
    };
    table.get(slot).copied().flatten()
}

fn button_slot(handedness: Handedness, button: ButtonName) -> Option<usize> {
    (0..GAMEPAD_BUTTON_SLOTS).find(|slot| button_name(handedness, *slot) == Some(button))
}

/// Discrete stick direction. Forward is negative Y, as reported by XR sticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StickDirection {
    Forward,
    Backward,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StickAxis {
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonitorEvent {
    ButtonDown { button: ButtonName, index: usize },
    ButtonUp { button: ButtonName, index: usize },
    AxisChanged { position: Vec2, delta: f32 },
    AxisDown { direction: StickDirection, position: Vec2 },
    AxisUp { direction: StickDirection, position: Vec2 },
    AxisHeld { axis: StickAxis, value: f32 },
}

/// One frame of raw controller data as delivered by the device session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGamepadSample {
    #[serde(default)]
    pub buttons: Vec<bool>,
    #[serde(default)]
    pub axes: Vec<f32>,
}

/// Zero inside the dead zone, otherwise shifted toward zero by the zone width.
pub fn apply_dead_zone(value: f32) -> f32 {
    if value.abs() < AXES_DEAD_ZONE {
        0.0
    } else {
        value - AXES_DEAD_ZONE * value.signum()
    }
}

fn classify(raw: f32, negative: StickDirection, positive: StickDirection) -> Option<StickDirection> {
    if raw.abs() <= HOLD_THRESHOLD {
        None
    } else if raw < 0.0 {
        Some(negative)
    } else {
        Some(positive)
    }
}

/// Turns per-frame samples of one hand into edge-triggered events.
#[derive(Debug, Clone)]
pub struct GamepadMonitor {
    handedness: Handedness,
    buttons: Option<Vec<bool>>,
    stick: Vec2,
    stick_raw: Vec2,
    x_direction: Option<StickDirection>,
    y_direction: Option<StickDirection>,
    hold_timer: f32,
}

impl GamepadMonitor {
    pub fn new(handedness: Handedness) -> Self {
        Self {
            handedness,
            buttons: None,
            stick: Vec2::ZERO,
            stick_raw: Vec2::ZERO,
            x_direction: None,
            y_direction: None,
            hold_timer: 0.0,
        }
    }

    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    /// Dead-zone filtered stick position.
    #[cfg(test)]
    pub fn stick_position(&self) -> Vec2 {
        self.stick
    }

    pub fn is_down(&self, button: ButtonName) -> bool {
        let Some(state) = self.buttons.as_ref() else {
            return false;
        };
        button_slot(self.handedness, button)
            .and_then(|slot| state.get(slot).copied())
            .unwrap_or(false)
    }

    /// Poll one frame. A missing sample means the hand has no input source this
    /// frame and yields nothing.
    pub fn update(&mut self, sample: Option<&RawGamepadSample>, delta: f32) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        let Some(sample) = sample else {
            return events;
        };
        self.poll_buttons(&sample.buttons, &mut events);
        self.poll_axes(&sample.axes, delta, &mut events);
        events
    }

    fn poll_buttons(&mut self, current: &[bool], events: &mut Vec<MonitorEvent>) {
        let Some(previous) = self.buttons.replace(current.to_vec()) else {
            // First frame only seeds state.
            return;
        };

        for (index, pressed) in current.iter().copied().enumerate() {
            let was_pressed = previous.get(index).copied().unwrap_or(false);
            if pressed == was_pressed {
                continue;
            }
            let Some(button) = button_name(self.handedness, index) else {
                continue;
            };
            events.push(if pressed {
                MonitorEvent::ButtonDown { button, index }
            } else {
                MonitorEvent::ButtonUp { button, index }
            });
        }
    }

    fn poll_axes(&mut self, axes: &[f32], delta: f32, events: &mut Vec<MonitorEvent>) {
        if axes.len() <= THUMBSTICK_Y_AXIS {
            return;
        }

        let raw = Vec2::new(axes[THUMBSTICK_X_AXIS], axes[THUMBSTICK_Y_AXIS]);
        let filtered = Vec2::new(apply_dead_zone(raw.x), apply_dead_zone(raw.y));
        let previous = self.stick;
        self.stick_raw = raw;
        self.stick = filtered;

        if previous != filtered {
            events.push(MonitorEvent::AxisChanged {
                position: filtered,
                delta,
            });
        }

        let y_direction = classify(raw.y, StickDirection::Forward, StickDirection::Backward);
        Self::emit_direction_edges(&mut self.y_direction, y_direction, filtered, events);
        let x_direction = classify(raw.x, StickDirection::Left, StickDirection::Right);
        Self::emit_direction_edges(&mut self.x_direction, x_direction, filtered, events);

        self.check_stick_holding(delta, events);
    }

    fn emit_direction_edges(
        state: &mut Option<StickDirection>,
        next: Option<StickDirection>,
        position: Vec2,
        events: &mut Vec<MonitorEvent>,
    ) {
        if *state == next {
            return;
        }
        if let Some(direction) = state.take() {
            events.push(MonitorEvent::AxisUp {
                direction,
                position,
            });
        }
        if let Some(direction) = next {
            events.push(MonitorEvent::AxisDown {
                direction,
                position,
            });
        }
        *state = next;
    }

    fn check_stick_holding(&mut self, delta: f32, events: &mut Vec<MonitorEvent>) {
        let mut ticked = false;
        if self.stick.length() > 0.0 && self.hold_timer <= 0.0 {
            if self.stick_raw.x.abs() > HOLD_THRESHOLD {
                events.push(MonitorEvent::AxisHeld {
                    axis: StickAxis::X,
                    value: self.stick.x,
                });
                ticked = true;
            }
            if self.stick_raw.y.abs() > HOLD_THRESHOLD {
                events.push(MonitorEvent::AxisHeld {
                    axis: StickAxis::Y,
                    value: self.stick.y,
                });
                ticked = true;
            }
        }

        if ticked {
            self.hold_timer = HOLD_REPEAT_INTERVAL;
        } else {
            self.hold_timer = (self.hold_timer - delta).max(0.0);
        }
    }
}
