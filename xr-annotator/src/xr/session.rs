use crate::xr::gamepad_monitor::{Handedness, RawGamepadSample};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub const CONTROLLER_SLOTS: usize = 2;

/// Position and orientation in tracking space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseRecord {
    pub position: [f32; 3],
    /// Quaternion as `[x, y, z, w]`.
    pub orientation: [f32; 4],
}

impl Default for PoseRecord {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            orientation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl PoseRecord {
    pub fn from_transform(transform: &Transform) -> Self {
        Self {
            position: transform.translation.to_array(),
            orientation: transform.rotation.to_array(),
        }
    }

    pub fn to_transform(&self) -> Transform {
        let rotation = Vec4::from_array(self.orientation)
            .try_normalize()
            .map(Quat::from_vec4)
            .unwrap_or(Quat::IDENTITY);
        Transform::from_translation(Vec3::from_array(self.position)).with_rotation(rotation)
    }
}

/// One controller as reported by the device session this frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerFrame {
    pub handedness: Handedness,
    #[serde(default)]
    pub target_ray: PoseRecord,
    #[serde(default)]
    pub grip: PoseRecord,
    #[serde(flatten)]
    pub gamepad: RawGamepadSample,
    #[serde(default)]
    pub has_haptics: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XrInputSource {
    #[default]
    None,
    /// Frames forwarded over RPC by the hosting page.
    Page,
    /// Local gamepad standing in for both hands.
    Gamepad,
}

/// Latest raw input for the head and both controller slots.
#[derive(Resource, Debug, Clone, Default)]
pub struct XrInputFrame {
    pub source: XrInputSource,
    pub head: PoseRecord,
    pub controllers: [Option<ControllerFrame>; CONTROLLER_SLOTS],
}

impl XrInputFrame {
    pub fn controller(&self, slot: usize) -> Option<&ControllerFrame> {
        self.controllers.get(slot).and_then(Option::as_ref)
    }
}

/// Wire shape of the `xr_input_frame` RPC parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XrInputFrameParams {
    #[serde(default)]
    pub head: PoseRecord,
    #[serde(default)]
    pub controllers: Vec<ControllerFrame>,
}

impl XrInputFrameParams {
    /// Place controllers in slots by order of arrival, dropping extras.
    pub fn into_frame(self, source: XrInputSource) -> XrInputFrame {
        let mut frame = XrInputFrame {
            source,
            head: self.head,
            controllers: Default::default(),
        };
        for (slot, controller) in self.controllers.into_iter().take(CONTROLLER_SLOTS).enumerate() {
            frame.controllers[slot] = Some(controller);
        }
        frame
    }
}

#[derive(Event, Debug, Clone)]
pub struct XrFrameReceived(pub XrInputFrame);

/// Every frame received since the controllers were last polled, oldest first.
/// The page can post several frames between two updates and each one may
/// carry a button edge.
#[derive(Resource, Debug, Default)]
pub struct XrFrameQueue(Vec<XrInputFrame>);

impl XrFrameQueue {
    pub fn push(&mut self, frame: XrInputFrame) {
        self.0.push(frame);
    }

    /// Take the queued frames, falling back to `latest` when nothing arrived
    /// so held buttons and casts still tick.
    pub fn drain_or(&mut self, latest: &XrInputFrame) -> Vec<XrInputFrame> {
        if self.0.is_empty() {
            vec![latest.clone()]
        } else {
            std::mem::take(&mut self.0)
        }
    }
}

#[derive(Event, Debug, Clone, Copy)]
pub struct XrSessionStarted;

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct XrControllerConnected {
    pub slot: usize,
    pub handedness: Handedness,
    pub has_haptics: bool,
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct XrControllerDisconnected {
    pub slot: usize,
}

/// Fire-and-forget vibration on one controller.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct HapticPulseRequest {
    pub handedness: Handedness,
    pub intensity: f32,
    pub millis: u64,
}

/// Slot occupancy seen on the previous frame.
#[derive(Resource, Debug, Default)]
pub struct ConnectionTracker {
    previous: [Option<Handedness>; CONTROLLER_SLOTS],
}

impl ConnectionTracker {
    /// Compare slot occupancy with the previous frame. Disconnections are
    /// reported before connections so a swapped slot is released first.
    pub fn diff(
        &mut self,
        frame: &XrInputFrame,
    ) -> (Vec<XrControllerDisconnected>, Vec<XrControllerConnected>) {
        let mut lost = Vec::new();
        let mut found = Vec::new();

        for slot in 0..CONTROLLER_SLOTS {
            let current = frame.controller(slot);
            let now = current.map(|c| c.handedness);
            if now == self.previous[slot] {
                continue;
            }
            if self.previous[slot].is_some() {
                lost.push(XrControllerDisconnected { slot });
            }
            if let Some(controller) = current {
                found.push(XrControllerConnected {
                    slot,
                    handedness: controller.handedness,
                    has_haptics: controller.has_haptics,
                });
            }
            self.previous[slot] = now;
        }

        (lost, found)
    }
}
