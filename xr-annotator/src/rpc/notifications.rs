use crate::engine::player::PlayerMoved;
use crate::rpc::web_rpc::WebRpcInterface;
use crate::tools::interaction_systems::{
    ColorChanged, HandednessChanged, MinimapToggled, ModeChanged, ObjectActivated,
    ObjectsChanged, SettingChanged,
};
use crate::tools::palette::color_to_hex;
use crate::xr::controllers_manager::ControllersManager;
use crate::xr::session::{HapticPulseRequest, XrInputFrame, XrInputSource};
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use serde_json::json;

#[derive(SystemParam)]
pub struct InteractionNotices<'w, 's> {
    modes: EventReader<'w, 's, ModeChanged>,
    colors: EventReader<'w, 's, ColorChanged>,
    handedness: EventReader<'w, 's, HandednessChanged>,
    settings: EventReader<'w, 's, SettingChanged>,
    objects: EventReader<'w, 's, ObjectsChanged>,
    activated: EventReader<'w, 's, ObjectActivated>,
    minimaps: EventReader<'w, 's, MinimapToggled>,
}

/// Mirror interaction state changes to the page.
pub fn notify_interaction_changes(
    mut notices: InteractionNotices,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for ModeChanged(mode) in notices.modes.read() {
        rpc_interface.send_notification("mode_changed", json!({ "mode": mode }));
    }
    for ColorChanged(color) in notices.colors.read() {
        rpc_interface.send_notification("color_changed", json!({ "color": color_to_hex(*color) }));
    }
    for HandednessChanged(handedness) in notices.handedness.read() {
        rpc_interface.send_notification("handedness_changed", json!({ "handedness": handedness }));
    }
    for SettingChanged { key, value } in notices.settings.read() {
        rpc_interface.send_notification("setting_changed", json!({ "key": key, "value": value }));
    }
    for ObjectsChanged(snapshot) in notices.objects.read() {
        match serde_json::to_value(snapshot) {
            Ok(params) => rpc_interface.send_notification("objects_changed", params),
            Err(e) => error!("Failed to serialize objects snapshot: {}", e),
        }
    }
    for ObjectActivated(id) in notices.activated.read() {
        rpc_interface.send_notification("object_activated", json!({ "id": id.0 }));
    }
    for MinimapToggled(visible) in notices.minimaps.read() {
        rpc_interface.send_notification("minimap_toggled", json!({ "visible": visible }));
    }
}

/// Announce where the hand menu hangs and whether it is open, on change.
pub fn notify_menu_layout(
    controllers: Res<ControllersManager>,
    mut last: Local<Option<(Option<usize>, bool)>>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    let menu = controllers.menu();
    let layout = (menu.attached_slot(), menu.visible());
    if *last == Some(layout) {
        return;
    }
    *last = Some(layout);

    let hand = menu
        .attached_slot()
        .and_then(|slot| controllers.controller(slot))
        .and_then(|controller| controller.handedness());
    rpc_interface.send_notification(
        "menu_layout",
        json!({
            "attached_slot": layout.0,
            "hand": hand,
            "visible": layout.1,
        }),
    );
}

pub fn notify_player_moves(
    mut moves: EventReader<PlayerMoved>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for moved in moves.read() {
        match serde_json::to_value(moved) {
            Ok(params) => rpc_interface.send_notification("player_moved", params),
            Err(e) => error!("Failed to serialize player move: {}", e),
        }
    }
}

/// The page owns the XR session, so it also owns the actuators.
pub fn forward_haptic_pulses(
    mut requests: EventReader<HapticPulseRequest>,
    frame: Res<XrInputFrame>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for request in requests.read() {
        if frame.source != XrInputSource::Page {
            continue;
        }
        rpc_interface.send_notification(
            "haptic_pulse",
            json!({
                "handedness": request.handedness,
                "intensity": request.intensity,
                "duration": request.millis,
            }),
        );
    }
}
