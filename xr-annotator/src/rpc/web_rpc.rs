use crate::engine::core::app_state::AppState;
use crate::engine::loading::progress::LoadingProgress;
use crate::engine::player::Player;
use crate::engine::settings::{MenuSliders, SettingKey, Settings};
use crate::objects::registry::{ObjectId, SpatialObjectRegistry};
use crate::rpc::activity_log::{ActivityLog, record_activity};
use crate::rpc::notifications::{
    forward_haptic_pulses, notify_interaction_changes, notify_menu_layout, notify_player_moves,
};
use crate::tools::interaction_mode::InteractionMode;
use crate::tools::interaction_systems::{
    ColorSelectRequest, HandednessToggleRequest, InteractionSet, ModeSelectRequest,
    ObjectColorRequest, SettingChangeRequest,
};
use crate::tools::mode_controller::InteractionModeController;
use crate::tools::palette::{Palette, color_to_hex, parse_hex_color};
use crate::xr::controllers_manager::ControllersManager;
use crate::xr::gamepad_monitor::Handedness;
use crate::xr::input_plugin::XrInputSet;
use crate::xr::session::{XrFrameReceived, XrInputFrameParams, XrInputSource, XrSessionStarted};
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;

#[cfg(target_arch = "wasm32")]
use web_sys::{MessageEvent, window};

/// JSON-RPC 2.0 request structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<RpcError>,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 notification structure for one-way communication.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
}

/// JSON-RPC 2.0 error object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Outgoing traffic to the hosting page, flushed once per frame.
#[derive(Resource, Default)]
pub struct WebRpcInterface {
    outgoing_notifications: Vec<RpcNotification>,
    outgoing_responses: Vec<RpcResponse>,
}

impl WebRpcInterface {
    /// Send notification to the page without expecting a response.
    pub fn send_notification(&mut self, method: &str, params: serde_json::Value) {
        self.outgoing_notifications.push(RpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        });
    }

    /// Queue response for transmission to the page.
    fn queue_response(&mut self, response: RpcResponse) {
        self.outgoing_responses.push(response);
    }

    #[cfg(test)]
    pub(crate) fn pending_notifications(&self) -> &[RpcNotification] {
        &self.outgoing_notifications
    }
}

/// Plugin establishing the postMessage bridge to the hosting page.
pub struct WebRpcPlugin;

impl Plugin for WebRpcPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WebRpcInterface>()
            .init_resource::<ActivityLog>()
            .add_event::<IncomingRpcMessage>()
            .add_systems(
                Update,
                (process_incoming_messages, handle_rpc_messages)
                    .chain()
                    .before(XrInputSet)
                    .before(InteractionSet),
            )
            .add_systems(
                Update,
                (
                    notify_interaction_changes,
                    notify_menu_layout,
                    notify_player_moves,
                    forward_haptic_pulses,
                    record_activity,
                    send_outgoing_messages,
                )
                    .chain()
                    .after(InteractionSet),
            );

        #[cfg(target_arch = "wasm32")]
        app.add_systems(Startup, setup_message_listener);
    }
}

#[cfg(target_arch = "wasm32")]
fn setup_message_listener(mut commands: Commands) {
    use std::sync::Arc;
    use std::sync::Mutex;

    // Filled from the JS message callback, drained each frame.
    let message_queue: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let queue_clone = message_queue.clone();

    let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
        if let Ok(data) = event.data().dyn_into::<js_sys::JsString>() {
            let message_str: String = data.into();

            if message_str.contains("jsonrpc") {
                if let Ok(mut queue) = queue_clone.lock() {
                    queue.push(message_str);
                }
            }
        }
    }) as Box<dyn FnMut(MessageEvent)>);

    if let Some(window) = window() {
        window
            .add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
            .expect("Failed to register message listener");
    }

    // Ownership moves to JS.
    closure.forget();
    commands.insert_resource(MessageQueue(message_queue));
}

#[derive(Resource)]
struct MessageQueue(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

/// Raw message text received from the page.
#[derive(Event)]
struct IncomingRpcMessage {
    content: String,
}

fn process_incoming_messages(
    message_queue: Option<Res<MessageQueue>>,
    mut message_events: EventWriter<IncomingRpcMessage>,
) {
    let Some(queue_res) = message_queue else {
        return;
    };

    let messages = if let Ok(mut queue) = queue_res.0.lock() {
        std::mem::take(&mut *queue)
    } else {
        Vec::new()
    };

    for message_str in messages {
        message_events.write(IncomingRpcMessage {
            content: message_str,
        });
    }
}

/// Read-only state reported back to the page.
#[derive(SystemParam)]
pub struct RpcState<'w> {
    app_state: Option<Res<'w, State<AppState>>>,
    diagnostics: Option<Res<'w, DiagnosticsStore>>,
    palette: Res<'w, Palette>,
    settings: Res<'w, Settings>,
    sliders: Option<Res<'w, MenuSliders>>,
    mode_controller: Res<'w, InteractionModeController>,
    registry: Res<'w, SpatialObjectRegistry>,
    controllers: Res<'w, ControllersManager>,
    player: Option<Res<'w, Player>>,
    loading: Option<Res<'w, LoadingProgress>>,
}

/// Requests forwarded into the ECS.
#[derive(SystemParam)]
pub struct RpcRequests<'w> {
    modes: EventWriter<'w, ModeSelectRequest>,
    colors: EventWriter<'w, ColorSelectRequest>,
    object_colors: EventWriter<'w, ObjectColorRequest>,
    handedness: EventWriter<'w, HandednessToggleRequest>,
    settings: EventWriter<'w, SettingChangeRequest>,
    sessions: EventWriter<'w, XrSessionStarted>,
    frames: EventWriter<'w, XrFrameReceived>,
}

fn handle_rpc_messages(
    mut events: EventReader<IncomingRpcMessage>,
    state: RpcState,
    mut requests: RpcRequests,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for event in events.read() {
        match serde_json::from_str::<RpcRequest>(&event.content) {
            Ok(request) => {
                if let Some(response) = handle_rpc_request(&request, &state, &mut requests) {
                    rpc_interface.queue_response(response);
                }
            }
            Err(parse_error) => {
                rpc_interface.send_notification(
                    "debug_message",
                    serde_json::json!({
                        "message": format!("Parse error: {}", parse_error)
                    }),
                );
            }
        }
    }
}

/// Run one request. Requests without an ID are notifications and get no reply.
fn handle_rpc_request(
    request: &RpcRequest,
    state: &RpcState,
    requests: &mut RpcRequests,
) -> Option<RpcResponse> {
    let params = &request.params;
    let running = state
        .app_state
        .as_ref()
        .is_some_and(|app_state| *app_state.get() == AppState::Running);
    if let Err(error) = check_ready(&request.method, running) {
        debug!("Rejected '{}' while loading", request.method);
        let id = request.id.clone()?;
        return Some(RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id: Some(id),
        });
    }

    let result = match request.method.as_str() {
        "xr_input_frame" => handle_xr_input_frame(params, requests),
        "xr_session_started" => {
            requests.sessions.write(XrSessionStarted);
            Ok(serde_json::json!({ "success": true }))
        }
        "set_mode" => handle_set_mode(params, requests),
        "set_color" => handle_set_color(params, &state.palette, requests),
        "set_object_color" => handle_set_object_color(params, state, requests),
        "get_palette" => Ok(serde_json::json!({ "colors": state.palette.to_hex_list() })),
        "toggle_handedness" => handle_toggle_handedness(params, requests),
        "set_setting" => handle_set_setting(params, requests),
        "get_state" => Ok(handle_get_state(state)),
        "get_objects" => serde_json::to_value(state.registry.export_snapshot())
            .map_err(|e| RpcError::internal_error(&e.to_string())),
        "get_fps" => Ok(handle_get_fps(state.diagnostics.as_deref())),
        _ => {
            warn!("Unknown RPC method: {}", request.method);
            let id = request.id.clone()?;
            return Some(create_error_response(
                id,
                -32601,
                "Method not found",
                Some(serde_json::json!({"method": request.method})),
            ));
        }
    };

    let id = request.id.clone()?;
    match result {
        Ok(result_value) => Some(RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(result_value),
            error: None,
            id: Some(id),
        }),
        Err(error) => Some(RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id: Some(id),
        }),
    }
}

/// Methods that mutate interaction state are only consumed once the scene is
/// running; accepting them earlier would drop them silently.
const RUNNING_ONLY_METHODS: [&str; 7] = [
    "xr_input_frame",
    "xr_session_started",
    "set_mode",
    "set_color",
    "set_object_color",
    "toggle_handedness",
    "set_setting",
];

fn check_ready(method: &str, running: bool) -> Result<(), RpcError> {
    if running || !RUNNING_ONLY_METHODS.contains(&method) {
        return Ok(());
    }
    Err(RpcError::not_ready(method))
}

fn handle_xr_input_frame(
    params: &serde_json::Value,
    requests: &mut RpcRequests,
) -> Result<serde_json::Value, RpcError> {
    let frame = serde_json::from_value::<XrInputFrameParams>(params.clone())
        .map_err(|e| RpcError::invalid_params(&format!("Malformed input frame: {e}")))?;
    requests
        .frames
        .write(XrFrameReceived(frame.into_frame(XrInputSource::Page)));
    Ok(serde_json::json!({ "success": true }))
}

pub fn parse_mode_params(params: &serde_json::Value) -> Result<InteractionMode, RpcError> {
    #[derive(Deserialize)]
    struct ModeParams {
        mode: String,
    }

    let parsed = serde_json::from_value::<ModeParams>(params.clone())
        .map_err(|_| RpcError::invalid_params("Expected 'mode' parameter"))?;
    parsed
        .mode
        .parse::<InteractionMode>()
        .map_err(|e| RpcError::invalid_params(&e))
}

fn handle_set_mode(
    params: &serde_json::Value,
    requests: &mut RpcRequests,
) -> Result<serde_json::Value, RpcError> {
    let mode = parse_mode_params(params)?;
    requests.modes.write(ModeSelectRequest(mode));
    info!("Mode selection dispatched: {}", mode);

    Ok(serde_json::json!({
        "success": true,
        "mode": mode
    }))
}

/// Accepts `{ "color": "#rrggbb" }` or `{ "index": n }` into the palette.
pub fn parse_color_params(
    params: &serde_json::Value,
    palette: &Palette,
) -> Result<Color, RpcError> {
    #[derive(Deserialize)]
    struct ColorParams {
        color: Option<String>,
        index: Option<usize>,
    }

    let parsed = serde_json::from_value::<ColorParams>(params.clone())
        .map_err(|_| RpcError::invalid_params("Expected 'color' or 'index' parameter"))?;
    let color = match (parsed.color, parsed.index) {
        (Some(hex), _) => parse_hex_color(&hex),
        (None, Some(index)) => palette.swatch(index),
        (None, None) => {
            return Err(RpcError::invalid_params("Expected 'color' or 'index' parameter"));
        }
    };
    color.map_err(|e| RpcError::invalid_params(&e.to_string()))
}

fn handle_set_color(
    params: &serde_json::Value,
    palette: &Palette,
    requests: &mut RpcRequests,
) -> Result<serde_json::Value, RpcError> {
    let color = parse_color_params(params, palette)?;
    requests.colors.write(ColorSelectRequest(color));

    Ok(serde_json::json!({
        "success": true,
        "color": color_to_hex(color)
    }))
}

/// `{ "id": n }` plus the same colour fields as `set_color`.
pub fn parse_object_color_params(
    params: &serde_json::Value,
    palette: &Palette,
) -> Result<ObjectColorRequest, RpcError> {
    #[derive(Deserialize)]
    struct ObjectParams {
        id: u64,
    }

    let parsed = serde_json::from_value::<ObjectParams>(params.clone())
        .map_err(|_| RpcError::invalid_params("Expected 'id' parameter"))?;
    Ok(ObjectColorRequest {
        id: ObjectId(parsed.id),
        color: parse_color_params(params, palette)?,
    })
}

fn handle_set_object_color(
    params: &serde_json::Value,
    state: &RpcState,
    requests: &mut RpcRequests,
) -> Result<serde_json::Value, RpcError> {
    let request = parse_object_color_params(params, &state.palette)?;
    if !state.registry.contains(request.id) {
        return Err(RpcError::invalid_params(&format!(
            "Unknown object {}",
            request.id.0
        )));
    }
    requests.object_colors.write(request);

    Ok(serde_json::json!({
        "success": true,
        "id": request.id.0,
        "color": color_to_hex(request.color)
    }))
}

fn handle_toggle_handedness(
    params: &serde_json::Value,
    requests: &mut RpcRequests,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize, Default)]
    struct HandednessParams {
        handedness: Option<Handedness>,
    }

    let parsed = if params.is_null() {
        HandednessParams::default()
    } else {
        serde_json::from_value::<HandednessParams>(params.clone())
            .map_err(|_| RpcError::invalid_params("Expected 'left' or 'right'"))?
    };
    requests
        .handedness
        .write(HandednessToggleRequest(parsed.handedness));
    Ok(serde_json::json!({ "success": true }))
}

/// Key and value checked against the slider range before dispatch.
pub fn parse_setting_params(
    params: &serde_json::Value,
) -> Result<SettingChangeRequest, RpcError> {
    #[derive(Deserialize)]
    struct SettingParams {
        key: String,
        value: f32,
    }

    let parsed = serde_json::from_value::<SettingParams>(params.clone())
        .map_err(|_| RpcError::invalid_params("Expected 'key' and 'value' parameters"))?;
    let key = parsed
        .key
        .parse::<SettingKey>()
        .map_err(|e| RpcError::invalid_params(&e.to_string()))?;
    let range = key.range();
    if !(range.min..=range.max).contains(&parsed.value) {
        return Err(RpcError::invalid_params(&format!(
            "{} must be within [{}, {}]",
            key.as_str(),
            range.min,
            range.max
        )));
    }
    Ok(SettingChangeRequest {
        key,
        value: parsed.value,
    })
}

fn handle_set_setting(
    params: &serde_json::Value,
    requests: &mut RpcRequests,
) -> Result<serde_json::Value, RpcError> {
    let request = parse_setting_params(params)?;
    requests.settings.write(request);
    Ok(serde_json::json!({
        "success": true,
        "key": request.key,
        "value": request.value
    }))
}

fn handle_get_state(state: &RpcState) -> serde_json::Value {
    let settings: serde_json::Map<String, serde_json::Value> = SettingKey::ALL
        .iter()
        .map(|key| (key.as_str().to_string(), serde_json::json!(state.settings.get(*key))))
        .collect();
    let sliders = state
        .sliders
        .as_ref()
        .map(|sliders| serde_json::json!(sliders.0))
        .unwrap_or(serde_json::Value::Null);
    let player = state.player.as_ref().map(|player| {
        serde_json::json!({
            "position": player.world_position().to_array(),
            "eye": player.eye_position().to_array(),
            "height_offset": player.height_offset(),
            "session_started": player.session_started(),
        })
    });
    let loading = state.loading.as_ref().map(|loading| {
        serde_json::json!({
            "complete": loading.is_complete(),
            "failure": loading.failure,
        })
    });

    serde_json::json!({
        "mode": state.mode_controller.mode(),
        "color": color_to_hex(state.registry.active_color()),
        "handedness": state.controllers.user_handedness(),
        "controllers_connected": state.controllers.connected(),
        "menu_visible": state.controllers.menu().visible(),
        "object_count": state.registry.len(),
        "drawing": state.registry.has_draft(),
        "settings": settings,
        "sliders": sliders,
        "player": player,
        "loading": loading,
    })
}

fn handle_get_fps(diagnostics: Option<&DiagnosticsStore>) -> serde_json::Value {
    let fps = diagnostics
        .and_then(|store| store.get(&FrameTimeDiagnosticsPlugin::FPS))
        .and_then(|fps_diagnostic| fps_diagnostic.smoothed())
        .unwrap_or(0.0) as f32;

    serde_json::json!({
        "fps": fps
    })
}

/// Create standardized error response with optional data payload.
fn create_error_response(
    id: serde_json::Value,
    code: i32,
    message: &str,
    data: Option<serde_json::Value>,
) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0".to_string(),
        result: None,
        error: Some(RpcError {
            code,
            message: message.to_string(),
            data,
        }),
        id: Some(id),
    }
}

/// Send queued notifications and responses to the page.
fn send_outgoing_messages(mut rpc_interface: ResMut<WebRpcInterface>) {
    for notification in rpc_interface.outgoing_notifications.drain(..) {
        send_message_to_parent(&notification);
    }

    for response in rpc_interface.outgoing_responses.drain(..) {
        send_message_to_parent(&response);
    }
}

fn send_message_to_parent<T: Serialize>(message: &T) {
    #[cfg(target_arch = "wasm32")]
    {
        match serde_json::to_string(message) {
            Ok(json) => {
                if let Some(window) = window() {
                    if let Some(parent) = window.parent().ok().flatten() {
                        if let Err(e) = parent.post_message(&JsValue::from_str(&json), "*") {
                            error!("Failed to send message to parent: {:?}", e);
                        }
                    } else {
                        warn!("No parent window available for message transmission");
                    }
                } else {
                    error!("Window object not available");
                }
            }
            Err(e) => {
                error!("Failed to serialize message: {}", e);
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
    }
}

/// Standard RPC error codes and constructors.
impl RpcError {
    pub fn invalid_params(message: &str) -> Self {
        Self {
            code: -32602,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn internal_error(message: &str) -> Self {
        Self {
            code: -32603,
            message: message.to_string(),
            data: None,
        }
    }

    /// Server-defined error for requests that arrive before the scene runs.
    pub fn not_ready(method: &str) -> Self {
        Self {
            code: -32002,
            message: "Scene is still loading".to_string(),
            data: Some(serde_json::json!({ "method": method })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mode_names_match_the_wire_format() {
        assert_eq!(
            parse_mode_params(&json!({ "mode": "addPolygon" })).unwrap(),
            InteractionMode::AddPolygon
        );
        let err = parse_mode_params(&json!({ "mode": "fly" })).unwrap_err();
        assert_eq!(err.code, -32602);
        assert!(parse_mode_params(&json!({})).is_err());
    }

    #[test]
    fn colours_come_from_hex_or_palette_index() {
        let palette = Palette::default();
        let red = parse_color_params(&json!({ "color": "#ff0000" }), &palette).unwrap();
        assert_eq!(color_to_hex(red), "#ff0000");

        let swatch = parse_color_params(&json!({ "index": 0 }), &palette).unwrap();
        assert_eq!(swatch, palette.first());

        assert!(parse_color_params(&json!({ "index": 99 }), &palette).is_err());
        assert!(parse_color_params(&json!({ "color": "red" }), &palette).is_err());
        assert!(parse_color_params(&json!({}), &palette).is_err());
    }

    #[test]
    fn settings_are_range_checked() {
        let request = parse_setting_params(&json!({ "key": "sun_theta", "value": 180.0 })).unwrap();
        assert_eq!(request.key, SettingKey::SunTheta);

        let err = parse_setting_params(&json!({ "key": "sun_phi", "value": 80.0 })).unwrap_err();
        assert!(err.message.contains("sun_phi"));
        assert!(parse_setting_params(&json!({ "key": "gravity", "value": 1.0 })).is_err());
    }

    #[test]
    fn interaction_requests_wait_for_the_running_scene() {
        let err = check_ready("set_mode", false).unwrap_err();
        assert_eq!(err.code, -32002);
        assert!(check_ready("set_color", false).is_err());
        assert!(check_ready("set_mode", true).is_ok());

        // Queries are answered during loading.
        assert!(check_ready("get_state", false).is_ok());
        assert!(check_ready("get_palette", false).is_ok());
    }

    #[test]
    fn object_colour_needs_an_id_and_a_colour() {
        let palette = Palette::default();
        let request =
            parse_object_color_params(&json!({ "id": 3, "color": "#00ff00" }), &palette).unwrap();
        assert_eq!(request.id, ObjectId(3));
        assert_eq!(color_to_hex(request.color), "#00ff00");

        assert!(parse_object_color_params(&json!({ "color": "#00ff00" }), &palette).is_err());
        assert!(parse_object_color_params(&json!({ "id": 3 }), &palette).is_err());
    }

    #[test]
    fn notification_requests_carry_default_params() {
        let request: RpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"xr_session_started"}"#).unwrap();
        assert!(request.params.is_null());
        assert!(request.id.is_none());
    }
}
