//! JSON-RPC 2.0 bridge to the hosting page over iframe postMessage.
//!
//! Incoming requests are parsed by a wasm message listener and handled once per
//! frame in `handle_rpc_request`. Requests carrying an `id` get a response;
//! the rest are treated as notifications. Outgoing notifications are queued on
//! `WebRpcInterface` and flushed after the interaction stage.
//!
//! Methods that change interaction state are refused with `-32002` until the
//! scene is running.
//!
//! ## Methods
//!
//! - `xr_session_started`, `xr_input_frame` (notification): session and per-frame
//!   head, controller and gamepad state
//! - `set_mode`, `set_color`, `set_object_color`, `toggle_handedness`,
//!   `set_setting`: interaction changes
//! - `get_palette`, `get_state`, `get_objects`, `get_fps`: queries
//!
//! ## Notifications
//!
//! `mode_changed`, `color_changed`, `handedness_changed`, `setting_changed`,
//! `objects_changed`, `object_activated`, `menu_layout`, `minimap_toggled`,
//! `player_moved`, `haptic_pulse`, `activity_log`, `loading_progress`,
//! `loading_failed`.

pub mod web_rpc;

/// Event-to-notification forwarding for interaction and player changes.
pub mod notifications;

/// Activity log records posted on every object change.
pub mod activity_log;
