//! Controller input for the immersive session.
//!
//! Raw frames arrive either from the hosting page over RPC or from a local
//! gamepad. Each frame is diffed for connection changes, then both hands poll
//! their buttons and stick and emit [`hand_controller::HandSignal`]s.

/// Edge detection over one controller's buttons and thumbstick.
pub mod gamepad_monitor;

/// One physical controller: pose, casting state and signal translation.
pub mod hand_controller;

/// Pairs both hands, tracks the skilled one and owns the hand menu.
pub mod controllers_manager;

/// Hand menu attachment and the floating minimap board.
pub mod ui_panel;

/// Input frame records, connection tracking and session events.
pub mod session;

/// Local gamepad standing in for both controllers.
pub mod gamepad_bridge;

/// Plugin wiring the raw input stage into the app.
pub mod input_plugin;
