//! Annotation tools driven by the skilled hand.
//!
//! One interaction mode is active at a time. Hand signals are routed to the
//! mode controller, which places markers, draws polylines on the terrain,
//! erases objects or teleports the player.
//!
//! ## Frame Order
//!
//! ```text
//! XrInputSet (raw frame, connection edges, session start)
//!   └─> handle_interaction_requests   mode / colour from page or menu
//!       └─> apply_setting_changes     sliders
//!           └─> update_controllers    poses, button polling, HandSignal
//!               └─> dispatch_hand_signals   commits and side effects
//!                   └─> update_mode_previews  placeholders, highlights
//! ```
//!
//! ## Modes
//!
//! - `navigate`: no trigger action, teleport with the stick
//! - `addPoint`: trigger drops a marker on the terrain
//! - `addPolygon`: trigger appends a vertex, a face button finishes the line
//! - `remove`: press and release on the same highlighted object erases it
//!
//! Teleport (stick forward then release) works in every mode.

/// Mode enumeration and its wire names.
pub mod interaction_mode;

/// Mode state machine over the object registry.
///
/// Handles hand signals and per-frame previews without touching the ECS.
pub mod mode_controller;

/// Annotation colour swatches offered by the menu.
pub mod palette;

/// Bevy systems, request events and notifications for the interaction stage.
pub mod interaction_systems;
