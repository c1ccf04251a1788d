//! Core application setup and state management.
//!
//! Handles application lifecycle, window configuration, state transitions,
//! and plugin initialisation for both native and WASM targets.

/// Application setup and plugin configuration for the Bevy engine.
///
/// Creates the main app with input, interaction and RPC plugins, asset
/// loading systems, and platform-specific configurations.
pub mod app_setup;

/// Application state machine and loading progress transitions.
///
/// Gates every runtime system until the session, terrain and scene are ready.
pub mod app_state;

/// Platform-specific window configuration for native and WASM builds.
///
/// Configures canvas integration for web targets and vsync settings.
pub mod window_config;
