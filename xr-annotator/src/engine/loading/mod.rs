//! Startup loading for the session configuration and terrain.
//!
//! Loading runs in stages: session config, then the heightfield it names,
//! then scene creation. Any failure is recorded once in [`progress::LoadingProgress`]
//! and reported to the page; the app then stays in `Loading`.

/// Loading progress tracking resource for state transitions.
pub mod progress;

/// Session config and heightfield asset loading with validation.
pub mod session_loader;

/// Terrain, visuals, rig, lighting and player creation once the terrain is ready.
pub mod scene_creator;
