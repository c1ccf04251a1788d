//! JSON assets read at startup.
//!
//! Both types are registered through `JsonAssetPlugin` under their own
//! double extension so the loaders never compete for plain `.json` files.

/// Regular height grid describing the terrain surface.
pub mod heightfield;

/// Deployment settings: terrain path, spawn point, log endpoint and handedness.
pub mod session_config;
