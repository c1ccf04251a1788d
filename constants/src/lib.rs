//! Shared tunables for the annotation engine.
//!
//! Plain numeric values only, no engine types.

pub mod input;
pub mod interaction;
pub mod palette;
pub mod panel;
pub mod path;
pub mod render_settings;
