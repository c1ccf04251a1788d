use crate::xr::gamepad_monitor::Handedness;
use bevy::prelude::*;
use constants::interaction::{DEFAULT_HEIGHT_OFFSET, DEFAULT_START_POSITION};
use constants::path::{DEFAULT_ACTIVITY_LOG_URL, DEFAULT_TERRAIN_PATH};
use serde::Deserialize;

/// Per-deployment startup configuration, read from `*.session.json`.
#[derive(Asset, TypePath, Resource, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Heightfield asset path, relative to the asset folder.
    pub terrain: String,
    /// Spawn location `[x, z]`; the height comes from the terrain.
    pub start_position: [f32; 2],
    pub activity_log_url: String,
    pub user_handedness: Handedness,
    pub height_offset: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            terrain: DEFAULT_TERRAIN_PATH.to_string(),
            start_position: DEFAULT_START_POSITION,
            activity_log_url: DEFAULT_ACTIVITY_LOG_URL.to_string(),
            user_handedness: Handedness::Right,
            height_offset: DEFAULT_HEIGHT_OFFSET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{ "user_handedness": "left", "height_offset": 2.5 }"#).unwrap();
        assert_eq!(config.user_handedness, Handedness::Left);
        assert_eq!(config.height_offset, 2.5);
        assert_eq!(config.terrain, DEFAULT_TERRAIN_PATH);
        assert_eq!(config.start_position, [0.0, -25.0]);
    }
}
