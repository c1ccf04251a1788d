/// Session configuration loaded at startup, relative to the asset folder.
pub const SESSION_CONFIG_PATH: &str = "default.session.json";

/// Heightfield used when the session configuration names none.
pub const DEFAULT_TERRAIN_PATH: &str = "terrain/demo.heightfield.json";

/// Endpoint receiving activity log records.
pub const DEFAULT_ACTIVITY_LOG_URL: &str = "/api/activity_log/";
