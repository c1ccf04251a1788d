/// Polylines float this far above the terrain hit point.
pub const LINE_FLOAT_OFFSET: f32 = 1.0;

/// A polyline needs at least this many points to be committed.
pub const MIN_POLYLINE_POINTS: usize = 2;

/// Haptic feedback fired when an object is erased.
pub const ERASE_PULSE_INTENSITY: f32 = 0.7;
pub const ERASE_PULSE_MILLIS: u64 = 200;

/// Player eye height above the feet position, in metres.
pub const DEFAULT_HEIGHT_OFFSET: f32 = 1.0;

/// Default spawn location on the terrain (x, z).
pub const DEFAULT_START_POSITION: [f32; 2] = [0.0, -25.0];

/// Terrain scale slider maps to `max(MIN_TERRAIN_SCALE, (v / 100)^2)`.
pub const MIN_TERRAIN_SCALE: f32 = 0.005;
