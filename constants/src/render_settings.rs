/// Visual height of a placed marker.
pub const MARKER_HEIGHT: f32 = 1.6;

/// Half extents of the box used to ray-test a marker, centred half a marker above its foot.
pub const MARKER_HIT_HALF_EXTENTS: [f32; 3] = [0.45, 0.8, 0.45];

/// Thickness of committed polylines. The tube cross-section radius equals this value.
pub const LINE_THICKNESS: f32 = 0.75;

/// Segments of the octagonal tube cross-section.
pub const LINE_RADIAL_SEGMENTS: usize = 8;

/// Alpha of placeholder (preview) geometry.
pub const PLACEHOLDER_OPACITY: f32 = 0.3;

/// Orientation marker shown before the first polyline point.
pub const AREA_MARKER_RADIUS: f32 = 0.3;
pub const AREA_MARKER_HEIGHT: f32 = 0.1;
pub const AREA_MARKER_OPACITY: f32 = 0.5;

/// Beam shown while a teleport is being aimed.
pub const NAVIGATION_MARKER_HEIGHT: f32 = 30.0;
pub const NAVIGATION_MARKER_RADIUS: f32 = 0.8;

/// Emissive tint applied to highlighted objects (sRGB).
pub const HIGHLIGHT_EMISSIVE: [f32; 3] = [0.0, 0.667, 0.0];

/// Length of the pointer line drawn from each controller.
pub const POINTER_LENGTH: f32 = 5.0;
