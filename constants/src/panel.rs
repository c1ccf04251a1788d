/// Hand menu placement relative to the off-hand grip.
pub const MENU_OFFSET: [f32; 3] = [0.0, 0.3, -0.15];
pub const MENU_TILT_RADIANS: f32 = -0.2 * std::f32::consts::PI;
pub const MENU_SCALE: f32 = 0.75;

/// Side of the square menu surface before scaling.
pub const MENU_PANEL_SIZE: f32 = 0.47;
pub const MENU_PANEL_DEPTH: f32 = 0.02;

/// Minimap panel placement relative to the player's head.
pub const MINIMAP_DISTANCE: f32 = 0.65;
pub const MINIMAP_INCLINATION_DEGREES: f32 = 20.0;
pub const MINIMAP_VERTICAL_OFFSET: f32 = -0.4;

/// Width of the minimap board. Its height follows the terrain aspect ratio.
pub const MINIMAP_WIDTH: f32 = 1.5;

/// Icon sizes on the board, and their lift off its face.
pub const MINIMAP_ICON_RADIUS: f32 = 0.012;
pub const MINIMAP_LINE_THICKNESS: f32 = 0.006;
pub const MINIMAP_ICON_LIFT: f32 = 0.006;
