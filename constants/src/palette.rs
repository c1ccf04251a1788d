/// Hue steps per palette row. The extra column past the last hue is greyscale.
pub const SWATCHES_PER_ROW: usize = 10;

/// Saturation and lightness used for scene colours, one entry per row.
pub const SATURATION_LEVELS: [f32; 2] = [0.55, 1.0];
pub const LIGHTNESS_LEVELS: [f32; 2] = [0.45, 0.5];

/// Lightness of the greyscale column, one entry per row.
pub const GREY_LIGHTNESS_LEVELS: [f32; 2] = [0.1, 0.3];
