use bevy::prelude::*;
use constants::palette::{
    GREY_LIGHTNESS_LEVELS, LIGHTNESS_LEVELS, SATURATION_LEVELS, SWATCHES_PER_ROW,
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PaletteError {
    #[error("invalid colour '{0}', expected #rrggbb")]
    InvalidHex(String),
    #[error("swatch index {index} out of range (palette has {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Draw colours offered by the hand menu.
///
/// One row per saturation/lightness level. Each row sweeps the hue wheel in
/// `SWATCHES_PER_ROW` steps and ends with a grey swatch.
#[derive(Resource, Debug, Clone)]
pub struct Palette {
    swatches: Vec<Color>,
}

impl Default for Palette {
    fn default() -> Self {
        let mut swatches = Vec::with_capacity(SATURATION_LEVELS.len() * (SWATCHES_PER_ROW + 1));
        for row in 0..SATURATION_LEVELS.len() {
            for column in 0..SWATCHES_PER_ROW {
                let hue = 360.0 * column as f32 / SWATCHES_PER_ROW as f32;
                swatches.push(Color::hsl(hue, SATURATION_LEVELS[row], LIGHTNESS_LEVELS[row]));
            }
            swatches.push(Color::hsl(0.0, 0.0, GREY_LIGHTNESS_LEVELS[row]));
        }
        Self { swatches }
    }
}

impl Palette {
    pub fn swatches(&self) -> &[Color] {
        &self.swatches
    }

    pub fn len(&self) -> usize {
        self.swatches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swatches.is_empty()
    }

    /// Initial draw colour.
    pub fn first(&self) -> Color {
        self.swatches.first().copied().unwrap_or(Color::WHITE)
    }

    pub fn swatch(&self, index: usize) -> Result<Color, PaletteError> {
        self.swatches
            .get(index)
            .copied()
            .ok_or(PaletteError::IndexOutOfRange {
                index,
                len: self.swatches.len(),
            })
    }

    pub fn to_hex_list(&self) -> Vec<String> {
        self.swatches.iter().map(|c| color_to_hex(*c)).collect()
    }
}

/// `#rrggbb`, alpha dropped.
pub fn color_to_hex(color: Color) -> String {
    let srgba = color.to_srgba();
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        channel(srgba.red),
        channel(srgba.green),
        channel(srgba.blue)
    )
}

pub fn parse_hex_color(hex: &str) -> Result<Color, PaletteError> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 {
        return Err(PaletteError::InvalidHex(hex.to_string()));
    }
    Srgba::hex(digits)
        .map(Color::Srgba)
        .map_err(|_| PaletteError::InvalidHex(hex.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_two_rows_with_grey_column() {
        let palette = Palette::default();
        assert_eq!(palette.len(), 22);

        let grey = palette.swatch(SWATCHES_PER_ROW).unwrap().to_srgba();
        assert!((grey.red - grey.green).abs() < 1e-4);
        assert!((grey.green - grey.blue).abs() < 1e-4);

        // Column 0 sits at hue 0.
        let first = palette.first().to_srgba();
        assert!(first.red > first.green && first.red > first.blue);

        assert_eq!(
            palette.swatch(22),
            Err(PaletteError::IndexOutOfRange { index: 22, len: 22 })
        );
    }

    #[test]
    fn hex_strings_parse_and_format() {
        let color = parse_hex_color("#ff8000").unwrap();
        assert_eq!(color_to_hex(color), "#ff8000");
        assert_eq!(color_to_hex(parse_hex_color("00AAff").unwrap()), "#00aaff");

        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("#gg0000").is_err());
    }
}
