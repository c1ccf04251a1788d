use bevy::prelude::*;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TerrainError {
    #[error("heightfield needs at least 2x2 samples, got {width}x{depth}")]
    TooSmall { width: usize, depth: usize },
    #[error("heightfield expects {expected} heights, found {found}")]
    SampleCount { expected: usize, found: usize },
    #[error("cell size must be positive, got {0}")]
    CellSize(f32),
}

/// Regular grid of terrain heights, row-major along X then Z.
#[derive(Asset, TypePath, Deserialize, Debug, Clone, PartialEq)]
pub struct Heightfield {
    pub width: usize,
    pub depth: usize,
    /// World `[x, z]` of the first sample.
    pub origin: [f32; 2],
    pub cell_size: f32,
    pub heights: Vec<f32>,
}

impl Heightfield {
    /// Flat field at `height`, centred on the world origin.
    #[cfg(test)]
    pub fn flat(width: usize, depth: usize, cell_size: f32, height: f32) -> Self {
        Self::from_fn(width, depth, cell_size, |_, _| height)
    }

    /// Field centred on the origin with heights from `f(x, z)` in world units.
    pub fn from_fn(
        width: usize,
        depth: usize,
        cell_size: f32,
        f: impl Fn(f32, f32) -> f32,
    ) -> Self {
        let origin = [
            -((width - 1) as f32) * cell_size * 0.5,
            -((depth - 1) as f32) * cell_size * 0.5,
        ];
        let mut heights = Vec::with_capacity(width * depth);
        for row in 0..depth {
            for col in 0..width {
                let x = origin[0] + col as f32 * cell_size;
                let z = origin[1] + row as f32 * cell_size;
                heights.push(f(x, z));
            }
        }
        Self {
            width,
            depth,
            origin,
            cell_size,
            heights,
        }
    }

    pub fn validate(&self) -> Result<(), TerrainError> {
        if self.width < 2 || self.depth < 2 {
            return Err(TerrainError::TooSmall {
                width: self.width,
                depth: self.depth,
            });
        }
        if self.cell_size.is_nan() || self.cell_size <= 0.0 {
            return Err(TerrainError::CellSize(self.cell_size));
        }
        let expected = self.width * self.depth;
        if self.heights.len() != expected {
            return Err(TerrainError::SampleCount {
                expected,
                found: self.heights.len(),
            });
        }
        Ok(())
    }

    pub fn min_corner(&self) -> Vec2 {
        Vec2::from_array(self.origin)
    }

    pub fn max_corner(&self) -> Vec2 {
        self.min_corner()
            + Vec2::new(
                (self.width - 1) as f32 * self.cell_size,
                (self.depth - 1) as f32 * self.cell_size,
            )
    }

    pub fn height_range(&self) -> (f32, f32) {
        self.heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), h| {
                (lo.min(*h), hi.max(*h))
            })
    }

    pub fn sample(&self, col: usize, row: usize) -> f32 {
        let col = col.min(self.width - 1);
        let row = row.min(self.depth - 1);
        self.heights[row * self.width + col]
    }

    /// Bilinear height at world `(x, z)`, `None` outside the grid.
    pub fn sample_bilinear(&self, x: f32, z: f32) -> Option<f32> {
        let min = self.min_corner();
        let max = self.max_corner();
        if x < min.x || x > max.x || z < min.y || z > max.y {
            return None;
        }

        let gx = (x - min.x) / self.cell_size;
        let gz = (z - min.y) / self.cell_size;
        let x0 = (gx.floor() as usize).min(self.width - 2);
        let z0 = (gz.floor() as usize).min(self.depth - 2);
        let wx = gx - x0 as f32;
        let wz = gz - z0 as f32;

        let h00 = self.sample(x0, z0);
        let h10 = self.sample(x0 + 1, z0);
        let h01 = self.sample(x0, z0 + 1);
        let h11 = self.sample(x0 + 1, z0 + 1);

        let h_top = h00 * (1.0 - wx) + h10 * wx;
        let h_bottom = h01 * (1.0 - wx) + h11 * wx;
        Some(h_top * (1.0 - wz) + h_bottom * wz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn bilinear_matches_linear_slope() {
        let field = Heightfield::from_fn(11, 11, 1.0, |x, _| 2.0 * x);
        assert_approx_eq!(field.sample_bilinear(1.25, 0.0).unwrap(), 2.5, 1e-5);
        assert_approx_eq!(field.sample_bilinear(5.0, 5.0).unwrap(), 10.0, 1e-5);
        assert!(field.sample_bilinear(5.1, 0.0).is_none());
    }

    #[test]
    fn validation_catches_bad_shapes() {
        let mut field = Heightfield::flat(4, 4, 1.0, 0.0);
        assert!(field.validate().is_ok());

        field.heights.pop();
        assert_eq!(
            field.validate(),
            Err(TerrainError::SampleCount {
                expected: 16,
                found: 15
            })
        );

        let tiny = Heightfield::flat(1, 4, 1.0, 0.0);
        assert!(matches!(tiny.validate(), Err(TerrainError::TooSmall { .. })));
    }

    #[test]
    fn parses_from_json() {
        let json = r#"{"width":2,"depth":2,"origin":[0.0,0.0],"cell_size":4.0,"heights":[0,1,2,3]}"#;
        let field: Heightfield = serde_json::from_str(json).unwrap();
        assert!(field.validate().is_ok());
        assert_eq!(field.max_corner(), Vec2::new(4.0, 4.0));
        assert_eq!(field.height_range(), (0.0, 3.0));
    }
}
