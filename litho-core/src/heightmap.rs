//! Normalized height field derived from filtered pixels.

use tracing::{debug, instrument};

use crate::error::{LithoError, Result};
use crate::raster::{RasterImage, CHANNELS};

/// Pixels with alpha below this are treated as empty and get height 0.
pub const ALPHA_THRESHOLD: u8 = 10;

/// Row-major grid of heights in `[0, 1]`, one per source pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightmap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl Heightmap {
    /// Build a heightmap from raw samples, clamping each into `[0, 1]`.
    ///
    /// Fails when the sample count is not `width * height` or is zero.
    pub fn new(width: u32, height: u32, mut values: Vec<f32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if expected == 0 || values.len() != expected {
            return Err(LithoError::EmptyHeightmap {
                expected,
                got: values.len(),
            });
        }
        for v in &mut values {
            *v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Sample at `(col, row)`, clamping both coordinates into the grid.
    pub fn get(&self, col: i64, row: i64) -> f32 {
        let col = col.clamp(0, i64::from(self.width) - 1) as usize;
        let row = row.clamp(0, i64::from(self.height) - 1) as usize;
        self.values[row * self.width as usize + col]
    }

    /// Apply `iterations` passes of a 3x3 box blur.
    ///
    /// Each output sample is the mean of the in-bounds samples of its 3x3
    /// neighbourhood in the previous pass.
    pub fn smoothed(&self, iterations: u32) -> Self {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut current = self.values.clone();
        let mut next = vec![0.0f32; current.len()];

        for _ in 0..iterations {
            for y in 0..h {
                let rows = y.saturating_sub(1)..=(y + 1).min(h - 1);
                for x in 0..w {
                    let cols = x.saturating_sub(1)..=(x + 1).min(w - 1);
                    let mut sum = 0.0;
                    let mut count = 0u32;
                    for ny in rows.clone() {
                        for nx in cols.clone() {
                            sum += current[ny * w + nx];
                            count += 1;
                        }
                    }
                    next[y * w + x] = sum / count as f32;
                }
            }
            std::mem::swap(&mut current, &mut next);
        }

        Self {
            width: self.width,
            height: self.height,
            values: current,
        }
    }
}

/// Convert filtered pixels to heights: luminance / 255, zero where the
/// pixel is nearly transparent.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn extract_heightmap(image: &RasterImage) -> Heightmap {
    let values: Vec<f32> = image
        .pixels()
        .chunks_exact(CHANNELS)
        .map(|px| {
            if px[3] < ALPHA_THRESHOLD {
                0.0
            } else {
                // f64 so that opaque white lands exactly on 1.0
                let lum = 0.299 * f64::from(px[0])
                    + 0.587 * f64::from(px[1])
                    + 0.114 * f64::from(px[2]);
                ((lum / 255.0) as f32).clamp(0.0, 1.0)
            }
        })
        .collect();
    debug!(samples = values.len(), "extracted heightmap");

    Heightmap {
        width: image.width(),
        height: image.height(),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_is_one_black_is_zero() {
        let white = RasterImage::filled(2, 2, [255, 255, 255, 255]).unwrap();
        let black = RasterImage::filled(2, 2, [0, 0, 0, 255]).unwrap();
        assert!(extract_heightmap(&white).values().iter().all(|&v| v == 1.0));
        assert!(extract_heightmap(&black).values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_transparent_pixels_are_flat() {
        let image = RasterImage::from_rgba(
            3,
            1,
            vec![255, 255, 255, 9, 255, 255, 255, 10, 255, 255, 255, 0],
        )
        .unwrap();
        let map = extract_heightmap(&image);
        assert_eq!(map.values(), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_uses_weighted_luminance() {
        let image = RasterImage::filled(1, 1, [0, 255, 0, 255]).unwrap();
        let map = extract_heightmap(&image);
        assert!((map.values()[0] - 0.587).abs() < 1e-5);
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        assert!(matches!(
            Heightmap::new(2, 2, vec![0.5; 3]),
            Err(LithoError::EmptyHeightmap {
                expected: 4,
                got: 3
            })
        ));
        assert!(Heightmap::new(0, 0, Vec::new()).is_err());
    }

    #[test]
    fn test_new_clamps_values() {
        let map = Heightmap::new(3, 1, vec![-1.0, 0.25, 7.0]).unwrap();
        assert_eq!(map.values(), &[0.0, 0.25, 1.0]);
    }

    #[test]
    fn test_get_clamps_coordinates() {
        let map = Heightmap::new(2, 2, vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(map.get(-5, -5), 0.1);
        assert_eq!(map.get(9, 0), 0.2);
        assert_eq!(map.get(1, 9), 0.4);
    }

    #[test]
    fn test_smoothing_spreads_a_spike() {
        let mut values = vec![0.0; 9];
        values[4] = 0.9;
        let map = Heightmap::new(3, 3, values).unwrap();

        let once = map.smoothed(1);
        // Every 3x3 window contains the centre; corners average 4 samples.
        assert!((once.get(1, 1) - 0.1).abs() < 1e-6);
        assert!((once.get(0, 0) - 0.225).abs() < 1e-6);
        assert!((once.get(1, 0) - 0.15).abs() < 1e-6);
        assert_eq!(once.width(), 3);
        assert_eq!(once.height(), 3);

        assert_eq!(map.smoothed(0), map);
    }

    #[test]
    fn test_smoothing_keeps_flat_fields() {
        let map = Heightmap::new(4, 3, vec![0.5; 12]).unwrap();
        let smoothed = map.smoothed(3);
        assert!(smoothed.values().iter().all(|v| (v - 0.5).abs() < 1e-6));
    }
}
