//! Raster filter stage: resampling, point adjustments and neighbourhood filters.
//!
//! The stages always run in the same order:
//!
//! 1. resample so neither edge exceeds the sampling resolution
//! 2. per-pixel point operations (grayscale, brightness, contrast, invert, gamma)
//! 3. median noise reduction
//! 4. sharpening
//! 5. gaussian blur, delegated to the [`RasterSurface`]
//!
//! Neighbourhood filters read from a frozen copy of the previous pass and
//! write into a second buffer, so no pass ever sees partially updated data.

use tracing::{debug, instrument};

use crate::error::{LithoError, Result};
use crate::raster::{ImageOpsSurface, RasterImage, RasterSurface, CHANNELS};
use crate::settings::FilterSettings;

/// ITU-R BT.601 luma weights.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Weighted luminance of an RGB triple, in 0..=255.
#[inline]
pub fn luminance(r: f32, g: f32, b: f32) -> f32 {
    LUMA_WEIGHTS[0] * r + LUMA_WEIGHTS[1] * g + LUMA_WEIGHTS[2] * b
}

/// Filter an image using the default `image`-backed raster surface.
pub fn apply_filters(
    image: &RasterImage,
    settings: &FilterSettings,
    max_dimension: u32,
) -> Result<RasterImage> {
    apply_filters_with(image, settings, max_dimension, &ImageOpsSurface)
}

/// Filter an image, delegating resampling and blur to `surface`.
///
/// The result is at most `max_dimension` pixels on its longest edge, with
/// the aspect ratio preserved.
#[instrument(skip_all, fields(width = image.width(), height = image.height(), max_dimension))]
pub fn apply_filters_with<S: RasterSurface + ?Sized>(
    image: &RasterImage,
    settings: &FilterSettings,
    max_dimension: u32,
    surface: &S,
) -> Result<RasterImage> {
    settings.validate()?;
    if max_dimension == 0 {
        return Err(LithoError::InvalidDimensions {
            width: max_dimension,
            height: max_dimension,
        });
    }

    let (width, height) = sampling_size(image.width(), image.height(), max_dimension);
    let sampled = if (width, height) == image.dimensions() {
        image.clone()
    } else {
        debug!(width, height, "resampling source image");
        surface.resize(image, width, height)
    };

    let mut pixels = sampled.into_raw();
    let (w, h) = (width as usize, height as usize);

    if has_point_operations(settings) {
        apply_point_operations(&mut pixels, settings);
    }

    if settings.noise_reduction > 0 {
        let passes = settings.noise_reduction.div_ceil(3);
        debug!(passes, "median noise reduction");
        median_filter(&mut pixels, w, h, passes);
    }

    if settings.sharpen > 0 {
        let amount = settings.sharpen as f32 / 10.0;
        debug!(amount, "sharpening");
        sharpen(&mut pixels, w, h, amount);
    }

    let mut filtered = RasterImage::from_rgba(width, height, pixels)?;
    if settings.blur > 0.0 {
        debug!(radius = settings.blur, "gaussian blur");
        filtered = surface.gaussian_blur(&filtered, settings.blur);
    }

    Ok(filtered)
}

/// Size after fitting `width` x `height` inside a `max_dimension` square.
///
/// Images already within bounds keep their size; larger ones shrink by a
/// single ratio, floored, never below one pixel.
pub fn sampling_size(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }
    let max = f64::from(max_dimension);
    let ratio = (max / f64::from(width)).min(max / f64::from(height));
    let scaled = |edge: u32| ((f64::from(edge) * ratio).floor() as u32).max(1);
    (scaled(width), scaled(height))
}

fn has_point_operations(settings: &FilterSettings) -> bool {
    settings.grayscale
        || settings.invert
        || settings.brightness != 0
        || settings.contrast != 0
        || settings.gamma != 1.0
}

/// Contrast factor for a slider value in -100..=100.
#[inline]
pub fn contrast_factor(contrast: i32) -> f32 {
    let c = contrast as f32;
    (259.0 * (c + 255.0)) / (255.0 * (259.0 - c))
}

/// Run the per-pixel chain on RGB, leaving alpha untouched.
///
/// Intermediate values are not clamped; only the final value is clamped
/// and rounded back to 8 bits.
fn apply_point_operations(pixels: &mut [u8], settings: &FilterSettings) {
    let brightness = settings.brightness as f32;
    let factor = contrast_factor(settings.contrast);
    let inverse_gamma = 1.0 / settings.gamma;
    let apply_gamma = settings.gamma != 1.0;

    for px in pixels.chunks_exact_mut(CHANNELS) {
        let mut rgb = [f32::from(px[0]), f32::from(px[1]), f32::from(px[2])];

        if settings.grayscale {
            let gray = luminance(rgb[0], rgb[1], rgb[2]);
            rgb = [gray; 3];
        }

        for value in &mut rgb {
            let mut v = *value + brightness;
            v = factor * (v - 128.0) + 128.0;
            if settings.invert {
                v = 255.0 - v;
            }
            if apply_gamma {
                v = 255.0 * (v / 255.0).powf(inverse_gamma);
            }
            *value = v;
        }

        for (dst, v) in px.iter_mut().zip(rgb) {
            *dst = clamp_channel(v);
        }
    }
}

/// Clamp to 0..=255 and round. NaN (from gamma on a negative value) maps to 0.
#[inline]
fn clamp_channel(v: f32) -> u8 {
    if v.is_nan() {
        0
    } else {
        v.clamp(0.0, 255.0).round() as u8
    }
}

/// 3x3 per-channel median over RGB, `passes` times. The outer ring of
/// pixels and the alpha channel are never written.
fn median_filter(pixels: &mut Vec<u8>, width: usize, height: usize, passes: u32) {
    if width < 3 || height < 3 {
        return;
    }

    let stride = width * CHANNELS;
    let mut next = pixels.clone();
    let mut window = [0u8; 9];

    for _ in 0..passes {
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let idx = y * stride + x * CHANNELS;
                for c in 0..3 {
                    let mut k = 0;
                    for row in [idx - stride, idx, idx + stride] {
                        for i in [row - CHANNELS, row, row + CHANNELS] {
                            window[k] = pixels[i + c];
                            k += 1;
                        }
                    }
                    window.sort_unstable();
                    next[idx + c] = window[4];
                }
            }
        }
        std::mem::swap(pixels, &mut next);
    }
}

/// Five-point sharpening kernel over RGB, border excluded.
fn sharpen(pixels: &mut [u8], width: usize, height: usize, amount: f32) {
    if width < 3 || height < 3 {
        return;
    }

    let source = pixels.to_vec();
    let stride = width * CHANNELS;
    let center_weight = 1.0 + 4.0 * amount;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let idx = y * stride + x * CHANNELS;
            for c in 0..3 {
                let i = idx + c;
                let neighbours = f32::from(source[i - stride])
                    + f32::from(source[i + stride])
                    + f32::from(source[i - CHANNELS])
                    + f32::from(source[i + CHANNELS]);
                let v = center_weight * f32::from(source[i]) - amount * neighbours;
                pixels[i] = clamp_channel(v);
            }
        }
    }
}
