//! Decoded RGBA rasters and the raster surface the filter stage delegates to.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

use crate::error::{LithoError, Result};

/// Number of interleaved samples per pixel.
pub const CHANNELS: usize = 4;

/// An 8-bit RGBA image with non-zero dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    buffer: RgbaImage,
}

impl RasterImage {
    /// Wrap an interleaved RGBA buffer of `width * height * 4` bytes.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(LithoError::InvalidDimensions { width, height });
        }
        RgbaImage::from_raw(width, height, pixels)
            .map(|buffer| Self { buffer })
            .ok_or(LithoError::InvalidDimensions { width, height })
    }

    /// Wrap an already decoded `image` buffer.
    pub fn from_rgba_image(buffer: RgbaImage) -> Result<Self> {
        let (width, height) = buffer.dimensions();
        if width == 0 || height == 0 {
            return Err(LithoError::InvalidDimensions { width, height });
        }
        Ok(Self { buffer })
    }

    /// Convert any decoded image to RGBA8.
    pub fn from_dynamic(image: &DynamicImage) -> Result<Self> {
        Self::from_rgba_image(image.to_rgba8())
    }

    /// Decode an encoded image (PNG, JPEG, ...) held in memory.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?;
        Self::from_dynamic(&image)
    }

    /// Solid image filled with one colour. Mostly useful for tests and previews.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * CHANNELS)
            .collect();
        Self::from_rgba(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Interleaved RGBA samples, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// RGBA value at `(x, y)`. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.buffer.get_pixel(x, y).0
    }

    pub(crate) fn into_raw(self) -> Vec<u8> {
        self.buffer.into_raw()
    }
}

/// Raster primitives the filter stage does not implement itself.
///
/// Hosts with their own drawing surface (a canvas, a GPU context) can
/// supply one; [`ImageOpsSurface`] is the default.
pub trait RasterSurface {
    /// Resample to exactly `width` x `height`.
    fn resize(&self, image: &RasterImage, width: u32, height: u32) -> RasterImage;

    /// Gaussian blur with the given pixel radius.
    fn gaussian_blur(&self, image: &RasterImage, radius: f32) -> RasterImage;
}

/// Raster surface backed by `image::imageops`.
///
/// Resampling is bilinear, and the blur radius is used directly as sigma,
/// matching how a CSS `blur(Npx)` filter interprets its argument.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageOpsSurface;

impl RasterSurface for ImageOpsSurface {
    fn resize(&self, image: &RasterImage, width: u32, height: u32) -> RasterImage {
        RasterImage {
            buffer: imageops::resize(&image.buffer, width, height, FilterType::Triangle),
        }
    }

    fn gaussian_blur(&self, image: &RasterImage, radius: f32) -> RasterImage {
        RasterImage {
            buffer: imageops::blur(&image.buffer, radius),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_dimensions() {
        let result = RasterImage::from_rgba(0, 4, Vec::new());
        assert!(matches!(
            result,
            Err(LithoError::InvalidDimensions {
                width: 0,
                height: 4
            })
        ));
    }

    #[test]
    fn test_rejects_short_buffer() {
        let result = RasterImage::from_rgba(2, 2, vec![0; 15]);
        assert!(matches!(result, Err(LithoError::InvalidDimensions { .. })));
    }

    #[test]
    fn test_filled() {
        let image = RasterImage::filled(3, 2, [10, 20, 30, 255]).unwrap();
        assert_eq!(image.pixels().len(), 3 * 2 * 4);
        assert_eq!(image.pixel(2, 1), [10, 20, 30, 255]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = RasterImage::decode(b"definitely not an image");
        assert!(matches!(result, Err(LithoError::Decode(_))));
    }

    #[test]
    fn test_decode_png() {
        let source = RgbaImage::from_pixel(5, 3, image::Rgba([1, 2, 3, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(source)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();

        let decoded = RasterImage::decode(bytes.get_ref()).unwrap();
        assert_eq!(decoded.dimensions(), (5, 3));
        assert_eq!(decoded.pixel(4, 2), [1, 2, 3, 255]);
    }

    #[test]
    fn test_surface_resize_and_blur_keep_shape() {
        let image = RasterImage::filled(16, 16, [200, 200, 200, 255]).unwrap();
        let surface = ImageOpsSurface;

        let resized = surface.resize(&image, 8, 4);
        assert_eq!(resized.dimensions(), (8, 4));
        assert_eq!(resized.pixel(3, 2), [200, 200, 200, 255]);

        let blurred = surface.gaussian_blur(&image, 1.0);
        assert_eq!(blurred.dimensions(), (16, 16));
        // Away from the edges a uniform image stays uniform.
        let [r, _, _, a] = blurred.pixel(8, 8);
        assert!((i32::from(r) - 200).abs() <= 1);
        assert!((i32::from(a) - 255).abs() <= 1);
    }
}
