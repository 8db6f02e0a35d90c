//! Filter and model parameters, passed by value into each pipeline call.

use serde::{Deserialize, Serialize};

use crate::error::{LithoError, Result};

/// Largest curvature, a fully closed cylinder.
pub const MAX_CURVE_ANGLE: f32 = 360.0;

/// Raster adjustments applied before height extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSettings {
    pub grayscale: bool,
    pub invert: bool,
    /// Offset added to every channel, -100..=100.
    pub brightness: i32,
    /// -100..=100, 0 leaves the image unchanged.
    pub contrast: i32,
    /// Must be positive, 1.0 disables the correction.
    pub gamma: f32,
    /// Gaussian blur radius in pixels, 0..=20.
    pub blur: f32,
    /// 0..=10
    pub sharpen: u32,
    /// 0..=10, each 3 steps add one median pass.
    pub noise_reduction: u32,
}

impl FilterSettings {
    /// Settings that leave every pixel untouched.
    pub fn passthrough() -> Self {
        Self {
            grayscale: false,
            ..Self::default()
        }
    }

    /// Check every field against its documented range.
    pub fn validate(&self) -> Result<()> {
        if !(-100..=100).contains(&self.brightness) {
            return Err(LithoError::invalid_filter(format!(
                "brightness {} outside -100..=100",
                self.brightness
            )));
        }
        if !(-100..=100).contains(&self.contrast) {
            return Err(LithoError::invalid_filter(format!(
                "contrast {} outside -100..=100",
                self.contrast
            )));
        }
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(LithoError::invalid_filter(format!(
                "gamma must be positive, got {}",
                self.gamma
            )));
        }
        if !(0.0..=20.0).contains(&self.blur) {
            return Err(LithoError::invalid_filter(format!(
                "blur radius {} outside 0..=20",
                self.blur
            )));
        }
        if self.sharpen > 10 {
            return Err(LithoError::invalid_filter(format!(
                "sharpen {} above 10",
                self.sharpen
            )));
        }
        if self.noise_reduction > 10 {
            return Err(LithoError::invalid_filter(format!(
                "noise reduction {} above 10",
                self.noise_reduction
            )));
        }
        Ok(())
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            grayscale: true,
            invert: false,
            brightness: 0,
            contrast: 0,
            gamma: 1.0,
            blur: 0.0,
            sharpen: 0,
            noise_reduction: 0,
        }
    }
}

/// Physical dimensions of the printed relief. Lengths are millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelSettings {
    pub width: f32,
    pub height: f32,
    /// Relief amplitude added on top of the base for a white pixel.
    pub depth: f32,
    pub base_height: f32,
    /// Width of the flat rim around the image, 0 disables the frame.
    pub frame_width: f32,
    /// Rim height above the base.
    pub frame_depth: f32,
    /// Arc subtended by the curved sheet in degrees, 0 is flat.
    pub curve_angle: f32,
    pub smoothing: bool,
    pub smoothing_iterations: u32,
    /// Longest pixel edge used when sampling the source image.
    pub sampling_resolution: u32,
}

impl ModelSettings {
    /// Check the physical parameters.
    pub fn validate(&self) -> Result<()> {
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(LithoError::invalid_model(format!(
                "width must be positive, got {}",
                self.width
            )));
        }
        if !self.height.is_finite() || self.height <= 0.0 {
            return Err(LithoError::invalid_model(format!(
                "height must be positive, got {}",
                self.height
            )));
        }
        let non_negative = [
            ("depth", self.depth),
            ("base height", self.base_height),
            ("frame width", self.frame_width),
            ("frame depth", self.frame_depth),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(LithoError::invalid_model(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if !(0.0..=MAX_CURVE_ANGLE).contains(&self.curve_angle) {
            return Err(LithoError::invalid_model(format!(
                "curve angle {} outside 0..=360",
                self.curve_angle
            )));
        }
        if self.sampling_resolution == 0 {
            return Err(LithoError::invalid_model("sampling resolution must be non-zero"));
        }
        Ok(())
    }

    /// Overall sheet width including the frame on both sides.
    pub fn total_width(&self) -> f32 {
        self.width + 2.0 * self.frame_width
    }

    /// Overall sheet height including the frame on both sides.
    pub fn total_height(&self) -> f32 {
        self.height + 2.0 * self.frame_width
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 100.0,
            depth: 3.0,
            base_height: 0.8,
            frame_width: 0.0,
            frame_depth: 3.0,
            curve_angle: 0.0,
            smoothing: false,
            smoothing_iterations: 1,
            sampling_resolution: 300,
        }
    }
}
