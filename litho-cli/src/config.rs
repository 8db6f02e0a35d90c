//! Command line arguments and the optional JSON settings file.
//!
//! Settings are resolved in three layers: built-in defaults, then the
//! settings file, then individual flags.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser};
use litho_core::{FilterSettings, ModelSettings};
use serde::{Deserialize, Serialize};

/// Convert an image into a printable lithophane STL.
#[derive(Debug, Parser)]
#[command(name = "litho", version)]
pub struct Cli {
    /// Source image (PNG, JPEG, WebP, BMP or GIF).
    pub input: PathBuf,

    /// Destination `.stl` file. Defaults to the input path with an `.stl`
    /// extension.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON file with `filter` and `model` sections.
    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    /// Print the effective settings as JSON and exit.
    #[arg(long)]
    pub print_settings: bool,

    /// Log every pipeline stage.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(flatten)]
    pub filter: FilterArgs,

    #[command(flatten)]
    pub model: ModelArgs,
}

impl Cli {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.input.with_extension("stl"))
    }

    /// Defaults, overlaid with the settings file, overlaid with flags.
    pub fn resolve_settings(&self) -> Result<SettingsFile> {
        let mut settings = match &self.settings {
            Some(path) => SettingsFile::load(path)?,
            None => SettingsFile::default(),
        };
        self.filter.apply(&mut settings.filter);
        self.model.apply(&mut settings.model);
        Ok(settings)
    }
}

/// Image filter overrides.
#[derive(Debug, Default, Args)]
#[command(next_help_heading = "Filter")]
pub struct FilterArgs {
    /// Replace colour with luminance.
    #[arg(long)]
    pub grayscale: Option<bool>,
    /// Swap light and dark, so dark pixels become thick.
    #[arg(long)]
    pub invert: Option<bool>,
    /// -100..=100
    #[arg(long, allow_negative_numbers = true)]
    pub brightness: Option<i32>,
    /// -100..=100
    #[arg(long, allow_negative_numbers = true)]
    pub contrast: Option<i32>,
    #[arg(long)]
    pub gamma: Option<f32>,
    /// Gaussian blur radius in pixels, 0..=20.
    #[arg(long)]
    pub blur: Option<f32>,
    /// 0..=10
    #[arg(long)]
    pub sharpen: Option<u32>,
    /// Median filter strength, 0..=10.
    #[arg(long)]
    pub noise_reduction: Option<u32>,
}

impl FilterArgs {
    pub fn apply(&self, settings: &mut FilterSettings) {
        override_with(&mut settings.grayscale, self.grayscale);
        override_with(&mut settings.invert, self.invert);
        override_with(&mut settings.brightness, self.brightness);
        override_with(&mut settings.contrast, self.contrast);
        override_with(&mut settings.gamma, self.gamma);
        override_with(&mut settings.blur, self.blur);
        override_with(&mut settings.sharpen, self.sharpen);
        override_with(&mut settings.noise_reduction, self.noise_reduction);
    }
}

/// Physical model overrides. Lengths in millimetres.
#[derive(Debug, Default, Args)]
#[command(next_help_heading = "Model")]
pub struct ModelArgs {
    #[arg(long)]
    pub width: Option<f32>,
    #[arg(long)]
    pub height: Option<f32>,
    /// Relief depth of a white pixel above the base.
    #[arg(long)]
    pub depth: Option<f32>,
    #[arg(long)]
    pub base_height: Option<f32>,
    #[arg(long)]
    pub frame_width: Option<f32>,
    #[arg(long)]
    pub frame_depth: Option<f32>,
    /// Degrees of cylinder arc, 0 for a flat sheet, 360 for a full ring.
    #[arg(long)]
    pub curve_angle: Option<f32>,
    #[arg(long)]
    pub smoothing: Option<bool>,
    #[arg(long)]
    pub smoothing_iterations: Option<u32>,
    /// Longest edge, in pixels, the image is sampled at.
    #[arg(long)]
    pub resolution: Option<u32>,
}

impl ModelArgs {
    pub fn apply(&self, settings: &mut ModelSettings) {
        override_with(&mut settings.width, self.width);
        override_with(&mut settings.height, self.height);
        override_with(&mut settings.depth, self.depth);
        override_with(&mut settings.base_height, self.base_height);
        override_with(&mut settings.frame_width, self.frame_width);
        override_with(&mut settings.frame_depth, self.frame_depth);
        override_with(&mut settings.curve_angle, self.curve_angle);
        override_with(&mut settings.smoothing, self.smoothing);
        override_with(&mut settings.smoothing_iterations, self.smoothing_iterations);
        override_with(&mut settings.sampling_resolution, self.resolution);
    }
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// On-disk settings document. Missing sections and fields keep defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
    pub filter: FilterSettings,
    pub model: ModelSettings,
}

impl SettingsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid settings file {}", path.display()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize settings")
    }
}
