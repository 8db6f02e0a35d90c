//! Litho command line host.
//!
//! Reads an image from disk, runs the core pipeline with the resolved
//! settings and writes the binary STL next to it.

pub mod config;
pub mod logger;

use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::ImageReader;
use litho_core::{build_lithophane, Bounds, EdgeReport, RasterImage};
use tracing::{debug, info, warn};

pub use config::{Cli, SettingsFile};

/// What one conversion produced, for the closing report.
#[derive(Debug, Clone)]
pub struct Summary {
    pub output: PathBuf,
    pub heightmap_size: (u32, u32),
    pub triangles: usize,
    pub bytes: usize,
    pub bounds: Option<Bounds>,
    pub edges: EdgeReport,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "wrote {}", self.output.display())?;
        writeln!(
            f,
            "  heightmap  {} x {}",
            self.heightmap_size.0, self.heightmap_size.1
        )?;
        writeln!(f, "  triangles  {}", self.triangles)?;
        writeln!(f, "  bytes      {}", self.bytes)?;
        if let Some(bounds) = &self.bounds {
            let size = bounds.size();
            writeln!(
                f,
                "  size       {:.2} x {:.2} x {:.2} mm",
                size.x, size.y, size.z
            )?;
        }
        write!(
            f,
            "  watertight {}",
            if self.edges.is_oriented_manifold() {
                "yes"
            } else {
                "no"
            }
        )
    }
}

/// Decode the image at `path`, guessing the format from its contents.
pub fn load_image(path: &Path) -> Result<RasterImage> {
    let decoded = ImageReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("failed to read {}", path.display()))?
        .decode()
        .with_context(|| format!("failed to decode {}", path.display()))?;
    debug!(
        width = decoded.width(),
        height = decoded.height(),
        "image decoded"
    );
    Ok(RasterImage::from_dynamic(&decoded)?)
}

/// Convert `cli.input` into an STL using the resolved settings.
pub fn run(cli: &Cli) -> Result<Summary> {
    let settings = cli.resolve_settings()?;
    let output = cli.output_path();

    let image = load_image(&cli.input)?;
    info!(
        input = %cli.input.display(),
        width = image.width(),
        height = image.height(),
        "converting"
    );

    let lithophane = build_lithophane(&image, &settings.filter, &settings.model)
        .context("failed to build lithophane")?;

    let edges = lithophane.mesh.edge_report();
    if !edges.is_oriented_manifold() {
        warn!(?edges, "mesh is not a closed oriented manifold");
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file =
        File::create(&output).with_context(|| format!("failed to create {}", output.display()))?;
    lithophane
        .stl
        .write_to(BufWriter::new(file))
        .with_context(|| format!("failed to write {}", output.display()))?;

    Ok(Summary {
        output,
        heightmap_size: (lithophane.heightmap.width(), lithophane.heightmap.height()),
        triangles: lithophane.mesh.triangle_count(),
        bytes: lithophane.stl.len(),
        bounds: lithophane.mesh.bounds(),
        edges,
    })
}
