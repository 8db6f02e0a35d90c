//! Relief mesh builder: turns a heightmap into a closed, printable solid.
//!
//! The solid is two grids of identical topology, a top relief surface and a
//! bottom base surface, stitched together along the perimeter by wall
//! triangles. Vertices live in a single preallocated arena:
//!
//! ```text
//! [0, n)      top grid,    index = row * (segs_x + 1) + col
//! [n, 2n)     bottom grid, same addressing offset by n
//! ```
//!
//! Placement happens in `f64` and is narrowed to `f32` on store, so large
//! cylinder radii at shallow curve angles keep their precision.

use nalgebra::Point3;
use tracing::{debug, instrument};

use crate::error::{LithoError, Result};
use crate::geometry::MeshGeometry;
use crate::heightmap::Heightmap;
use crate::settings::ModelSettings;

/// Cylinder radius in millimetres above which a curve is built flat.
const MAX_RADIUS: f64 = 1e12;

/// Grid dimensions derived from the heightmap size and the model settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    /// Heightmap width in pixels.
    pub image_cols: u32,
    /// Heightmap height in pixels.
    pub image_rows: u32,
    /// Frame segments on each side, horizontally.
    pub frame_cols: u32,
    /// Frame segments on each side, vertically.
    pub frame_rows: u32,
    /// Total horizontal segments, image plus both frame sides.
    pub segs_x: u32,
    /// Total vertical segments.
    pub segs_y: u32,
    /// Sheet width in millimetres including the frame.
    pub total_width: f64,
    /// Sheet height in millimetres including the frame.
    pub total_height: f64,
}

impl GridLayout {
    /// Size the grid for a `image_cols` x `image_rows` heightmap.
    pub fn new(image_cols: u32, image_rows: u32, settings: &ModelSettings) -> Result<Self> {
        // Written as a negation so NaN is rejected too.
        if !(settings.width > 0.0 && settings.height > 0.0) {
            return Err(LithoError::invalid_model(format!(
                "model size must be positive, got {}x{}",
                settings.width, settings.height
            )));
        }

        let px_per_mm_x = f64::from(image_cols) / f64::from(settings.width);
        let px_per_mm_y = f64::from(image_rows) / f64::from(settings.height);
        if !px_per_mm_x.is_finite()
            || !px_per_mm_y.is_finite()
            || px_per_mm_x <= 0.0
            || px_per_mm_y <= 0.0
        {
            return Err(LithoError::invalid_model(format!(
                "pixel density undefined for a {image_cols}x{image_rows} image"
            )));
        }

        let frame_segments = |px_per_mm: f64| -> Result<u32> {
            if settings.frame_width <= 0.0 {
                return Ok(0);
            }
            let segments = (f64::from(settings.frame_width) * px_per_mm).round().max(1.0);
            if segments > f64::from(u32::MAX) {
                return Err(LithoError::invalid_model(format!(
                    "frame width {} mm needs too many segments",
                    settings.frame_width
                )));
            }
            Ok(segments as u32)
        };
        let frame_cols = frame_segments(px_per_mm_x)?;
        let frame_rows = frame_segments(px_per_mm_y)?;

        let too_large = || {
            LithoError::invalid_model(format!(
                "{image_cols}x{image_rows} image with a {frame_cols}x{frame_rows} segment frame \
                 is too large"
            ))
        };
        let span = |inner: u32, frame: u32| {
            frame
                .checked_mul(2)
                .and_then(|border| border.checked_add(inner))
                .ok_or_else(too_large)
        };
        let segs_x = span(image_cols, frame_cols)?;
        let segs_y = span(image_rows, frame_rows)?;

        // Both grids must stay addressable with u32 indices.
        let arena = (u64::from(segs_x) + 1)
            .checked_mul(u64::from(segs_y) + 1)
            .and_then(|grid| grid.checked_mul(2));
        if !arena.is_some_and(|n| n <= u64::from(u32::MAX)) {
            return Err(too_large());
        }

        Ok(Self {
            image_cols,
            image_rows,
            frame_cols,
            frame_rows,
            segs_x,
            segs_y,
            total_width: f64::from(settings.total_width()),
            total_height: f64::from(settings.total_height()),
        })
    }

    pub fn has_frame(&self) -> bool {
        self.frame_cols > 0
    }

    /// Vertices per grid row.
    pub fn columns(&self) -> usize {
        self.segs_x as usize + 1
    }

    /// Vertices in one surface grid.
    pub fn grid_vertex_count(&self) -> usize {
        self.columns() * (self.segs_y as usize + 1)
    }

    /// Arena index of the top-surface vertex at `(row, col)`.
    #[inline]
    pub fn index(&self, row: u32, col: u32) -> u32 {
        row * (self.segs_x + 1) + col
    }

    /// Two top and two bottom triangles per cell, two wall triangles per
    /// perimeter segment.
    pub fn triangle_count(&self) -> usize {
        let (sx, sy) = (self.segs_x as usize, self.segs_y as usize);
        4 * sx * sy + 4 * (sx + sy)
    }

    /// Whether the grid vertex falls on the frame, including the seam
    /// between frame and image.
    fn in_frame(&self, row: u32, col: u32) -> bool {
        if !self.has_frame() {
            return false;
        }
        let col = i64::from(col) - i64::from(self.frame_cols);
        let row = i64::from(row) - i64::from(self.frame_rows);
        col <= 0
            || row <= 0
            || col >= i64::from(self.image_cols)
            || row >= i64::from(self.image_rows)
    }

    /// Flat-sheet position of a grid vertex, centred on the origin with
    /// row 0 at the top edge.
    fn flat_xy(&self, row: u32, col: u32) -> (f64, f64) {
        let dx = self.total_width / f64::from(self.segs_x);
        let dy = self.total_height / f64::from(self.segs_y);
        (
            -self.total_width / 2.0 + f64::from(col) * dx,
            self.total_height / 2.0 - f64::from(row) * dy,
        )
    }
}

/// Cylinder the flat sheet is wrapped around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Curvature {
    /// Subtended angle in radians.
    pub angle: f64,
    /// Radius of the base shell.
    pub radius: f64,
    total_width: f64,
}

impl Curvature {
    /// `None` for a flat sheet.
    pub fn new(curve_angle_degrees: f32, total_width: f64) -> Option<Self> {
        if curve_angle_degrees <= 0.0 {
            return None;
        }
        let angle = f64::from(curve_angle_degrees).to_radians();
        let radius = total_width / angle;
        // Beyond this radius (R + z) cos a - R cancels to zero in f64.
        if !radius.is_finite() || radius > MAX_RADIUS {
            return None;
        }
        Some(Self {
            angle,
            radius,
            total_width,
        })
    }

    /// Wrap a flat point `(x, y)` at distance `offset` above the base shell.
    ///
    /// The cylinder axis runs along Y through `(0, _, -radius)`, so the
    /// sheet centre stays at the origin.
    pub fn wrap(&self, x: f64, y: f64, offset: f64) -> [f64; 3] {
        let a = x / self.total_width * self.angle;
        let r = self.radius + offset;
        [r * a.sin(), y, r * a.cos() - self.radius]
    }
}

/// Build the closed relief solid for `heightmap`.
#[instrument(skip_all, fields(width = heightmap.width(), height = heightmap.height()))]
pub fn build_relief(heightmap: &Heightmap, settings: &ModelSettings) -> Result<MeshGeometry> {
    settings.validate()?;

    let (cols, rows) = (heightmap.width(), heightmap.height());
    let expected = cols as usize * rows as usize;
    if expected == 0 || heightmap.values().len() != expected {
        return Err(LithoError::EmptyHeightmap {
            expected,
            got: heightmap.values().len(),
        });
    }

    let layout = GridLayout::new(cols, rows, settings)?;

    let smoothed;
    let heightmap = if settings.smoothing && settings.smoothing_iterations > 0 {
        debug!(iterations = settings.smoothing_iterations, "smoothing heightmap");
        smoothed = heightmap.smoothed(settings.smoothing_iterations);
        &smoothed
    } else {
        heightmap
    };

    debug!(
        segs_x = layout.segs_x,
        segs_y = layout.segs_y,
        frame_cols = layout.frame_cols,
        frame_rows = layout.frame_rows,
        "relief grid"
    );

    let mut mesh =
        MeshGeometry::with_capacity(2 * layout.grid_vertex_count(), layout.triangle_count());
    place_vertices(&mut mesh, &layout, heightmap, settings);
    triangulate(&mut mesh, &layout);

    debug!(
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "relief mesh built"
    );
    Ok(mesh)
}

/// Height of the top surface above z = 0 at a grid vertex.
fn vertex_height(
    layout: &GridLayout,
    heightmap: &Heightmap,
    settings: &ModelSettings,
    row: u32,
    col: u32,
) -> f64 {
    let base = f64::from(settings.base_height);
    if layout.in_frame(row, col) {
        return base + f64::from(settings.frame_depth);
    }
    let sample = heightmap.get(
        i64::from(col) - i64::from(layout.frame_cols),
        i64::from(row) - i64::from(layout.frame_rows),
    );
    base + f64::from(sample) * f64::from(settings.depth)
}

/// Fill the arena: top grid first, then the bottom grid.
fn place_vertices(
    mesh: &mut MeshGeometry,
    layout: &GridLayout,
    heightmap: &Heightmap,
    settings: &ModelSettings,
) {
    let curvature = Curvature::new(settings.curve_angle, layout.total_width);
    let to_point = |[x, y, z]: [f64; 3]| Point3::new(x as f32, y as f32, z as f32);

    for row in 0..=layout.segs_y {
        for col in 0..=layout.segs_x {
            let (x, y) = layout.flat_xy(row, col);
            let z = vertex_height(layout, heightmap, settings, row, col);
            let p = match curvature {
                Some(curve) => curve.wrap(x, y, z),
                None => [x, y, z],
            };
            mesh.vertices.push(to_point(p));
        }
    }

    for row in 0..=layout.segs_y {
        for col in 0..=layout.segs_x {
            let (x, y) = layout.flat_xy(row, col);
            let p = match curvature {
                Some(curve) => curve.wrap(x, y, 0.0),
                None => [x, y, 0.0],
            };
            mesh.vertices.push(to_point(p));
        }
    }
}

/// Emit surface and wall triangles for every cell.
///
/// Cell corners, looking down on the top surface:
///
/// ```text
/// a ---- b      row
/// |      |
/// c ---- d      row + 1
/// ```
///
/// Top triangles are counter-clockwise from above, bottom triangles are the
/// same triangles reversed. A wall over the top boundary edge `u -> v`
/// (in top-surface winding order) is `[v, u, u'] [v, u', v']`, where primes
/// are the matching bottom vertices, so every edge is traversed once in each
/// direction.
fn triangulate(mesh: &mut MeshGeometry, layout: &GridLayout) {
    let offset = layout.grid_vertex_count() as u32;
    let last_col = layout.segs_x - 1;
    let last_row = layout.segs_y - 1;

    let wall = |u: u32, v: u32| [[v, u, u + offset], [v, u + offset, v + offset]];

    for row in 0..layout.segs_y {
        for col in 0..layout.segs_x {
            let a = layout.index(row, col);
            let b = layout.index(row, col + 1);
            let c = layout.index(row + 1, col);
            let d = layout.index(row + 1, col + 1);

            mesh.triangles.push([c, d, b]);
            mesh.triangles.push([c, b, a]);

            mesh.triangles.push([c + offset, b + offset, d + offset]);
            mesh.triangles.push([c + offset, a + offset, b + offset]);

            if col == 0 {
                mesh.triangles.extend(wall(a, c));
            }
            if col == last_col {
                mesh.triangles.extend(wall(d, b));
            }
            if row == 0 {
                mesh.triangles.extend(wall(b, a));
            }
            if row == last_row {
                mesh.triangles.extend(wall(c, d));
            }
        }
    }
}
