//! Litho Core Library - image to lithophane relief conversion
//!
//! This library provides the stateless core of the converter: raster
//! filtering, heightmap extraction, relief mesh construction and binary STL
//! serialization. Every stage is a pure function of its inputs.

pub mod error;
pub mod filter;
pub mod geometry;
pub mod heightmap;
pub mod pipeline;
pub mod raster;
pub mod relief;
pub mod settings;
pub mod stl;

// Re-export commonly used types
pub use error::{LithoError, Result};
pub use filter::apply_filters;
pub use geometry::{Bounds, EdgeReport, MeshGeometry, Triangle};
pub use heightmap::{extract_heightmap, Heightmap};
pub use pipeline::{build_lithophane, generate_heightmap, Lithophane};
pub use raster::{ImageOpsSurface, RasterImage, RasterSurface};
pub use relief::{build_relief, GridLayout};
pub use settings::{FilterSettings, ModelSettings};
pub use stl::{parse_binary_stl, to_binary_stl, BinaryMeshBuffer};
