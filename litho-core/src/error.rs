//! Error types for the lithophane pipeline.

use thiserror::Error;

/// Result type for lithophane operations.
pub type Result<T> = std::result::Result<T, LithoError>;

/// Errors raised by the pipeline stages.
///
/// Every variant is a deterministic validation failure raised before any
/// output is produced.
#[derive(Debug, Error)]
pub enum LithoError {
    /// Image has a zero dimension or a pixel buffer of the wrong length.
    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Reported width in pixels.
        width: u32,
        /// Reported height in pixels.
        height: u32,
    },

    /// Physical model parameters cannot produce a mesh.
    #[error("invalid model settings: {message}")]
    InvalidModelSettings {
        /// What was wrong.
        message: String,
    },

    /// Filter parameters outside their documented range.
    #[error("invalid filter settings: {message}")]
    InvalidFilterSettings {
        /// What was wrong.
        message: String,
    },

    /// Heightmap sample count does not match the image dimensions.
    #[error("heightmap has {got} samples, expected {expected}")]
    EmptyHeightmap {
        /// `width * height` of the source image.
        expected: usize,
        /// Number of samples supplied.
        got: usize,
    },

    /// Serializer was handed a mesh without triangles.
    #[error("mesh has no triangles")]
    EmptyMesh,

    /// Mesh cannot be written: dangling vertex indices or too many triangles.
    #[error("invalid mesh: {message}")]
    InvalidMesh {
        /// What was wrong.
        message: String,
    },

    /// Source bytes could not be decoded as an image.
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    /// Binary STL data is truncated or inconsistent.
    #[error("malformed STL: {message}")]
    MalformedStl {
        /// Description of the problem.
        message: String,
    },

    /// Writing a serialized buffer failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LithoError {
    /// Create an `InvalidModelSettings` error with the given message.
    #[must_use]
    pub fn invalid_model(message: impl Into<String>) -> Self {
        Self::InvalidModelSettings {
            message: message.into(),
        }
    }

    /// Create an `InvalidMesh` error with the given message.
    #[must_use]
    pub fn invalid_mesh(message: impl Into<String>) -> Self {
        Self::InvalidMesh {
            message: message.into(),
        }
    }

    /// Create an `InvalidFilterSettings` error with the given message.
    #[must_use]
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilterSettings {
            message: message.into(),
        }
    }

    /// Create a `MalformedStl` error with the given message.
    #[must_use]
    pub fn malformed_stl(message: impl Into<String>) -> Self {
        Self::MalformedStl {
            message: message.into(),
        }
    }
}
