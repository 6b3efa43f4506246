//! Error types for the index map rendering pipeline.

use std::path::Path;

use thiserror::Error;

/// Result type alias using RenderError.
pub type RenderResult<T> = Result<T, RenderError>;

/// Primary error type for every stage of the pipeline.
///
/// None of these are retried inside the core; a failed render leaves no
/// output artifact behind.
#[derive(Debug, Error)]
pub enum RenderError {
    // === Input Errors ===
    #[error("Input not found: {path}: {reason}")]
    InputNotFound { path: String, reason: String },

    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Invalid point table: {0}")]
    InvalidTable(String),

    #[error("Failed to decode raster: {0}")]
    Decode(String),

    // === Grid Errors ===
    #[error(
        "Points do not form a regular grid: {distinct_lons} longitudes x {distinct_lats} latitudes != {rows} rows"
    )]
    IrregularGrid {
        distinct_lons: usize,
        distinct_lats: usize,
        rows: usize,
    },

    #[error("Raster has no valid pixels: {0}")]
    EmptyRaster(String),

    #[error("Degenerate stretch range: min={min}, max={max}")]
    DegenerateStretch { min: f64, max: f64 },

    #[error("Invalid geotransform: {0}")]
    InvalidTransform(String),

    // === Configuration / Output Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Create an InputNotFound error for a path.
    pub fn input_not_found(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        Self::InputNotFound {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an EmptyRaster error.
    pub fn empty_raster(msg: impl Into<String>) -> Self {
        Self::EmptyRaster(msg.into())
    }

    /// Create an InvalidTransform error.
    pub fn invalid_transform(msg: impl Into<String>) -> Self {
        Self::InvalidTransform(msg.into())
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an InvalidTable error.
    pub fn invalid_table(msg: impl Into<String>) -> Self {
        Self::InvalidTable(msg.into())
    }

    /// Whether the pipeline corrects this condition itself instead of failing.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RenderError::DegenerateStretch { .. })
    }
}

impl From<tiff::TiffError> for RenderError {
    fn from(err: tiff::TiffError) -> Self {
        RenderError::Decode(err.to_string())
    }
}
