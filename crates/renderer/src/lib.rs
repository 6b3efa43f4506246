//! Image rendering for index maps.
//!
//! Implements the raster-to-pixels half of the pipeline:
//! - Named color ramps with 256-entry lookup tables
//! - Percentile stretch colorization into RGBA overlays
//! - True-color band stretch and RGB stacking
//! - PNG encoding (indexed, RGBA, RGB)

pub mod colorize;
pub mod colormap;
pub mod png;
pub mod truecolor;

pub use colorize::{colorize, colorize_with, resolve_range, ColorizedLayer};
pub use colormap::{ColorRamp, DEFAULT_RAMP, RAMP_NAMES};
pub use truecolor::{compose_true_color, stretch_band, StretchPercentiles};
