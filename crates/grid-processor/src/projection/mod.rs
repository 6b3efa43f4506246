//! Projection utilities for grid processing.
//!
//! This module handles coordinate transformations and interpolation
//! for re-projecting grids to geographic coordinates.

pub mod interpolation;
pub mod reproject;

pub use interpolation::bilinear_interpolate;
pub use reproject::{calculate_default_transform, reproject_to_geographic, warp_bilinear, WarpTarget};
