//! Coordinate reference system transformations.
//!
//! Implements map projections from scratch without external dependencies.

pub mod mercator;
pub mod transform;
pub mod transverse_mercator;

pub use transform::{densified_edges, CrsTransform, Projection, DEFAULT_DENSIFY_POINTS};
pub use transverse_mercator::TransverseMercator;
