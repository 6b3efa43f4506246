//! Common types shared across the index map rendering crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod geojson;
pub mod geotransform;
pub mod grid;

pub use bbox::{BoundingBox, ClipBounds};
pub use crs::{Crs, OUTPUT_EPSG};
pub use error::{RenderError, RenderResult};
pub use geojson::{AoiDocument, AreaOfInterest, GeoJson, Geometry, GeometryVisitor, PolygonCollector};
pub use geotransform::GeoTransform;
pub use grid::RasterGrid;
