//! Grid processing for index maps.
//!
//! Everything between a raster file on disk and a finished `f32` grid in
//! geographic coordinates lives here:
//!
//! - **Loading**: windowed GeoTIFF reads, reprojected to EPSG:4326
//! - **AOI**: clip bounds from GeoJSON polygons, pixel-centre masking
//! - **Enhancement**: unsharp mask, bilinear upsampling, gaussian smoothing
//! - **Point tables**: `longitude,latitude,value` CSV in both directions
//!
//! # Architecture
//!
//! ```text
//! GeoTIFF ──► loader::read_native(clip window)
//!                  │
//!                  ▼
//!        projection::warp_bilinear ──► EPSG:4326 grid
//!                  │
//!                  ▼
//!   EnhancementChain::apply
//!     sharpen ─► mask ─► conform ─► upsample ─► smooth ─► re-mask
//!                  │
//!                  ▼
//!            RasterGrid + GeoTransform
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{load_aoi, load_raster, require_clip_bounds, EnhancementChain, EnhancementConfig, NoConform};
//!
//! let aoi = load_aoi(&["field.geojson"])?;
//! let clip = require_clip_bounds(&aoi, 0.3)?;
//! let raster = load_raster("ndvi.tif", clip.as_ref())?;
//!
//! let chain = EnhancementChain::new(EnhancementConfig::compare_all());
//! let (grid, transform) = chain.apply(raster.grid, raster.transform, &aoi, clip.as_ref(), &NoConform)?;
//! ```

pub mod aoi;
pub mod config;
pub mod csv_grid;
pub mod enhance;
pub mod loader;
pub mod mask;
pub mod projection;
pub mod writer;

// Re-export commonly used types at crate root
pub use aoi::{load_aoi, require_clip_bounds, resolve_clip_bounds, ResolvedBounds};
pub use config::EnhancementConfig;
pub use csv_grid::{
    expand_to_clip_bounds, parse_point_table, read_point_table, reconstruct_grid, write_point_table, GridPoint,
};
pub use enhance::{gaussian_blur, smooth, unsharp_mask, upsample, ClipConform, EnhancementChain, NoConform};
pub use loader::{
    load_raster, load_raster_onto, read_metadata, read_native, LoadedRaster, NativeRaster, PixelWindow,
    RasterMetadata,
};
pub use mask::{mask_with_aoi, mask_with_polygons, rasterize_polygons, Polygon};
pub use projection::{
    bilinear_interpolate, calculate_default_transform, reproject_to_geographic, warp_bilinear,
    WarpTarget,
};
pub use raster_common::{RenderError, RenderResult};
pub use writer::{write_atomic, write_atomic_with};
