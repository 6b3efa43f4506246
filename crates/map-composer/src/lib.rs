//! Index map composition.
//!
//! Ties the raster pipeline to interactive map documents:
//!
//! ```text
//!   RasterSource ──► LayerPipeline ──► PreparedLayer ──► colorize ──► PNG
//!   (GeoTIFF, CSV,     (window, sharpen,                               │
//!    RGB bands)         mask, upsample,                                ▼
//!                       smooth, re-mask)              MapDocument ──► HTML
//! ```
//!
//! Renderers: [`IndexMapRenderer`], [`MultiIndexMapRenderer`],
//! [`CsvMapRenderer`], [`TrueColorRenderer`], [`OverlayMapRenderer`], plus
//! [`export_indices_csv`] and [`render_compare_all`].

pub mod compare;
pub mod config;
pub mod document;
pub mod pipeline;
pub mod renderers;
pub mod source;

pub use compare::{needs_rebuild, render_compare_all, render_compare_all_with, CompareOutcome, COMPARE_ALL_FILE};
pub use config::{RenderOptions, NO_TILES};
pub use document::{
    png_data_uri, AoiOverlaySpec, BaseTiles, ImageOverlaySpec, LayerControlSpec, LegendSpec, MapDocument,
    TileLayerSpec, ESRI_WORLD_IMAGERY, ESRI_WORLD_IMAGERY_URL,
};
pub use pipeline::{LayerPipeline, PreparedLayer};
pub use renderers::{
    export_indices_csv, list_inputs, CsvMapRenderer, IndexMapRenderer, MultiIndexMapRenderer, OverlayMapRenderer,
    TrueColorRenderer, CLOSE_ZOOM, DEFAULT_ZOOM, TRUE_COLOR_LAYER,
};
pub use source::{
    layer_name, GeoTiffSource, PointTableSource, RasterSource, TrueColorComposite, TrueColorSource,
};

pub use raster_common::{RenderError, RenderResult};
