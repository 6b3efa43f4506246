//! Raster sources feeding the layer pipeline.
//!
//! Every source hands the pipeline an EPSG:4326 grid. Sources differ in how
//! they honour a clip window and in the optional conform step that runs
//! between masking and upsampling.

use std::path::{Path, PathBuf};

use grid_processor::{
    expand_to_clip_bounds, load_raster, load_raster_onto, read_point_table, reconstruct_grid, unsharp_mask,
    EnhancementConfig, LoadedRaster, WarpTarget,
};
use image::RgbImage;
use raster_common::{BoundingBox, ClipBounds, GeoTransform, RasterGrid, RenderResult};
use renderer::{compose_true_color, StretchPercentiles};
use tracing::{debug, info};

/// Display name of a file: its stem.
pub fn layer_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A single-band grid source.
pub trait RasterSource {
    /// Name shown in legends and the layer control.
    fn name(&self) -> &str;

    /// Load the grid in EPSG:4326, windowed to `clip` where supported.
    fn load(&self, clip: Option<&ClipBounds>) -> RenderResult<LoadedRaster>;

    /// Adjust the masked grid to the clip bounds before upsampling.
    fn conform_to_clip(
        &self,
        grid: RasterGrid,
        transform: GeoTransform,
        _clip: &ClipBounds,
    ) -> RenderResult<(RasterGrid, GeoTransform)> {
        Ok((grid, transform))
    }
}

/// A GeoTIFF on disk.
#[derive(Debug, Clone)]
pub struct GeoTiffSource {
    path: PathBuf,
    name: String,
}

impl GeoTiffSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = layer_name(&path);
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RasterSource for GeoTiffSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self, clip: Option<&ClipBounds>) -> RenderResult<LoadedRaster> {
        load_raster(&self.path, clip)
    }
}

/// A `longitude,latitude,value` point table.
///
/// Tables cover only the exported pixels, so when clipping the grid is padded
/// with no-data out to the clip bounds.
#[derive(Debug, Clone)]
pub struct PointTableSource {
    path: PathBuf,
    name: String,
}

impl PointTableSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = layer_name(&path);
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RasterSource for PointTableSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self, _clip: Option<&ClipBounds>) -> RenderResult<LoadedRaster> {
        let points = read_point_table(&self.path)?;
        let (grid, transform) = reconstruct_grid(&points)?;
        let bounds = transform.bounds(grid.rows(), grid.cols());
        info!(
            path = %self.path.display(),
            points = points.len(),
            rows = grid.rows(),
            cols = grid.cols(),
            "Loaded point table"
        );
        Ok(LoadedRaster {
            grid,
            transform,
            bounds,
        })
    }

    fn conform_to_clip(
        &self,
        grid: RasterGrid,
        transform: GeoTransform,
        clip: &ClipBounds,
    ) -> RenderResult<(RasterGrid, GeoTransform)> {
        expand_to_clip_bounds(&grid, &transform, clip)
    }
}

/// A stretched RGB composite and where it sits on the map.
#[derive(Debug, Clone)]
pub struct TrueColorComposite {
    pub image: RgbImage,
    pub bounds: BoundingBox,
}

/// Red, green and blue band rasters of one scene.
#[derive(Debug, Clone)]
pub struct TrueColorSource {
    red: PathBuf,
    green: PathBuf,
    blue: PathBuf,
}

impl TrueColorSource {
    pub fn new(red: impl Into<PathBuf>, green: impl Into<PathBuf>, blue: impl Into<PathBuf>) -> Self {
        Self {
            red: red.into(),
            green: green.into(),
            blue: blue.into(),
        }
    }

    /// Load the three bands on the red band's grid and stack them.
    ///
    /// Only the sharpening settings of `enhancement` apply to true color.
    pub fn compose(
        &self,
        clip: Option<&ClipBounds>,
        enhancement: &EnhancementConfig,
        percentiles: StretchPercentiles,
    ) -> RenderResult<TrueColorComposite> {
        let red = load_raster(&self.red, clip)?;
        let target = WarpTarget {
            transform: red.transform,
            rows: red.grid.rows(),
            cols: red.grid.cols(),
        };
        let green = load_raster_onto(&self.green, clip, &target)?;
        let blue = load_raster_onto(&self.blue, clip, &target)?;
        debug!(rows = target.rows, cols = target.cols, "Bands aligned to red reference grid");

        let bands = [red.grid, green, blue];
        let [r, g, b] = if enhancement.sharpen {
            bands.map(|band| unsharp_mask(&band, enhancement.sharpen_radius, enhancement.sharpen_amount))
        } else {
            bands
        };

        let image = compose_true_color(&r, &g, &b, percentiles)?;
        Ok(TrueColorComposite {
            image,
            bounds: red.bounds,
        })
    }
}
