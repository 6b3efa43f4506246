//! Map renderers.
//!
//! Each renderer is a thin composition over [`LayerPipeline`]: build the
//! prepared layer(s), colorize, encode to PNG and assemble a [`MapDocument`].
//! Renderers validate their [`RenderOptions`] once at construction.

use std::path::{Path, PathBuf};

use grid_processor::{load_aoi, require_clip_bounds, write_point_table};
use raster_common::{AreaOfInterest, RenderError, RenderResult};
use renderer::png::{encode_rgb, encode_rgba};
use renderer::{colorize_with, ColorRamp, StretchPercentiles};
use tracing::{debug, info, instrument, warn};

use crate::config::RenderOptions;
use crate::document::{BaseTiles, LegendSpec, MapDocument};
use crate::pipeline::{LayerPipeline, PreparedLayer};
use crate::source::{GeoTiffSource, PointTableSource, RasterSource, TrueColorComposite, TrueColorSource};

/// Initial zoom of index maps.
pub const DEFAULT_ZOOM: u8 = 11;

/// Initial zoom of true-color and overlay maps.
pub const CLOSE_ZOOM: u8 = 12;

/// Name of the true-color overlay.
pub const TRUE_COLOR_LAYER: &str = "True color";

const LEGEND_STOPS: usize = 10;
const GRAYSCALE: [&str; 2] = ["#000000", "#FFFFFF"];

/// Files in `dir` with the given extension, sorted by name.
pub fn list_inputs(dir: &Path, extension: &str) -> RenderResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| RenderError::input_not_found(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let matches = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// A colorized layer encoded for embedding.
struct EncodedLayer {
    png: Vec<u8>,
    min: f64,
    max: f64,
}

fn encode_layer(layer: &PreparedLayer, ramp: &ColorRamp, options: &RenderOptions) -> RenderResult<EncodedLayer> {
    let colorized = colorize_with(layer.grid(), ramp, options.vmin, options.vmax, options.opacity)?;
    let png = encode_rgba(&colorized.image)?;
    debug!(
        layer = layer.name(),
        min = colorized.min,
        max = colorized.max,
        bytes = png.len(),
        "Encoded layer"
    );
    Ok(EncodedLayer {
        png,
        min: colorized.min,
        max: colorized.max,
    })
}

fn index_legend(name: &str, ramp: &ColorRamp, encoded: &EncodedLayer) -> LegendSpec {
    LegendSpec::new(
        format!("{} (min={:.3}, max={:.3})", name, encoded.min, encoded.max),
        ramp.hex_stops(LEGEND_STOPS),
        encoded.min,
        encoded.max,
    )
}

fn grayscale() -> Vec<String> {
    GRAYSCALE.iter().map(|c| c.to_string()).collect()
}

/// State shared by every renderer: validated options, ramp and tiles.
#[derive(Debug, Clone)]
struct RenderContext {
    options: RenderOptions,
    ramp: ColorRamp,
    tiles: BaseTiles,
}

impl RenderContext {
    fn new(options: RenderOptions) -> RenderResult<Self> {
        options.validate()?;
        let ramp = ColorRamp::named(&options.colormap)?;
        let tiles = BaseTiles::resolve(&options.base_tiles, options.tile_attribution.as_deref())?;
        Ok(Self { options, ramp, tiles })
    }

    fn zoom(&self, default: u8) -> u8 {
        self.options.zoom_start.unwrap_or(default)
    }

    fn prepare(&self, source: &dyn RasterSource, aoi: &AreaOfInterest) -> RenderResult<PreparedLayer> {
        LayerPipeline::new(&self.options, aoi)?.prepare(source)
    }

    /// One visible overlay with its legend, an AOI outline and a layer control.
    fn single_layer_document(&self, layer: &PreparedLayer) -> RenderResult<MapDocument> {
        let encoded = encode_layer(layer, &self.ramp, &self.options)?;
        let mut document = MapDocument::new(layer.name(), &layer.view_bounds(), self.zoom(DEFAULT_ZOOM), &self.tiles);
        document
            .add_image_overlay(layer.name(), &encoded.png, layer.bounds(), true, true)
            .add_legend(index_legend(layer.name(), &self.ramp, &encoded))
            .add_aoi(layer.aoi())
            .with_layer_control(true);
        Ok(document)
    }
}

/// Single GeoTIFF index map.
#[derive(Debug, Clone)]
pub struct IndexMapRenderer {
    ctx: RenderContext,
}

impl IndexMapRenderer {
    pub fn new(options: RenderOptions) -> RenderResult<Self> {
        Ok(Self {
            ctx: RenderContext::new(options)?,
        })
    }

    pub fn options(&self) -> &RenderOptions {
        &self.ctx.options
    }

    #[instrument(skip_all, fields(raster = %raster.display()))]
    pub fn prepare(&self, raster: &Path, aoi_paths: &[PathBuf]) -> RenderResult<PreparedLayer> {
        let aoi = load_aoi(aoi_paths)?;
        self.ctx.prepare(&GeoTiffSource::new(raster), &aoi)
    }

    /// Assemble the map document of a prepared layer.
    pub fn document(&self, layer: &PreparedLayer) -> RenderResult<MapDocument> {
        self.ctx.single_layer_document(layer)
    }

    #[instrument(skip_all, fields(layer = layer.name(), output = %output.display()))]
    pub fn render_html(&self, layer: &PreparedLayer, output: &Path) -> RenderResult<PathBuf> {
        self.document(layer)?.write_html(output)
    }

    pub fn render(&self, raster: &Path, aoi_paths: &[PathBuf], output: &Path) -> RenderResult<PathBuf> {
        let layer = self.prepare(raster, aoi_paths)?;
        self.render_html(&layer, output)
    }

    /// Write the finite pixels of a prepared layer as a point table.
    #[instrument(skip_all, fields(layer = layer.name(), output = %output.display()))]
    pub fn export_csv(&self, layer: &PreparedLayer, output: &Path) -> RenderResult<usize> {
        let rows = write_point_table(layer.grid(), layer.transform(), output)?;
        info!(rows, "Exported point table");
        Ok(rows)
    }
}

/// Several GeoTIFF indices as toggleable layers of one map.
#[derive(Debug, Clone)]
pub struct MultiIndexMapRenderer {
    ctx: RenderContext,
}

impl MultiIndexMapRenderer {
    pub fn new(options: RenderOptions) -> RenderResult<Self> {
        Ok(Self {
            ctx: RenderContext::new(options)?,
        })
    }

    pub fn options(&self) -> &RenderOptions {
        &self.ctx.options
    }

    #[instrument(skip_all, fields(rasters = rasters.len()))]
    pub fn prepare(&self, rasters: &[PathBuf], aoi_paths: &[PathBuf]) -> RenderResult<Vec<PreparedLayer>> {
        if rasters.is_empty() {
            return Err(RenderError::invalid_config("at least one index raster is required"));
        }
        let aoi = load_aoi(aoi_paths)?;
        let pipeline = LayerPipeline::new(&self.ctx.options, &aoi)?;
        rasters
            .iter()
            .map(|path| pipeline.prepare(&GeoTiffSource::new(path)))
            .collect()
    }

    /// One group per layer named `"{name} ({min}..{max})"`; only the first
    /// is visible. Each legend follows its group's visibility.
    pub fn document(&self, layers: &[PreparedLayer]) -> RenderResult<MapDocument> {
        let first = layers
            .first()
            .ok_or_else(|| RenderError::invalid_config("at least one index raster is required"))?;
        let title = layers.iter().map(|l| l.name()).collect::<Vec<_>>().join(", ");
        let view = layers[1..]
            .iter()
            .fold(first.view_bounds(), |acc, layer| acc.union(&layer.view_bounds()));
        let mut document = MapDocument::new(title, &view, self.ctx.zoom(DEFAULT_ZOOM), &self.ctx.tiles);

        for (position, layer) in layers.iter().enumerate() {
            let encoded = encode_layer(layer, &self.ctx.ramp, &self.ctx.options)?;
            let group = format!("{} ({:.2}..{:.2})", layer.name(), encoded.min, encoded.max);
            document
                .add_image_overlay(group.clone(), &encoded.png, layer.bounds(), position == 0, true)
                .add_legend(index_legend(layer.name(), &self.ctx.ramp, &encoded).for_layer(group));
        }

        document.add_aoi(first.aoi()).with_layer_control(false);
        Ok(document)
    }

    #[instrument(skip_all, fields(layers = layers.len(), output = %output.display()))]
    pub fn render_html(&self, layers: &[PreparedLayer], output: &Path) -> RenderResult<PathBuf> {
        self.document(layers)?.write_html(output)
    }

    pub fn render(&self, rasters: &[PathBuf], aoi_paths: &[PathBuf], output: &Path) -> RenderResult<PathBuf> {
        let layers = self.prepare(rasters, aoi_paths)?;
        self.render_html(&layers, output)
    }
}

/// Map of a `longitude,latitude,value` point table.
#[derive(Debug, Clone)]
pub struct CsvMapRenderer {
    ctx: RenderContext,
}

impl CsvMapRenderer {
    pub fn new(options: RenderOptions) -> RenderResult<Self> {
        Ok(Self {
            ctx: RenderContext::new(options)?,
        })
    }

    pub fn options(&self) -> &RenderOptions {
        &self.ctx.options
    }

    #[instrument(skip_all, fields(table = %table.display()))]
    pub fn prepare(&self, table: &Path, aoi_paths: &[PathBuf]) -> RenderResult<PreparedLayer> {
        let aoi = load_aoi(aoi_paths)?;
        self.ctx.prepare(&PointTableSource::new(table), &aoi)
    }

    pub fn document(&self, layer: &PreparedLayer) -> RenderResult<MapDocument> {
        self.ctx.single_layer_document(layer)
    }

    #[instrument(skip_all, fields(layer = layer.name(), output = %output.display()))]
    pub fn render_html(&self, layer: &PreparedLayer, output: &Path) -> RenderResult<PathBuf> {
        self.document(layer)?.write_html(output)
    }

    pub fn render(&self, table: &Path, aoi_paths: &[PathBuf], output: &Path) -> RenderResult<PathBuf> {
        let layer = self.prepare(table, aoi_paths)?;
        self.render_html(&layer, output)
    }
}

/// Compose red, green and blue bands over the padded AOI bounds.
///
/// The AOI window is applied whether or not `clip` is set.
fn compose_bands(
    options: &RenderOptions,
    bands: &TrueColorSource,
    aoi: &AreaOfInterest,
) -> RenderResult<TrueColorComposite> {
    let clip = require_clip_bounds(aoi, options.padding_factor)?;
    let percentiles = StretchPercentiles {
        lower: options.stretch_lower,
        upper: options.stretch_upper,
    };
    let composite = bands.compose(clip.as_ref(), &options.enhancement, percentiles)?;
    info!(
        width = composite.image.width(),
        height = composite.image.height(),
        "Composed true color"
    );
    Ok(composite)
}

/// RGB composite of three band rasters.
#[derive(Debug, Clone)]
pub struct TrueColorRenderer {
    ctx: RenderContext,
}

impl TrueColorRenderer {
    pub fn new(options: RenderOptions) -> RenderResult<Self> {
        Ok(Self {
            ctx: RenderContext::new(options)?,
        })
    }

    pub fn options(&self) -> &RenderOptions {
        &self.ctx.options
    }

    #[instrument(skip_all)]
    pub fn prepare(&self, bands: &TrueColorSource, aoi: &AreaOfInterest) -> RenderResult<TrueColorComposite> {
        compose_bands(&self.ctx.options, bands, aoi)
    }

    pub fn document(&self, composite: &TrueColorComposite, aoi: &AreaOfInterest) -> RenderResult<MapDocument> {
        let png = encode_rgb(&composite.image)?;
        let caption = format!(
            "RGB composite ({}-{}%)",
            self.ctx.options.stretch_lower.trunc(),
            self.ctx.options.stretch_upper.trunc()
        );
        let mut document = MapDocument::new(
            TRUE_COLOR_LAYER,
            &composite.bounds,
            self.ctx.zoom(CLOSE_ZOOM),
            &self.ctx.tiles,
        );
        document
            .add_image_overlay(TRUE_COLOR_LAYER, &png, &composite.bounds, true, true)
            .add_aoi(aoi)
            .add_legend(LegendSpec::new(caption, grayscale(), 0.0, 255.0))
            .with_layer_control(true)
            .fit_to(&composite.bounds);
        Ok(document)
    }

    #[instrument(skip_all, fields(output = %output.display()))]
    pub fn render(&self, bands: &TrueColorSource, aoi_paths: &[PathBuf], output: &Path) -> RenderResult<PathBuf> {
        let aoi = load_aoi(aoi_paths)?;
        let composite = self.prepare(bands, &aoi)?;
        self.document(&composite, &aoi)?.write_html(output)
    }
}

/// True-color base image with point-table index layers on top.
#[derive(Debug, Clone)]
pub struct OverlayMapRenderer {
    ctx: RenderContext,
}

impl OverlayMapRenderer {
    pub fn new(options: RenderOptions) -> RenderResult<Self> {
        Ok(Self {
            ctx: RenderContext::new(options)?,
        })
    }

    pub fn options(&self) -> &RenderOptions {
        &self.ctx.options
    }

    /// Point tables in `dir`, sorted by name and limited to `indices` stems
    /// when any are given.
    pub fn select_tables(dir: &Path, indices: &[String]) -> RenderResult<Vec<PathBuf>> {
        let mut tables = list_inputs(dir, "csv")?;
        if !indices.is_empty() {
            tables.retain(|path| indices.iter().any(|name| *name == crate::source::layer_name(path)));
        }
        if tables.is_empty() {
            return Err(RenderError::input_not_found(
                dir,
                "no CSV point tables found (check the index filter)",
            ));
        }
        Ok(tables)
    }

    pub fn document(
        &self,
        composite: &TrueColorComposite,
        layers: &[PreparedLayer],
        aoi: &AreaOfInterest,
    ) -> RenderResult<MapDocument> {
        let png = encode_rgb(&composite.image)?;
        let mut document = MapDocument::new(
            TRUE_COLOR_LAYER,
            &composite.bounds,
            self.ctx.zoom(CLOSE_ZOOM),
            &self.ctx.tiles,
        );
        document
            .add_image_overlay(TRUE_COLOR_LAYER, &png, &composite.bounds, true, false)
            .add_aoi(aoi);

        for (position, layer) in layers.iter().enumerate() {
            let encoded = encode_layer(layer, &self.ctx.ramp, &self.ctx.options)?;
            document.add_image_overlay(layer.name(), &encoded.png, layer.bounds(), position == 0, true);
        }

        document
            .add_legend(LegendSpec::new(
                format!("{} (relative scale)", self.ctx.ramp.name()),
                grayscale(),
                0.0,
                1.0,
            ))
            .with_layer_control(false)
            .fit_to(&composite.bounds);
        Ok(document)
    }

    #[instrument(skip_all, fields(tables = %table_dir.display(), output = %output.display()))]
    pub fn render(
        &self,
        bands: &TrueColorSource,
        table_dir: &Path,
        indices: &[String],
        aoi_paths: &[PathBuf],
        output: &Path,
    ) -> RenderResult<PathBuf> {
        let aoi = load_aoi(aoi_paths)?;
        let composite = compose_bands(&self.ctx.options, bands, &aoi)?;
        let tables = Self::select_tables(table_dir, indices)?;

        let pipeline = LayerPipeline::new(&self.ctx.options, &aoi)?;
        let layers = tables
            .iter()
            .map(|path| pipeline.prepare(&PointTableSource::new(path)))
            .collect::<RenderResult<Vec<_>>>()?;

        self.document(&composite, &layers, &aoi)?.write_html(output)
    }
}

/// Export every `*.tif` in `index_dir` to `{stem}.csv` in `output_dir`
/// through the index pipeline. Returns the written paths.
#[instrument(skip_all, fields(index_dir = %index_dir.display(), output_dir = %output_dir.display()))]
pub fn export_indices_csv(
    index_dir: &Path,
    aoi_paths: &[PathBuf],
    output_dir: &Path,
    options: RenderOptions,
) -> RenderResult<Vec<PathBuf>> {
    let rasters = list_inputs(index_dir, "tif")?;
    if rasters.is_empty() {
        return Err(RenderError::input_not_found(index_dir, "no GeoTIFF indices found"));
    }

    let renderer = IndexMapRenderer::new(options)?;
    let aoi = load_aoi(aoi_paths)?;
    let mut written = Vec::with_capacity(rasters.len());
    for raster in &rasters {
        let layer = renderer.ctx.prepare(&GeoTiffSource::new(raster), &aoi)?;
        let output = output_dir.join(format!("{}.csv", layer.name()));
        let rows = renderer.export_csv(&layer, &output)?;
        if rows == 0 {
            warn!(layer = layer.name(), "Exported point table has no rows");
        }
        written.push(output);
    }
    info!(count = written.len(), "Exported indices");
    Ok(written)
}
