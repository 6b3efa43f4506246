//! Percentile stretch and color mapping of index grids into RGBA images.

use image::{Rgba, RgbaImage};
use raster_common::{RasterGrid, RenderError, RenderResult};
use tracing::{debug, warn};

use crate::colormap::ColorRamp;

/// Default lower/upper percentiles used when bounds are not given.
pub const DEFAULT_LOWER_PERCENTILE: f64 = 2.0;
pub const DEFAULT_UPPER_PERCENTILE: f64 = 98.0;

/// Offset added to the upper bound of a degenerate range.
pub const DEGENERATE_OFFSET: f64 = 1e-3;

/// Percentile of sorted values, linear interpolation between order statistics.
///
/// `q` is in `[0, 100]`. Returns `None` for an empty slice.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let pos = (q.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Finite samples of a grid, ascending, as `f64`.
pub fn sorted_finite(grid: &RasterGrid) -> Vec<f64> {
    let mut values: Vec<f64> = grid.finite_values().map(f64::from).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

/// Widen a range whose ends coincide, logging the correction.
pub fn correct_degenerate(min: f64, max: f64) -> (f64, f64) {
    if is_close(min, max) {
        let stretch = RenderError::DegenerateStretch { min, max };
        warn!(%stretch, "Correcting degenerate stretch range");
        (min, min + DEGENERATE_OFFSET)
    } else {
        (min, max)
    }
}

/// Bounds for normalization: given values win, gaps are filled from the
/// `lower`/`upper` percentiles of the finite samples.
///
/// A filled range that ends up inverted is an `InvalidConfig`.
pub fn resolve_range(
    grid: &RasterGrid,
    vmin: Option<f64>,
    vmax: Option<f64>,
    lower: f64,
    upper: f64,
) -> RenderResult<(f64, f64)> {
    let sorted = sorted_finite(grid);
    if sorted.is_empty() {
        return Err(RenderError::empty_raster("raster has no finite pixels to render"));
    }
    let min = match vmin {
        Some(v) => v,
        None => percentile_sorted(&sorted, lower).unwrap_or(sorted[0]),
    };
    let max = match vmax {
        Some(v) => v,
        None => percentile_sorted(&sorted, upper).unwrap_or(sorted[sorted.len() - 1]),
    };
    if min > max && !is_close(min, max) {
        return Err(RenderError::invalid_config(format!(
            "stretch range is inverted: vmin {} is above vmax {}",
            min, max
        )));
    }
    Ok(correct_degenerate(min, max))
}

/// A colorized grid together with the range it was stretched over.
#[derive(Debug, Clone)]
pub struct ColorizedLayer {
    pub image: RgbaImage,
    pub min: f64,
    pub max: f64,
}

/// Stretch `grid` into `[0, 1]` and map it through the named ramp.
///
/// Finite pixels get `alpha = floor(opacity * 255)`; no-data pixels are fully
/// transparent black.
pub fn colorize(
    grid: &RasterGrid,
    ramp_name: &str,
    vmin: Option<f64>,
    vmax: Option<f64>,
    opacity: f64,
) -> RenderResult<ColorizedLayer> {
    let ramp = ColorRamp::named(ramp_name)?;
    colorize_with(grid, &ramp, vmin, vmax, opacity)
}

pub fn colorize_with(
    grid: &RasterGrid,
    ramp: &ColorRamp,
    vmin: Option<f64>,
    vmax: Option<f64>,
    opacity: f64,
) -> RenderResult<ColorizedLayer> {
    let (min, max) = resolve_range(grid, vmin, vmax, DEFAULT_LOWER_PERCENTILE, DEFAULT_UPPER_PERCENTILE)?;
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).floor() as u8;
    let range = max - min;

    let mut image = RgbaImage::new(grid.cols() as u32, grid.rows() as u32);
    for (i, &value) in grid.data().iter().enumerate() {
        if !value.is_finite() {
            continue;
        }
        let t = ((value as f64 - min) / range).clamp(0.0, 1.0);
        let [r, g, b] = ramp.color_at(t);
        let x = (i % grid.cols()) as u32;
        let y = (i / grid.cols()) as u32;
        image.put_pixel(x, y, Rgba([r, g, b, alpha]));
    }

    debug!(
        ramp = ramp.name(),
        min,
        max,
        width = image.width(),
        height = image.height(),
        "Colorized grid"
    );
    Ok(ColorizedLayer { image, min, max })
}
