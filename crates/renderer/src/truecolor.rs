//! Per-band percentile stretch and RGB stacking for true-color composites.

use image::{Rgb, RgbImage};
use raster_common::{RasterGrid, RenderError, RenderResult};
use tracing::debug;

use crate::colorize::{correct_degenerate, percentile_sorted, sorted_finite};

/// Lower/upper stretch percentiles for each band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchPercentiles {
    pub lower: f64,
    pub upper: f64,
}

impl Default for StretchPercentiles {
    fn default() -> Self {
        Self { lower: 2.0, upper: 98.0 }
    }
}

/// Normalize one band into `[0, 1]`; no-data becomes 0.
pub fn stretch_band(band: &RasterGrid, percentiles: StretchPercentiles) -> RenderResult<Vec<f32>> {
    let sorted = sorted_finite(band);
    let (lo, hi) = match (
        percentile_sorted(&sorted, percentiles.lower),
        percentile_sorted(&sorted, percentiles.upper),
    ) {
        (Some(lo), Some(hi)) => correct_degenerate(lo, hi),
        _ => return Err(RenderError::empty_raster("band has no finite pixels")),
    };
    let range = hi - lo;
    Ok(band
        .data()
        .iter()
        .map(|&v| {
            if v.is_finite() {
                ((v as f64 - lo) / range).clamp(0.0, 1.0) as f32
            } else {
                0.0
            }
        })
        .collect())
}

/// Stretch three co-registered bands and stack them into an 8-bit image.
pub fn compose_true_color(
    red: &RasterGrid,
    green: &RasterGrid,
    blue: &RasterGrid,
    percentiles: StretchPercentiles,
) -> RenderResult<RgbImage> {
    if red.shape() != green.shape() || red.shape() != blue.shape() {
        return Err(RenderError::invalid_transform(format!(
            "band shapes differ: red {:?}, green {:?}, blue {:?}",
            red.shape(),
            green.shape(),
            blue.shape()
        )));
    }
    let r = stretch_band(red, percentiles)?;
    let g = stretch_band(green, percentiles)?;
    let b = stretch_band(blue, percentiles)?;

    let cols = red.cols();
    let mut image = RgbImage::new(cols as u32, red.rows() as u32);
    for i in 0..r.len() {
        let px = Rgb([to_u8(r[i]), to_u8(g[i]), to_u8(b[i])]);
        image.put_pixel((i % cols) as u32, (i / cols) as u32, px);
    }
    debug!(
        width = image.width(),
        height = image.height(),
        lower = percentiles.lower,
        upper = percentiles.upper,
        "Composed true-color image"
    );
    Ok(image)
}

fn to_u8(v: f32) -> u8 {
    (v * 255.0) as u8
}
