//! Reprojection utilities for converting grids between coordinate systems.
//!
//! Rasters arrive in their native CRS (UTM for most satellite products) and
//! are warped onto a regular EPSG:4326 grid before any enhancement.

use projection::{CrsTransform, DEFAULT_DENSIFY_POINTS};
use raster_common::{Crs, GeoTransform, RasterGrid, RenderError, RenderResult};
use tracing::debug;

use super::bilinear_interpolate;

/// Shape and placement of a warp destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarpTarget {
    pub transform: GeoTransform,
    pub rows: usize,
    pub cols: usize,
}

/// Choose an output grid in `dst_crs` for a source raster.
///
/// The extent is the envelope of the source edges (densified) in the target
/// CRS. Pixels are square, sized so the number of pixels along the diagonal
/// is preserved:
///
/// ```text
/// res  = hypot(extent_w, extent_h) / hypot(src_cols, src_rows)
/// cols = round(extent_w / res), rows = round(extent_h / res)
/// ```
pub fn calculate_default_transform(
    src_crs: Crs,
    dst_crs: Crs,
    src_transform: &GeoTransform,
    src_rows: usize,
    src_cols: usize,
) -> RenderResult<WarpTarget> {
    if src_rows == 0 || src_cols == 0 {
        return Err(RenderError::empty_raster("source raster has zero size"));
    }

    let src_bounds = src_transform.bounds(src_rows, src_cols);
    let extent = CrsTransform::new(src_crs, dst_crs).transform_bounds(&src_bounds, DEFAULT_DENSIFY_POINTS)?;

    let src_diag = ((src_cols * src_cols + src_rows * src_rows) as f64).sqrt();
    let dst_diag = extent.width().hypot(extent.height());
    let res = dst_diag / src_diag;

    let cols = ((extent.width() / res).round() as usize).max(1);
    let rows = ((extent.height() / res).round() as usize).max(1);

    let transform = GeoTransform::new(extent.min_x, extent.max_y, res, res)?;
    debug!(
        src_crs = %src_crs,
        dst_crs = %dst_crs,
        rows,
        cols,
        res,
        "Computed default warp target"
    );

    Ok(WarpTarget {
        transform,
        rows,
        cols,
    })
}

/// Warp `src` onto `target` with bilinear resampling.
///
/// Every destination pixel centre is transformed back into the source CRS.
/// Centres that land outside the source footprint stay `NaN`; otherwise the
/// value follows [`bilinear_interpolate`], so no-data never becomes finite.
pub fn warp_bilinear(
    src: &RasterGrid,
    src_transform: &GeoTransform,
    src_crs: Crs,
    target: &WarpTarget,
    dst_crs: Crs,
) -> RasterGrid {
    let dst_to_src = CrsTransform::new(dst_crs, src_crs);
    let (src_rows, src_cols) = src.shape();
    let data = src.data();

    RasterGrid::from_fn(target.rows, target.cols, |row, col| {
        let (x, y) = target.transform.pixel_center(row, col);
        let Some((sx, sy)) = dst_to_src.transform(x, y) else {
            return f32::NAN;
        };
        let (fcol, frow) = src_transform.geo_to_pixel(sx, sy);
        if fcol < 0.0 || frow < 0.0 || fcol > src_cols as f64 || frow > src_rows as f64 {
            return f32::NAN;
        }
        // Corner convention to centre-index space
        bilinear_interpolate(data, src_cols, src_rows, fcol - 0.5, frow - 0.5)
    })
}

/// Reproject a raster to EPSG:4326 using the default output grid.
pub fn reproject_to_geographic(
    src: &RasterGrid,
    src_transform: &GeoTransform,
    src_crs: Crs,
) -> RenderResult<(RasterGrid, GeoTransform)> {
    let target = calculate_default_transform(src_crs, Crs::WGS84, src_transform, src.rows(), src.cols())?;
    let grid = warp_bilinear(src, src_transform, src_crs, &target, Crs::WGS84);
    Ok((grid, target.transform))
}
