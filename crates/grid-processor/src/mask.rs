//! Polygon masking by scanline rasterization.
//!
//! A pixel is inside when its centre is inside a polygon. Rings of one
//! polygon combine with the even-odd rule, so holes are excluded; separate
//! polygons are unioned.

use raster_common::{AreaOfInterest, GeoTransform, RasterGrid, RenderError, RenderResult};
use tracing::debug;

/// A polygon as a list of rings of `(x, y)` vertices.
pub type Polygon = Vec<Vec<(f64, f64)>>;

/// Sorted x positions where the polygon's edges cross the line `y`.
fn scanline_crossings(polygon: &Polygon, y: f64, out: &mut Vec<f64>) {
    out.clear();
    for ring in polygon {
        let n = ring.len();
        if n < 2 {
            continue;
        }
        for i in 0..n {
            let (x1, y1) = ring[i];
            let (x2, y2) = ring[(i + 1) % n];
            // Half-open rule so shared vertices are counted once
            if (y1 <= y) != (y2 <= y) {
                out.push(x1 + (y - y1) * (x2 - x1) / (y2 - y1));
            }
        }
    }
    out.sort_by(|a, b| a.total_cmp(b));
}

/// Binary mask (`true` = inside) aligned to `transform`.
pub fn rasterize_polygons(
    polygons: &[Polygon],
    transform: &GeoTransform,
    rows: usize,
    cols: usize,
) -> RenderResult<Vec<bool>> {
    if !transform.is_north_up() {
        return Err(RenderError::invalid_transform(
            "cannot rasterize polygons onto a rotated grid",
        ));
    }
    let mut mask = vec![false; rows * cols];
    let mut crossings = Vec::new();
    let ox = transform.origin_x();
    let pw = transform.pixel_width();

    for row in 0..rows {
        let (_, y) = transform.pixel_center(row, 0);
        for polygon in polygons {
            scanline_crossings(polygon, y, &mut crossings);
            for pair in crossings.chunks_exact(2) {
                // Columns whose centre x satisfies pair[0] <= x < pair[1]
                let start = ((pair[0] - ox) / pw - 0.5).ceil().max(0.0);
                let end = ((pair[1] - ox) / pw - 0.5).ceil().min(cols as f64);
                if end <= start {
                    continue;
                }
                let offset = row * cols;
                for cell in &mut mask[offset + start as usize..offset + end as usize] {
                    *cell = true;
                }
            }
        }
    }
    Ok(mask)
}

/// Set every pixel outside the AOI polygons to `NaN`.
///
/// An AOI without polygons leaves the grid unchanged.
pub fn mask_with_aoi(grid: &RasterGrid, transform: &GeoTransform, aoi: &AreaOfInterest) -> RenderResult<RasterGrid> {
    let polygons = aoi.collect_polygons().polygons;
    mask_with_polygons(grid, transform, &polygons)
}

/// Set every pixel outside `polygons` to `NaN`.
pub fn mask_with_polygons(grid: &RasterGrid, transform: &GeoTransform, polygons: &[Polygon]) -> RenderResult<RasterGrid> {
    if polygons.is_empty() {
        return Ok(grid.clone());
    }
    let mask = rasterize_polygons(polygons, transform, grid.rows(), grid.cols())?;
    let mut out = grid.clone();
    out.apply_mask(&mask);
    debug!(
        polygons = polygons.len(),
        inside = mask.iter().filter(|m| **m).count(),
        "Masked grid to AOI"
    );
    Ok(out)
}
