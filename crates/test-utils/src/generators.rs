//! Synthetic index grids.
//!
//! These generators create predictable, verifiable patterns that can be used
//! across the test suite.

use raster_common::RasterGrid;

/// A grid holding `1, 2, ..., rows*cols` in row-major order.
///
/// ```
/// use test_utils::ramp_grid;
///
/// let grid = ramp_grid(4, 4);
/// assert_eq!(grid.get(0, 0), Some(1.0));
/// assert_eq!(grid.get(3, 3), Some(16.0));
/// ```
pub fn ramp_grid(rows: usize, cols: usize) -> RasterGrid {
    RasterGrid::from_fn(rows, cols, |r, c| (r * cols + c + 1) as f32)
}

/// NDVI-like values in `[-0.2, 0.9]`.
///
/// A smooth radial bump (vegetated field in the centre) over a gentle west to
/// east gradient, so percentile stretches have something to work with.
pub fn ndvi_field(rows: usize, cols: usize) -> RasterGrid {
    let cy = (rows as f32 - 1.0) / 2.0;
    let cx = (cols as f32 - 1.0) / 2.0;
    let scale = (rows.max(cols) as f32 / 2.0).max(1.0);
    RasterGrid::from_fn(rows, cols, |r, c| {
        let dy = (r as f32 - cy) / scale;
        let dx = (c as f32 - cx) / scale;
        let bump = (-(dx * dx + dy * dy) * 2.0).exp();
        let gradient = c as f32 / cols.max(1) as f32;
        (-0.2 + 0.9 * bump + 0.2 * gradient).clamp(-0.2, 0.9)
    })
}

/// Copy of `grid` with `NaN` written at each `(row, col)` in `holes`.
pub fn with_nan_holes(grid: &RasterGrid, holes: &[(usize, usize)]) -> RasterGrid {
    let mut out = grid.clone();
    for &(r, c) in holes {
        out.set(r, c, f32::NAN);
    }
    out
}

/// Reflectance-like band values scaled by `gain`.
///
/// Used for red/green/blue true-color triples.
pub fn reflectance_band(rows: usize, cols: usize, gain: f32) -> RasterGrid {
    RasterGrid::from_fn(rows, cols, |r, c| {
        let t = (r + c) as f32 / (rows + cols).max(1) as f32;
        gain * (0.02 + 0.3 * t)
    })
}

/// Positions of all `NaN` samples in a grid.
pub fn nan_positions(grid: &RasterGrid) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    for r in 0..grid.rows() {
        for (c, v) in grid.row(r).iter().enumerate() {
            if v.is_nan() {
                out.push((r, c));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_grid() {
        let grid = ramp_grid(3, 5);
        assert_eq!(grid.shape(), (3, 5));
        assert_eq!(grid.get(1, 0), Some(6.0));
        assert_eq!(grid.finite_count(), 15);
    }

    #[test]
    fn test_ndvi_field_range() {
        let grid = ndvi_field(20, 30);
        for v in grid.data() {
            assert!((-0.2..=0.9).contains(v));
        }
        // Centre is greener than the corner
        assert!(grid.get(10, 15).unwrap() > grid.get(0, 0).unwrap());
    }

    #[test]
    fn test_nan_holes_roundtrip() {
        let holes = vec![(0, 0), (2, 3)];
        let grid = with_nan_holes(&ramp_grid(4, 4), &holes);
        assert_eq!(nan_positions(&grid), holes);
    }

    #[test]
    fn test_reflectance_band_scales_with_gain() {
        let a = reflectance_band(4, 4, 1.0);
        let b = reflectance_band(4, 4, 2.0);
        assert!((b.get(2, 2).unwrap() - 2.0 * a.get(2, 2).unwrap()).abs() < 1e-6);
    }
}
