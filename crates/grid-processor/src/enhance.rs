//! Visual enhancement of index grids: sharpening, resampling and smoothing.
//!
//! Every operation here preserves the no-data mask of its input. Blurs run
//! on a copy where `NaN` is replaced by the mean of the finite samples, and
//! the original mask is restored afterwards.

use raster_common::{AreaOfInterest, ClipBounds, Crs, GeoTransform, RasterGrid, RenderResult};
use tracing::debug;

use crate::config::EnhancementConfig;
use crate::mask::mask_with_aoi;
use crate::projection::{warp_bilinear, WarpTarget};

/// Gaussian kernels are truncated at this many standard deviations.
const TRUNCATE: f64 = 4.0;

/// Normalized 1-D gaussian kernel with radius `floor(4σ + 0.5)`.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as usize;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Convolve one line with edge replication ("nearest" boundary mode).
fn convolve_line(input: &[f64], kernel: &[f64], out: &mut [f64]) {
    let n = input.len() as isize;
    let radius = (kernel.len() / 2) as isize;
    for (i, slot) in out.iter_mut().enumerate() {
        let mut acc = 0.0;
        for (k, w) in kernel.iter().enumerate() {
            let j = (i as isize + k as isize - radius).clamp(0, n - 1);
            acc += w * input[j as usize];
        }
        *slot = acc;
    }
}

/// Separable gaussian blur of a grid with no `NaN` values.
///
/// Returns the input unchanged for a sigma below `f64::EPSILON`.
pub fn gaussian_blur(grid: &RasterGrid, sigma: f64) -> RasterGrid {
    if !(sigma >= f64::EPSILON) || grid.is_empty() {
        return grid.clone();
    }
    let (rows, cols) = grid.shape();
    let kernel = gaussian_kernel(sigma);

    let mut buf: Vec<f64> = grid.data().iter().map(|&v| v as f64).collect();

    // Along columns (axis 0)
    let mut line = vec![0.0; rows];
    let mut out = vec![0.0; rows];
    for c in 0..cols {
        for r in 0..rows {
            line[r] = buf[r * cols + c];
        }
        convolve_line(&line, &kernel, &mut out);
        for r in 0..rows {
            buf[r * cols + c] = out[r];
        }
    }

    // Along rows (axis 1)
    let mut out = vec![0.0; cols];
    for r in 0..rows {
        let start = r * cols;
        convolve_line(&buf[start..start + cols], &kernel, &mut out);
        buf[start..start + cols].copy_from_slice(&out);
    }

    RasterGrid::from_fn(rows, cols, |r, c| buf[r * cols + c] as f32)
}

/// Blur with the no-data mask filled by the finite mean, then restored.
fn blur_nan_safe(grid: &RasterGrid, sigma: f64) -> Option<(RasterGrid, RasterGrid, Vec<bool>)> {
    let mean = grid.finite_mean()?;
    let mask = grid.finite_mask();
    let filled = grid.filled_nan(mean as f32);
    let blurred = gaussian_blur(&filled, sigma);
    Some((filled, blurred, mask))
}

/// Unsharp mask: `filled + amount * (filled - blur(filled, radius))`.
///
/// All-`NaN` input is returned unchanged.
pub fn unsharp_mask(grid: &RasterGrid, radius: f64, amount: f64) -> RasterGrid {
    let Some((filled, blurred, mask)) = blur_nan_safe(grid, radius) else {
        return grid.clone();
    };
    let amount = amount as f32;
    let mut out = RasterGrid::from_fn(grid.rows(), grid.cols(), |r, c| {
        let i = r * grid.cols() + c;
        let f = filled.data()[i];
        f + amount * (f - blurred.data()[i])
    });
    out.apply_mask(&mask);
    out
}

/// Gaussian smoothing that keeps no-data pixels as `NaN`.
///
/// A no-op for `radius <= 0`.
pub fn smooth(grid: &RasterGrid, radius: f64) -> RasterGrid {
    if !(radius > 0.0) {
        return grid.clone();
    }
    let Some((_, mut blurred, mask)) = blur_nan_safe(grid, radius) else {
        return grid.clone();
    };
    blurred.apply_mask(&mask);
    blurred
}

/// Bilinear upsampling by `factor` over the same extent.
///
/// The output has `floor(rows * factor) x floor(cols * factor)` pixels and a
/// transform whose pixel sizes are divided by `factor`. A no-op for
/// `factor <= 1`.
pub fn upsample(grid: &RasterGrid, transform: &GeoTransform, factor: f64) -> RenderResult<(RasterGrid, GeoTransform)> {
    if !(factor > 1.0) {
        return Ok((grid.clone(), *transform));
    }
    let rows = (grid.rows() as f64 * factor).floor() as usize;
    let cols = (grid.cols() as f64 * factor).floor() as usize;
    let target = WarpTarget {
        transform: transform.scaled(factor)?,
        rows,
        cols,
    };
    // Same CRS on both sides; the warp reduces to pure resampling
    let out = warp_bilinear(grid, transform, Crs::WGS84, &target, Crs::WGS84);
    debug!(factor, rows, cols, "Upsampled grid");
    Ok((out, target.transform))
}

/// Source-specific step run between masking and upsampling when clipping.
pub trait ClipConform {
    fn conform_to_clip(
        &self,
        grid: RasterGrid,
        transform: GeoTransform,
        clip: &ClipBounds,
    ) -> RenderResult<(RasterGrid, GeoTransform)>;
}

/// Leaves the grid as it is.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoConform;

impl ClipConform for NoConform {
    fn conform_to_clip(
        &self,
        grid: RasterGrid,
        transform: GeoTransform,
        _clip: &ClipBounds,
    ) -> RenderResult<(RasterGrid, GeoTransform)> {
        Ok((grid, transform))
    }
}

/// The fixed enhancement ordering shared by every raster source:
///
/// ```text
/// sharpen -> [mask] -> [conform to clip] -> upsample -> smooth -> [re-mask]
/// ```
///
/// Masking happens only when clipping is enabled and the AOI has polygons;
/// the re-mask only when the grid was upsampled.
#[derive(Debug, Clone, Default)]
pub struct EnhancementChain {
    config: EnhancementConfig,
}

impl EnhancementChain {
    pub fn new(config: EnhancementConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnhancementConfig {
        &self.config
    }

    pub fn apply(
        &self,
        grid: RasterGrid,
        transform: GeoTransform,
        aoi: &AreaOfInterest,
        clip_bounds: Option<&ClipBounds>,
        conform: &dyn ClipConform,
    ) -> RenderResult<(RasterGrid, GeoTransform)> {
        let cfg = &self.config;
        let clip = cfg.clip && !aoi.is_empty();

        let mut grid = if cfg.sharpen {
            unsharp_mask(&grid, cfg.sharpen_radius, cfg.sharpen_amount)
        } else {
            grid
        };
        let mut transform = transform;

        if clip {
            grid = mask_with_aoi(&grid, &transform, aoi)?;
        }
        if cfg.clip {
            if let Some(bounds) = clip_bounds {
                (grid, transform) = conform.conform_to_clip(grid, transform, bounds)?;
            }
        }

        (grid, transform) = upsample(&grid, &transform, cfg.upsample_factor)?;
        grid = smooth(&grid, cfg.smooth_radius);

        if clip && cfg.upsample_factor > 1.0 {
            grid = mask_with_aoi(&grid, &transform, aoi)?;
        }

        debug!(
            rows = grid.rows(),
            cols = grid.cols(),
            finite = grid.finite_count(),
            "Enhancement chain complete"
        );
        Ok((grid, transform))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_kernel_radius_and_sum() {
        let k = gaussian_kernel(1.0);
        assert_eq!(k.len(), 9);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(gaussian_kernel(1.2).len(), 11);
    }

    #[test]
    fn test_blur_with_vanishing_sigma_is_identity() {
        let grid = RasterGrid::from_fn(5, 5, |r, c| (r * 5 + c) as f32);
        for sigma in [1e-170, 1e-300, f64::EPSILON / 2.0] {
            assert_eq!(gaussian_blur(&grid, sigma), grid);
        }
        let sharpened = unsharp_mask(&grid, 1e-300, 1.5);
        assert_eq!(sharpened, grid);
    }

    #[test]
    fn test_blur_preserves_constant() {
        let grid = RasterGrid::filled(6, 7, 3.5);
        let out = gaussian_blur(&grid, 1.5);
        for v in out.data() {
            assert!((v - 3.5).abs() < 1e-5);
        }
    }

    #[test]
    fn test_unsharp_restores_nan_mask() {
        let mut grid = RasterGrid::from_fn(5, 5, |r, c| (r * 5 + c) as f32);
        grid.set(2, 2, f32::NAN);
        let out = unsharp_mask(&grid, 1.0, 1.5);
        assert!(out.get(2, 2).unwrap().is_nan());
        assert_eq!(out.finite_count(), 24);
    }

    #[test]
    fn test_unsharp_all_nan_is_unchanged() {
        let grid = RasterGrid::nan(3, 3);
        let out = unsharp_mask(&grid, 1.0, 1.3);
        assert_eq!(out.finite_count(), 0);
    }

    #[test]
    fn test_unsharp_increases_contrast_at_step() {
        let grid = RasterGrid::from_fn(1, 10, |_, c| if c < 5 { 0.0 } else { 1.0 });
        let out = unsharp_mask(&grid, 1.0, 1.0);
        assert!(out.get(0, 4).unwrap() < 0.0);
        assert!(out.get(0, 5).unwrap() > 1.0);
    }

    #[test]
    fn test_smooth_noop_for_zero_radius() {
        let grid = RasterGrid::from_fn(3, 3, |r, c| (r + c) as f32);
        assert_eq!(smooth(&grid, 0.0), grid);
        assert_eq!(smooth(&grid, -1.0), grid);
    }

    #[test]
    fn test_upsample_noop_for_small_factor() {
        let gt = GeoTransform::new(0.0, 3.0, 1.0, 1.0).unwrap();
        let grid = RasterGrid::from_fn(3, 3, |r, c| (r * 3 + c) as f32);
        for factor in [1.0, 0.5, 0.0] {
            let (out, t) = upsample(&grid, &gt, factor).unwrap();
            assert_eq!(out, grid);
            assert_eq!(t, gt);
        }
    }

    #[test]
    fn test_upsample_dims_and_extent() {
        let gt = GeoTransform::new(10.0, 20.0, 0.1, 0.1).unwrap();
        let grid = RasterGrid::from_fn(4, 6, |r, c| (r + c) as f32);
        let (out, t) = upsample(&grid, &gt, 3.0).unwrap();
        assert_eq!(out.shape(), (12, 18));
        assert!((t.pixel_width() - 0.1 / 3.0).abs() < 1e-12);
        let b0 = gt.bounds(4, 6);
        let b1 = t.bounds(12, 18);
        assert!((b0.max_x - b1.max_x).abs() < 1e-9);
        assert!((b0.min_y - b1.min_y).abs() < 1e-9);
        assert_eq!(out.finite_count(), out.len());
    }

    #[test]
    fn test_upsample_keeps_nan() {
        let gt = GeoTransform::new(0.0, 4.0, 1.0, 1.0).unwrap();
        let mut grid = RasterGrid::filled(4, 4, 1.0);
        grid.set(1, 1, f32::NAN);
        let (out, _) = upsample(&grid, &gt, 2.0).unwrap();
        // Fine pixels centred inside the NaN source pixel stay NaN
        assert!(out.get(2, 2).unwrap().is_nan());
        assert!(out.get(3, 3).unwrap().is_nan());
        assert_eq!(out.get(7, 7), Some(1.0));
    }
}
