//! Interpolation methods for grid resampling.
//!
//! Sample positions are in pixel-centre index space: `(0.0, 0.0)` is the
//! centre of the top-left pixel and `(width - 1, height - 1)` the centre of
//! the bottom-right one.

/// Bilinear interpolation.
///
/// Positions are clamped into the centre-index range, so the outer half
/// pixel replicates the edge values. A `NaN` neighbour only poisons the
/// result when its weight is non-zero; sampling exactly on a valid pixel
/// centre next to no-data returns that pixel's value.
pub fn bilinear_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if width == 0 || height == 0 || !x.is_finite() || !y.is_finite() {
        return f32::NAN;
    }

    let x = x.clamp(0.0, (width - 1) as f64);
    let y = y.clamp(0.0, (height - 1) as f64);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let xf = x - x0 as f64;
    let yf = y - y0 as f64;

    let corners = [
        (data[y0 * width + x0], (1.0 - xf) * (1.0 - yf)),
        (data[y0 * width + x1], xf * (1.0 - yf)),
        (data[y1 * width + x0], (1.0 - xf) * yf),
        (data[y1 * width + x1], xf * yf),
    ];

    let mut acc = 0.0f64;
    for (value, weight) in corners {
        if weight == 0.0 {
            continue;
        }
        // Any contributing NaN makes the result no-data
        if !value.is_finite() {
            return f32::NAN;
        }
        acc += value as f64 * weight;
    }
    acc as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bilinear_interpolate() {
        let data: Vec<f32> = vec![
            1.0, 2.0,
            3.0, 4.0,
        ];

        // Corners
        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.0, 0.0), 1.0);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 1.0, 0.0), 2.0);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.0, 1.0), 3.0);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 1.0, 1.0), 4.0);

        // Center
        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.5, 0.5), 2.5);
    }

    #[test]
    fn test_bilinear_clamps_outer_half_pixel() {
        let data: Vec<f32> = vec![
            1.0, 2.0,
            3.0, 4.0,
        ];
        assert_eq!(bilinear_interpolate(&data, 2, 2, -0.4, -0.4), 1.0);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 1.4, 1.4), 4.0);
    }

    #[test]
    fn test_bilinear_nan_only_when_weighted() {
        let data: Vec<f32> = vec![
            1.0, f32::NAN,
            3.0, 4.0,
        ];

        // Exactly on a valid centre: the NaN neighbour has zero weight
        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.0, 0.0), 1.0);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.0, 0.5), 2.0);

        // Between valid and NaN
        assert!(bilinear_interpolate(&data, 2, 2, 0.5, 0.0).is_nan());
        assert!(bilinear_interpolate(&data, 2, 2, 0.5, 0.5).is_nan());
    }
}
