//! Affine geotransforms mapping raster (col, row) to coordinates.

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::BoundingBox;

/// Affine mapping from pixel space to CRS coordinates.
///
/// ```text
/// x = origin_x + col * pixel_width  + row * rotation_x
/// y = origin_y - row * pixel_height + col * rotation_y
/// ```
///
/// Pixel sizes are always positive magnitudes; rows grow southwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    origin_x: f64,
    origin_y: f64,
    pixel_width: f64,
    pixel_height: f64,
    rotation_x: f64,
    rotation_y: f64,
}

impl GeoTransform {
    /// North-up transform anchored at the top-left corner of pixel (0, 0).
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> RenderResult<Self> {
        Self::with_rotation(origin_x, origin_y, pixel_width, pixel_height, 0.0, 0.0)
    }

    /// Transform including rotation terms.
    pub fn with_rotation(
        origin_x: f64,
        origin_y: f64,
        pixel_width: f64,
        pixel_height: f64,
        rotation_x: f64,
        rotation_y: f64,
    ) -> RenderResult<Self> {
        if !(pixel_width.is_finite() && pixel_width > 0.0) {
            return Err(RenderError::invalid_transform(format!(
                "pixel width must be positive, got {}",
                pixel_width
            )));
        }
        if !(pixel_height.is_finite() && pixel_height > 0.0) {
            return Err(RenderError::invalid_transform(format!(
                "pixel height must be positive, got {}",
                pixel_height
            )));
        }
        if !(origin_x.is_finite() && origin_y.is_finite()) {
            return Err(RenderError::invalid_transform("origin is not finite"));
        }
        let gt = Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            rotation_x,
            rotation_y,
        };
        if gt.determinant().abs() < f64::EPSILON * pixel_width * pixel_height {
            return Err(RenderError::invalid_transform("transform is not invertible"));
        }
        Ok(gt)
    }

    /// Build from a GDAL-ordered coefficient array
    /// `[origin_x, a, b, origin_y, d, e]` where `e` is negative for north-up.
    pub fn from_gdal(coeffs: [f64; 6]) -> RenderResult<Self> {
        let [ox, a, b, oy, d, e] = coeffs;
        if e >= 0.0 {
            return Err(RenderError::invalid_transform(format!(
                "south-up rasters are not supported (row step {})",
                e
            )));
        }
        Self::with_rotation(ox, oy, a, -e, b, d)
    }

    pub fn origin_x(&self) -> f64 {
        self.origin_x
    }

    pub fn origin_y(&self) -> f64 {
        self.origin_y
    }

    pub fn pixel_width(&self) -> f64 {
        self.pixel_width
    }

    pub fn pixel_height(&self) -> f64 {
        self.pixel_height
    }

    /// True when both rotation terms are zero.
    pub fn is_north_up(&self) -> bool {
        self.rotation_x == 0.0 && self.rotation_y == 0.0
    }

    fn determinant(&self) -> f64 {
        // Matrix [[pw, rx], [ry, -ph]]
        -self.pixel_width * self.pixel_height - self.rotation_x * self.rotation_y
    }

    /// Coordinates of a fractional pixel position (corner convention).
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.rotation_x,
            self.origin_y - row * self.pixel_height + col * self.rotation_y,
        )
    }

    /// Coordinates of the centre of pixel `(row, col)`.
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.pixel_to_geo(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Fractional `(col, row)` of a coordinate (corner convention).
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let det = self.determinant();
        let col = (-self.pixel_height * dx - self.rotation_x * dy) / det;
        let row = (self.pixel_width * dy - self.rotation_y * dx) / det;
        (col, row)
    }

    /// Bounds covered by a `rows x cols` array under this transform.
    pub fn bounds(&self, rows: usize, cols: usize) -> BoundingBox {
        let corners = [
            self.pixel_to_geo(0.0, 0.0),
            self.pixel_to_geo(cols as f64, 0.0),
            self.pixel_to_geo(0.0, rows as f64),
            self.pixel_to_geo(cols as f64, rows as f64),
        ];
        // Corners are finite because the transform is validated on construction.
        BoundingBox::from_points(corners).unwrap_or(BoundingBox::new(
            self.origin_x,
            self.origin_y,
            self.origin_x,
            self.origin_y,
        ))
    }

    /// Same origin with pixel sizes divided by `factor`.
    pub fn scaled(&self, factor: f64) -> RenderResult<Self> {
        Self::with_rotation(
            self.origin_x,
            self.origin_y,
            self.pixel_width / factor,
            self.pixel_height / factor,
            self.rotation_x / factor,
            self.rotation_y / factor,
        )
    }

    /// Same pixel sizes with the top-left corner moved to `(origin_x, origin_y)`.
    pub fn with_origin(&self, origin_x: f64, origin_y: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            ..*self
        }
    }

    /// Transform of the sub-array starting at `(row_off, col_off)`.
    pub fn window(&self, row_off: usize, col_off: usize) -> Self {
        let (x, y) = self.pixel_to_geo(col_off as f64, row_off as f64);
        self.with_origin(x, y)
    }
}
