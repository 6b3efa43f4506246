//! Point and bounds transformation between supported CRSs.
//!
//! Every transform pivots through geographic longitude/latitude. EPSG:4674
//! (SIRGAS 2000) is treated as coincident with WGS84; the datums differ by
//! centimetres, far below raster resolution.

use raster_common::{BoundingBox, Crs, RenderError, RenderResult};

use crate::mercator;
use crate::transverse_mercator::TransverseMercator;

/// Number of points inserted between the corners of each edge when
/// transforming bounds.
pub const DEFAULT_DENSIFY_POINTS: usize = 21;

/// Forward/inverse projection for a single CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Geographic,
    WebMercator,
    TransverseMercator(TransverseMercator),
}

impl Projection {
    pub fn for_crs(crs: Crs) -> Self {
        match crs {
            Crs::Geographic { .. } => Projection::Geographic,
            Crs::WebMercator => Projection::WebMercator,
            Crs::Utm { zone, south, .. } => {
                Projection::TransverseMercator(TransverseMercator::utm(zone, south))
            }
        }
    }

    /// CRS coordinates to `(lon, lat)` degrees.
    pub fn to_geographic(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let (lon, lat) = match self {
            Projection::Geographic => (x, y),
            Projection::WebMercator => mercator::inverse(x, y),
            Projection::TransverseMercator(tm) => tm.inverse(x, y),
        };
        (lon.is_finite() && lat.is_finite()).then_some((lon, lat))
    }

    /// `(lon, lat)` degrees to CRS coordinates.
    pub fn from_geographic(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if !(-90.0..=90.0).contains(&lat) {
            return None;
        }
        let (x, y) = match self {
            Projection::Geographic => (lon, lat),
            Projection::WebMercator => mercator::forward(lon, lat),
            Projection::TransverseMercator(tm) => tm.forward(lon, lat),
        };
        (x.is_finite() && y.is_finite()).then_some((x, y))
    }
}

/// Transformation from one CRS to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrsTransform {
    src: Crs,
    dst: Crs,
    src_proj: Projection,
    dst_proj: Projection,
}

impl CrsTransform {
    pub fn new(src: Crs, dst: Crs) -> Self {
        Self {
            src,
            dst,
            src_proj: Projection::for_crs(src),
            dst_proj: Projection::for_crs(dst),
        }
    }

    pub fn source(&self) -> Crs {
        self.src
    }

    pub fn target(&self) -> Crs {
        self.dst
    }

    /// True when coordinates pass through unchanged.
    pub fn is_identity(&self) -> bool {
        self.src == self.dst || (self.src.is_geographic() && self.dst.is_geographic())
    }

    /// Transform a single point. `None` if it falls outside either domain.
    pub fn transform(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if self.is_identity() {
            return Some((x, y));
        }
        let (lon, lat) = self.src_proj.to_geographic(x, y)?;
        self.dst_proj.from_geographic(lon, lat)
    }

    /// Transform a box by sampling `densify_pts` extra points along every
    /// edge and returning the extent of all transformed samples.
    pub fn transform_bounds(&self, bbox: &BoundingBox, densify_pts: usize) -> RenderResult<BoundingBox> {
        if self.is_identity() {
            return Ok(*bbox);
        }
        let points = densified_edges(bbox, densify_pts)
            .into_iter()
            .filter_map(|(x, y)| self.transform(x, y));
        BoundingBox::from_points(points).ok_or_else(|| {
            RenderError::invalid_transform(format!(
                "bounds {:?} cannot be transformed from {} to {}",
                bbox, self.src, self.dst
            ))
        })
    }

    /// Reverse direction.
    pub fn inverse(&self) -> CrsTransform {
        CrsTransform::new(self.dst, self.src)
    }
}

/// Points along the four edges of `bbox`, corners included.
pub fn densified_edges(bbox: &BoundingBox, densify_pts: usize) -> Vec<(f64, f64)> {
    let segments = densify_pts + 1;
    let mut points = Vec::with_capacity(segments * 4);
    for i in 0..segments {
        let t = i as f64 / segments as f64;
        let x = bbox.min_x + t * bbox.width();
        let y = bbox.min_y + t * bbox.height();
        // Bottom, right, top, left; each edge contributes its start corner.
        points.push((x, bbox.min_y));
        points.push((bbox.max_x, y));
        points.push((bbox.max_x - t * bbox.width(), bbox.max_y));
        points.push((bbox.min_x, bbox.max_y - t * bbox.height()));
    }
    points
}
