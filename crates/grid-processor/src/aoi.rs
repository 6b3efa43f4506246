//! Clip bounds from area-of-interest polygons.

use std::path::Path;

use raster_common::{AreaOfInterest, BoundingBox, ClipBounds, RenderError, RenderResult};
use tracing::{info, warn};

/// Result of resolving AOI bounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedBounds {
    /// Padded union bounds, `None` when no polygon was found.
    pub bounds: Option<ClipBounds>,
    /// Geometry types that were skipped because they are not polygonal.
    pub skipped: Vec<String>,
}

/// Read AOI GeoJSON files.
pub fn load_aoi<P: AsRef<Path>>(paths: &[P]) -> RenderResult<AreaOfInterest> {
    let aoi = AreaOfInterest::load(paths)?;
    if !aoi.is_empty() {
        info!(documents = aoi.documents().len(), "Loaded AOI");
    }
    Ok(aoi)
}

/// Union bounds of every polygon vertex, each axis expanded by
/// `padding_factor * extent / 2` on both sides.
pub fn resolve_clip_bounds(aoi: &AreaOfInterest, padding_factor: f64) -> ResolvedBounds {
    let collected = aoi.collect_polygons();
    for kind in &collected.unsupported {
        warn!(geometry = %kind, "Skipping non-polygonal AOI geometry");
    }
    let vertices = collected.polygons.iter().flatten().flatten().copied();
    let bounds = BoundingBox::from_points(vertices).map(|b| b.padded(padding_factor));
    ResolvedBounds {
        bounds,
        skipped: collected.unsupported,
    }
}

/// Like [`resolve_clip_bounds`], but fails when AOI documents were supplied
/// and none of them contains a polygon.
pub fn require_clip_bounds(aoi: &AreaOfInterest, padding_factor: f64) -> RenderResult<Option<ClipBounds>> {
    let resolved = resolve_clip_bounds(aoi, padding_factor);
    match resolved.bounds {
        Some(bounds) => Ok(Some(bounds)),
        None if aoi.is_empty() => Ok(None),
        None => Err(RenderError::UnsupportedGeometry(format!(
            "AOI contains no Polygon or MultiPolygon (found: {})",
            if resolved.skipped.is_empty() {
                "nothing".to_string()
            } else {
                resolved.skipped.join(", ")
            }
        ))),
    }
}
