//! Common fixtures for index map tests.
//!
//! This module provides pre-defined areas and file writers for GeoJSON and
//! point-table inputs. Files are written into a caller-owned directory,
//! usually a `tempfile::TempDir`.

use std::io;
use std::path::{Path, PathBuf};

use raster_common::{GeoTransform, RasterGrid};

/// Common areas used across tests, as `(min_lon, min_lat, max_lon, max_lat)`.
pub mod area {
    /// A sugarcane field region in São Paulo state (UTM zone 23S)
    pub const FIELD: (f64, f64, f64, f64) = (-47.16, -22.89, -47.12, -22.85);

    /// One-degree cell on the equator and prime meridian
    pub const UNIT_CELL: (f64, f64, f64, f64) = (0.0, 0.0, 1.0, 1.0);
}

/// Common EPSG codes.
pub mod epsg {
    pub const WGS84: u16 = 4326;
    pub const SIRGAS_2000: u16 = 4674;
    pub const WEB_MERCATOR: u16 = 3857;
    /// WGS 84 / UTM zone 23S
    pub const UTM_23S: u16 = 32723;
}

/// A closed ring around `(min_x, min_y, max_x, max_y)`.
pub fn rectangle_ring(bounds: (f64, f64, f64, f64)) -> Vec<[f64; 2]> {
    let (x0, y0, x1, y1) = bounds;
    vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]
}

/// A GeoJSON `Polygon` geometry covering `bounds`.
pub fn rectangle_polygon(bounds: (f64, f64, f64, f64)) -> serde_json::Value {
    serde_json::json!({
        "type": "Polygon",
        "coordinates": [rectangle_ring(bounds)],
    })
}

/// A `FeatureCollection` with one feature per geometry.
pub fn feature_collection(geometries: Vec<serde_json::Value>) -> serde_json::Value {
    let features: Vec<serde_json::Value> = geometries
        .into_iter()
        .map(|geometry| {
            serde_json::json!({
                "type": "Feature",
                "properties": {},
                "geometry": geometry,
            })
        })
        .collect();
    serde_json::json!({ "type": "FeatureCollection", "features": features })
}

/// Write a GeoJSON value to `dir/name`.
pub fn write_geojson(dir: &Path, name: &str, value: &serde_json::Value) -> io::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, value.to_string())?;
    Ok(path)
}

/// Write a regular point table, one row per finite pixel centre.
pub fn write_point_csv(dir: &Path, name: &str, grid: &RasterGrid, transform: &GeoTransform) -> io::Result<PathBuf> {
    let mut text = String::from("longitude,latitude,value\n");
    for r in 0..grid.rows() {
        for (c, v) in grid.row(r).iter().enumerate() {
            if v.is_finite() {
                let (lon, lat) = transform.pixel_center(r, c);
                text.push_str(&format!("{},{},{}\n", lon, lat, v));
            }
        }
    }
    write_text(dir, name, &text)
}

/// Write arbitrary text (e.g. malformed tables) to `dir/name`.
pub fn write_text(dir: &Path, name: &str, text: &str) -> io::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, text)?;
    Ok(path)
}
