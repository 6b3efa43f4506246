//! Point tables (`longitude,latitude,value`) and regular grid reconstruction.
//!
//! The table is the lossless export format of a prepared layer: one row per
//! finite pixel, coordinates at pixel centres. Reading it back recovers the
//! grid as long as every lon/lat combination is present.

use std::io::Write;
use std::path::Path;

use raster_common::{ClipBounds, GeoTransform, RasterGrid, RenderError, RenderResult};
use tracing::{debug, warn};

use crate::writer::write_atomic_with;

/// Resolution used for an axis with a single distinct coordinate.
pub const FALLBACK_RESOLUTION: f64 = 1e-4;

const REQUIRED_COLUMNS: [&str; 3] = ["longitude", "latitude", "value"];

/// A single table row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub lon: f64,
    pub lat: f64,
    pub value: f32,
}

/// Strip whole-field quotes. Quoted fields with embedded separators or
/// escaped quotes are not supported and yield `None`.
fn unquote(field: &str) -> Option<&str> {
    let field = field.trim();
    match field.strip_prefix('"') {
        Some(rest) => rest.strip_suffix('"').filter(|inner| !inner.contains('"')),
        None => (!field.contains('"')).then_some(field),
    }
}

/// Split a line on `,`, rejecting fields that are only partly quoted.
fn split_fields(line: &str) -> RenderResult<Vec<&str>> {
    line.split(',')
        .map(|f| {
            unquote(f).ok_or_else(|| {
                RenderError::invalid_table(format!(
                    "quoted fields with embedded separators are not supported: {}",
                    line
                ))
            })
        })
        .collect()
}

/// Parse a point table from text.
///
/// Fields are separated by `,` and may be wrapped in double quotes as a
/// whole; quoting that hides a separator is rejected as `InvalidTable`.
pub fn parse_point_table(text: &str) -> RenderResult<Vec<GridPoint>> {
    let mut lines = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| RenderError::empty_raster("point table is empty"))?;
    let columns = split_fields(header.trim_start_matches('\u{feff}'))?;

    let mut index = [0usize; 3];
    for (slot, name) in index.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = columns.iter().position(|c| *c == name).ok_or_else(|| {
            RenderError::invalid_table(format!(
                "missing column '{}' (need longitude, latitude, value)",
                name
            ))
        })?;
    }

    let mut points = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let fields = split_fields(line)?;
        let field = |i: usize| fields.get(index[i]).copied().unwrap_or("");
        let parse_err = || RenderError::invalid_table(format!("invalid values on data row {}: {}", line_no + 1, line));

        let lon: f64 = field(0).parse().map_err(|_| parse_err())?;
        let lat: f64 = field(1).parse().map_err(|_| parse_err())?;
        let value: f32 = field(2).parse().map_err(|_| parse_err())?;
        points.push(GridPoint { lon, lat, value });
    }

    if points.is_empty() {
        return Err(RenderError::empty_raster("point table has no data rows"));
    }
    Ok(points)
}

/// Read a point table from disk.
pub fn read_point_table(path: impl AsRef<Path>) -> RenderResult<Vec<GridPoint>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| RenderError::input_not_found(path, e))?;
    parse_point_table(&text).map_err(|e| match e {
        RenderError::InvalidTable(msg) => RenderError::InvalidTable(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

fn distinct_sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.collect();
    v.sort_by(|a, b| a.total_cmp(b));
    v.dedup();
    v
}

/// Rebuild a regular grid from scattered points.
///
/// Columns follow distinct longitudes ascending and rows distinct latitudes
/// descending. The transform is anchored half a pixel outside the first
/// column and row centres.
pub fn reconstruct_grid(points: &[GridPoint]) -> RenderResult<(RasterGrid, GeoTransform)> {
    if points.is_empty() {
        return Err(RenderError::empty_raster("no points to reconstruct"));
    }
    let lons = distinct_sorted(points.iter().map(|p| p.lon));
    let mut lats = distinct_sorted(points.iter().map(|p| p.lat));
    lats.reverse();

    if lons.len() * lats.len() != points.len() {
        return Err(RenderError::IrregularGrid {
            distinct_lons: lons.len(),
            distinct_lats: lats.len(),
            rows: points.len(),
        });
    }

    let mut grid = RasterGrid::nan(lats.len(), lons.len());
    for p in points {
        let col = lons.binary_search_by(|v| v.total_cmp(&p.lon));
        let row = lats.binary_search_by(|v| p.lat.total_cmp(v));
        if let (Ok(col), Ok(row)) = (col, row) {
            grid.set(row, col, p.value);
        }
    }

    let lon_res = if lons.len() > 1 {
        lons[1] - lons[0]
    } else {
        warn!(resolution = FALLBACK_RESOLUTION, "Single longitude in point table, using fallback resolution");
        FALLBACK_RESOLUTION
    };
    let lat_res = if lats.len() > 1 {
        lats[0] - lats[1]
    } else {
        warn!(resolution = FALLBACK_RESOLUTION, "Single latitude in point table, using fallback resolution");
        FALLBACK_RESOLUTION
    };

    let transform = GeoTransform::new(lons[0] - lon_res / 2.0, lats[0] + lat_res / 2.0, lon_res, lat_res)?;
    debug!(
        rows = grid.rows(),
        cols = grid.cols(),
        lon_res,
        lat_res,
        "Reconstructed grid from point table"
    );
    Ok((grid, transform))
}

/// Pad a grid with `NaN` so it covers `clip`.
///
/// Each side grows by `ceil(delta / res)` whole pixels (zero when the grid
/// already reaches that edge); the origin moves by the same pixel counts, so
/// existing samples keep their coordinates.
pub fn expand_to_clip_bounds(
    grid: &RasterGrid,
    transform: &GeoTransform,
    clip: &ClipBounds,
) -> RenderResult<(RasterGrid, GeoTransform)> {
    if !transform.is_north_up() {
        return Err(RenderError::invalid_transform("cannot pad a rotated grid"));
    }
    let lon_res = transform.pixel_width();
    let lat_res = transform.pixel_height();
    let current = transform.bounds(grid.rows(), grid.cols());

    let pad = |delta: f64, res: f64| -> usize {
        let pixels = delta / res;
        if pixels > 0.0 {
            // Tolerate float noise on exact multiples
            (pixels - 1e-9).ceil() as usize
        } else {
            0
        }
    };
    let left = pad(current.min_x - clip.min_x, lon_res);
    let right = pad(clip.max_x - current.max_x, lon_res);
    let top = pad(clip.max_y - current.max_y, lat_res);
    let bottom = pad(current.min_y - clip.min_y, lat_res);

    if left == 0 && right == 0 && top == 0 && bottom == 0 {
        return Ok((grid.clone(), *transform));
    }

    let rows = top + grid.rows() + bottom;
    let cols = left + grid.cols() + right;
    let padded = RasterGrid::from_fn(rows, cols, |r, c| {
        if r < top || c < left {
            return f32::NAN;
        }
        grid.get(r - top, c - left).unwrap_or(f32::NAN)
    });
    let origin_x = transform.origin_x() - left as f64 * lon_res;
    let origin_y = transform.origin_y() + top as f64 * lat_res;

    debug!(left, right, top, bottom, "Padded grid to clip bounds");
    Ok((padded, transform.with_origin(origin_x, origin_y)))
}

/// Write one row per finite pixel, coordinates at pixel centres.
pub fn write_point_table(grid: &RasterGrid, transform: &GeoTransform, path: impl AsRef<Path>) -> RenderResult<usize> {
    let path = path.as_ref();
    let mut written = 0usize;
    write_atomic_with(path, |w| {
        writeln!(w, "longitude,latitude,value")?;
        for row in 0..grid.rows() {
            for (col, &value) in grid.row(row).iter().enumerate() {
                if !value.is_finite() {
                    continue;
                }
                let (lon, lat) = transform.pixel_center(row, col);
                writeln!(w, "{},{},{}", lon, lat, value)?;
                written += 1;
            }
        }
        Ok(())
    })?;
    debug!(path = %path.display(), points = written, "Wrote point table");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_common::BoundingBox;

    fn three_by_three() -> Vec<GridPoint> {
        let mut points = Vec::new();
        for (i, lat) in [-22.0, -22.01, -22.02].into_iter().enumerate() {
            for (j, lon) in [-47.0, -46.99, -46.98].into_iter().enumerate() {
                points.push(GridPoint {
                    lon,
                    lat,
                    value: (i * 3 + j) as f32,
                });
            }
        }
        points
    }

    #[test]
    fn test_reconstruct_three_by_three() {
        let mut points = three_by_three();
        points.reverse();
        let (grid, gt) = reconstruct_grid(&points).unwrap();
        assert_eq!(grid.shape(), (3, 3));
        assert_eq!(grid.finite_count(), 9);
        // Row 0 is the northernmost latitude, column 0 the westernmost longitude
        assert_eq!(grid.get(0, 0), Some(0.0));
        assert_eq!(grid.get(0, 2), Some(2.0));
        assert_eq!(grid.get(2, 0), Some(6.0));
        assert!((gt.pixel_width() - 0.01).abs() < 1e-9);
        assert!((gt.pixel_height() - 0.01).abs() < 1e-9);
        assert!((gt.origin_x() - (-47.005)).abs() < 1e-9);
        assert!((gt.origin_y() - (-21.995)).abs() < 1e-9);
    }

    #[test]
    fn test_irregular_grid() {
        let mut points = three_by_three();
        points.pop();
        match reconstruct_grid(&points) {
            Err(RenderError::IrregularGrid {
                distinct_lons,
                distinct_lats,
                rows,
            }) => assert_eq!((distinct_lons, distinct_lats, rows), (3, 3, 8)),
            other => panic!("expected IrregularGrid, got {:?}", other),
        }
    }

    #[test]
    fn test_single_point_uses_fallback_resolution() {
        let (grid, gt) = reconstruct_grid(&[GridPoint {
            lon: 1.0,
            lat: 2.0,
            value: 0.5,
        }])
        .unwrap();
        assert_eq!(grid.shape(), (1, 1));
        assert_eq!(gt.pixel_width(), FALLBACK_RESOLUTION);
        assert_eq!(gt.pixel_height(), FALLBACK_RESOLUTION);
    }

    #[test]
    fn test_parse_any_column_order() {
        let text = "value,latitude,longitude\n0.5,-22.0,-47.0\n0.25,-22.0,-46.99\n";
        let points = parse_point_table(text).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].lon, -46.99);
        assert_eq!(points[1].value, 0.25);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_point_table("lon,lat,value\n1,2,3\n"),
            Err(RenderError::InvalidTable(_))
        ));
        assert!(matches!(
            parse_point_table("longitude,latitude,value\n1,2,abc\n"),
            Err(RenderError::InvalidTable(_))
        ));
        assert!(matches!(
            parse_point_table("longitude,latitude,value\n"),
            Err(RenderError::EmptyRaster(_))
        ));
    }

    #[test]
    fn test_quoted_fields() {
        let text = "\"longitude\",\"latitude\",\"value\"\n\"-47.0\",-22.0,\"0.5\"\n";
        let points = parse_point_table(text).unwrap();
        assert_eq!(points[0], GridPoint { lon: -47.0, lat: -22.0, value: 0.5 });

        // A quoted decimal comma splits into a half-quoted pair
        assert!(matches!(
            parse_point_table("longitude,latitude,value\n-47.0,-22.0,\"0,5\"\n"),
            Err(RenderError::InvalidTable(_))
        ));
        assert!(matches!(
            parse_point_table("longitude,latitude,value,label\n-47.0,-22.0,0.5,\"a \"\"b\"\"\"\n"),
            Err(RenderError::InvalidTable(_))
        ));
    }

    #[test]
    fn test_expand_keeps_samples_aligned() {
        let gt = GeoTransform::new(0.0, 2.0, 1.0, 1.0).unwrap();
        let grid = RasterGrid::from_fn(2, 2, |r, c| (r * 2 + c) as f32);
        let clip = BoundingBox::new(-1.5, -0.2, 3.0, 4.0);

        let (padded, pt) = expand_to_clip_bounds(&grid, &gt, &clip).unwrap();
        // left 2, right 1, top 2, bottom 1
        assert_eq!(padded.shape(), (5, 5));
        assert_eq!(pt.origin_x(), -2.0);
        assert_eq!(pt.origin_y(), 4.0);
        assert_eq!(padded.get(2, 2), Some(0.0));
        assert_eq!(padded.get(3, 3), Some(3.0));
        assert_eq!(padded.finite_count(), 4);
        // Sample (0, 0) keeps its centre coordinate
        assert_eq!(pt.pixel_center(2, 2), gt.pixel_center(0, 0));
    }

    #[test]
    fn test_expand_noop_when_covered() {
        let gt = GeoTransform::new(0.0, 2.0, 1.0, 1.0).unwrap();
        let grid = RasterGrid::filled(2, 2, 1.0);
        let clip = BoundingBox::new(0.5, 0.5, 1.5, 1.5);
        let (out, t) = expand_to_clip_bounds(&grid, &gt, &clip).unwrap();
        assert_eq!(out, grid);
        assert_eq!(t, gt);
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ndvi.csv");
        let gt = GeoTransform::new(-47.1, -22.8, 0.0001, 0.0001).unwrap();
        let grid = RasterGrid::from_fn(4, 5, |r, c| 0.1 + (r * 5 + c) as f32 * 0.013);

        assert_eq!(write_point_table(&grid, &gt, &path).unwrap(), 20);
        let (back, bt) = reconstruct_grid(&read_point_table(&path).unwrap()).unwrap();
        assert_eq!(back.shape(), grid.shape());
        assert_eq!(back.data(), grid.data());
        assert!((bt.origin_x() - gt.origin_x()).abs() < 1e-9);
        assert!((bt.origin_y() - gt.origin_y()).abs() < 1e-9);
    }
}
