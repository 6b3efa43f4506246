//! Single-band GeoTIFF loading with windowed reads and reprojection.
//!
//! The loader reads only the strips or tiles that intersect the requested
//! clip window, converts the no-data sentinel to `NaN` and warps the result
//! onto a regular EPSG:4326 grid.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use projection::{CrsTransform, DEFAULT_DENSIFY_POINTS};
use raster_common::{BoundingBox, ClipBounds, Crs, GeoTransform, RasterGrid, RenderError, RenderResult};
use serde::Serialize;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::{debug, info};

use crate::projection::{calculate_default_transform, warp_bilinear, WarpTarget};

// GeoTIFF / GDAL private tags
const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_MODEL_TRANSFORMATION: u16 = 34264;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

// GeoKeys
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;

const RASTER_PIXEL_IS_POINT: u16 = 2;

/// Georeferencing of a raster file, read without decoding pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterMetadata {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
    pub crs: Crs,
    pub nodata: Option<f64>,
}

impl RasterMetadata {
    /// Bounds of the full raster in its native CRS.
    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.rows, self.cols)
    }
}

/// A raster reprojected to EPSG:4326.
#[derive(Debug, Clone)]
pub struct LoadedRaster {
    pub grid: RasterGrid,
    pub transform: GeoTransform,
    pub bounds: BoundingBox,
}

/// A rectangular block of pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub row_off: usize,
    pub col_off: usize,
    pub rows: usize,
    pub cols: usize,
}

impl PixelWindow {
    pub fn full(rows: usize, cols: usize) -> Self {
        Self {
            row_off: 0,
            col_off: 0,
            rows,
            cols,
        }
    }

    /// Window covering `bounds` under a north-up transform.
    ///
    /// Offsets are floored and the far edges ceiled, so every pixel touching
    /// the bounds is included. Returns `None` for an empty window.
    pub fn from_bounds(transform: &GeoTransform, rows: usize, cols: usize, bounds: &BoundingBox) -> Option<Self> {
        const EPS: f64 = 1e-9;
        let (c0, r0) = transform.geo_to_pixel(bounds.min_x, bounds.max_y);
        let (c1, r1) = transform.geo_to_pixel(bounds.max_x, bounds.min_y);

        let col_off = (c0 + EPS).floor().clamp(0.0, cols as f64) as usize;
        let row_off = (r0 + EPS).floor().clamp(0.0, rows as f64) as usize;
        let col_end = (c1 - EPS).ceil().clamp(0.0, cols as f64) as usize;
        let row_end = (r1 - EPS).ceil().clamp(0.0, rows as f64) as usize;

        if col_end <= col_off || row_end <= row_off {
            return None;
        }
        Some(Self {
            row_off,
            col_off,
            rows: row_end - row_off,
            cols: col_end - col_off,
        })
    }
}

/// Open a GeoTIFF decoder, mapping open failures to `InputNotFound`.
fn open_decoder(path: &Path) -> RenderResult<Decoder<BufReader<File>>> {
    let file = File::open(path).map_err(|e| RenderError::input_not_found(path, e))?;
    Decoder::new(BufReader::new(file))
        .map_err(|e| RenderError::Decode(format!("{}: {}", path.display(), e)))
}

fn find_f64_vec<R: Read + Seek>(decoder: &mut Decoder<R>, code: u16) -> RenderResult<Option<Vec<f64>>> {
    match decoder.find_tag(Tag::from_u16_exhaustive(code))? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}

/// Parse the GeoKey directory into `(key, value)` pairs with inline values.
fn read_geo_keys<R: Read + Seek>(decoder: &mut Decoder<R>) -> RenderResult<Vec<(u16, u16)>> {
    let directory = match decoder.find_tag(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY))? {
        Some(value) => value.into_u16_vec()?,
        None => return Ok(Vec::new()),
    };
    if directory.len() < 4 {
        return Ok(Vec::new());
    }
    let count = directory[3] as usize;
    let keys = directory[4..]
        .chunks_exact(4)
        .take(count)
        // TIFFTagLocation 0 means the value is stored inline
        .filter(|entry| entry[1] == 0)
        .map(|entry| (entry[0], entry[3]))
        .collect();
    Ok(keys)
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>, pixel_is_point: bool) -> RenderResult<GeoTransform> {
    if let Some(m) = find_f64_vec(decoder, TAG_MODEL_TRANSFORMATION)? {
        if m.len() >= 8 {
            // Row-major 4x4: x = m0*col + m1*row + m3, y = m4*col + m5*row + m7
            return GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]]);
        }
    }

    let scale = find_f64_vec(decoder, TAG_MODEL_PIXEL_SCALE)?;
    let tiepoint = find_f64_vec(decoder, TAG_MODEL_TIEPOINT)?;
    match (scale, tiepoint) {
        (Some(scale), Some(tiepoint)) if scale.len() >= 2 && tiepoint.len() >= 6 => {
            // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
            let (mut i, mut j) = (tiepoint[0], tiepoint[1]);
            // The tiepoint names a pixel centre; move it to the corner
            if pixel_is_point {
                i += 0.5;
                j += 0.5;
            }
            let origin_x = tiepoint[3] - i * scale[0];
            let origin_y = tiepoint[4] + j * scale[1];
            GeoTransform::new(origin_x, origin_y, scale[0], scale[1])
        }
        _ => Err(RenderError::invalid_transform(
            "raster has neither ModelTransformation nor ModelPixelScale + ModelTiepoint",
        )),
    }
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> RenderResult<Option<f64>> {
    let Some(value) = decoder.find_tag(Tag::from_u16_exhaustive(TAG_GDAL_NODATA))? else {
        return Ok(None);
    };
    let text = value.into_string()?;
    let text = text.trim_matches(char::from(0)).trim();
    Ok(text.parse::<f64>().ok().filter(|v| !v.is_nan()))
}

fn read_metadata_from<R: Read + Seek>(decoder: &mut Decoder<R>) -> RenderResult<RasterMetadata> {
    let (width, height) = decoder.dimensions()?;
    let keys = read_geo_keys(decoder)?;
    let key = |id: u16| keys.iter().find(|(k, _)| *k == id).map(|(_, v)| *v);

    let pixel_is_point = key(KEY_RASTER_TYPE) == Some(RASTER_PIXEL_IS_POINT);
    let crs = match (key(KEY_PROJECTED_CS_TYPE), key(KEY_GEOGRAPHIC_TYPE)) {
        (Some(code), _) => Crs::from_epsg(code as u32)?,
        (None, Some(code)) => Crs::from_epsg(code as u32)?,
        (None, None) => Crs::WGS84,
    };

    Ok(RasterMetadata {
        rows: height as usize,
        cols: width as usize,
        transform: read_transform(decoder, pixel_is_point)?,
        crs,
        nodata: read_nodata(decoder)?,
    })
}

/// Report size, transform, CRS and no-data of a GeoTIFF without decoding pixels.
pub fn read_metadata(path: impl AsRef<Path>) -> RenderResult<RasterMetadata> {
    let path = path.as_ref();
    let mut decoder = open_decoder(path)?;
    read_metadata_from(&mut decoder)
}

/// Convert any decoded chunk to `f32`, keeping every `step`-th sample.
fn chunk_to_f32(result: DecodingResult, step: usize) -> RenderResult<Vec<f32>> {
    fn take<T: Copy>(buf: Vec<T>, step: usize, f: impl Fn(T) -> f32) -> Vec<f32> {
        buf.into_iter().step_by(step.max(1)).map(f).collect()
    }
    let values = match result {
        DecodingResult::U8(buf) => take(buf, step, |v| v as f32),
        DecodingResult::U16(buf) => take(buf, step, |v| v as f32),
        DecodingResult::U32(buf) => take(buf, step, |v| v as f32),
        DecodingResult::U64(buf) => take(buf, step, |v| v as f32),
        DecodingResult::I8(buf) => take(buf, step, |v| v as f32),
        DecodingResult::I16(buf) => take(buf, step, |v| v as f32),
        DecodingResult::I32(buf) => take(buf, step, |v| v as f32),
        DecodingResult::I64(buf) => take(buf, step, |v| v as f32),
        DecodingResult::F32(buf) => take(buf, step, |v| v),
        DecodingResult::F64(buf) => take(buf, step, |v| v as f32),
        #[allow(unreachable_patterns)]
        _ => return Err(RenderError::Decode("unsupported TIFF sample format".to_string())),
    };
    Ok(values)
}

/// Decode band 1 inside `window`, touching only intersecting chunks.
fn read_window<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    meta: &RasterMetadata,
    window: PixelWindow,
) -> RenderResult<RasterGrid> {
    let samples_per_pixel = decoder
        .find_tag(Tag::SamplesPerPixel)?
        .map(|v| v.into_u32())
        .transpose()?
        .unwrap_or(1) as usize;
    // PlanarConfiguration 2 stores band 1 in its own leading chunks
    let planar = decoder
        .find_tag(Tag::PlanarConfiguration)?
        .map(|v| v.into_u16())
        .transpose()?
        .unwrap_or(1);
    let step = if planar == 2 { 1 } else { samples_per_pixel };

    let (chunk_w, chunk_h) = decoder.chunk_dimensions();
    let (chunk_w, chunk_h) = (chunk_w as usize, chunk_h as usize);
    if chunk_w == 0 || chunk_h == 0 {
        return Err(RenderError::Decode("TIFF reports zero-sized chunks".to_string()));
    }
    let chunks_across = meta.cols.div_ceil(chunk_w);

    let mut grid = RasterGrid::nan(window.rows, window.cols);
    let first_chunk_row = window.row_off / chunk_h;
    let last_chunk_row = (window.row_off + window.rows - 1) / chunk_h;
    let first_chunk_col = window.col_off / chunk_w;
    let last_chunk_col = (window.col_off + window.cols - 1) / chunk_w;

    let mut chunks_read = 0usize;
    for chunk_row in first_chunk_row..=last_chunk_row {
        for chunk_col in first_chunk_col..=last_chunk_col {
            let index = (chunk_row * chunks_across + chunk_col) as u32;
            let (data_w, data_h) = decoder.chunk_data_dimensions(index);
            let values = chunk_to_f32(decoder.read_chunk(index)?, step)?;
            chunks_read += 1;

            let chunk_y0 = chunk_row * chunk_h;
            let chunk_x0 = chunk_col * chunk_w;
            let (data_w, data_h) = (data_w as usize, data_h as usize);

            let y_start = chunk_y0.max(window.row_off);
            let y_end = (chunk_y0 + data_h).min(window.row_off + window.rows);
            let x_start = chunk_x0.max(window.col_off);
            let x_end = (chunk_x0 + data_w).min(window.col_off + window.cols);

            for y in y_start..y_end {
                for x in x_start..x_end {
                    let src = (y - chunk_y0) * data_w + (x - chunk_x0);
                    if let Some(&v) = values.get(src) {
                        grid.set(y - window.row_off, x - window.col_off, v);
                    }
                }
            }
        }
    }
    debug!(
        chunks_read,
        rows = window.rows,
        cols = window.cols,
        "Decoded raster window"
    );

    if let Some(nodata) = meta.nodata {
        let sentinel = nodata as f32;
        for v in grid.data_mut() {
            if *v == sentinel {
                *v = f32::NAN;
            }
        }
    }
    for v in grid.data_mut() {
        if !v.is_finite() {
            *v = f32::NAN;
        }
    }
    Ok(grid)
}

/// A raster in its native CRS, possibly windowed.
#[derive(Debug, Clone)]
pub struct NativeRaster {
    pub grid: RasterGrid,
    pub transform: GeoTransform,
    pub crs: Crs,
}

/// Read band 1 in the native CRS, limited to `clip` (EPSG:4326) if given.
pub fn read_native(path: impl AsRef<Path>, clip: Option<&ClipBounds>) -> RenderResult<NativeRaster> {
    let path = path.as_ref();
    let mut decoder = open_decoder(path)?;
    let meta = read_metadata_from(&mut decoder)?;

    let window = match clip {
        Some(clip) if meta.transform.is_north_up() => {
            let src_clip = CrsTransform::new(Crs::WGS84, meta.crs).transform_bounds(clip, DEFAULT_DENSIFY_POINTS)?;
            let clamped = src_clip.intersection(&meta.bounds()).ok_or_else(|| {
                RenderError::empty_raster(format!(
                    "{}: clip bounds do not intersect the raster",
                    path.display()
                ))
            })?;
            PixelWindow::from_bounds(&meta.transform, meta.rows, meta.cols, &clamped).ok_or_else(|| {
                RenderError::empty_raster(format!("{}: clip window has zero area", path.display()))
            })?
        }
        _ => PixelWindow::full(meta.rows, meta.cols),
    };
    if window.rows == 0 || window.cols == 0 {
        return Err(RenderError::empty_raster(format!("{}: raster has zero size", path.display())));
    }

    let grid = read_window(&mut decoder, &meta, window)?;
    Ok(NativeRaster {
        grid,
        transform: meta.transform.window(window.row_off, window.col_off),
        crs: meta.crs,
    })
}

/// Load band 1, reprojected to EPSG:4326 on the default output grid.
pub fn load_raster(path: impl AsRef<Path>, clip: Option<&ClipBounds>) -> RenderResult<LoadedRaster> {
    let path = path.as_ref();
    let native = read_native(path, clip)?;
    let target = calculate_default_transform(
        native.crs,
        Crs::WGS84,
        &native.transform,
        native.grid.rows(),
        native.grid.cols(),
    )?;
    let grid = warp_bilinear(&native.grid, &native.transform, native.crs, &target, Crs::WGS84);
    let bounds = target.transform.bounds(target.rows, target.cols);

    info!(
        path = %path.display(),
        crs = %native.crs,
        rows = target.rows,
        cols = target.cols,
        "Loaded raster"
    );

    Ok(LoadedRaster {
        grid,
        transform: target.transform,
        bounds,
    })
}

/// Load band 1 warped onto an existing EPSG:4326 grid.
pub fn load_raster_onto(
    path: impl AsRef<Path>,
    clip: Option<&ClipBounds>,
    target: &WarpTarget,
) -> RenderResult<RasterGrid> {
    let native = read_native(path, clip)?;
    Ok(warp_bilinear(&native.grid, &native.transform, native.crs, target, Crs::WGS84))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_floor_and_ceil() {
        let gt = GeoTransform::new(0.0, 10.0, 1.0, 1.0).unwrap();
        let bounds = BoundingBox::new(2.5, 3.2, 5.1, 7.9);
        let w = PixelWindow::from_bounds(&gt, 10, 10, &bounds).unwrap();
        assert_eq!(
            w,
            PixelWindow {
                row_off: 2,
                col_off: 2,
                rows: 5,
                cols: 4
            }
        );
    }

    #[test]
    fn test_window_exact_pixel_edges() {
        let gt = GeoTransform::new(0.0, 10.0, 1.0, 1.0).unwrap();
        let bounds = BoundingBox::new(2.0, 3.0, 5.0, 7.0);
        let w = PixelWindow::from_bounds(&gt, 10, 10, &bounds).unwrap();
        assert_eq!((w.row_off, w.col_off, w.rows, w.cols), (3, 2, 4, 3));
    }

    #[test]
    fn test_window_outside_is_none() {
        let gt = GeoTransform::new(0.0, 10.0, 1.0, 1.0).unwrap();
        let bounds = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert!(PixelWindow::from_bounds(&gt, 10, 10, &bounds).is_none());
    }

    #[test]
    fn test_missing_file_is_input_not_found() {
        let err = load_raster("/nonexistent/ndvi.tif", None).unwrap_err();
        assert!(matches!(err, RenderError::InputNotFound { .. }));
    }
}
