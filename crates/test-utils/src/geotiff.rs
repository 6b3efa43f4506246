//! Minimal GeoTIFF writer for loader tests.
//!
//! Writes a single-band strip TIFF with ModelPixelScale + ModelTiepoint,
//! a GeoKey directory carrying the EPSG code and an optional `GDAL_NODATA`
//! string, which is the subset the loader understands.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tiff::TiffResult;

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;

/// Sample encoding of the written band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    Float32,
    /// Values are rounded and clamped into `u16`.
    UInt16,
}

/// Builder for a georeferenced single-band TIFF.
#[derive(Debug, Clone)]
pub struct GeoTiffFixture {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
    origin: (f64, f64),
    pixel_size: (f64, f64),
    epsg: u16,
    nodata: Option<f64>,
    pixel_is_point: bool,
    sample_type: SampleType,
}

impl GeoTiffFixture {
    /// A WGS84 raster with 1° pixels anchored at `(0, rows)`.
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Self {
        assert_eq!(data.len(), rows * cols, "data length must be rows * cols");
        Self {
            rows,
            cols,
            data,
            origin: (0.0, rows as f64),
            pixel_size: (1.0, 1.0),
            epsg: 4326,
            nodata: None,
            pixel_is_point: false,
            sample_type: SampleType::Float32,
        }
    }

    pub fn from_grid(grid: &raster_common::RasterGrid) -> Self {
        Self::new(grid.rows(), grid.cols(), grid.data().to_vec())
    }

    /// Upper-left corner of the upper-left pixel.
    pub fn origin(mut self, x: f64, y: f64) -> Self {
        self.origin = (x, y);
        self
    }

    pub fn pixel_size(mut self, width: f64, height: f64) -> Self {
        self.pixel_size = (width, height);
        self
    }

    pub fn epsg(mut self, code: u16) -> Self {
        self.epsg = code;
        self
    }

    pub fn nodata(mut self, value: f64) -> Self {
        self.nodata = Some(value);
        self
    }

    /// Tag the raster as PixelIsPoint, tiepoint at the first pixel centre.
    pub fn pixel_is_point(mut self) -> Self {
        self.pixel_is_point = true;
        self
    }

    pub fn sample_type(mut self, sample_type: SampleType) -> Self {
        self.sample_type = sample_type;
        self
    }

    fn is_geographic(&self) -> bool {
        matches!(self.epsg, 4326 | 4674)
    }

    fn geo_keys(&self) -> Vec<u16> {
        let (model_type, crs_key) = if self.is_geographic() {
            (2, KEY_GEOGRAPHIC_TYPE)
        } else {
            (1, KEY_PROJECTED_CS_TYPE)
        };
        let raster_type = if self.pixel_is_point { 2 } else { 1 };
        // Header: version 1, revision 1.0, key count
        vec![
            1,
            1,
            0,
            3,
            KEY_MODEL_TYPE,
            0,
            1,
            model_type,
            KEY_RASTER_TYPE,
            0,
            1,
            raster_type,
            crs_key,
            0,
            1,
            self.epsg,
        ]
    }

    fn tiepoint(&self) -> [f64; 6] {
        let (x, y) = self.origin;
        if self.pixel_is_point {
            let (w, h) = self.pixel_size;
            [0.0, 0.0, 0.0, x + w / 2.0, y - h / 2.0, 0.0]
        } else {
            [0.0, 0.0, 0.0, x, y, 0.0]
        }
    }

    /// Write the file.
    pub fn write(&self, path: impl AsRef<Path>) -> TiffResult<()> {
        let file = File::create(path.as_ref())?;
        let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
        let scale = [self.pixel_size.0, self.pixel_size.1, 0.0];
        let tiepoint = self.tiepoint();
        let keys = self.geo_keys();
        let nodata = self.nodata.map(|v| v.to_string());
        let (w, h) = (self.cols as u32, self.rows as u32);

        macro_rules! write_image {
            ($color:ty, $samples:expr) => {{
                let mut image = encoder.new_image::<$color>(w, h)?;
                let dir = image.encoder();
                dir.write_tag(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE), &scale[..])?;
                dir.write_tag(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT), &tiepoint[..])?;
                dir.write_tag(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY), &keys[..])?;
                if let Some(nodata) = &nodata {
                    dir.write_tag(Tag::from_u16_exhaustive(TAG_GDAL_NODATA), nodata.as_str())?;
                }
                image.write_data($samples)?;
            }};
        }

        match self.sample_type {
            SampleType::Float32 => write_image!(colortype::Gray32Float, &self.data[..]),
            SampleType::UInt16 => {
                let samples: Vec<u16> = self
                    .data
                    .iter()
                    .map(|v| if v.is_finite() { v.round().clamp(0.0, 65535.0) as u16 } else { 0 })
                    .collect();
                write_image!(colortype::Gray16, &samples[..])
            }
        }
        Ok(())
    }

    /// Write into `dir/name` and return the path.
    pub fn write_in(&self, dir: &Path, name: &str) -> TiffResult<std::path::PathBuf> {
        let path = dir.join(name);
        self.write(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::decoder::{Decoder, DecodingResult};

    #[test]
    fn test_written_file_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let data: Vec<f32> = (0..12).map(|v| v as f32 * 0.5).collect();
        let path = GeoTiffFixture::new(3, 4, data.clone())
            .origin(-47.0, -22.0)
            .pixel_size(0.01, 0.01)
            .nodata(-9999.0)
            .write_in(dir.path(), "band.tif")
            .unwrap();

        let mut decoder = Decoder::new(File::open(path).unwrap()).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (4, 3));
        match decoder.read_image().unwrap() {
            DecodingResult::F32(values) => assert_eq!(values, data),
            _ => panic!("expected f32 samples"),
        }
        let keys = decoder
            .find_tag(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY))
            .unwrap()
            .unwrap()
            .into_u16_vec()
            .unwrap();
        assert_eq!(keys[3], 3);
        assert_eq!(*keys.last().unwrap(), 4326);
    }
}
