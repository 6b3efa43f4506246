//! PNG encoding for RGBA and RGB image data.
//!
//! Supports three encoding modes:
//! - **Indexed PNG (color type 3)**: Used when an RGBA image has ≤256 unique
//!   colors. Index overlays with few distinct values compress much better.
//! - **RGBA PNG (color type 6)**: Fallback for images with >256 colors.
//! - **RGB PNG (color type 2)**: Opaque true-color composites.
//!
//! Use `encode_rgba` for automatic mode selection on image buffers.

use std::collections::HashMap;
use std::io::Write;

use image::{RgbImage, RgbaImage};
use raster_common::{RenderError, RenderResult};

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

const COLOR_TYPE_RGB: u8 = 2;
const COLOR_TYPE_INDEXED: u8 = 3;
const COLOR_TYPE_RGBA: u8 = 6;

/// Encode an RGBA image, indexed when the palette fits.
pub fn encode_rgba(image: &RgbaImage) -> RenderResult<Vec<u8>> {
    create_png_auto(image.as_raw(), image.width() as usize, image.height() as usize)
}

/// Encode an opaque RGB image.
pub fn encode_rgb(image: &RgbImage) -> RenderResult<Vec<u8>> {
    create_png_rgb(image.as_raw(), image.width() as usize, image.height() as usize)
}

/// Create a PNG image with automatic format selection.
///
/// - If ≤256 unique colors: uses indexed PNG (smaller, faster)
/// - Otherwise: uses RGBA PNG (full color)
pub fn create_png_auto(pixels: &[u8], width: usize, height: usize) -> RenderResult<Vec<u8>> {
    check_len(pixels, width, height, 4)?;
    match extract_palette(pixels) {
        Some((palette, indices)) => create_png_indexed(width, height, &palette, &indices),
        None => create_png(pixels, width, height),
    }
}

/// Pack RGBA bytes into a u32 for faster hashing and comparison
#[inline(always)]
fn pack_color(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (r as u32) | ((g as u32) << 8) | ((b as u32) << 16) | ((a as u32) << 24)
}

/// Palette and per-pixel indices, or `None` with more than 256 colors.
fn extract_palette(pixels: &[u8]) -> Option<(Vec<(u8, u8, u8, u8)>, Vec<u8>)> {
    let mut color_to_index: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Vec<(u8, u8, u8, u8)> = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices: Vec<u8> = Vec::with_capacity(pixels.len() / 4);

    for chunk in pixels.chunks_exact(4) {
        let packed = pack_color(chunk[0], chunk[1], chunk[2], chunk[3]);

        let index = match color_to_index.get(&packed) {
            Some(&idx) => idx,
            None => {
                if palette.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let idx = palette.len() as u8;
                palette.push((chunk[0], chunk[1], chunk[2], chunk[3]));
                color_to_index.insert(packed, idx);
                idx
            }
        };
        indices.push(index);
    }

    Some((palette, indices))
}

fn check_len(pixels: &[u8], width: usize, height: usize, channels: usize) -> RenderResult<()> {
    if width == 0 || height == 0 {
        return Err(RenderError::empty_raster("cannot encode a zero-sized image"));
    }
    if pixels.len() != width * height * channels {
        return Err(RenderError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "pixel buffer has {} bytes, expected {}x{}x{}",
                pixels.len(),
                width,
                height,
                channels
            ),
        )));
    }
    Ok(())
}

fn write_header(png: &mut Vec<u8>, width: usize, height: usize, color_type: u8) {
    png.extend_from_slice(&PNG_SIGNATURE);

    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr_data.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(color_type);
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(png, b"IHDR", &ihdr_data);
}

/// Create an indexed PNG (color type 3) from palette and indices.
pub fn create_png_indexed(
    width: usize,
    height: usize,
    palette: &[(u8, u8, u8, u8)],
    indices: &[u8],
) -> RenderResult<Vec<u8>> {
    check_len(indices, width, height, 1)?;
    let mut png = Vec::new();
    write_header(&mut png, width, height, COLOR_TYPE_INDEXED);

    // PLTE chunk (palette)
    let mut plte_data = Vec::with_capacity(palette.len() * 3);
    for (r, g, b, _) in palette {
        plte_data.extend_from_slice(&[*r, *g, *b]);
    }
    write_chunk(&mut png, b"PLTE", &plte_data);

    // tRNS chunk (transparency) - only if any color has alpha < 255
    if palette.iter().any(|(_, _, _, a)| *a < 255) {
        let trns_data: Vec<u8> = palette.iter().map(|(_, _, _, a)| *a).collect();
        write_chunk(&mut png, b"tRNS", &trns_data);
    }

    let idat_data = deflate_scanlines(indices, width, height, 1)?;
    write_chunk(&mut png, b"IDAT", &idat_data);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Create a PNG image from RGBA pixel data (color type 6).
pub fn create_png(pixels: &[u8], width: usize, height: usize) -> RenderResult<Vec<u8>> {
    check_len(pixels, width, height, 4)?;
    let mut png = Vec::new();
    write_header(&mut png, width, height, COLOR_TYPE_RGBA);
    let idat_data = deflate_scanlines(pixels, width, height, 4)?;
    write_chunk(&mut png, b"IDAT", &idat_data);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Create a PNG image from RGB pixel data (color type 2).
pub fn create_png_rgb(pixels: &[u8], width: usize, height: usize) -> RenderResult<Vec<u8>> {
    check_len(pixels, width, height, 3)?;
    let mut png = Vec::new();
    write_header(&mut png, width, height, COLOR_TYPE_RGB);
    let idat_data = deflate_scanlines(pixels, width, height, 3)?;
    write_chunk(&mut png, b"IDAT", &idat_data);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Write a PNG chunk
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Deflate scanlines for the IDAT chunk, each prefixed with filter type 0.
fn deflate_scanlines(samples: &[u8], width: usize, height: usize, bytes_per_pixel: usize) -> RenderResult<Vec<u8>> {
    let stride = width * bytes_per_pixel;
    let mut uncompressed = Vec::with_capacity(height * (1 + stride));
    for row in samples.chunks_exact(stride).take(height) {
        uncompressed.push(0); // filter type: none
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&uncompressed)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_palette_simple() {
        // 4 pixels: red, green, blue, red (3 unique colors)
        let pixels = [
            255, 0, 0, 255, // red
            0, 255, 0, 255, // green
            0, 0, 255, 255, // blue
            255, 0, 0, 255, // red again
        ];

        let (palette, indices) = extract_palette(&pixels).unwrap();
        assert_eq!(palette.len(), 3);
        assert_eq!(indices.len(), 4);
        assert_eq!(indices[0], indices[3]); // both red pixels have same index
    }

    #[test]
    fn test_extract_palette_overflow() {
        let pixels: Vec<u8> = (0..300u32).flat_map(|i| [(i % 256) as u8, (i / 256) as u8, 0, 255]).collect();
        assert!(extract_palette(&pixels).is_none());
    }

    #[test]
    fn test_chunk_crc() {
        let mut png = Vec::new();
        write_chunk(&mut png, b"IEND", &[]);
        // Well-known CRC of an empty IEND chunk
        assert_eq!(&png[8..], &[0xAE, 0x42, 0x60, 0x82]);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(create_png(&[0u8; 7], 1, 2).is_err());
        assert!(matches!(create_png_rgb(&[], 0, 0), Err(RenderError::EmptyRaster(_))));
    }
}
