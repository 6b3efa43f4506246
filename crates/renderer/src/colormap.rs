//! Named color ramps and their 256-entry lookup tables.
//!
//! Ramps are defined by evenly spaced hex stops and expanded by linear
//! interpolation. Any name with an `_r` suffix is the reversed ramp.

use raster_common::{RenderError, RenderResult};

/// Number of entries in a ramp lookup table.
pub const LUT_SIZE: usize = 256;

/// Ramp used when none is configured.
pub const DEFAULT_RAMP: &str = "RdYlGn";

const RDYLGN: &[&str] = &[
    "#a50026", "#d73027", "#f46d43", "#fdae61", "#fee08b", "#ffffbf", "#d9ef8b", "#a6d96a", "#66bd63", "#1a9850",
    "#006837",
];
const RDYLBU: &[&str] = &[
    "#a50026", "#d73027", "#f46d43", "#fdae61", "#fee090", "#ffffbf", "#e0f3f8", "#abd9e9", "#74add1", "#4575b4",
    "#313695",
];
const SPECTRAL: &[&str] = &[
    "#9e0142", "#d53e4f", "#f46d43", "#fdae61", "#fee08b", "#ffffbf", "#e6f598", "#abdda4", "#66c2a5", "#3288bd",
    "#5e4fa2",
];
const YLGN: &[&str] = &[
    "#ffffe5", "#f7fcb9", "#d9f0a3", "#addd8e", "#78c679", "#41ab5d", "#238443", "#006837", "#004529",
];
const GREENS: &[&str] = &[
    "#f7fcf5", "#e5f5e0", "#c7e9c0", "#a1d99b", "#74c476", "#41ab5d", "#238b45", "#006d2c", "#00441b",
];
const BRBG: &[&str] = &[
    "#543005", "#8c510a", "#bf812d", "#dfc27d", "#f6e8c3", "#f5f5f5", "#c7eae5", "#80cdc1", "#35978f", "#01665e",
    "#003c30",
];
const VIRIDIS: &[&str] = &[
    "#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779", "#6ece58", "#b5de2b", "#fde725",
];
const MAGMA: &[&str] = &[
    "#000004", "#180f3d", "#440f76", "#721f81", "#9e2f7f", "#cd4071", "#f1605d", "#fd9668", "#feca8d", "#fcfdbf",
];
const GRAY: &[&str] = &["#000000", "#ffffff"];

/// Names accepted by [`ColorRamp::named`] (each also with an `_r` suffix).
pub const RAMP_NAMES: &[&str] = &[
    "RdYlGn", "RdYlBu", "Spectral", "YlGn", "Greens", "BrBG", "viridis", "magma", "gray",
];

fn stops_for(base: &str) -> Option<&'static [&'static str]> {
    let stops = match base {
        "RdYlGn" => RDYLGN,
        "RdYlBu" => RDYLBU,
        "Spectral" => SPECTRAL,
        "YlGn" => YLGN,
        "Greens" => GREENS,
        "BrBG" => BRBG,
        "viridis" => VIRIDIS,
        "magma" => MAGMA,
        "gray" | "grey" => GRAY,
        _ => return None,
    };
    Some(stops)
}

/// Parse hex color string to RGB
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

/// Format an RGB triple as `#rrggbb`.
pub fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// A continuous color ramp sampled into a lookup table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    name: String,
    /// Stops as unit-interval RGB.
    stops: Vec<[f64; 3]>,
    lut: Vec<[u8; 3]>,
}

impl ColorRamp {
    /// Look up a ramp by name, e.g. `RdYlGn` or `viridis_r`.
    pub fn named(name: &str) -> RenderResult<Self> {
        let (base, reversed) = match name.strip_suffix("_r") {
            Some(base) => (base, true),
            None => (name, false),
        };
        let hex = stops_for(base)
            .ok_or_else(|| RenderError::invalid_config(format!("unknown color ramp '{}'", name)))?;
        Ok(Self::from_hex(name, hex, reversed))
    }

    fn from_hex(name: &str, hex: &[&str], reversed: bool) -> Self {
        let mut stops: Vec<[f64; 3]> = hex
            .iter()
            .filter_map(|h| hex_to_rgb(h))
            .map(|(r, g, b)| [r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0])
            .collect();
        if reversed {
            stops.reverse();
        }
        Self::from_stops(name, stops)
    }

    fn from_stops(name: &str, stops: Vec<[f64; 3]>) -> Self {
        let lut = (0..LUT_SIZE)
            .map(|i| {
                let c = interpolate(&stops, i as f64 / (LUT_SIZE - 1) as f64);
                [to_byte(c[0]), to_byte(c[1]), to_byte(c[2])]
            })
            .collect();
        Self {
            name: name.to_string(),
            stops,
            lut,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The lookup table, `LUT_SIZE` entries from low to high.
    pub fn lut(&self) -> &[[u8; 3]] {
        &self.lut
    }

    /// Color for a normalized value; out-of-range input is clipped.
    pub fn color_at(&self, t: f64) -> [u8; 3] {
        self.lut[lut_index(t)]
    }

    /// `n` evenly spaced colors as `#rrggbb`, for legend gradients.
    pub fn hex_stops(&self, n: usize) -> Vec<String> {
        match n {
            0 => Vec::new(),
            1 => vec![rgb_to_hex(self.color_at(0.0))],
            _ => (0..n)
                .map(|i| {
                    let c = interpolate(&self.stops, i as f64 / (n - 1) as f64);
                    rgb_to_hex([to_byte(c[0]), to_byte(c[1]), to_byte(c[2])])
                })
                .collect(),
        }
    }
}

impl Default for ColorRamp {
    fn default() -> Self {
        Self::from_hex(DEFAULT_RAMP, RDYLGN, false)
    }
}

/// Table index of a normalized value: `floor(t * N)`, with 1.0 in the top bin.
fn lut_index(t: f64) -> usize {
    if !(t > 0.0) {
        return 0;
    }
    ((t * LUT_SIZE as f64) as usize).min(LUT_SIZE - 1)
}

/// Truncating conversion; the small bias keeps exact stop colors exact.
fn to_byte(c: f64) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0 + 1e-9).min(255.0) as u8
}

/// Linear interpolation between evenly spaced stops.
fn interpolate(stops: &[[f64; 3]], t: f64) -> [f64; 3] {
    match stops.len() {
        0 => [0.0; 3],
        1 => stops[0],
        n => {
            let pos = t.clamp(0.0, 1.0) * (n - 1) as f64;
            let i = (pos.floor() as usize).min(n - 2);
            let f = pos - i as f64;
            let (a, b) = (stops[i], stops[i + 1]);
            [
                a[0] + (b[0] - a[0]) * f,
                a[1] + (b[1] - a[1]) * f,
                a[2] + (b[2] - a[2]) * f,
            ]
        }
    }
}
