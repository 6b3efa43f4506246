//! Coordinate Reference System types and utilities.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RenderError, RenderResult};

/// EPSG code of the output CRS of every map layer.
pub const OUTPUT_EPSG: u32 = 4326;

/// Coordinate reference systems the raster loader can reproject from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crs {
    /// Longitude/latitude in degrees (EPSG:4326 WGS84, EPSG:4674 SIRGAS 2000).
    Geographic { epsg: u32 },
    /// Spherical Web Mercator in meters (EPSG:3857).
    WebMercator,
    /// Universal Transverse Mercator in meters.
    Utm { epsg: u32, zone: u8, south: bool },
}

impl Crs {
    /// WGS84 geographic, the CRS of every rendered overlay.
    pub const WGS84: Crs = Crs::Geographic { epsg: OUTPUT_EPSG };

    /// Resolve an EPSG code.
    ///
    /// Supported: 4326, 4674, 3857/900913, WGS84 UTM (32601-32660,
    /// 32701-32760) and SIRGAS 2000 UTM south zones 17S-25S (31977-31985).
    pub fn from_epsg(code: u32) -> RenderResult<Self> {
        match code {
            4326 | 4674 => Ok(Crs::Geographic { epsg: code }),
            3857 | 900913 => Ok(Crs::WebMercator),
            32601..=32660 => Ok(Crs::Utm {
                epsg: code,
                zone: (code - 32600) as u8,
                south: false,
            }),
            32701..=32760 => Ok(Crs::Utm {
                epsg: code,
                zone: (code - 32700) as u8,
                south: true,
            }),
            31977..=31985 => Ok(Crs::Utm {
                epsg: code,
                zone: (code - 31960) as u8,
                south: true,
            }),
            _ => Err(RenderError::UnsupportedCrs(format!("EPSG:{}", code))),
        }
    }

    /// Parse strings like `"EPSG:32723"` (case-insensitive) or a bare code.
    pub fn from_string(s: &str) -> RenderResult<Self> {
        let normalized = s.trim().to_uppercase();
        let code = normalized.strip_prefix("EPSG:").unwrap_or(&normalized);
        if normalized == "CRS:84" {
            return Ok(Crs::WGS84);
        }
        code.parse::<u32>()
            .map_err(|_| RenderError::UnsupportedCrs(s.to_string()))
            .and_then(Self::from_epsg)
    }

    /// The EPSG code this CRS was resolved from.
    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Geographic { epsg } => *epsg,
            Crs::WebMercator => 3857,
            Crs::Utm { epsg, .. } => *epsg,
        }
    }

    /// Check if this is a geographic (lon/lat) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Geographic { .. })
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crs() {
        assert_eq!(Crs::from_string("EPSG:4326").unwrap(), Crs::WGS84);
        assert_eq!(Crs::from_string("epsg:3857").unwrap(), Crs::WebMercator);
        assert_eq!(Crs::from_string("CRS:84").unwrap(), Crs::WGS84);
        assert!(matches!(
            Crs::from_string("EPSG:99999"),
            Err(RenderError::UnsupportedCrs(_))
        ));
        assert!(Crs::from_string("not-a-crs").is_err());
    }

    #[test]
    fn test_utm_zones() {
        assert_eq!(
            Crs::from_epsg(32723).unwrap(),
            Crs::Utm {
                epsg: 32723,
                zone: 23,
                south: true
            }
        );
        assert_eq!(
            Crs::from_epsg(32618).unwrap(),
            Crs::Utm {
                epsg: 32618,
                zone: 18,
                south: false
            }
        );
        assert_eq!(
            Crs::from_epsg(31983).unwrap(),
            Crs::Utm {
                epsg: 31983,
                zone: 23,
                south: true
            }
        );
    }

    #[test]
    fn test_display_round_trips() {
        for code in [4326, 4674, 32722, 31982] {
            let crs = Crs::from_epsg(code).unwrap();
            assert_eq!(Crs::from_string(&crs.to_string()).unwrap(), crs);
        }
    }
}
