//! Transverse Mercator projection on the WGS84 ellipsoid.
//!
//! Series expansions follow Snyder, "Map Projections: A Working Manual"
//! (USGS PP 1395), equations 8-9 to 8-25. Accuracy is well below a
//! millimetre within a UTM zone and degrades slowly away from the central
//! meridian, which is more than enough for pixel-level reprojection.
//!
//! UTM parameters:
//! - Scale factor on the central meridian: 0.9996
//! - Central meridian: `zone * 6 - 183` degrees
//! - False easting: 500 000 m
//! - False northing: 0 m (north) or 10 000 000 m (south)

use std::f64::consts::PI;

/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6378137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257223563;

const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Transverse Mercator projection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    /// Central meridian in radians
    pub lon0: f64,
    /// Scale factor on the central meridian
    pub k0: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    a: f64,
    e2: f64,
    ep2: f64,
}

impl TransverseMercator {
    /// Create a projection with an arbitrary central meridian (degrees).
    pub fn new(lon0_deg: f64, k0: f64, false_easting: f64, false_northing: f64) -> Self {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        Self {
            lon0: lon0_deg.to_radians(),
            k0,
            false_easting,
            false_northing,
            a: WGS84_A,
            e2,
            ep2: e2 / (1.0 - e2),
        }
    }

    /// Standard UTM zone (1-60).
    pub fn utm(zone: u8, south: bool) -> Self {
        let lon0 = zone as f64 * 6.0 - 183.0;
        let false_northing = if south { UTM_FALSE_NORTHING_SOUTH } else { 0.0 };
        Self::new(lon0, UTM_K0, UTM_FALSE_EASTING, false_northing)
    }

    /// Meridian arc length from the equator to latitude `phi` (radians).
    fn meridian_arc(&self, phi: f64) -> f64 {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        self.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }

    /// Project geographic coordinates (degrees) to easting/northing (meters).
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let phi = lat_deg.to_radians();
        let mut dlon = lon_deg.to_radians() - self.lon0;
        // Normalize longitude difference to [-π, π]
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }

        let sin_phi = phi.sin();
        let cos_phi = phi.cos();
        let tan_phi = phi.tan();

        let n = self.a / (1.0 - self.e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = self.ep2 * cos_phi * cos_phi;
        let a = dlon * cos_phi;
        let m = self.meridian_arc(phi);

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let x = self.k0
            * n
            * (a + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * self.ep2) * a5 / 120.0);
        let y = self.k0
            * (m + n
                * tan_phi
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * self.ep2) * a6 / 720.0));

        (x + self.false_easting, y + self.false_northing)
    }

    /// Unproject easting/northing (meters) to `(lon, lat)` in degrees.
    pub fn inverse(&self, easting: f64, northing: f64) -> (f64, f64) {
        let x = easting - self.false_easting;
        let y = northing - self.false_northing;

        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;

        let m = y / self.k0;
        let mu = m / (self.a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

        let sqrt_1me2 = (1.0 - e2).sqrt();
        let e1 = (1.0 - sqrt_1me2) / (1.0 + sqrt_1me2);
        let e1_2 = e1 * e1;
        let e1_3 = e1_2 * e1;
        let e1_4 = e1_3 * e1;

        // Footpoint latitude
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

        let sin_phi1 = phi1.sin();
        let cos_phi1 = phi1.cos();
        let tan_phi1 = phi1.tan();

        let c1 = self.ep2 * cos_phi1 * cos_phi1;
        let t1 = tan_phi1 * tan_phi1;
        let denom = 1.0 - e2 * sin_phi1 * sin_phi1;
        let n1 = self.a / denom.sqrt();
        let r1 = self.a * (1.0 - e2) / denom.powf(1.5);
        let d = x / (n1 * self.k0);

        let d2 = d * d;
        let d3 = d2 * d;
        let d4 = d3 * d;
        let d5 = d4 * d;
        let d6 = d5 * d;

        let phi = phi1
            - (n1 * tan_phi1 / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * self.ep2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * self.ep2
                        - 3.0 * c1 * c1)
                        * d6
                        / 720.0);

        let lon = self.lon0
            + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * self.ep2 + 24.0 * t1 * t1)
                    * d5
                    / 120.0)
                / cos_phi1;

        (lon.to_degrees(), phi.to_degrees())
    }
}
