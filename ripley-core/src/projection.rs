//! Pure-Rust geographic → planar projections (Snyder 1987, USGS formulas).
//!
//! Supports the New York Long Island state plane (EPSG:2263, Lambert
//! Conformal Conic 2SP in US survey feet) and UTM zones (EPSG 326xx/327xx).
//! No libproj dependency.

use crate::error::{Error, Result};
use crate::point::{GeoCoord, SpatialPoint};
use std::f64::consts::FRAC_PI_4;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Ellipsoids

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const GRS80_A: f64 = 6_378_137.0;
const GRS80_F: f64 = 1.0 / 298.257_222_101;

// EPSG:2263 parameters

const NYLI_LAT1: f64 = 41.0 + 2.0 / 60.0;
const NYLI_LAT2: f64 = 40.0 + 40.0 / 60.0;
const NYLI_LAT0: f64 = 40.0 + 10.0 / 60.0;
const NYLI_LON0: f64 = -74.0;
const NYLI_FALSE_EASTING_M: f64 = 300_000.0;
/// Metres per US survey foot.
const US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;

// UTM parameters

const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// A fixed planar projection used for an entire analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Projection {
    /// Coordinates are already planar; `lon` maps to x and `lat` to y.
    Identity,
    /// NAD83 / New York Long Island (EPSG:2263), US survey feet.
    #[default]
    NewYorkLongIsland,
    /// WGS84 / UTM, metres.
    Utm {
        /// Zone number (1..=60).
        zone: u8,
        /// Northern hemisphere.
        north: bool,
    },
}

impl Projection {
    /// Maps an EPSG code to a supported projection.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] for unsupported codes.
    pub fn from_epsg(code: u32) -> Result<Self> {
        match code {
            2263 => Ok(Self::NewYorkLongIsland),
            32601..=32660 => Ok(Self::Utm {
                zone: u8::try_from(code - 32600).unwrap_or(0),
                north: true,
            }),
            32701..=32760 => Ok(Self::Utm {
                zone: u8::try_from(code - 32700).unwrap_or(0),
                north: false,
            }),
            _ => Err(Error::InvalidConfig(format!(
                "unsupported projection EPSG:{code} (supported: 2263, 326xx, 327xx)"
            ))),
        }
    }

    /// EPSG code of the projection, if it has one.
    #[must_use]
    pub fn epsg(&self) -> Option<u32> {
        match self {
            Self::Identity => None,
            Self::NewYorkLongIsland => Some(2263),
            Self::Utm { zone, north: true } => Some(32600 + u32::from(*zone)),
            Self::Utm { zone, north: false } => Some(32700 + u32::from(*zone)),
        }
    }

    /// Name of the planar unit.
    #[must_use]
    pub fn units(&self) -> &'static str {
        match self {
            Self::Identity => "input units",
            Self::NewYorkLongIsland => "US survey feet",
            Self::Utm { .. } => "metres",
        }
    }

    /// Projects a geographic coordinate to planar coordinates.
    ///
    /// # Errors
    /// Returns [`Error::Projection`] for non-finite values, out-of-range
    /// degrees, or coordinates outside the projection's valid domain.
    pub fn project(&self, coord: GeoCoord) -> Result<SpatialPoint> {
        let fail = |reason: &str| Error::Projection {
            lon: coord.lon,
            lat: coord.lat,
            reason: reason.to_string(),
        };

        if !coord.lon.is_finite() || !coord.lat.is_finite() {
            return Err(fail("coordinate is not finite"));
        }
        if let Self::Identity = self {
            return Ok(SpatialPoint::new(coord.lon, coord.lat));
        }
        if coord.lat.abs() > 90.0 {
            return Err(fail("latitude outside [-90, 90]"));
        }
        if coord.lon.abs() > 180.0 {
            return Err(fail("longitude outside [-180, 180]"));
        }

        match *self {
            Self::Identity => Ok(SpatialPoint::new(coord.lon, coord.lat)),
            Self::NewYorkLongIsland => {
                if coord.lat.abs() >= 89.9 {
                    return Err(fail("latitude too close to a pole for Lambert conformal conic"));
                }
                let (x, y) = lcc_new_york_long_island(coord.lon, coord.lat);
                Ok(SpatialPoint::new(x, y))
            }
            Self::Utm { zone, north } => {
                if !(1..=60).contains(&zone) {
                    return Err(fail("UTM zone outside 1..=60"));
                }
                if !(-80.0..=84.0).contains(&coord.lat) {
                    return Err(fail("latitude outside the UTM band [-80, 84]"));
                }
                let lon0 = utm_central_meridian(zone);
                let mut dlon = coord.lon - lon0;
                if dlon > 180.0 {
                    dlon -= 360.0;
                } else if dlon < -180.0 {
                    dlon += 360.0;
                }
                if dlon.abs() > 30.0 {
                    return Err(fail("longitude more than 30 degrees from the zone meridian"));
                }
                let (x, y) = wgs84_to_utm(coord.lat, dlon, north);
                Ok(SpatialPoint::new(x, y))
            }
        }
    }

    /// Projects every coordinate, failing on the first bad one.
    ///
    /// # Errors
    /// See [`Projection::project`].
    pub fn project_all(&self, coords: &[GeoCoord]) -> Result<Vec<SpatialPoint>> {
        coords.iter().map(|&c| self.project(c)).collect()
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg() {
            Some(code) => write!(f, "EPSG:{code}"),
            None => write!(f, "identity"),
        }
    }
}

// Lambert Conformal Conic 2SP (Snyder pp. 104-110)

fn lcc_m(phi: f64, e2: f64) -> f64 {
    let s = phi.sin();
    phi.cos() / (1.0 - e2 * s * s).sqrt()
}

fn lcc_t(phi: f64, e: f64) -> f64 {
    let s = phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - e * s) / (1.0 + e * s)).powf(e / 2.0)
}

/// Returns `(x, y)` in US survey feet for EPSG:2263.
fn lcc_new_york_long_island(lon_deg: f64, lat_deg: f64) -> (f64, f64) {
    let e2 = 2.0 * GRS80_F - GRS80_F * GRS80_F;
    let e = e2.sqrt();

    let phi1 = NYLI_LAT1.to_radians();
    let phi2 = NYLI_LAT2.to_radians();
    let phi0 = NYLI_LAT0.to_radians();

    let m1 = lcc_m(phi1, e2);
    let m2 = lcc_m(phi2, e2);
    let t1 = lcc_t(phi1, e);
    let t2 = lcc_t(phi2, e);
    let t0 = lcc_t(phi0, e);

    let n = (m1.ln() - m2.ln()) / (t1.ln() - t2.ln());
    let big_f = m1 / (n * t1.powf(n));
    let rho0 = GRS80_A * big_f * t0.powf(n);

    let t = lcc_t(lat_deg.to_radians(), e);
    let rho = GRS80_A * big_f * t.powf(n);
    let theta = n * (lon_deg - NYLI_LON0).to_radians();

    let x_m = NYLI_FALSE_EASTING_M + rho * theta.sin();
    let y_m = rho0 - rho * theta.cos();

    (x_m / US_SURVEY_FOOT, y_m / US_SURVEY_FOOT)
}

// Transverse Mercator / UTM (Snyder pp. 61-64)

fn utm_central_meridian(zone: u8) -> f64 {
    f64::from(zone) * 6.0 - 183.0
}

/// Meridional arc length from the equator to `lat` (radians).
fn meridional_arc(lat: f64, e2: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    WGS84_A
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

/// `dlon_deg` is the longitude offset from the zone's central meridian.
fn wgs84_to_utm(lat_deg: f64, dlon_deg: f64, north: bool) -> (f64, f64) {
    let e2 = 2.0 * WGS84_F - WGS84_F * WGS84_F;
    let ep2 = e2 / (1.0 - e2);

    let lat = lat_deg.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let tan_lat = lat.tan();

    let n = WGS84_A / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = ep2 * cos_lat * cos_lat;
    let a = cos_lat * dlon_deg.to_radians();
    let m = meridional_arc(lat, e2);

    let a2 = a * a;
    let a3 = a2 * a;
    let a4 = a2 * a2;
    let a5 = a4 * a;
    let a6 = a4 * a2;

    let easting = UTM_K0
        * n
        * (a + (1.0 - t + c) * a3 / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0)
        + UTM_FALSE_EASTING;

    let northing = UTM_K0
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

    if north {
        (easting, northing)
    } else {
        (easting, northing + UTM_FALSE_NORTHING_SOUTH)
    }
}
