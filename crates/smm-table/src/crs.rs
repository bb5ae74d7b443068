// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Coordinate reference systems and reprojection.
//!
//! A [`Crs`] is just an EPSG code. Definitions come from the EPSG registry
//! bundled by `crs-definitions`; the math is done by `proj4rs`. Geographic
//! systems are expressed in degrees, `(lon, lat)` order.

use std::fmt;
use std::str::FromStr;

use geo::{Coord, Geometry, MapCoords};
use proj4rs::Proj;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Latitude bound of the Web-Mercator square.
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

const WGS84_DEF: &str = "+proj=longlat +datum=WGS84 +no_defs";
const WEB_MERCATOR_DEF: &str =
    "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs";

/// Errors from parsing or transforming CRS values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrsError {
    /// The text is not an `EPSG:<code>` identifier.
    #[error("invalid crs identifier: {0}")]
    Invalid(String),
    /// The EPSG registry has no definition for the code.
    #[error("unknown crs: {0}")]
    UnknownCode(Crs),
    /// The projection library rejected the definition or a coordinate.
    #[error("cannot transform from {from} to {to}: {message}")]
    Projection {
        /// Source system.
        from: Crs,
        /// Target system.
        to: Crs,
        /// Message from the projection library.
        message: String,
    },
}

/// An EPSG-coded coordinate reference system.
///
/// Serialized as `"EPSG:<code>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs(u32);

impl Crs {
    /// WGS84 geographic coordinates (lon/lat degrees).
    pub const WGS84: Crs = Crs(4326);
    /// Spherical (Web) Mercator, metres.
    pub const WEB_MERCATOR: Crs = Crs(3857);

    /// Create from a raw EPSG code.
    pub const fn epsg(code: u32) -> Self {
        Self(code)
    }

    /// The EPSG code.
    pub const fn code(self) -> u32 {
        self.0
    }

    /// PROJ.4 definition of the system.
    pub fn proj4(self) -> Result<&'static str, CrsError> {
        match self {
            Self::WGS84 => Ok(WGS84_DEF),
            Self::WEB_MERCATOR => Ok(WEB_MERCATOR_DEF),
            _ => u16::try_from(self.0)
                .ok()
                .and_then(crs_definitions::from_code)
                .map(|def| def.proj4)
                .ok_or(CrsError::UnknownCode(self)),
        }
    }

    /// Returns `true` for lon/lat systems (units are degrees). Unknown codes
    /// are not geographic.
    pub fn is_geographic(self) -> bool {
        self.proj4().is_ok_and(|def| def.contains("+proj=longlat"))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl FromStr for Crs {
    type Err = CrsError;

    /// Accepts `EPSG:3857`, `epsg:3857`, `3857` and OGC URNs such as
    /// `urn:ogc:def:crs:EPSG::3857`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("urn:ogc:def:crs:OGC:1.3:CRS84") {
            return Ok(Self::WGS84);
        }
        let upper = trimmed.to_ascii_uppercase();
        let code = if upper.contains("EPSG") {
            upper.rsplit(':').next().unwrap_or_default()
        } else {
            upper.as_str()
        };
        code.parse::<u32>()
            .map(Crs)
            .map_err(|_| CrsError::Invalid(s.to_string()))
    }
}

impl TryFrom<String> for Crs {
    type Error = CrsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

/// A prepared transform between two systems.
pub struct Reprojection {
    from: Crs,
    to: Crs,
    src: Proj,
    dst: Proj,
    src_latlong: bool,
    dst_latlong: bool,
    clamp_lat: bool,
}

impl fmt::Debug for Reprojection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reprojection")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

impl Reprojection {
    /// Look up both definitions and prepare the transform.
    pub fn new(from: Crs, to: Crs) -> Result<Self, CrsError> {
        let (src_def, dst_def) = (from.proj4()?, to.proj4()?);
        let build = |def: &str| {
            Proj::from_proj_string(def).map_err(|e| CrsError::Projection {
                from,
                to,
                message: e.to_string(),
            })
        };
        let src_latlong = src_def.contains("+proj=longlat");
        Ok(Self {
            from,
            to,
            src: build(src_def)?,
            dst: build(dst_def)?,
            src_latlong,
            dst_latlong: dst_def.contains("+proj=longlat"),
            clamp_lat: src_latlong && dst_def.contains("+proj=merc"),
        })
    }

    /// Transform every coordinate of `geometry`.
    pub fn apply(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>, CrsError> {
        if self.from == self.to {
            return Ok(geometry.clone());
        }
        geometry.try_map_coords(|c| self.coord(c))
    }

    fn coord(&self, c: Coord<f64>) -> Result<Coord<f64>, CrsError> {
        let mut point = if self.src_latlong {
            let lat = if self.clamp_lat {
                c.y.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT)
            } else {
                c.y
            };
            (c.x.to_radians(), lat.to_radians(), 0.0)
        } else {
            (c.x, c.y, 0.0)
        };
        proj4rs::transform::transform(&self.src, &self.dst, &mut point).map_err(|e| {
            CrsError::Projection {
                from: self.from,
                to: self.to,
                message: e.to_string(),
            }
        })?;
        Ok(if self.dst_latlong {
            Coord {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            }
        } else {
            Coord {
                x: point.0,
                y: point.1,
            }
        })
    }
}

/// Transform `geometry` from `from` to `to`.
pub fn transform(geometry: &Geometry<f64>, from: Crs, to: Crs) -> Result<Geometry<f64>, CrsError> {
    if from == to {
        return Ok(geometry.clone());
    }
    Reprojection::new(from, to)?.apply(geometry)
}
