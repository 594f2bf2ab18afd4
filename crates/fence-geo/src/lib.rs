use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod containment;
pub mod distance;
pub mod rectangle;
pub mod record;

pub use containment::{
    distance_to_boundary_edge, test_point, ContainmentFault, ContainmentMethod,
    ContainmentResult, Edge, EdgeDistance,
};
pub use distance::{distance_m, haversine_m, vincenty_m, DistanceError, Formula, Measured};
pub use rectangle::{BoundaryError, Corner, RectangularBoundary};
pub use record::{BoundaryMetadata, BoundaryRecord, CornerSet, RecordError};

/// Meters per degree of latitude used for meter/degree conversions.
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Coordinates carrying more fractional digits than this are treated as fabricated.
pub const MAX_COORDINATE_DECIMALS: usize = 8;

/// A WGS-84 position in degrees. Serialized as a `[lat, lon]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Range check only. Used for boundary corners, which are often derived
    /// values with long fractional expansions.
    pub fn check_range(&self) -> Result<(), CoordinateError> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }

    /// Full validation for client-submitted positions.
    pub fn validate(&self) -> Result<(), CoordinateError> {
        self.check_range()?;
        if self.latitude == 0.0 && self.longitude == 0.0 {
            return Err(CoordinateError::NullIsland);
        }
        for (axis, value) in [(Axis::Latitude, self.latitude), (Axis::Longitude, self.longitude)] {
            let digits = decimal_places(value);
            if digits > MAX_COORDINATE_DECIMALS {
                return Err(CoordinateError::ExcessivePrecision { axis, digits });
            }
        }
        Ok(())
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(value: Coordinate) -> Self {
        [value.latitude, value.longitude]
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Latitude,
    Longitude,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latitude => write!(f, "latitude"),
            Self::Longitude => write!(f, "longitude"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("coordinates must be finite numbers")]
    NonFinite,
    #[error("latitude must be between -90 and 90 degrees (got {0})")]
    LatitudeOutOfRange(f64),
    #[error("longitude must be between -180 and 180 degrees (got {0})")]
    LongitudeOutOfRange(f64),
    #[error("invalid coordinates (0,0) detected")]
    NullIsland,
    #[error("{axis} precision suspiciously high ({digits} decimal places)")]
    ExcessivePrecision { axis: Axis, digits: usize },
}

impl CoordinateError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::NonFinite => "non_finite_coordinates",
            Self::LatitudeOutOfRange(_) => "latitude_out_of_range",
            Self::LongitudeOutOfRange(_) => "longitude_out_of_range",
            Self::NullIsland => "null_island",
            Self::ExcessivePrecision { .. } => "excessive_precision",
        }
    }
}

/// Number of fractional digits in the shortest round-trip rendering of `value`.
pub fn decimal_places(value: f64) -> usize {
    let text = value.to_string();
    text.split_once('.')
        .map(|(_, fraction)| fraction.len())
        .unwrap_or(0)
}

/// Degrees of longitude spanned by `meters` at `latitude`.
pub fn meters_to_lon_degrees(meters: f64, latitude: f64) -> f64 {
    meters / (METERS_PER_DEGREE_LAT * latitude.to_radians().cos())
}

pub fn meters_to_lat_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE_LAT
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    pub fn contains(&self, coord: Coordinate) -> bool {
        coord.latitude <= self.north
            && coord.latitude >= self.south
            && coord.longitude <= self.east
            && coord.longitude >= self.west
    }

    /// Grows the box outward by `meters` on every side. Longitude growth uses
    /// the latitude closest to a pole so the margin is never undershot.
    pub fn expanded_by_m(&self, meters: f64) -> Self {
        let lat_pad = meters_to_lat_degrees(meters);
        let widest = self.north.abs().max(self.south.abs()).min(89.0);
        let lon_pad = meters_to_lon_degrees(meters, widest);
        Self {
            north: self.north + lat_pad,
            south: self.south - lat_pad,
            east: self.east + lon_pad,
            west: self.west - lon_pad,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum GeoFence {
    Circle {
        center: Coordinate,
        radius_m: f64,
    },
    Rectangle {
        boundary: RectangularBoundary,
        tolerance_m: f64,
        gps_accuracy_threshold_m: f64,
    },
}

/// A computational fault that was absorbed by falling back to a coarser answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    HaversineFallback,
    BoundingBoxOnly,
    CircularFallback,
}

impl Degradation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HaversineFallback => "haversine_fallback",
            Self::BoundingBoxOnly => "bounding_box_only",
            Self::CircularFallback => "circular_fallback",
        }
    }
}
