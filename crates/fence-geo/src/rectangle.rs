use crate::containment::Edge;
use crate::distance::{distance_m, Measured};
use crate::record::BoundaryRecord;
use crate::{meters_to_lat_degrees, meters_to_lon_degrees, BoundingBox, Coordinate, CoordinateError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum disagreement, in degrees, between the two corners sharing an edge
/// (roughly 33 m at the equator).
pub const EDGE_ALIGNMENT_TOLERANCE_DEG: f64 = 0.0003;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    Ne,
    Nw,
    Se,
    Sw,
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Ne => "northeast",
            Self::Nw => "northwest",
            Self::Se => "southeast",
            Self::Sw => "southwest",
        };
        write!(f, "{}", value)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoundaryError {
    #[error("{corner} corner is invalid: {source}")]
    InvalidCorner {
        corner: Corner,
        source: CoordinateError,
    },
    #[error("{edge} edge is not axis-aligned (deviation {deviation_deg:.6} degrees, max 0.0003)")]
    EdgeNotAligned { edge: Edge, deviation_deg: f64 },
    #[error("northeast corner must be north of southwest corner")]
    NotNorthOfSouthwest,
    #[error("northeast corner must be east of southwest corner")]
    NotEastOfSouthwest,
    #[error("{what} must be a positive number of meters (got {value})")]
    NonPositiveDimension { what: &'static str, value: f64 },
}

/// A near axis-aligned quadrilateral defined by its four corners.
///
/// Construction always validates, so a value of this type is never an
/// invalid rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoundaryRecord", into = "BoundaryRecord")]
pub struct RectangularBoundary {
    ne: Coordinate,
    nw: Coordinate,
    se: Coordinate,
    sw: Coordinate,
}

impl RectangularBoundary {
    pub fn new(
        ne: Coordinate,
        nw: Coordinate,
        se: Coordinate,
        sw: Coordinate,
    ) -> Result<Self, BoundaryError> {
        let boundary = Self { ne, nw, se, sw };
        boundary.validate()?;
        Ok(boundary)
    }

    /// Equal-area square centered on the circle.
    pub fn from_circular(center: Coordinate, radius_m: f64) -> Result<Self, BoundaryError> {
        if !(radius_m.is_finite() && radius_m > 0.0) {
            return Err(BoundaryError::NonPositiveDimension {
                what: "radius",
                value: radius_m,
            });
        }
        let side = radius_m * std::f64::consts::PI.sqrt();
        Self::from_center_and_dimensions(center, side, side)
    }

    /// `width_m` spans east-west, `height_m` north-south.
    pub fn from_center_and_dimensions(
        center: Coordinate,
        width_m: f64,
        height_m: f64,
    ) -> Result<Self, BoundaryError> {
        for (what, value) in [("width", width_m), ("height", height_m)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(BoundaryError::NonPositiveDimension { what, value });
            }
        }
        let lat_offset = meters_to_lat_degrees(height_m / 2.0);
        let lon_offset = meters_to_lon_degrees(width_m / 2.0, center.latitude);
        let north = center.latitude + lat_offset;
        let south = center.latitude - lat_offset;
        let east = center.longitude + lon_offset;
        let west = center.longitude - lon_offset;

        Self::new(
            Coordinate::new(north, east),
            Coordinate::new(north, west),
            Coordinate::new(south, east),
            Coordinate::new(south, west),
        )
    }

    fn validate(&self) -> Result<(), BoundaryError> {
        for (corner, coord) in self.corners() {
            coord
                .check_range()
                .map_err(|source| BoundaryError::InvalidCorner { corner, source })?;
        }

        let checks = [
            (Edge::North, (self.ne.latitude - self.nw.latitude).abs()),
            (Edge::South, (self.se.latitude - self.sw.latitude).abs()),
            (Edge::East, (self.ne.longitude - self.se.longitude).abs()),
            (Edge::West, (self.nw.longitude - self.sw.longitude).abs()),
        ];
        for (edge, deviation_deg) in checks {
            if deviation_deg > EDGE_ALIGNMENT_TOLERANCE_DEG {
                return Err(BoundaryError::EdgeNotAligned {
                    edge,
                    deviation_deg,
                });
            }
        }

        if self.ne.latitude <= self.sw.latitude {
            return Err(BoundaryError::NotNorthOfSouthwest);
        }
        if self.ne.longitude <= self.sw.longitude {
            return Err(BoundaryError::NotEastOfSouthwest);
        }
        Ok(())
    }

    pub fn ne(&self) -> Coordinate {
        self.ne
    }

    pub fn nw(&self) -> Coordinate {
        self.nw
    }

    pub fn se(&self) -> Coordinate {
        self.se
    }

    pub fn sw(&self) -> Coordinate {
        self.sw
    }

    pub fn corners(&self) -> [(Corner, Coordinate); 4] {
        [
            (Corner::Ne, self.ne),
            (Corner::Nw, self.nw),
            (Corner::Se, self.se),
            (Corner::Sw, self.sw),
        ]
    }

    /// The four edges as closed-polygon segments, in north, east, south, west order.
    pub fn edges(&self) -> [(Edge, Coordinate, Coordinate); 4] {
        [
            (Edge::North, self.nw, self.ne),
            (Edge::East, self.ne, self.se),
            (Edge::South, self.se, self.sw),
            (Edge::West, self.sw, self.nw),
        ]
    }

    fn edge_lengths(&self) -> [Measured; 4] {
        self.edges().map(|(_, start, end)| distance_m(start, end))
    }

    /// Square meters: mean north/south width times mean east/west height.
    pub fn area(&self) -> f64 {
        let [north, east, south, west] = self.edge_lengths();
        let width = (north.meters + south.meters) / 2.0;
        let height = (east.meters + west.meters) / 2.0;
        width * height
    }

    pub fn perimeter(&self) -> f64 {
        self.edge_lengths().iter().map(|measured| measured.meters).sum()
    }

    pub fn center(&self) -> Coordinate {
        let corners = [self.ne, self.nw, self.se, self.sw];
        Coordinate::new(
            corners.iter().map(|c| c.latitude).sum::<f64>() / 4.0,
            corners.iter().map(|c| c.longitude).sum::<f64>() / 4.0,
        )
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let lats = [self.ne, self.nw, self.se, self.sw].map(|c| c.latitude);
        let lons = [self.ne, self.nw, self.se, self.sw].map(|c| c.longitude);
        BoundingBox {
            north: lats.iter().copied().fold(f64::MIN, f64::max),
            south: lats.iter().copied().fold(f64::MAX, f64::min),
            east: lons.iter().copied().fold(f64::MIN, f64::max),
            west: lons.iter().copied().fold(f64::MAX, f64::min),
        }
    }
}

impl fmt::Display for RectangularBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RectangularBoundary NE={} NW={} SE={} SW={}",
            self.ne, self.nw, self.se, self.sw
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_boundary() -> RectangularBoundary {
        RectangularBoundary::new(
            Coordinate::new(40.7130, -74.0058),
            Coordinate::new(40.7130, -74.0062),
            Coordinate::new(40.7128, -74.0058),
            Coordinate::new(40.7128, -74.0062),
        )
        .unwrap()
    }

    #[test]
    fn rejects_tilted_north_edge() {
        let err = RectangularBoundary::new(
            Coordinate::new(40.7140, -74.0058),
            Coordinate::new(40.7130, -74.0062),
            Coordinate::new(40.7128, -74.0058),
            Coordinate::new(40.7128, -74.0062),
        )
        .unwrap_err();
        match err {
            BoundaryError::EdgeNotAligned {
                edge,
                deviation_deg,
            } => {
                assert_eq!(edge, Edge::North);
                assert!((deviation_deg - 0.001).abs() < 1e-9);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_tilted_west_edge() {
        let err = RectangularBoundary::new(
            Coordinate::new(40.7130, -74.0058),
            Coordinate::new(40.7130, -74.0062),
            Coordinate::new(40.7128, -74.0058),
            Coordinate::new(40.7128, -74.0070),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BoundaryError::EdgeNotAligned {
                edge: Edge::West,
                ..
            }
        ));
        assert!(err.to_string().contains("west"));
    }

    #[test]
    fn rejects_swapped_corners() {
        let err = RectangularBoundary::new(
            Coordinate::new(40.7128, -74.0058),
            Coordinate::new(40.7128, -74.0062),
            Coordinate::new(40.7130, -74.0058),
            Coordinate::new(40.7130, -74.0062),
        )
        .unwrap_err();
        assert_eq!(err, BoundaryError::NotNorthOfSouthwest);

        let err = RectangularBoundary::new(
            Coordinate::new(40.7130, -74.0062),
            Coordinate::new(40.7130, -74.0058),
            Coordinate::new(40.7128, -74.0062),
            Coordinate::new(40.7128, -74.0058),
        )
        .unwrap_err();
        assert_eq!(err, BoundaryError::NotEastOfSouthwest);
    }

    #[test]
    fn rejects_out_of_range_corner() {
        let err = RectangularBoundary::new(
            Coordinate::new(95.0, -74.0058),
            Coordinate::new(95.0, -74.0062),
            Coordinate::new(40.7128, -74.0058),
            Coordinate::new(40.7128, -74.0062),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BoundaryError::InvalidCorner {
                corner: Corner::Ne,
                ..
            }
        ));
    }

    #[test]
    fn geometry_of_sample_boundary() {
        let boundary = sample_boundary();
        // ~22.2 m tall, ~33.7 m wide at this latitude
        let area = boundary.area();
        assert!(area > 700.0 && area < 800.0, "area {area}");
        let perimeter = boundary.perimeter();
        assert!(
            perimeter > 105.0 && perimeter < 115.0,
            "perimeter {perimeter}"
        );
        let center = boundary.center();
        assert!((center.latitude - 40.7129).abs() < 1e-9);
        assert!((center.longitude + 74.0060).abs() < 1e-9);
        let bbox = boundary.bounding_box();
        assert_eq!(bbox.north, 40.7130);
        assert_eq!(bbox.west, -74.0062);
    }

    #[test]
    fn from_circular_preserves_area() {
        let center = Coordinate::new(40.7128, -74.0060);
        let boundary = RectangularBoundary::from_circular(center, 50.0).unwrap();
        let circle_area = std::f64::consts::PI * 50.0 * 50.0;
        let ratio = boundary.area() / circle_area;
        assert!((ratio - 1.0).abs() < 0.05, "ratio {ratio}");
        let c = boundary.center();
        assert!((c.latitude - center.latitude).abs() < 1e-9);
        assert!((c.longitude - center.longitude).abs() < 1e-9);
    }

    #[test]
    fn from_center_and_dimensions_matches_requested_size() {
        let center = Coordinate::new(51.5, -0.12);
        let boundary = RectangularBoundary::from_center_and_dimensions(center, 60.0, 30.0).unwrap();
        let [north, east, _, _] = boundary.edges().map(|(_, a, b)| crate::haversine_m(a, b));
        assert!((north - 60.0).abs() < 1.0, "width {north}");
        assert!((east - 30.0).abs() < 1.0, "height {east}");
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        let center = Coordinate::new(51.5, -0.12);
        assert!(matches!(
            RectangularBoundary::from_circular(center, 0.0),
            Err(BoundaryError::NonPositiveDimension { what: "radius", .. })
        ));
        assert!(RectangularBoundary::from_center_and_dimensions(center, -1.0, 5.0).is_err());
    }
}
