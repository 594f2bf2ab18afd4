use crate::distance::haversine_m;
use crate::rectangle::RectangularBoundary;
use crate::{Coordinate, Degradation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    North,
    East,
    South,
    West,
    Unknown,
}

impl Edge {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::East => "east",
            Self::South => "south",
            Self::West => "west",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentMethod {
    BoundingBoxReject,
    RayCasting,
    BoundingBoxFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ContainmentFault {
    #[error("point is not a finite coordinate")]
    NonFinitePoint,
    #[error("non-finite ray crossing on {0} edge")]
    DegenerateCrossing(Edge),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeDistance {
    pub distance_m: f64,
    pub edge: Edge,
    pub nearest_point: Coordinate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainmentResult {
    pub inside: bool,
    pub distance_to_edge_m: f64,
    pub nearest_edge: Edge,
    pub nearest_point: Option<Coordinate>,
    pub method: ContainmentMethod,
}

impl ContainmentResult {
    pub fn degradation(&self) -> Option<Degradation> {
        (self.method == ContainmentMethod::BoundingBoxFallback)
            .then_some(Degradation::BoundingBoxOnly)
    }
}

/// Point-in-rectangle test plus the distance to the nearest edge.
///
/// Points outside the bounding box skip the exact test. If the exact test
/// faults, the bounding-box answer is used instead and the result is tagged
/// [`ContainmentMethod::BoundingBoxFallback`].
pub fn test_point(point: Coordinate, boundary: &RectangularBoundary) -> ContainmentResult {
    let bbox = boundary.bounding_box();
    let finite = point.latitude.is_finite() && point.longitude.is_finite();

    if finite && !bbox.contains(point) {
        let nearest = distance_to_boundary_edge(point, boundary);
        return ContainmentResult {
            inside: false,
            distance_to_edge_m: nearest.distance_m,
            nearest_edge: nearest.edge,
            nearest_point: Some(nearest.nearest_point),
            method: ContainmentMethod::BoundingBoxReject,
        };
    }

    match ray_cast(point, boundary) {
        Ok(inside) => {
            let nearest = distance_to_boundary_edge(point, boundary);
            ContainmentResult {
                inside,
                distance_to_edge_m: nearest.distance_m,
                nearest_edge: nearest.edge,
                nearest_point: Some(nearest.nearest_point),
                method: ContainmentMethod::RayCasting,
            }
        }
        Err(fault) => {
            tracing::warn!(
                degradation = "bounding_box_only",
                error = %fault,
                "exact containment test failed, using bounding box"
            );
            let nearest = distance_to_boundary_edge(point, boundary);
            let usable = nearest.distance_m.is_finite();
            ContainmentResult {
                inside: bbox.contains(point),
                distance_to_edge_m: if usable { nearest.distance_m } else { 0.0 },
                nearest_edge: if usable { nearest.edge } else { Edge::Unknown },
                nearest_point: usable.then_some(nearest.nearest_point),
                method: ContainmentMethod::BoundingBoxFallback,
            }
        }
    }
}

/// Even-odd ray casting in (lat, lon) space with a ray toward increasing
/// longitude.
pub fn ray_cast(
    point: Coordinate,
    boundary: &RectangularBoundary,
) -> Result<bool, ContainmentFault> {
    if !(point.latitude.is_finite() && point.longitude.is_finite()) {
        return Err(ContainmentFault::NonFinitePoint);
    }
    let (py, px) = (point.latitude, point.longitude);
    let mut crossings = 0usize;

    for (edge, start, end) in boundary.edges() {
        let (y1, x1) = (start.latitude, start.longitude);
        let (y2, x2) = (end.latitude, end.longitude);
        if (y1 <= py && py < y2) || (y2 <= py && py < y1) {
            let x = x1 + (py - y1) * (x2 - x1) / (y2 - y1);
            if !x.is_finite() {
                return Err(ContainmentFault::DegenerateCrossing(edge));
            }
            if x > px {
                crossings += 1;
            }
        }
    }

    Ok(crossings % 2 == 1)
}

/// Shortest distance from `point` to any of the four edge segments.
pub fn distance_to_boundary_edge(
    point: Coordinate,
    boundary: &RectangularBoundary,
) -> EdgeDistance {
    let mut best = EdgeDistance {
        distance_m: f64::INFINITY,
        edge: Edge::Unknown,
        nearest_point: boundary.center(),
    };
    for (edge, start, end) in boundary.edges() {
        let (distance_m, nearest_point) = distance_to_segment(point, start, end);
        if distance_m < best.distance_m {
            best = EdgeDistance {
                distance_m,
                edge,
                nearest_point,
            };
        }
    }
    if best.edge == Edge::Unknown {
        best.distance_m = f64::NAN;
    }
    best
}

/// Projection is planar in degrees with the parameter clamped to the
/// segment; the final distance is great-circle.
fn distance_to_segment(point: Coordinate, start: Coordinate, end: Coordinate) -> (f64, Coordinate) {
    let d_lat = end.latitude - start.latitude;
    let d_lon = end.longitude - start.longitude;
    let length_sq = d_lat * d_lat + d_lon * d_lon;

    if length_sq == 0.0 {
        return (haversine_m(point, start), start);
    }

    let t = ((point.latitude - start.latitude) * d_lat
        + (point.longitude - start.longitude) * d_lon)
        / length_sq;
    let t = t.clamp(0.0, 1.0);
    let closest = Coordinate::new(start.latitude + t * d_lat, start.longitude + t * d_lon);
    (haversine_m(point, closest), closest)
}
