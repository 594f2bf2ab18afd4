use fence_geo::{ContainmentMethod, Coordinate, Degradation, Edge};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeofenceMethod {
    Circular,
    Rectangular,
}

impl GeofenceMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Circular => "circular",
            Self::Rectangular => "rectangular",
        }
    }
}

impl fmt::Display for GeofenceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    InsideBoundary,
    WithinToleranceWithGoodGps,
    WithinToleranceButPoorGps,
    OutsideTolerance,
    GpsAccuracyExceedsThreshold,
    InsideRadius,
    OutsideRadius,
    InvalidCoordinates,
    InvalidAccuracy,
    InvalidBoundary,
}

impl ReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InsideBoundary => "inside_boundary",
            Self::WithinToleranceWithGoodGps => "within_tolerance_with_good_gps",
            Self::WithinToleranceButPoorGps => "within_tolerance_but_poor_gps",
            Self::OutsideTolerance => "outside_tolerance",
            Self::GpsAccuracyExceedsThreshold => "gps_accuracy_exceeds_threshold",
            Self::InsideRadius => "inside_radius",
            Self::OutsideRadius => "outside_radius",
            Self::InvalidCoordinates => "invalid_coordinates",
            Self::InvalidAccuracy => "invalid_accuracy",
            Self::InvalidBoundary => "invalid_boundary",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one check-in evaluation. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    pub inside: bool,
    pub method: GeofenceMethod,
    pub reason: ReasonCode,
    pub distance_to_edge_m: Option<f64>,
    pub nearest_edge: Option<Edge>,
    pub nearest_point: Option<Coordinate>,
    pub distance_from_center_m: Option<f64>,
    pub radius_m: Option<f64>,
    pub tolerance_applied: bool,
    pub uncertainty_intersects_boundary: bool,
    pub containment: Option<ContainmentMethod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<Degradation>,
    /// Human-readable cause for input rejections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AdmissionDecision {
    pub fn rejected(method: GeofenceMethod, reason: ReasonCode, detail: impl Into<String>) -> Self {
        Self {
            inside: false,
            method,
            reason,
            distance_to_edge_m: None,
            nearest_edge: None,
            nearest_point: None,
            distance_from_center_m: None,
            radius_m: None,
            tolerance_applied: false,
            uncertainty_intersects_boundary: false,
            containment: None,
            degradations: Vec::new(),
            detail: Some(detail.into()),
        }
    }

    pub fn degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    /// "Move N meters toward the <edge> edge" for rejected rectangular
    /// check-ins that know where the boundary is.
    pub fn guidance(&self) -> Option<String> {
        if self.inside {
            return None;
        }
        match (self.distance_to_edge_m, self.nearest_edge) {
            (Some(distance), Some(edge)) if edge != Edge::Unknown => {
                Some(format!("move {:.1} m toward the {} edge", distance, edge))
            }
            _ => match (self.distance_from_center_m, self.radius_m) {
                (Some(distance), Some(radius)) if distance > radius => {
                    Some(format!("move {:.1} m toward the center", distance - radius))
                }
                _ => None,
            },
        }
    }
}
