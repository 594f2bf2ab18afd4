//! Persisted geofence settings for one boundary owner and the rules for
//! changing them once a reference location is locked.

use fence_config::AdmissionPolicyConfig;
use fence_core::{datetime_from_millis, EpochMillis, FenceError, FenceResult, PrecisionLevel};
use fence_geo::{haversine_m, Coordinate, CornerSet, Degradation, GeoFence, RectangularBoundary};
use fence_integrity::verify_integrity;
use fence_policy::GeofenceMethod;
use fence_session::LockedLocation;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceConfig {
    pub geofence_type: GeofenceMethod,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub radius_m: Option<f64>,
    /// Persisted rectangular boundary record, stored as JSON text.
    #[serde(default)]
    pub boundary_record: Option<String>,
    #[serde(default)]
    pub tolerance_m: Option<f64>,
    #[serde(default)]
    pub gps_accuracy_threshold_m: Option<f64>,
    #[serde(default)]
    pub location_locked: bool,
    #[serde(default)]
    pub allow_location_updates: bool,
    #[serde(default)]
    pub reference_accuracy_m: Option<f64>,
    #[serde(default)]
    pub integrity_hash: Option<String>,
    #[serde(default)]
    pub locked_at_ms: Option<EpochMillis>,
}

/// The geofence a check-in is evaluated against, plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFence {
    pub fence: GeoFence,
    pub degradation: Option<Degradation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub center: Coordinate,
    pub radius_m: f64,
    pub circular_area_sqm: f64,
    pub rectangular_area_sqm: f64,
    pub perimeter_m: f64,
    /// Rectangular area over circular area.
    pub area_ratio: f64,
    pub corners: CornerSet,
}

impl GeofenceConfig {
    pub fn circular(center: Coordinate, radius_m: f64) -> Self {
        Self {
            geofence_type: GeofenceMethod::Circular,
            latitude: Some(center.latitude),
            longitude: Some(center.longitude),
            radius_m: Some(radius_m),
            boundary_record: None,
            tolerance_m: None,
            gps_accuracy_threshold_m: None,
            location_locked: false,
            allow_location_updates: false,
            reference_accuracy_m: None,
            integrity_hash: None,
            locked_at_ms: None,
        }
    }

    /// Rectangular settings. The circular fields hold a circle through the
    /// corners so an unreadable record still has something to fall back to.
    pub fn rectangular(
        boundary: &RectangularBoundary,
        tolerance_m: f64,
        threshold_m: f64,
    ) -> FenceResult<Self> {
        let center = boundary.center();
        Ok(Self {
            geofence_type: GeofenceMethod::Rectangular,
            latitude: Some(center.latitude),
            longitude: Some(center.longitude),
            radius_m: Some(covering_radius_m(boundary)),
            boundary_record: Some(boundary.to_json()?),
            tolerance_m: Some(tolerance_m),
            gps_accuracy_threshold_m: Some(threshold_m),
            location_locked: false,
            allow_location_updates: false,
            reference_accuracy_m: None,
            integrity_hash: None,
            locked_at_ms: None,
        })
    }

    pub fn center(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.latitude?, self.longitude?))
    }

    fn circle(&self) -> FenceResult<GeoFence> {
        match (self.center(), self.radius_m) {
            (Some(center), Some(radius_m)) => Ok(GeoFence::Circle { center, radius_m }),
            _ => Err(FenceError::invalid_boundary("missing circular geofence data")),
        }
    }

    /// Rectangular settings whose record cannot be read fall back to the
    /// circular fields, tagged [`Degradation::CircularFallback`].
    pub fn resolve(&self, defaults: &AdmissionPolicyConfig) -> FenceResult<ResolvedFence> {
        if self.geofence_type == GeofenceMethod::Circular {
            return Ok(ResolvedFence {
                fence: self.circle()?,
                degradation: None,
            });
        }

        let parsed = match self.boundary_record.as_deref() {
            Some(text) => RectangularBoundary::from_json(text).map_err(FenceError::from),
            None => Err(FenceError::invalid_boundary("no boundary record stored")),
        };
        match parsed {
            Ok(boundary) => Ok(ResolvedFence {
                fence: GeoFence::Rectangle {
                    boundary,
                    tolerance_m: self.tolerance_m.unwrap_or(defaults.default_tolerance_m),
                    gps_accuracy_threshold_m: self
                        .gps_accuracy_threshold_m
                        .unwrap_or(defaults.default_gps_accuracy_threshold_m),
                },
                degradation: None,
            }),
            Err(err) => {
                tracing::warn!(
                    degradation = Degradation::CircularFallback.as_str(),
                    error = %err,
                    "rectangular boundary unreadable, evaluating as circle"
                );
                Ok(ResolvedFence {
                    fence: self.circle().map_err(|_| err)?,
                    degradation: Some(Degradation::CircularFallback),
                })
            }
        }
    }

    fn ensure_unlocked(&self) -> FenceResult<()> {
        if self.location_locked && !self.allow_location_updates {
            return Err(FenceError::locked("location is locked and cannot be updated"));
        }
        Ok(())
    }

    /// Stores the result of a completed confirmation as the reference point.
    pub fn lock_reference(&mut self, location: &LockedLocation) -> FenceResult<()> {
        self.ensure_unlocked()?;
        location.coordinate().validate()?;
        self.latitude = Some(location.latitude);
        self.longitude = Some(location.longitude);
        self.reference_accuracy_m = Some(location.average_accuracy_m);
        self.integrity_hash = Some(location.integrity_hash.clone());
        self.locked_at_ms = Some(location.locked_at_ms);
        self.location_locked = true;
        Ok(())
    }

    pub fn replace_boundary(
        &mut self,
        boundary: &RectangularBoundary,
        tolerance_m: f64,
        threshold_m: f64,
    ) -> FenceResult<()> {
        self.ensure_unlocked()?;
        for (what, value) in [("tolerance", tolerance_m), ("accuracy threshold", threshold_m)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(FenceError::invalid_input(format!(
                    "{what} must be a non-negative number of meters (got {value})"
                )));
            }
        }
        self.boundary_record = Some(boundary.to_json()?);
        if self.circle().is_err() {
            let center = boundary.center();
            self.latitude = Some(center.latitude);
            self.longitude = Some(center.longitude);
            self.radius_m = Some(covering_radius_m(boundary));
        }
        self.tolerance_m = Some(tolerance_m);
        self.gps_accuracy_threshold_m = Some(threshold_m);
        self.geofence_type = GeofenceMethod::Rectangular;
        Ok(())
    }

    /// Replaces a circular geofence with the equal-area square around the
    /// same center. The circular fields are kept as the fallback.
    pub fn convert_to_rectangular(
        &mut self,
        defaults: &AdmissionPolicyConfig,
    ) -> FenceResult<ConversionReport> {
        if self.geofence_type == GeofenceMethod::Rectangular {
            return Err(FenceError::invalid_input("geofence is already rectangular"));
        }
        self.ensure_unlocked()?;
        let (center, radius_m) = match self.circle()? {
            GeoFence::Circle { center, radius_m } => (center, radius_m),
            GeoFence::Rectangle { .. } => {
                return Err(FenceError::invalid_boundary("missing circular geofence data"));
            }
        };
        let boundary = RectangularBoundary::from_circular(center, radius_m)?;

        let circular_area_sqm = PI * radius_m * radius_m;
        let report = ConversionReport {
            center,
            radius_m,
            circular_area_sqm,
            rectangular_area_sqm: boundary.area(),
            perimeter_m: boundary.perimeter(),
            area_ratio: boundary.area() / circular_area_sqm,
            corners: boundary.to_record().corners,
        };
        self.replace_boundary(
            &boundary,
            defaults.default_tolerance_m,
            defaults.default_gps_accuracy_threshold_m,
        )?;
        tracing::info!(
            radius_m,
            area_ratio = report.area_ratio,
            "circular geofence converted to rectangular"
        );
        Ok(report)
    }

    pub fn reference_precision(&self) -> PrecisionLevel {
        PrecisionLevel::from_accuracy(self.reference_accuracy_m)
    }

    /// Recomputes the stored hash from the stored reference point and lock time.
    pub fn verify_reference_integrity(&self, salt: &str) -> bool {
        match (self.center(), self.locked_at_ms, self.integrity_hash.as_deref()) {
            (Some(center), Some(locked_at_ms), Some(hash)) => {
                verify_integrity(center, datetime_from_millis(locked_at_ms), salt, hash)
            }
            _ => false,
        }
    }
}

fn covering_radius_m(boundary: &RectangularBoundary) -> f64 {
    let center = boundary.center();
    boundary
        .corners()
        .iter()
        .map(|(_, corner)| haversine_m(center, *corner))
        .fold(0.0, f64::max)
}
