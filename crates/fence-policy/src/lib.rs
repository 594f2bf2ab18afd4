pub mod accuracy;
pub mod decision;
pub mod tolerance;

pub use accuracy::{assess_accuracy, validate_accuracy, AccuracyAssessment, AccuracyReason};
pub use decision::{AdmissionDecision, GeofenceMethod, ReasonCode};
pub use tolerance::{apply_tolerance, ToleranceOutcome};

use fence_config::AdmissionPolicyConfig;
use fence_core::LocationSample;
use fence_geo::{distance_m, test_point, Coordinate, GeoFence, RectangularBoundary};

pub trait AdmissionPolicy {
    fn admit(&self, fence: &GeoFence, sample: &LocationSample) -> AdmissionDecision;
}

#[derive(Debug, Clone, Default)]
pub struct StandardAdmissionPolicy {
    config: AdmissionPolicyConfig,
}

impl StandardAdmissionPolicy {
    pub fn new(config: AdmissionPolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdmissionPolicyConfig {
        &self.config
    }

    fn check_input(
        &self,
        method: GeofenceMethod,
        sample: &LocationSample,
    ) -> Option<AdmissionDecision> {
        if let Err(err) = sample.coordinate().validate() {
            return Some(AdmissionDecision::rejected(
                method,
                ReasonCode::InvalidCoordinates,
                err.to_string(),
            ));
        }
        if !(sample.accuracy_m.is_finite() && sample.accuracy_m >= 0.0) {
            return Some(AdmissionDecision::rejected(
                method,
                ReasonCode::InvalidAccuracy,
                format!(
                    "accuracy must be a non-negative number of meters (got {})",
                    sample.accuracy_m
                ),
            ));
        }
        None
    }

    pub fn admit_circle(
        &self,
        center: Coordinate,
        radius_m: f64,
        sample: &LocationSample,
    ) -> AdmissionDecision {
        let method = GeofenceMethod::Circular;
        if let Some(rejected) = self.check_input(method, sample) {
            return rejected;
        }
        if let Err(err) = center.check_range() {
            return AdmissionDecision::rejected(
                method,
                ReasonCode::InvalidBoundary,
                err.to_string(),
            );
        }
        if !(radius_m.is_finite() && radius_m > 0.0) {
            return AdmissionDecision::rejected(
                method,
                ReasonCode::InvalidBoundary,
                format!("radius must be a positive number of meters (got {radius_m})"),
            );
        }

        let measured = distance_m(sample.coordinate(), center);
        let inside = measured.meters <= radius_m;
        let mut degradations = Vec::new();
        if measured.degraded() {
            degradations.push(fence_geo::Degradation::HaversineFallback);
        }

        AdmissionDecision {
            inside,
            method,
            reason: if inside {
                ReasonCode::InsideRadius
            } else {
                ReasonCode::OutsideRadius
            },
            distance_to_edge_m: None,
            nearest_edge: None,
            nearest_point: None,
            distance_from_center_m: Some(measured.meters),
            radius_m: Some(radius_m),
            tolerance_applied: false,
            uncertainty_intersects_boundary: sample.accuracy_m
                >= (measured.meters - radius_m).abs(),
            containment: None,
            degradations,
            detail: None,
        }
    }

    /// Tolerance admission over the exact containment test. A point strictly
    /// inside is still refused when its fix is worse than `threshold_m`, and a
    /// point outside the box grown by `tolerance_m` is never admitted.
    pub fn admit_rectangle(
        &self,
        boundary: &RectangularBoundary,
        tolerance_m: f64,
        threshold_m: f64,
        sample: &LocationSample,
    ) -> AdmissionDecision {
        let method = GeofenceMethod::Rectangular;
        if let Some(rejected) = self.check_input(method, sample) {
            return rejected;
        }

        let point = sample.coordinate();
        let containment = test_point(point, boundary);
        let within_margin = containment.inside
            || boundary
                .bounding_box()
                .expanded_by_m(tolerance_m)
                .contains(point);
        let tolerance = apply_tolerance(
            &containment,
            tolerance_m,
            sample.accuracy_m,
            self.config.good_gps_accuracy_m,
        );
        let accuracy = assess_accuracy(sample.accuracy_m, threshold_m, &containment);

        // edge distance is haversine while the grown box uses the degree
        // conversion, so the box decides near the tolerance line
        let (inside, reason, tolerance_applied) = if !within_margin {
            (false, ReasonCode::OutsideTolerance, false)
        } else if containment.inside && accuracy.reason == AccuracyReason::ExceedsThreshold {
            (false, ReasonCode::GpsAccuracyExceedsThreshold, false)
        } else {
            (
                tolerance.accepted,
                tolerance.reason,
                tolerance.tolerance_applied,
            )
        };

        AdmissionDecision {
            inside,
            method,
            reason,
            distance_to_edge_m: Some(containment.distance_to_edge_m),
            nearest_edge: Some(containment.nearest_edge),
            nearest_point: containment.nearest_point,
            distance_from_center_m: None,
            radius_m: None,
            tolerance_applied,
            uncertainty_intersects_boundary: accuracy.uncertainty_intersects_boundary,
            containment: Some(containment.method),
            degradations: containment.degradation().into_iter().collect(),
            detail: None,
        }
    }
}

impl AdmissionPolicy for StandardAdmissionPolicy {
    fn admit(&self, fence: &GeoFence, sample: &LocationSample) -> AdmissionDecision {
        let decision = match fence {
            GeoFence::Circle { center, radius_m } => self.admit_circle(*center, *radius_m, sample),
            GeoFence::Rectangle {
                boundary,
                tolerance_m,
                gps_accuracy_threshold_m,
            } => self.admit_rectangle(boundary, *tolerance_m, *gps_accuracy_threshold_m, sample),
        };
        tracing::debug!(
            method = %decision.method,
            reason = %decision.reason,
            inside = decision.inside,
            distance_to_edge_m = decision.distance_to_edge_m,
            distance_from_center_m = decision.distance_from_center_m,
            "evaluated check-in"
        );
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fence_geo::{ContainmentMethod, Edge};
    use proptest::prelude::*;

    fn boundary() -> RectangularBoundary {
        RectangularBoundary::new(
            Coordinate::new(40.7130, -74.0058),
            Coordinate::new(40.7130, -74.0062),
            Coordinate::new(40.7128, -74.0058),
            Coordinate::new(40.7128, -74.0062),
        )
        .unwrap()
    }

    fn rectangle(tolerance_m: f64, threshold_m: f64) -> GeoFence {
        GeoFence::Rectangle {
            boundary: boundary(),
            tolerance_m,
            gps_accuracy_threshold_m: threshold_m,
        }
    }

    #[test]
    fn one_meter_outside_depends_on_fix_quality() {
        let policy = StandardAdmissionPolicy::default();
        // ~1 m north of the north edge
        let poor = LocationSample::new(40.713009, -74.006, 25.0);
        let decision = policy.admit(&rectangle(2.0, 20.0), &poor);
        assert!(!decision.inside);
        assert_eq!(decision.reason, ReasonCode::WithinToleranceButPoorGps);
        assert!(!decision.tolerance_applied);

        let good = LocationSample::new(40.713009, -74.006, 8.0);
        let decision = policy.admit(&rectangle(2.0, 20.0), &good);
        assert!(decision.inside);
        assert_eq!(decision.reason, ReasonCode::WithinToleranceWithGoodGps);
        assert!(decision.tolerance_applied);
        assert_eq!(decision.nearest_edge, Some(Edge::North));
        assert_eq!(decision.method, GeofenceMethod::Rectangular);
    }

    #[test]
    fn inside_with_poor_fix_exceeds_threshold() {
        let policy = StandardAdmissionPolicy::default();
        let sample = LocationSample::new(40.7129, -74.006, 35.0);
        let decision = policy.admit(&rectangle(2.0, 20.0), &sample);
        assert!(!decision.inside);
        assert_eq!(decision.reason, ReasonCode::GpsAccuracyExceedsThreshold);

        let sample = LocationSample::new(40.7129, -74.006, 15.0);
        let decision = policy.admit(&rectangle(2.0, 20.0), &sample);
        assert!(decision.inside);
        assert_eq!(decision.reason, ReasonCode::InsideBoundary);
        assert!(decision.uncertainty_intersects_boundary);
        assert_eq!(decision.containment, Some(ContainmentMethod::RayCasting));
    }

    #[test]
    fn far_outside_reports_guidance() {
        let policy = StandardAdmissionPolicy::default();
        let sample = LocationSample::new(40.7131, -74.006, 5.0);
        let decision = policy.admit(&rectangle(2.0, 20.0), &sample);
        assert!(!decision.inside);
        assert_eq!(decision.reason, ReasonCode::OutsideTolerance);
        let guidance = decision.guidance().unwrap();
        assert!(guidance.contains("north"), "{guidance}");
    }

    #[test]
    fn invalid_input_is_a_typed_rejection() {
        let policy = StandardAdmissionPolicy::default();
        let decision = policy.admit(&rectangle(2.0, 20.0), &LocationSample::new(0.0, 0.0, 5.0));
        assert_eq!(decision.reason, ReasonCode::InvalidCoordinates);
        assert!(decision.detail.is_some());

        let decision = policy.admit(
            &rectangle(2.0, 20.0),
            &LocationSample::new(40.7129, -74.006, -3.0),
        );
        assert_eq!(decision.reason, ReasonCode::InvalidAccuracy);

        let decision = policy.admit(
            &rectangle(2.0, 20.0),
            &LocationSample::new(40.712912345, -74.006, 5.0),
        );
        assert_eq!(decision.reason, ReasonCode::InvalidCoordinates);
    }

    #[test]
    fn tolerance_stops_at_the_grown_box() {
        let policy = StandardAdmissionPolicy::default();
        let grown = boundary().bounding_box().expanded_by_m(10.0);

        // just past the grown north side, yet under 10 m by haversine
        let beyond = LocationSample::new(40.7130899, -74.006, 5.0);
        assert!(!grown.contains(beyond.coordinate()));
        let decision = policy.admit(&rectangle(10.0, 20.0), &beyond);
        assert!(!decision.inside);
        assert_eq!(decision.reason, ReasonCode::OutsideTolerance);
        assert!(!decision.tolerance_applied);
        assert!(decision.distance_to_edge_m.unwrap() < 10.0);

        let within = LocationSample::new(40.713089, -74.006, 5.0);
        assert!(grown.contains(within.coordinate()));
        let decision = policy.admit(&rectangle(10.0, 20.0), &within);
        assert!(decision.inside);
        assert_eq!(decision.reason, ReasonCode::WithinToleranceWithGoodGps);
    }

    #[test]
    fn circle_admission_uses_radius() {
        let policy = StandardAdmissionPolicy::default();
        let fence = GeoFence::Circle {
            center: Coordinate::new(40.7128, -74.0060),
            radius_m: 50.0,
        };
        let near = policy.admit(&fence, &LocationSample::new(40.7130, -74.0060, 5.0));
        assert!(near.inside);
        assert_eq!(near.reason, ReasonCode::InsideRadius);
        assert_eq!(near.method, GeofenceMethod::Circular);
        assert!(near.distance_from_center_m.unwrap() < 25.0);
        assert!(!near.degraded());

        let far = policy.admit(&fence, &LocationSample::new(40.7140, -74.0060, 5.0));
        assert!(!far.inside);
        assert_eq!(far.reason, ReasonCode::OutsideRadius);
        assert!(far.guidance().unwrap().contains("center"));

        let broken = GeoFence::Circle {
            center: Coordinate::new(40.7128, -74.0060),
            radius_m: 0.0,
        };
        assert_eq!(
            policy.admit(&broken, &LocationSample::new(40.7130, -74.0060, 5.0)).reason,
            ReasonCode::InvalidBoundary
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn outside_expanded_box_is_never_admitted(
            lat in -60.0f64..60.0,
            lon in -170.0f64..170.0,
            width in 5.0f64..300.0,
            height in 5.0f64..300.0,
            tolerance in 0.0f64..10.0,
            accuracy in 0.0f64..100.0,
            d_lat in -0.01f64..0.01,
            d_lon in -0.01f64..0.01,
        ) {
            let boundary = RectangularBoundary::from_center_and_dimensions(
                Coordinate::new(lat, lon), width, height,
            ).unwrap();
            let expanded = boundary.bounding_box().expanded_by_m(tolerance);
            let point_lat = ((lat + d_lat) * 1e6).round() / 1e6;
            let point_lon = ((lon + d_lon) * 1e6).round() / 1e6;
            let point = Coordinate::new(point_lat, point_lon);
            prop_assume!(!expanded.contains(point));

            let decision = StandardAdmissionPolicy::default().admit_rectangle(
                &boundary, tolerance, 20.0, &LocationSample::new(point_lat, point_lon, accuracy),
            );
            prop_assert!(!decision.inside, "{:?}", decision);
        }
    }
}
