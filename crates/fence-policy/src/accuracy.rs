use fence_geo::{test_point, ContainmentResult, Coordinate, RectangularBoundary};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyReason {
    ExceedsThreshold,
    InsideWithGoodMargin,
    InsideButUncertaintyExtendsOutside,
    OutsideButUncertaintyIntersectsBoundary,
    OutsideBoundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyAssessment {
    pub acceptable: bool,
    pub reason: AccuracyReason,
    pub uncertainty_intersects_boundary: bool,
    pub accuracy_m: f64,
    pub threshold_m: f64,
    pub distance_to_edge_m: Option<f64>,
}

pub fn validate_accuracy(
    accuracy_m: f64,
    threshold_m: f64,
    point: Coordinate,
    boundary: &RectangularBoundary,
) -> AccuracyAssessment {
    if accuracy_m > threshold_m {
        return exceeds(accuracy_m, threshold_m);
    }
    assess_accuracy(accuracy_m, threshold_m, &test_point(point, boundary))
}

/// Same as [`validate_accuracy`] for a containment result already in hand.
pub fn assess_accuracy(
    accuracy_m: f64,
    threshold_m: f64,
    containment: &ContainmentResult,
) -> AccuracyAssessment {
    if accuracy_m > threshold_m {
        return exceeds(accuracy_m, threshold_m);
    }

    let distance = containment.distance_to_edge_m;
    let (acceptable, reason, intersects) = if containment.inside {
        if accuracy_m > distance {
            (true, AccuracyReason::InsideButUncertaintyExtendsOutside, true)
        } else {
            (true, AccuracyReason::InsideWithGoodMargin, false)
        }
    } else if accuracy_m >= distance {
        (false, AccuracyReason::OutsideButUncertaintyIntersectsBoundary, true)
    } else {
        (false, AccuracyReason::OutsideBoundary, false)
    };

    AccuracyAssessment {
        acceptable,
        reason,
        uncertainty_intersects_boundary: intersects,
        accuracy_m,
        threshold_m,
        distance_to_edge_m: Some(distance),
    }
}

fn exceeds(accuracy_m: f64, threshold_m: f64) -> AccuracyAssessment {
    AccuracyAssessment {
        acceptable: false,
        reason: AccuracyReason::ExceedsThreshold,
        uncertainty_intersects_boundary: false,
        accuracy_m,
        threshold_m,
        distance_to_edge_m: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary() -> RectangularBoundary {
        RectangularBoundary::new(
            Coordinate::new(40.7130, -74.0058),
            Coordinate::new(40.7130, -74.0062),
            Coordinate::new(40.7128, -74.0058),
            Coordinate::new(40.7128, -74.0062),
        )
        .unwrap()
    }

    const CENTER: Coordinate = Coordinate::new(40.7129, -74.0060);

    #[test]
    fn threshold_is_checked_first() {
        let result = validate_accuracy(25.0, 20.0, CENTER, &boundary());
        assert!(!result.acceptable);
        assert_eq!(result.reason, AccuracyReason::ExceedsThreshold);
        assert!(result.distance_to_edge_m.is_none());
    }

    #[test]
    fn inside_margin_versus_uncertain() {
        // center is ~11 m from the north and south edges
        let tight = validate_accuracy(5.0, 20.0, CENTER, &boundary());
        assert!(tight.acceptable);
        assert_eq!(tight.reason, AccuracyReason::InsideWithGoodMargin);
        assert!(!tight.uncertainty_intersects_boundary);

        let loose = validate_accuracy(15.0, 20.0, CENTER, &boundary());
        assert!(loose.acceptable);
        assert_eq!(
            loose.reason,
            AccuracyReason::InsideButUncertaintyExtendsOutside
        );
        assert!(loose.uncertainty_intersects_boundary);
    }

    #[test]
    fn outside_is_never_acceptable() {
        let point = Coordinate::new(40.7131, -74.0060);
        let near = validate_accuracy(15.0, 20.0, point, &boundary());
        assert!(!near.acceptable);
        assert_eq!(
            near.reason,
            AccuracyReason::OutsideButUncertaintyIntersectsBoundary
        );
        assert!(near.uncertainty_intersects_boundary);

        let far = validate_accuracy(5.0, 20.0, point, &boundary());
        assert_eq!(far.reason, AccuracyReason::OutsideBoundary);
        assert!(!far.uncertainty_intersects_boundary);
    }
}
