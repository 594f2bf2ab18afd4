use crate::decision::ReasonCode;
use fence_geo::ContainmentResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceOutcome {
    pub accepted: bool,
    pub reason: ReasonCode,
    pub tolerance_applied: bool,
    pub distance_to_edge_m: f64,
}

/// Accept/reject from containment alone. The edge margin is only honored
/// when the fix is good enough to trust it.
pub fn apply_tolerance(
    containment: &ContainmentResult,
    tolerance_m: f64,
    accuracy_m: f64,
    good_gps_accuracy_m: f64,
) -> ToleranceOutcome {
    let distance = containment.distance_to_edge_m;

    if containment.inside {
        return ToleranceOutcome {
            accepted: true,
            reason: ReasonCode::InsideBoundary,
            tolerance_applied: false,
            distance_to_edge_m: distance,
        };
    }

    if distance <= tolerance_m {
        let trusted = accuracy_m <= good_gps_accuracy_m;
        return ToleranceOutcome {
            accepted: trusted,
            reason: if trusted {
                ReasonCode::WithinToleranceWithGoodGps
            } else {
                ReasonCode::WithinToleranceButPoorGps
            },
            tolerance_applied: trusted,
            distance_to_edge_m: distance,
        };
    }

    ToleranceOutcome {
        accepted: false,
        reason: ReasonCode::OutsideTolerance,
        tolerance_applied: false,
        distance_to_edge_m: distance,
    }
}
