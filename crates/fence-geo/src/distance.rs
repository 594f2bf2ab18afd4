//! Surface distance between two coordinates.
//!
//! Two formulas are available. The great-circle (haversine) form always
//! produces an answer; the ellipsoidal (Vincenty) form is accurate to the
//! millimetre but can fail to converge for near-antipodal inputs. Callers that
//! want the precise answer should go through [`distance_m`], which falls back
//! to haversine and reports which formula produced the value.

use crate::Coordinate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const WGS84_B: f64 = (1.0 - WGS84_F) * WGS84_A;

pub const VINCENTY_MAX_ITERATIONS: usize = 100;
const VINCENTY_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DistanceError {
    #[error("ellipsoidal formula did not converge after {0} iterations")]
    NoConvergence(usize),
    #[error("distance inputs must be finite")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formula {
    Haversine,
    Vincenty,
    HaversineFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measured {
    pub meters: f64,
    pub formula: Formula,
}

impl Measured {
    pub fn degraded(&self) -> bool {
        self.formula == Formula::HaversineFallback
    }
}

pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

pub fn vincenty_m(a: Coordinate, b: Coordinate) -> Result<f64, DistanceError> {
    if ![a.latitude, a.longitude, b.latitude, b.longitude]
        .iter()
        .all(|value| value.is_finite())
    {
        return Err(DistanceError::NonFinite);
    }

    let l = (b.longitude - a.longitude).to_radians();
    let u1 = ((1.0 - WGS84_F) * a.latitude.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * b.latitude.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    let mut converged = false;
    let mut sin_sigma = 0.0;
    let mut cos_sigma = 0.0;
    let mut sigma = 0.0;
    let mut cos2_alpha = 0.0;
    let mut cos_2sigma_m = 0.0;

    for _ in 0..VINCENTY_MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            // coincident points
            return Ok(0.0);
        }
        cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        sigma = sin_sigma.atan2(cos_sigma);

        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        cos2_alpha = 1.0 - sin_alpha * sin_alpha;
        cos_2sigma_m = if cos2_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos2_alpha
        } else {
            // equatorial line
            0.0
        };

        let c = WGS84_F / 16.0 * cos2_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos2_alpha));
        let previous = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));

        if (lambda - previous).abs() <= VINCENTY_EPSILON {
            converged = true;
            break;
        }
    }

    if !converged || !lambda.is_finite() {
        return Err(DistanceError::NoConvergence(VINCENTY_MAX_ITERATIONS));
    }

    let u_sq = cos2_alpha * (WGS84_A.powi(2) - WGS84_B.powi(2)) / WGS84_B.powi(2);
    let big_a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
    let delta_sigma = big_b
        * sin_sigma
        * (cos_2sigma_m
            + big_b / 4.0
                * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                    - big_b / 6.0
                        * cos_2sigma_m
                        * (-3.0 + 4.0 * sin_sigma.powi(2))
                        * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));

    Ok(WGS84_B * big_a * (sigma - delta_sigma))
}

/// Ellipsoidal distance, degrading to great-circle when the iteration fails.
pub fn distance_m(a: Coordinate, b: Coordinate) -> Measured {
    match vincenty_m(a, b) {
        Ok(meters) => Measured {
            meters,
            formula: Formula::Vincenty,
        },
        Err(err) => {
            tracing::warn!(
                degradation = "haversine_fallback",
                error = %err,
                "ellipsoidal distance failed, using great-circle"
            );
            Measured {
                meters: haversine_m(a, b),
                formula: Formula::HaversineFallback,
            }
        }
    }
}
