use fence_config::IntegrityPolicy;
use fence_core::{LocationSample, RiskLevel};
use fence_geo::decimal_places;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedField {
    CapturedAt,
    UserAgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "factor", content = "field")]
pub enum SpoofingFactor {
    IntegerCoordinates,
    ExcessivePrecision,
    ImpossibleAccuracy,
    MissingField(ExpectedField),
    ImpossibleSpeed,
}

impl SpoofingFactor {
    pub fn weight(self) -> u32 {
        match self {
            Self::IntegerCoordinates => 30,
            Self::ExcessivePrecision => 20,
            Self::ImpossibleAccuracy => 40,
            Self::MissingField(_) => 10,
            Self::ImpossibleSpeed => 35,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpoofingAssessment {
    pub risk: RiskLevel,
    pub score: u32,
    pub factors: Vec<SpoofingFactor>,
}

/// Additive heuristics over signals that real GPS fixes rarely produce.
pub fn detect_spoofing(sample: &LocationSample, policy: &IntegrityPolicy) -> SpoofingAssessment {
    let mut factors = Vec::new();

    if sample.latitude.fract() == 0.0 && sample.longitude.fract() == 0.0 {
        factors.push(SpoofingFactor::IntegerCoordinates);
    }

    if decimal_places(sample.latitude) > policy.spoof_precision_digits
        || decimal_places(sample.longitude) > policy.spoof_precision_digits
    {
        factors.push(SpoofingFactor::ExcessivePrecision);
    }

    if sample.accuracy_m < policy.min_plausible_accuracy_m {
        factors.push(SpoofingFactor::ImpossibleAccuracy);
    }

    if sample.captured_at.is_none() {
        factors.push(SpoofingFactor::MissingField(ExpectedField::CapturedAt));
    }
    if sample.user_agent().is_none() {
        factors.push(SpoofingFactor::MissingField(ExpectedField::UserAgent));
    }

    if sample
        .speed_mps
        .is_some_and(|speed| speed > policy.max_plausible_speed_mps)
    {
        factors.push(SpoofingFactor::ImpossibleSpeed);
    }

    let score = factors.iter().map(|factor| factor.weight()).sum();
    SpoofingAssessment {
        risk: RiskLevel::from_score(score),
        score,
        factors,
    }
}
