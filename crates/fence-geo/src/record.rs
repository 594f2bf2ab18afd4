//! Persisted JSON form of a [`RectangularBoundary`].
//!
//! ```json
//! {"type":"rectangular","version":"1.0",
//!  "corners":{"ne":[lat,lon],"nw":[lat,lon],"se":[lat,lon],"sw":[lat,lon]},
//!  "metadata":{"area_sqm":number,"perimeter_m":number,"center":[lat,lon]}}
//! ```

use crate::rectangle::{BoundaryError, RectangularBoundary};
use crate::Coordinate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const RECORD_TYPE: &str = "rectangular";
pub const RECORD_VERSION: &str = "1.0";

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed boundary record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported boundary type {0:?}")]
    UnsupportedType(String),
    #[error("unsupported boundary record version {0:?}")]
    UnsupportedVersion(String),
    #[error("invalid boundary: {0}")]
    Boundary(#[from] BoundaryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerSet {
    pub ne: Coordinate,
    pub nw: Coordinate,
    pub se: Coordinate,
    pub sw: Coordinate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryMetadata {
    pub area_sqm: f64,
    pub perimeter_m: f64,
    pub center: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
    pub corners: CornerSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BoundaryMetadata>,
}

impl From<RectangularBoundary> for BoundaryRecord {
    fn from(value: RectangularBoundary) -> Self {
        Self {
            kind: RECORD_TYPE.to_string(),
            version: RECORD_VERSION.to_string(),
            corners: CornerSet {
                ne: value.ne(),
                nw: value.nw(),
                se: value.se(),
                sw: value.sw(),
            },
            metadata: Some(BoundaryMetadata {
                area_sqm: round2(value.area()),
                perimeter_m: round2(value.perimeter()),
                center: value.center(),
            }),
        }
    }
}

impl TryFrom<BoundaryRecord> for RectangularBoundary {
    type Error = RecordError;

    fn try_from(value: BoundaryRecord) -> Result<Self, Self::Error> {
        if value.kind != RECORD_TYPE {
            return Err(RecordError::UnsupportedType(value.kind));
        }
        if value.version.split('.').next() != Some("1") {
            return Err(RecordError::UnsupportedVersion(value.version));
        }
        Self::try_from(value.corners)
    }
}

impl TryFrom<CornerSet> for RectangularBoundary {
    type Error = RecordError;

    fn try_from(value: CornerSet) -> Result<Self, Self::Error> {
        Ok(Self::new(value.ne, value.nw, value.se, value.sw)?)
    }
}

impl RectangularBoundary {
    pub fn to_record(&self) -> BoundaryRecord {
        BoundaryRecord::from(*self)
    }

    pub fn to_json(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string(&self.to_record())?)
    }

    /// Accepts the full versioned record or a bare `{ne,nw,se,sw}` object.
    pub fn from_json(text: &str) -> Result<Self, RecordError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, RecordError> {
        if value.get("corners").is_some() {
            let record: BoundaryRecord = serde_json::from_value(value)?;
            Self::try_from(record)
        } else {
            let corners: CornerSet = serde_json::from_value(value)?;
            Self::try_from(corners)
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> RectangularBoundary {
        RectangularBoundary::new(
            Coordinate::new(40.7130, -74.0058),
            Coordinate::new(40.7130, -74.0062),
            Coordinate::new(40.7128, -74.0058),
            Coordinate::new(40.7128, -74.0062),
        )
        .unwrap()
    }

    #[test]
    fn writes_the_persisted_shape() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "rectangular");
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["corners"]["ne"][0], 40.7130);
        assert_eq!(value["corners"]["sw"][1], -74.0062);
        assert!(value["metadata"]["area_sqm"].is_f64());
        assert!(value["metadata"]["perimeter_m"].is_f64());
        assert_eq!(
            value["metadata"]["center"].as_array().map(Vec::len),
            Some(2)
        );
    }

    #[test]
    fn metadata_is_rounded_to_centimeters() {
        let record = sample().to_record();
        let metadata = record.metadata.unwrap();
        assert_eq!(metadata.area_sqm, round2(metadata.area_sqm));
        assert_eq!(metadata.perimeter_m, round2(metadata.perimeter_m));
    }

    #[test]
    fn reads_record_written_by_another_producer() {
        let text = r#"{"type":"rectangular","version":"1.0",
            "corners":{"ne":[40.713,-74.0058],"nw":[40.713,-74.0062],
                       "se":[40.7128,-74.0058],"sw":[40.7128,-74.0062]},
            "metadata":{"area_sqm":751.2,"perimeter_m":112.04,"center":[40.7129,-74.006]}}"#;
        let boundary = RectangularBoundary::from_json(text).unwrap();
        assert_eq!(boundary, sample());
    }

    #[test]
    fn reads_bare_corner_object() {
        let text = r#"{"ne":[40.713,-74.0058],"nw":[40.713,-74.0062],
                       "se":[40.7128,-74.0058],"sw":[40.7128,-74.0062]}"#;
        assert_eq!(RectangularBoundary::from_json(text).unwrap(), sample());
    }

    #[test]
    fn rejects_malformed_records() {
        assert!(matches!(
            RectangularBoundary::from_json("{not json"),
            Err(RecordError::Json(_))
        ));
        assert!(matches!(
            RectangularBoundary::from_json(r#"{"corners":{"ne":[1,2]}}"#),
            Err(RecordError::Json(_))
        ));

        let mut record = sample().to_record();
        record.kind = "circular".to_string();
        let text = serde_json::to_string(&record).unwrap();
        assert!(matches!(
            RectangularBoundary::from_json(&text),
            Err(RecordError::UnsupportedType(_))
        ));

        let mut record = sample().to_record();
        record.version = "2.0".to_string();
        let text = serde_json::to_string(&record).unwrap();
        assert!(matches!(
            RectangularBoundary::from_json(&text),
            Err(RecordError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn rejects_invalid_geometry_in_record() {
        let text = r#"{"type":"rectangular","version":"1.0",
            "corners":{"ne":[40.7128,-74.0058],"nw":[40.7128,-74.0062],
                       "se":[40.7130,-74.0058],"sw":[40.7130,-74.0062]}}"#;
        assert!(matches!(
            RectangularBoundary::from_json(text),
            Err(RecordError::Boundary(BoundaryError::NotNorthOfSouthwest))
        ));
    }

    #[test]
    fn serde_goes_through_the_record() {
        let boundary = sample();
        let value = serde_json::to_value(boundary).unwrap();
        assert_eq!(value["type"], "rectangular");
        let back: RectangularBoundary = serde_json::from_value(value).unwrap();
        assert_eq!(back, boundary);
    }

    proptest! {
        #[test]
        fn round_trip_preserves_geometry(
            lat in -60.0f64..60.0,
            lon in -170.0f64..170.0,
            width in 5.0f64..300.0,
            height in 5.0f64..300.0,
        ) {
            let boundary = RectangularBoundary::from_center_and_dimensions(
                Coordinate::new(lat, lon), width, height,
            ).unwrap();
            let json = boundary.to_json().unwrap();
            let back = RectangularBoundary::from_json(&json).unwrap();
            prop_assert_eq!(back, boundary);
            let area_slack = 1e-9 * boundary.area().max(1.0);
            prop_assert!((back.area() - boundary.area()).abs() <= area_slack);
            let perimeter_slack = 1e-9 * boundary.perimeter().max(1.0);
            prop_assert!((back.perimeter() - boundary.perimeter()).abs() <= perimeter_slack);
        }
    }
}
