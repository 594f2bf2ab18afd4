pub mod domain;
pub mod error;
pub mod grading;
pub mod ids;
pub mod time;

pub use domain::{DeviceMetadata, LocationSample};
pub use error::{ErrorCode, FenceError, FenceResult};
pub use grading::{PrecisionLevel, Reliability, RiskLevel};
pub use ids::{BoundaryOwnerId, SessionId, SessionKey, SubjectId};
pub use time::{
    age_ms, datetime_from_millis, now_epoch_millis, older_than, parse_timestamp, EpochMillis,
};
