use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidInput,
    InvalidBoundary,
    Locked,
    NotFound,
    Internal,
}

#[derive(Debug, Clone)]
pub struct FenceError {
    pub code: ErrorCode,
    pub message: String,
}

impl FenceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn invalid_boundary(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidBoundary, message)
    }

    pub fn locked(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Locked, message)
    }
}

impl fmt::Display for FenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for FenceError {}

impl From<fence_geo::BoundaryError> for FenceError {
    fn from(value: fence_geo::BoundaryError) -> Self {
        Self::invalid_boundary(value.to_string())
    }
}

impl From<fence_geo::RecordError> for FenceError {
    fn from(value: fence_geo::RecordError) -> Self {
        Self::invalid_boundary(value.to_string())
    }
}

impl From<fence_geo::CoordinateError> for FenceError {
    fn from(value: fence_geo::CoordinateError) -> Self {
        Self::invalid_input(value.to_string())
    }
}

pub type FenceResult<T> = Result<T, FenceError>;
