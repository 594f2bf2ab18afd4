//! Multi-sample confirmation protocol for locking a trusted reference
//! location, and the keyed store that holds in-flight sessions.

pub mod session;
pub mod store;

pub use session::{
    Confirmation, ConfirmationOutcome, ConfirmationRejection, ConfirmationSession, LockedLocation,
    SessionState, SessionSummary,
};
pub use store::{SessionProgress, SessionStore};
