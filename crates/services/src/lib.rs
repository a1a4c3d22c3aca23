#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;

pub use study_core::Clock;
pub use sessions as session;

pub use error::SessionError;

pub use sessions::{
    ProgressTracker, RatingResult, RatingTicket, ReviewSession, SessionLoopService, SessionPhase,
    SessionProgress,
};
