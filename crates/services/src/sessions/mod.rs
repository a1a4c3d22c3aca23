mod machine;
mod progress;
mod tracker;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use machine::{RatingTicket, ReviewSession, SessionPhase};
pub use progress::SessionProgress;
pub use tracker::{ProgressTracker, RatingResult};
pub use workflow::SessionLoopService;
