//! Adaptive review scheduling.
//!
//! A session keeps every question of the plan in one of four buckets
//! (`new`, `hard`, `medium`, `easy`). `QueueBuilder` fills them from the supply
//! service, `SchedulerState::produce_next` draws what to present next, and
//! `SchedulerState::apply_rating` puts a rated question back where its rating says.

mod buckets;
mod queue;
mod state;
mod stream;

pub use buckets::{Bucket, Buckets};
pub use queue::{Classification, QueueBuilder, QueueError, ReviewQuestions, SupplyEntry, classify};
pub use state::{AppliedRating, SchedulerState};
pub use stream::{StreamGenerator, StreamOutput, produce_next};
