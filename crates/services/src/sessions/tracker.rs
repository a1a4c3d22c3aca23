use std::sync::Arc;

use study_core::model::{Difficulty, QuestionProgress};
use storage::repository::{ProgressPersistence, RecordedRating, StorageError};

use super::machine::{RatingTicket, ReviewSession};
use crate::Clock;
use crate::error::SessionError;

/// Outcome of a rating that was applied and persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingResult {
    pub ticket: RatingTicket,
    pub persisted: QuestionProgress,
    pub is_finished: bool,
}

/// Applies ratings to a session and forwards them to the persistence service.
///
/// Local state is updated first and stays updated whatever the persistence outcome.
#[derive(Clone)]
pub struct ProgressTracker {
    clock: Clock,
    persistence: Arc<dyn ProgressPersistence>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(clock: Clock, persistence: Arc<dyn ProgressPersistence>) -> Self {
        Self { clock, persistence }
    }

    /// Apply `rating` to the revealed question and advance the session.
    ///
    /// # Errors
    ///
    /// Returns the session's state errors (`RatingInFlight`, `NotRevealed`, `Finished`).
    pub fn apply_rating(
        &self,
        session: &mut ReviewSession,
        rating: Difficulty,
    ) -> Result<RatingTicket, SessionError> {
        session.submit_rating(rating, self.clock.now())
    }

    /// Send an applied rating to the persistence service.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` from the persistence service.
    pub async fn forward(&self, ticket: &RatingTicket) -> Result<RecordedRating, StorageError> {
        self.persistence
            .record_rating(ticket.plan_id, ticket.question_id, ticket.difficulty)
            .await
    }

    /// Release the session's in-flight slot and report the persistence outcome.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PersistenceFailure` if persistence failed. The session keeps
    /// its local state and remembers the message.
    pub fn settle(
        &self,
        session: &mut ReviewSession,
        ticket: RatingTicket,
        outcome: Result<RecordedRating, StorageError>,
    ) -> Result<RatingResult, SessionError> {
        match outcome {
            Ok(recorded) => {
                session.resolve_rating(&ticket, None);
                log::debug!(
                    "persisted rating for {} (review count {})",
                    ticket.question_id,
                    recorded.progress.review_count
                );
                Ok(RatingResult {
                    ticket,
                    persisted: recorded.progress,
                    is_finished: session.is_finished(),
                })
            }
            Err(err) => {
                log::warn!("failed to persist rating for {}: {err}", ticket.question_id);
                session.resolve_rating(&ticket, Some(err.to_string()));
                Err(SessionError::PersistenceFailure(err))
            }
        }
    }
}
