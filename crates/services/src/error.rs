//! Shared error types for the services crate.

use thiserror::Error;

use study_core::model::{QuestionId, SessionSummaryError};
use storage::repository::StorageError;

/// Errors emitted by review sessions and the services driving them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("question supply unavailable: {0}")]
    SupplyUnavailable(#[source] StorageError),
    #[error("no questions available for this plan")]
    NoQuestions,
    #[error("rating was applied locally but could not be saved: {0}")]
    PersistenceFailure(#[source] StorageError),
    #[error("session is not loading")]
    NotLoading,
    #[error("no question is being presented")]
    NotPresenting,
    #[error("select an option before revealing the answer")]
    NoSelection,
    #[error("option {index} is out of range for {len} options")]
    OptionOutOfRange { index: usize, len: usize },
    #[error("reveal the answer before rating")]
    NotRevealed,
    #[error("a rating for {question_id} is still being saved")]
    RatingInFlight { question_id: QuestionId },
    #[error("session already finished")]
    Finished,
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
}
