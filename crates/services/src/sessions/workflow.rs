use std::sync::Arc;

use study_core::model::{Difficulty, ReviewSettings, SessionSummary, StudyPlanId};
use storage::repository::{ProgressPersistence, QuestionSupply, Storage};

use super::machine::ReviewSession;
use super::tracker::{ProgressTracker, RatingResult};
use crate::Clock;
use crate::error::SessionError;

/// Orchestrates session load, persisted rating and finishing.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    supply: Arc<dyn QuestionSupply>,
    tracker: ProgressTracker,
    settings: ReviewSettings,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        supply: Arc<dyn QuestionSupply>,
        persistence: Arc<dyn ProgressPersistence>,
    ) -> Self {
        Self {
            clock,
            supply,
            tracker: ProgressTracker::new(clock, persistence),
            settings: ReviewSettings::default(),
        }
    }

    /// Wire the service to both collaborators of a `Storage`.
    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(clock, Arc::clone(&storage.supply), Arc::clone(&storage.progress))
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ReviewSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &ReviewSettings {
        &self.settings
    }

    /// A session in `Loading`, not yet fed. Use `reload` to load it.
    #[must_use]
    pub fn new_session(&self, plan_id: StudyPlanId) -> ReviewSession {
        ReviewSession::new(plan_id, self.settings, self.clock.now())
    }

    /// Start a new session for the given plan.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SupplyUnavailable` or `SessionError::NoQuestions` if nothing
    /// can be presented.
    pub async fn start_session(&self, plan_id: StudyPlanId) -> Result<ReviewSession, SessionError> {
        let mut session = self.new_session(plan_id);
        self.reload(&mut session).await?;
        Ok(session)
    }

    /// Rebuild the session from the question supply.
    ///
    /// On failure the session stays `Unavailable` and can be reloaded again.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SupplyUnavailable` or `SessionError::NoQuestions`.
    pub async fn reload(&self, session: &mut ReviewSession) -> Result<(), SessionError> {
        session.begin_reload(self.clock.now());
        let supplied = self.supply.fetch_review_questions(session.plan_id()).await;
        session.load(supplied)
    }

    /// Rate the revealed question, advance, and persist the rating.
    ///
    /// # Errors
    ///
    /// Returns the session's state errors when the rating is not accepted.
    /// Returns `SessionError::PersistenceFailure` if the rating was applied locally but
    /// could not be saved; the session has still advanced.
    pub async fn rate_current(
        &self,
        session: &mut ReviewSession,
        rating: Difficulty,
    ) -> Result<RatingResult, SessionError> {
        let ticket = self.tracker.apply_rating(session, rating)?;
        let outcome = self.tracker.forward(&ticket).await;
        self.tracker.settle(session, ticket, outcome)
    }

    /// End the session and return its summary.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotPresenting` if the session never loaded.
    pub fn finish(&self, session: &mut ReviewSession) -> Result<SessionSummary, SessionError> {
        session.finish(self.clock.now())
    }
}
