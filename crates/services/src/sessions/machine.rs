use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use study_core::model::{
    Difficulty, Question, QuestionId, ReviewSettings, SessionRating, SessionSummary, StudyPlanId,
};
use study_core::scheduler::{Bucket, QueueBuilder, ReviewQuestions, SchedulerState};
use storage::repository::StorageError;

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── PHASES ────────────────────────────────────────────────────────────────────
//

/// Where a review session is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the question supply (start or reload).
    Loading,
    /// A question is shown; the learner may pick an option.
    Presenting,
    /// The answer is shown; the learner may rate it.
    Revealed,
    /// No more questions, or the learner ended the session.
    Finished,
    /// Loading failed or yielded nothing. Only a reload leaves this phase.
    Unavailable,
}

/// Handle for a rating that was applied locally and still has to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingTicket {
    pub sequence: u64,
    pub plan_id: StudyPlanId,
    pub question_id: QuestionId,
    pub difficulty: Difficulty,
    pub was_new: bool,
    pub answered_correctly: bool,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    sequence: u64,
    question_id: QuestionId,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One learner-facing review loop over a study plan.
///
/// Selection and reveal are local. A rating is applied to the scheduler immediately and
/// the session advances before persistence resolves; while that call is outstanding
/// (see `resolve_rating`) further ratings are rejected.
pub struct ReviewSession {
    plan_id: StudyPlanId,
    settings: ReviewSettings,
    phase: SessionPhase,
    scheduler: Option<SchedulerState>,
    current: Option<Question>,
    upcoming: VecDeque<Question>,
    selection: Option<usize>,
    answered_correctly: Option<bool>,
    ratings: Vec<SessionRating>,
    in_flight: Option<InFlight>,
    next_sequence: u64,
    last_error: Option<String>,
    started_at: DateTime<Utc>,
    summary: Option<SessionSummary>,
}

impl ReviewSession {
    /// Create a session in `Loading`; feed it with `load`.
    #[must_use]
    pub fn new(plan_id: StudyPlanId, settings: ReviewSettings, started_at: DateTime<Utc>) -> Self {
        Self {
            plan_id,
            settings,
            phase: SessionPhase::Loading,
            scheduler: None,
            current: None,
            upcoming: VecDeque::new(),
            selection: None,
            answered_correctly: None,
            ratings: Vec::new(),
            in_flight: None,
            next_sequence: 0,
            last_error: None,
            started_at,
            summary: None,
        }
    }

    #[must_use]
    pub fn plan_id(&self) -> StudyPlanId {
        self.plan_id
    }

    #[must_use]
    pub fn settings(&self) -> &ReviewSettings {
        &self.settings
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn scheduler(&self) -> Option<&SchedulerState> {
        self.scheduler.as_ref()
    }

    /// The question being presented or revealed.
    #[must_use]
    pub fn current(&self) -> Option<&Question> {
        match self.phase {
            SessionPhase::Presenting | SessionPhase::Revealed => self.current.as_ref(),
            _ => None,
        }
    }

    /// Questions already drawn by the generator and waiting their turn.
    pub fn upcoming(&self) -> impl Iterator<Item = &Question> + '_ {
        self.upcoming.iter()
    }

    #[must_use]
    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    /// Correctness of the current selection, known once revealed.
    #[must_use]
    pub fn answered_correctly(&self) -> Option<bool> {
        self.answered_correctly
    }

    #[must_use]
    pub fn ratings(&self) -> &[SessionRating] {
        &self.ratings
    }

    #[must_use]
    pub fn is_rating_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Last load or persistence error, for display.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == SessionPhase::Finished
    }

    /// Every question the session currently holds: buckets, then the current
    /// question, then the upcoming stream.
    #[must_use]
    pub fn question_ids(&self) -> Vec<QuestionId> {
        let mut ids: Vec<QuestionId> = self
            .scheduler
            .iter()
            .flat_map(|s| s.buckets().ids())
            .collect();
        ids.extend(self.current.as_ref().map(Question::id));
        ids.extend(self.upcoming.iter().map(Question::id));
        ids
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let len_of = |bucket: Bucket| {
            self.scheduler
                .as_ref()
                .map_or(0, |s| s.buckets().len_of(bucket))
        };
        SessionProgress {
            phase: self.phase,
            new: len_of(Bucket::New),
            hard: len_of(Bucket::Hard),
            medium: len_of(Bucket::Medium),
            easy: len_of(Bucket::Easy),
            upcoming: self.upcoming.len(),
            new_streak: self.scheduler.as_ref().map_or(0, SchedulerState::new_streak),
            new_questions_answered: self
                .scheduler
                .as_ref()
                .map_or(0, SchedulerState::new_questions_answered),
            ratings_given: self.ratings.len(),
            rating_in_flight: self.in_flight.is_some(),
        }
    }

    //
    // ─── LOADING ───────────────────────────────────────────────────────────────
    //

    /// Re-enter `Loading`, discarding local scheduling state.
    ///
    /// An outstanding rating is abandoned: its ticket no longer matches anything.
    pub fn begin_reload(&mut self, started_at: DateTime<Utc>) {
        let sequence = self.next_sequence;
        *self = Self::new(self.plan_id, self.settings, started_at);
        self.next_sequence = sequence;
    }

    /// Build the queue from the supply response and present the first question.
    ///
    /// On failure the session moves to `Unavailable` and keeps the error for display.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotLoading` outside `Loading`.
    /// Returns `SessionError::SupplyUnavailable` if the supply call failed.
    /// Returns `SessionError::NoQuestions` if the plan holds no questions.
    pub fn load(
        &mut self,
        supplied: Result<ReviewQuestions, StorageError>,
    ) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Loading {
            return Err(SessionError::NotLoading);
        }

        let supplied = match supplied {
            Ok(supplied) => supplied,
            Err(err) => return Err(self.unavailable(SessionError::SupplyUnavailable(err))),
        };

        let mut scheduler = match QueueBuilder::from_supply(supplied) {
            Ok(state) => state.with_settings(&self.settings),
            Err(_) => return Err(self.unavailable(SessionError::NoQuestions)),
        };

        let mut drawn = scheduler.produce_next().questions.into_iter();
        let Some(first) = drawn.next() else {
            return Err(self.unavailable(SessionError::NoQuestions));
        };

        self.current = Some(first);
        self.upcoming.extend(drawn);
        self.scheduler = Some(scheduler);
        self.phase = SessionPhase::Presenting;
        log::info!(
            "session started for plan {} with {} questions",
            self.plan_id,
            self.question_ids().len()
        );
        Ok(())
    }

    fn unavailable(&mut self, err: SessionError) -> SessionError {
        log::warn!("session for plan {} unavailable: {err}", self.plan_id);
        self.phase = SessionPhase::Unavailable;
        self.last_error = Some(err.to_string());
        err
    }

    //
    // ─── ANSWERING ─────────────────────────────────────────────────────────────
    //

    /// Pick an option of the current question. Buckets are untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotPresenting` unless a question is being presented.
    /// Returns `SessionError::OptionOutOfRange` for an invalid index.
    pub fn select(&mut self, index: usize) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Presenting {
            return Err(SessionError::NotPresenting);
        }
        let question = self.current.as_ref().ok_or(SessionError::NotPresenting)?;
        let len = question.options().len();
        if index >= len {
            return Err(SessionError::OptionOutOfRange { index, len });
        }
        self.selection = Some(index);
        Ok(())
    }

    /// Show the answer and return whether the selection was correct.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotPresenting` unless a question is being presented.
    /// Returns `SessionError::NoSelection` if nothing was selected.
    pub fn reveal(&mut self) -> Result<bool, SessionError> {
        if self.phase != SessionPhase::Presenting {
            return Err(SessionError::NotPresenting);
        }
        let question = self.current.as_ref().ok_or(SessionError::NotPresenting)?;
        let selection = self.selection.ok_or(SessionError::NoSelection)?;
        let correct = question.is_correct(selection);
        self.answered_correctly = Some(correct);
        self.phase = SessionPhase::Revealed;
        Ok(correct)
    }

    /// Apply a rating to the revealed question and advance to the next one.
    ///
    /// Local state changes immediately and is never rolled back. The returned ticket
    /// must be handed to `resolve_rating` once persistence finishes.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RatingInFlight` while an earlier rating is unresolved.
    /// Returns `SessionError::Finished` after the session ended.
    /// Returns `SessionError::NotRevealed` unless the answer is shown.
    pub fn submit_rating(
        &mut self,
        difficulty: Difficulty,
        rated_at: DateTime<Utc>,
    ) -> Result<RatingTicket, SessionError> {
        if let Some(pending) = self.in_flight {
            return Err(SessionError::RatingInFlight {
                question_id: pending.question_id,
            });
        }
        match self.phase {
            SessionPhase::Revealed => {}
            SessionPhase::Finished => return Err(SessionError::Finished),
            _ => return Err(SessionError::NotRevealed),
        }
        let (Some(scheduler), Some(question)) = (self.scheduler.as_mut(), self.current.take())
        else {
            return Err(SessionError::NotRevealed);
        };

        let answered_correctly = self.answered_correctly.unwrap_or(false);
        let applied = scheduler.apply_rating(&question, difficulty, rated_at);
        log::debug!(
            "rated {} as {} (new: {}, streak now {})",
            applied.question_id,
            difficulty,
            applied.was_new,
            scheduler.new_streak()
        );

        self.ratings.push(SessionRating {
            question_id: applied.question_id,
            difficulty,
            answered_correctly,
            was_new: applied.was_new,
            rated_at,
        });

        let ticket = RatingTicket {
            sequence: self.next_sequence,
            plan_id: self.plan_id,
            question_id: applied.question_id,
            difficulty,
            was_new: applied.was_new,
            answered_correctly,
        };
        self.next_sequence += 1;
        self.in_flight = Some(InFlight {
            sequence: ticket.sequence,
            question_id: ticket.question_id,
        });

        self.advance(rated_at);
        Ok(ticket)
    }

    /// Clear the in-flight slot for `ticket`. A failure is kept for display only.
    ///
    /// Returns `false` for a ticket that no longer matches (e.g. after a reload).
    pub fn resolve_rating(&mut self, ticket: &RatingTicket, error: Option<String>) -> bool {
        match self.in_flight {
            Some(pending) if pending.sequence == ticket.sequence => {
                self.in_flight = None;
                if error.is_some() {
                    self.last_error = error;
                }
                true
            }
            _ => false,
        }
    }

    /// End the session now and build its summary. Repeated calls return the same summary.
    ///
    /// A `completed_at` earlier than the start (a clock stepping back) is treated as the start.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotPresenting` if the session never loaded.
    /// Propagates summary construction errors; the session is left unchanged in that case.
    pub fn finish(&mut self, completed_at: DateTime<Utc>) -> Result<SessionSummary, SessionError> {
        match self.phase {
            SessionPhase::Finished => self.summary.clone().ok_or(SessionError::Finished),
            SessionPhase::Presenting | SessionPhase::Revealed => {
                let summary = self.build_summary(completed_at)?;
                self.complete(Some(summary.clone()));
                Ok(summary)
            }
            SessionPhase::Loading | SessionPhase::Unavailable => Err(SessionError::NotPresenting),
        }
    }

    /// Move past a rated question. Never fails: the rating is already applied and its
    /// ticket must reach the caller.
    fn advance(&mut self, now: DateTime<Utc>) {
        self.selection = None;
        self.answered_correctly = None;

        let limit_reached = self
            .settings
            .session_limit()
            .is_some_and(|limit| self.ratings.len() >= usize::try_from(limit).unwrap_or(usize::MAX));
        if limit_reached {
            return self.complete_at(now);
        }

        if let Some(next) = self.upcoming.pop_front() {
            self.current = Some(next);
            self.phase = SessionPhase::Presenting;
            return;
        }

        let next = match self.scheduler.as_mut() {
            Some(scheduler) if !scheduler.is_exhausted() => {
                let mut drawn = scheduler.produce_next().questions.into_iter();
                drawn.next().map(|first| (first, drawn))
            }
            _ => None,
        };
        match next {
            Some((first, rest)) => {
                self.current = Some(first);
                self.upcoming.extend(rest);
                self.phase = SessionPhase::Presenting;
            }
            None => self.complete_at(now),
        }
    }

    fn build_summary(&self, completed_at: DateTime<Utc>) -> Result<SessionSummary, SessionError> {
        let plan_stats = self
            .scheduler
            .as_ref()
            .map(|s| s.plan().stats())
            .unwrap_or_default();
        Ok(SessionSummary::from_ratings(
            self.plan_id,
            self.started_at,
            completed_at.max(self.started_at),
            &self.ratings,
            plan_stats,
        )?)
    }

    fn complete_at(&mut self, completed_at: DateTime<Utc>) {
        match self.build_summary(completed_at) {
            Ok(summary) => self.complete(Some(summary)),
            Err(err) => {
                log::warn!("session for plan {} finished without a summary: {err}", self.plan_id);
                self.last_error = Some(err.to_string());
                self.complete(None);
            }
        }
    }

    fn complete(&mut self, summary: Option<SessionSummary>) {
        self.phase = SessionPhase::Finished;
        self.selection = None;
        self.answered_correctly = None;
        log::info!(
            "session for plan {} finished after {} ratings",
            self.plan_id,
            self.ratings.len()
        );
        self.summary = summary;
    }
}

impl fmt::Debug for ReviewSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewSession")
            .field("plan_id", &self.plan_id)
            .field("phase", &self.phase)
            .field("current", &self.current.as_ref().map(Question::id))
            .field("upcoming_len", &self.upcoming.len())
            .field("ratings_len", &self.ratings.len())
            .field("in_flight", &self.in_flight.map(|p| p.question_id))
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
