use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{Difficulty, ProgressStats, QuestionId, StudyPlanId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many ratings for a single session: {len}")]
    TooManyRatings { len: usize },
}

/// One rating given during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRating {
    pub question_id: QuestionId,
    pub difficulty: Difficulty,
    pub answered_correctly: bool,
    pub was_new: bool,
    pub rated_at: DateTime<Utc>,
}

/// End-of-session totals shown to the learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    plan_id: StudyPlanId,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total_ratings: u32,
    easy: u32,
    medium: u32,
    hard: u32,
    new_questions_answered: u32,
    correct_answers: u32,
    plan_stats: ProgressStats,
}

impl SessionSummary {
    /// Build a summary from the ratings given in a session.
    ///
    /// `plan_stats` is the plan-wide aggregate at completion time.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::InvalidTimeRange` if `completed_at` is before `started_at`.
    /// Returns `SessionSummaryError::TooManyRatings` if the count cannot fit in `u32`.
    pub fn from_ratings(
        plan_id: StudyPlanId,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        ratings: &[SessionRating],
        plan_stats: ProgressStats,
    ) -> Result<Self, SessionSummaryError> {
        if completed_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }
        let total_ratings = u32::try_from(ratings.len())
            .map_err(|_| SessionSummaryError::TooManyRatings { len: ratings.len() })?;

        let mut summary = Self {
            plan_id,
            started_at,
            completed_at,
            total_ratings,
            easy: 0,
            medium: 0,
            hard: 0,
            new_questions_answered: 0,
            correct_answers: 0,
            plan_stats,
        };

        for rating in ratings {
            match rating.difficulty {
                Difficulty::Easy => summary.easy += 1,
                Difficulty::Medium => summary.medium += 1,
                Difficulty::Hard => summary.hard += 1,
            }
            if rating.was_new {
                summary.new_questions_answered += 1;
            }
            if rating.answered_correctly {
                summary.correct_answers += 1;
            }
        }

        Ok(summary)
    }

    #[must_use]
    pub fn plan_id(&self) -> StudyPlanId {
        self.plan_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn total_ratings(&self) -> u32 {
        self.total_ratings
    }

    #[must_use]
    pub fn easy(&self) -> u32 {
        self.easy
    }

    #[must_use]
    pub fn medium(&self) -> u32 {
        self.medium
    }

    #[must_use]
    pub fn hard(&self) -> u32 {
        self.hard
    }

    #[must_use]
    pub fn new_questions_answered(&self) -> u32 {
        self.new_questions_answered
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn plan_stats(&self) -> ProgressStats {
        self.plan_stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn rating(id: u64, difficulty: Difficulty, correct: bool, was_new: bool) -> SessionRating {
        SessionRating {
            question_id: QuestionId::new(id),
            difficulty,
            answered_correctly: correct,
            was_new,
            rated_at: fixed_now(),
        }
    }

    #[test]
    fn summary_counts_ratings() {
        let now = fixed_now();
        let ratings = vec![
            rating(1, Difficulty::Easy, true, true),
            rating(2, Difficulty::Hard, false, true),
            rating(2, Difficulty::Medium, true, false),
            rating(3, Difficulty::Hard, false, false),
        ];
        let stats = ProgressStats {
            reviewed: 3,
            easy: 1,
            medium: 1,
            hard: 1,
        };

        let summary =
            SessionSummary::from_ratings(StudyPlanId::new(4), now, now, &ratings, stats).unwrap();

        assert_eq!(summary.total_ratings(), 4);
        assert_eq!(summary.easy(), 1);
        assert_eq!(summary.medium(), 1);
        assert_eq!(summary.hard(), 2);
        assert_eq!(summary.new_questions_answered(), 2);
        assert_eq!(summary.correct_answers(), 2);
        assert_eq!(summary.plan_stats(), stats);
    }

    #[test]
    fn rejects_inverted_time_range() {
        let now = fixed_now();
        let err = SessionSummary::from_ratings(
            StudyPlanId::new(1),
            now,
            now - chrono::Duration::seconds(1),
            &[],
            ProgressStats::default(),
        )
        .unwrap_err();
        assert_eq!(err, SessionSummaryError::InvalidTimeRange);
    }
}
