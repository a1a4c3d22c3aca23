use chrono::{DateTime, Utc};

use crate::model::{Difficulty, QuestionId};

/// Review state of one question within one study plan.
///
/// There is at most one record per (plan, question); a new rating overwrites the
/// previous one rather than appending history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionProgress {
    pub question_id: QuestionId,
    pub difficulty: Option<Difficulty>,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub review_count: u32,
}

impl QuestionProgress {
    /// Record for a question rated for the first time.
    #[must_use]
    pub fn first_rating(
        question_id: QuestionId,
        difficulty: Difficulty,
        reviewed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            question_id,
            difficulty: Some(difficulty),
            last_reviewed: Some(reviewed_at),
            review_count: 1,
        }
    }

    /// Rehydrate a record from persisted storage.
    #[must_use]
    pub fn from_persisted(
        question_id: QuestionId,
        difficulty: Option<Difficulty>,
        last_reviewed: Option<DateTime<Utc>>,
        review_count: u32,
    ) -> Self {
        Self {
            question_id,
            difficulty,
            last_reviewed,
            review_count,
        }
    }

    /// The record that replaces this one after another rating.
    #[must_use]
    pub fn rated(&self, difficulty: Difficulty, reviewed_at: DateTime<Utc>) -> Self {
        Self {
            question_id: self.question_id,
            difficulty: Some(difficulty),
            last_reviewed: Some(reviewed_at),
            review_count: self.review_count.saturating_add(1),
        }
    }

    #[must_use]
    pub fn is_reviewed(&self) -> bool {
        self.last_reviewed.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn rerating_overwrites_and_counts() {
        let first = QuestionProgress::first_rating(QuestionId::new(1), Difficulty::Hard, fixed_now());
        let later = fixed_now() + chrono::Duration::minutes(3);
        let second = first.rated(Difficulty::Easy, later);

        assert_eq!(second.question_id, QuestionId::new(1));
        assert_eq!(second.difficulty, Some(Difficulty::Easy));
        assert_eq!(second.last_reviewed, Some(later));
        assert_eq!(second.review_count, 2);
    }
}
