use chrono::{DateTime, Utc};

use crate::model::{
    Difficulty, ProgressStats, QuestionId, QuestionProgress, QuestionSetId, StudyPlanId,
};

/// Context of a review session: which question set is studied and what the
/// learner has rated so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyPlan {
    id: StudyPlanId,
    question_set_id: QuestionSetId,
    question_set_name: String,
    progress: Vec<QuestionProgress>,
}

impl StudyPlan {
    #[must_use]
    pub fn new(
        id: StudyPlanId,
        question_set_id: QuestionSetId,
        question_set_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            question_set_id,
            question_set_name: question_set_name.into(),
            progress: Vec::new(),
        }
    }

    /// Attach persisted progress records, keeping the last record per question.
    #[must_use]
    pub fn with_progress(mut self, records: impl IntoIterator<Item = QuestionProgress>) -> Self {
        for record in records {
            self.upsert_progress(record);
        }
        self
    }

    #[must_use]
    pub fn id(&self) -> StudyPlanId {
        self.id
    }

    #[must_use]
    pub fn question_set_id(&self) -> QuestionSetId {
        self.question_set_id
    }

    #[must_use]
    pub fn question_set_name(&self) -> &str {
        &self.question_set_name
    }

    #[must_use]
    pub fn progress(&self) -> &[QuestionProgress] {
        &self.progress
    }

    #[must_use]
    pub fn progress_for(&self, question_id: QuestionId) -> Option<&QuestionProgress> {
        self.progress.iter().find(|p| p.question_id == question_id)
    }

    /// Replace the record for the same question, or insert it if absent.
    pub fn upsert_progress(&mut self, record: QuestionProgress) {
        match self
            .progress
            .iter_mut()
            .find(|p| p.question_id == record.question_id)
        {
            Some(existing) => *existing = record,
            None => self.progress.push(record),
        }
    }

    /// Apply a rating to the matching record and return the updated copy.
    pub fn record_rating(
        &mut self,
        question_id: QuestionId,
        difficulty: Difficulty,
        reviewed_at: DateTime<Utc>,
    ) -> QuestionProgress {
        let updated = match self.progress_for(question_id) {
            Some(existing) => existing.rated(difficulty, reviewed_at),
            None => QuestionProgress::first_rating(question_id, difficulty, reviewed_at),
        };
        self.upsert_progress(updated.clone());
        updated
    }

    #[must_use]
    pub fn stats(&self) -> ProgressStats {
        ProgressStats::from_progress(&self.progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn plan() -> StudyPlan {
        StudyPlan::new(StudyPlanId::new(1), QuestionSetId::new(7), "Biology")
    }

    #[test]
    fn record_rating_keeps_one_record_per_question() {
        let mut plan = plan();
        let q = QuestionId::new(3);

        plan.record_rating(q, Difficulty::Hard, fixed_now());
        let second = plan.record_rating(q, Difficulty::Easy, fixed_now());

        assert_eq!(plan.progress().len(), 1);
        assert_eq!(second.review_count, 2);
        assert_eq!(plan.progress_for(q).unwrap().difficulty, Some(Difficulty::Easy));
    }

    #[test]
    fn with_progress_collapses_duplicates() {
        let now = fixed_now();
        let plan = plan().with_progress([
            QuestionProgress::first_rating(QuestionId::new(1), Difficulty::Hard, now),
            QuestionProgress::first_rating(QuestionId::new(1), Difficulty::Medium, now),
            QuestionProgress::first_rating(QuestionId::new(2), Difficulty::Easy, now),
        ]);

        assert_eq!(plan.progress().len(), 2);
        assert_eq!(plan.stats().medium, 1);
        assert_eq!(plan.stats().hard, 0);
        assert_eq!(plan.question_set_name(), "Biology");
    }
}
