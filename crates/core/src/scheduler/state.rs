use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::{Difficulty, Question, QuestionId, QuestionProgress, ReviewSettings, StudyPlan};
use crate::scheduler::{Bucket, Buckets, StreamGenerator, StreamOutput};

/// What `apply_rating` did to local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRating {
    pub question_id: QuestionId,
    pub difficulty: Difficulty,
    /// Bucket the question was removed from, `None` if it was already drawn for presentation.
    pub removed_from: Option<Bucket>,
    pub was_new: bool,
    pub progress: QuestionProgress,
}

/// All scheduling state of one review session.
///
/// Buckets and counters are mutated only through `produce_next` (draws) and
/// `apply_rating` (placement); everything else reads them.
#[derive(Debug, Clone)]
pub struct SchedulerState {
    plan: StudyPlan,
    buckets: Buckets,
    generator: StreamGenerator,
    new_streak: u32,
    new_questions_answered: u32,
    pending_hard: Vec<Question>,
    last_reviewed: HashMap<QuestionId, DateTime<Utc>>,
}

impl SchedulerState {
    /// Start from freshly built buckets. `pending_hard` is a snapshot of the hard bucket.
    #[must_use]
    pub fn new(
        plan: StudyPlan,
        buckets: Buckets,
        last_reviewed: HashMap<QuestionId, DateTime<Utc>>,
    ) -> Self {
        let pending_hard = buckets.get(Bucket::Hard).iter().cloned().collect();
        Self {
            plan,
            buckets,
            generator: StreamGenerator::default(),
            new_streak: 0,
            new_questions_answered: 0,
            pending_hard,
            last_reviewed,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: &ReviewSettings) -> Self {
        self.generator = StreamGenerator::new(settings);
        self
    }

    #[must_use]
    pub fn plan(&self) -> &StudyPlan {
        &self.plan
    }

    #[must_use]
    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    #[must_use]
    pub fn new_streak(&self) -> u32 {
        self.new_streak
    }

    #[must_use]
    pub fn new_questions_answered(&self) -> u32 {
        self.new_questions_answered
    }

    /// Questions rated Hard, in rating order. Tracked but not consumed by the generator.
    #[must_use]
    pub fn pending_hard(&self) -> &[Question] {
        &self.pending_hard
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.buckets.is_empty()
    }

    /// True if the question has never been reviewed in this plan.
    #[must_use]
    pub fn is_new(&self, question_id: QuestionId) -> bool {
        !self.last_reviewed.contains_key(&question_id)
    }

    /// Draw the next question(s) using the current streak.
    ///
    /// The streak resets to zero only when a milestone fired on this call.
    pub fn produce_next(&mut self) -> StreamOutput {
        let out = self.generator.produce_next(&mut self.buckets, self.new_streak);
        if out.milestone_fired() {
            log::debug!(
                "milestone at streak {} (hard={}, medium={})",
                self.new_streak,
                out.inserted_hard_milestone,
                out.inserted_medium_milestone
            );
            self.new_streak = 0;
        }
        out
    }

    /// Place a rated question and update counters and the plan's progress.
    ///
    /// The question ends up in exactly the bucket named by `difficulty`, however
    /// many times it was rated before.
    pub fn apply_rating(
        &mut self,
        question: &Question,
        difficulty: Difficulty,
        reviewed_at: DateTime<Utc>,
    ) -> AppliedRating {
        let id = question.id();
        let removed_from = self.buckets.remove(id).map(|(bucket, _)| bucket);

        self.buckets.push_back(Bucket::from(difficulty), question.clone());
        if difficulty == Difficulty::Hard {
            self.pending_hard.push(question.clone());
        }

        let was_new = self.last_reviewed.insert(id, reviewed_at).is_none();
        if was_new {
            self.new_questions_answered = self.new_questions_answered.saturating_add(1);
            self.new_streak = self.new_streak.saturating_add(1);
        }

        let progress = self.plan.record_rating(id, difficulty, reviewed_at);

        AppliedRating {
            question_id: id,
            difficulty,
            removed_from,
            was_new,
            progress,
        }
    }
}
