use async_trait::async_trait;
use study_core::Clock;
use study_core::model::{
    Difficulty, Question, QuestionId, QuestionProgress, QuestionSetId, StudyPlan, StudyPlanId,
};
use study_core::scheduler::{ReviewQuestions, SupplyEntry};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result of persisting one rating: the updated plan and the record that changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRating {
    pub plan: StudyPlan,
    pub progress: QuestionProgress,
}

/// Supplies the questions of a plan, grouped by last-known difficulty.
#[async_trait]
pub trait QuestionSupply: Send + Sync {
    /// Fetch every question of the plan's set along with the plan itself.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the plan is missing, or other storage errors.
    async fn fetch_review_questions(
        &self,
        plan_id: StudyPlanId,
    ) -> Result<ReviewQuestions, StorageError>;
}

/// Durably records ratings.
#[async_trait]
pub trait ProgressPersistence: Send + Sync {
    /// Overwrite (or create) the progress record for a question and return the new plan state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the plan is missing or the question is not part of
    /// its set, or other storage errors.
    async fn record_rating(
        &self,
        plan_id: StudyPlanId,
        question_id: QuestionId,
        rating: Difficulty,
    ) -> Result<RecordedRating, StorageError>;
}

/// Question sets and plans, used to seed a store.
#[async_trait]
pub trait QuestionBankRepository: Send + Sync {
    /// Persist or update a plan together with its question set name and progress.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the plan cannot be stored.
    async fn upsert_plan(&self, plan: &StudyPlan) -> Result<(), StorageError>;

    /// Persist or update a question within a set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the set does not exist and
    /// `StorageError::Conflict` if the question id already belongs to another set.
    async fn upsert_question(
        &self,
        set_id: QuestionSetId,
        question: &Question,
    ) -> Result<(), StorageError>;

    /// Fetch a plan with all of its progress records.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn get_plan(&self, id: StudyPlanId) -> Result<Option<StudyPlan>, StorageError>;

    /// Questions of a set in their stored order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn questions_for_set(&self, set_id: QuestionSetId)
    -> Result<Vec<Question>, StorageError>;
}

/// Group a set's questions the way the supply service reports them.
///
/// Unrated questions go to `new`; rated ones go to the array named by their stored
/// difficulty. A reviewed record without a difficulty is reported under `medium`
/// with no label, leaving the final decision to the queue builder.
#[must_use]
pub fn partition_questions(plan: StudyPlan, questions: Vec<Question>) -> ReviewQuestions {
    let mut out = ReviewQuestions::empty(plan);
    for question in questions {
        let progress = out.plan.progress_for(question.id()).cloned();
        match progress {
            Some(QuestionProgress {
                last_reviewed: Some(at),
                difficulty,
                ..
            }) => {
                let entry = SupplyEntry::reviewed(question, at, difficulty);
                match difficulty {
                    Some(Difficulty::Hard) => out.hard.push(entry),
                    Some(Difficulty::Easy) => out.easy.push(entry),
                    Some(Difficulty::Medium) | None => out.medium.push(entry),
                }
            }
            _ => out.new.push(SupplyEntry::unreviewed(question)),
        }
    }
    out
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    clock: Clock,
    plans: Arc<Mutex<HashMap<StudyPlanId, StudyPlan>>>,
    questions: Arc<Mutex<HashMap<QuestionSetId, Vec<Question>>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the clock used to stamp recorded ratings.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl QuestionBankRepository for InMemoryRepository {
    async fn upsert_plan(&self, plan: &StudyPlan) -> Result<(), StorageError> {
        let mut guard = self
            .plans
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(plan.id(), plan.clone());
        drop(guard);

        let mut questions = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        questions.entry(plan.question_set_id()).or_default();
        Ok(())
    }

    async fn upsert_question(
        &self,
        set_id: QuestionSetId,
        question: &Question,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if !guard.contains_key(&set_id) {
            return Err(StorageError::NotFound);
        }
        let owned_elsewhere = guard.iter().any(|(id, questions)| {
            *id != set_id && questions.iter().any(|q| q.id() == question.id())
        });
        if owned_elsewhere {
            return Err(StorageError::Conflict);
        }
        let set = guard.get_mut(&set_id).ok_or(StorageError::NotFound)?;
        match set.iter_mut().find(|q| q.id() == question.id()) {
            Some(existing) => *existing = question.clone(),
            None => set.push(question.clone()),
        }
        Ok(())
    }

    async fn get_plan(&self, id: StudyPlanId) -> Result<Option<StudyPlan>, StorageError> {
        let guard = self
            .plans
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn questions_for_set(
        &self,
        set_id: QuestionSetId,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&set_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl QuestionSupply for InMemoryRepository {
    async fn fetch_review_questions(
        &self,
        plan_id: StudyPlanId,
    ) -> Result<ReviewQuestions, StorageError> {
        let plan = self.get_plan(plan_id).await?.ok_or(StorageError::NotFound)?;
        let questions = self.questions_for_set(plan.question_set_id()).await?;
        Ok(partition_questions(plan, questions))
    }
}

#[async_trait]
impl ProgressPersistence for InMemoryRepository {
    async fn record_rating(
        &self,
        plan_id: StudyPlanId,
        question_id: QuestionId,
        rating: Difficulty,
    ) -> Result<RecordedRating, StorageError> {
        let mut plans = self
            .plans
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let plan = plans.get_mut(&plan_id).ok_or(StorageError::NotFound)?;

        let in_set = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .get(&plan.question_set_id())
            .is_some_and(|set| set.iter().any(|q| q.id() == question_id));
        if !in_set {
            return Err(StorageError::NotFound);
        }

        let progress = plan.record_rating(question_id, rating, self.clock.now());
        Ok(RecordedRating {
            plan: plan.clone(),
            progress,
        })
    }
}

/// Aggregates the collaborator contracts behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub supply: Arc<dyn QuestionSupply>,
    pub progress: Arc<dyn ProgressPersistence>,
    pub bank: Arc<dyn QuestionBankRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(InMemoryRepository::new())
    }

    #[must_use]
    pub fn from_in_memory(repo: InMemoryRepository) -> Self {
        let supply: Arc<dyn QuestionSupply> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressPersistence> = Arc::new(repo.clone());
        let bank: Arc<dyn QuestionBankRepository> = Arc::new(repo);
        Self {
            supply,
            progress,
            bank,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::time::fixed_now;

    fn question(id: u64) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Q{id}"),
            vec!["yes".into(), "no".into()],
            0,
            None,
        )
        .unwrap()
    }

    async fn seeded(repo: &InMemoryRepository, count: u64) -> StudyPlan {
        let plan = StudyPlan::new(StudyPlanId::new(1), QuestionSetId::new(10), "Chemistry");
        repo.upsert_plan(&plan).await.unwrap();
        for id in 1..=count {
            repo.upsert_question(plan.question_set_id(), &question(id))
                .await
                .unwrap();
        }
        plan
    }

    #[tokio::test]
    async fn fetch_puts_unrated_questions_in_new() {
        let repo = InMemoryRepository::new();
        seeded(&repo, 3).await;

        let supplied = repo.fetch_review_questions(StudyPlanId::new(1)).await.unwrap();

        assert_eq!(supplied.new.len(), 3);
        assert!(supplied.new.iter().all(|e| e.last_reviewed.is_none()));
        assert_eq!(supplied.plan.question_set_name(), "Chemistry");
    }

    #[tokio::test]
    async fn record_rating_overwrites_and_regroups() {
        let repo = InMemoryRepository::new().with_clock(Clock::fixed(fixed_now()));
        seeded(&repo, 2).await;

        repo.record_rating(StudyPlanId::new(1), QuestionId::new(1), Difficulty::Hard)
            .await
            .unwrap();
        let recorded = repo
            .record_rating(StudyPlanId::new(1), QuestionId::new(1), Difficulty::Easy)
            .await
            .unwrap();

        assert_eq!(recorded.progress.review_count, 2);
        assert_eq!(recorded.progress.last_reviewed, Some(fixed_now()));
        assert_eq!(recorded.plan.progress().len(), 1);

        let supplied = repo.fetch_review_questions(StudyPlanId::new(1)).await.unwrap();
        assert_eq!(supplied.easy.len(), 1);
        assert_eq!(supplied.easy[0].difficulty_level.as_deref(), Some("easy"));
        assert_eq!(supplied.new.len(), 1);
        assert!(supplied.hard.is_empty());
    }

    #[tokio::test]
    async fn record_rating_rejects_foreign_question() {
        let repo = InMemoryRepository::new();
        seeded(&repo, 1).await;

        let err = repo
            .record_rating(StudyPlanId::new(1), QuestionId::new(42), Difficulty::Hard)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));

        let err = repo
            .fetch_review_questions(StudyPlanId::new(9))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn question_id_stays_with_its_first_set() {
        let repo = InMemoryRepository::new();
        seeded(&repo, 2).await;
        let other = StudyPlan::new(StudyPlanId::new(2), QuestionSetId::new(20), "Biology");
        repo.upsert_plan(&other).await.unwrap();

        let err = repo
            .upsert_question(other.question_set_id(), &question(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        repo.upsert_question(QuestionSetId::new(10), &question(1))
            .await
            .unwrap();
        let chemistry = repo.questions_for_set(QuestionSetId::new(10)).await.unwrap();
        let biology = repo.questions_for_set(QuestionSetId::new(20)).await.unwrap();
        assert_eq!(chemistry.len(), 2);
        assert!(biology.is_empty());
    }

    #[test]
    fn reviewed_without_difficulty_is_reported_as_unlabelled_medium() {
        let plan = StudyPlan::new(StudyPlanId::new(1), QuestionSetId::new(1), "Set").with_progress(
            [QuestionProgress::from_persisted(
                QuestionId::new(1),
                None,
                Some(fixed_now()),
                1,
            )],
        );

        let supplied = partition_questions(plan, vec![question(1), question(2)]);

        assert_eq!(supplied.medium.len(), 1);
        assert_eq!(supplied.medium[0].difficulty_level, None);
        assert_eq!(supplied.new.len(), 1);
    }
}
