use study_core::model::{Difficulty, QuestionId, StudyPlanId};
use study_core::scheduler::ReviewQuestions;

use super::{SqliteRepository, mapping::id_to_i64};
use crate::repository::{
    ProgressPersistence, QuestionBankRepository, QuestionSupply, RecordedRating, StorageError,
    partition_questions,
};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl QuestionSupply for SqliteRepository {
    async fn fetch_review_questions(
        &self,
        plan_id: StudyPlanId,
    ) -> Result<ReviewQuestions, StorageError> {
        let plan = self.load_plan(plan_id).await?.ok_or(StorageError::NotFound)?;
        let questions = self.questions_for_set(plan.question_set_id()).await?;
        Ok(partition_questions(plan, questions))
    }
}

#[async_trait::async_trait]
impl ProgressPersistence for SqliteRepository {
    async fn record_rating(
        &self,
        plan_id: StudyPlanId,
        question_id: QuestionId,
        rating: Difficulty,
    ) -> Result<RecordedRating, StorageError> {
        let plan = id_to_i64("plan_id", plan_id.value())?;
        let question = id_to_i64("question_id", question_id.value())?;
        let reviewed_at = self.clock.now();

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let belongs = sqlx::query(
            r"
                SELECT 1
                FROM study_plans p
                JOIN questions q ON q.set_id = p.set_id
                WHERE p.id = ?1 AND q.id = ?2
            ",
        )
        .bind(plan)
        .bind(question)
        .fetch_optional(&mut *tx)
        .await
        .map_err(conn)?;
        if belongs.is_none() {
            return Err(StorageError::NotFound);
        }

        sqlx::query(
            r"
                INSERT INTO question_progress (
                    plan_id, question_id, difficulty, last_reviewed, review_count
                )
                VALUES (?1, ?2, ?3, ?4, 1)
                ON CONFLICT(plan_id, question_id) DO UPDATE SET
                    difficulty = excluded.difficulty,
                    last_reviewed = excluded.last_reviewed,
                    review_count = question_progress.review_count + 1
            ",
        )
        .bind(plan)
        .bind(question)
        .bind(rating.as_str())
        .bind(reviewed_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;

        let plan = self.load_plan(plan_id).await?.ok_or(StorageError::NotFound)?;
        let progress = plan
            .progress_for(question_id)
            .cloned()
            .ok_or(StorageError::Conflict)?;
        log::debug!(
            "recorded {rating} for question {question_id} in plan {plan_id} (count {})",
            progress.review_count
        );

        Ok(RecordedRating { plan, progress })
    }
}
