use sqlx::Row;
use study_core::model::{Question, QuestionSetId, StudyPlan, StudyPlanId};

use super::{
    SqliteRepository,
    mapping::{id_to_i64, map_progress_row, map_question_row, options_to_json, set_id_from_i64},
};
use crate::repository::{QuestionBankRepository, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl SqliteRepository {
    pub(crate) async fn load_plan(
        &self,
        id: StudyPlanId,
    ) -> Result<Option<StudyPlan>, StorageError> {
        let plan_id = id_to_i64("plan_id", id.value())?;

        let row = sqlx::query(
            r"
                SELECT p.set_id, s.name
                FROM study_plans p
                JOIN question_sets s ON s.id = p.set_id
                WHERE p.id = ?1
            ",
        )
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let set_id = set_id_from_i64(row.try_get::<i64, _>("set_id").map_err(ser)?)?;
        let name: String = row.try_get("name").map_err(ser)?;

        let progress_rows = sqlx::query(
            r"
                SELECT question_id, difficulty, last_reviewed, review_count
                FROM question_progress
                WHERE plan_id = ?1
                ORDER BY question_id ASC
            ",
        )
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut progress = Vec::with_capacity(progress_rows.len());
        for row in &progress_rows {
            progress.push(map_progress_row(row)?);
        }

        Ok(Some(StudyPlan::new(id, set_id, name).with_progress(progress)))
    }
}

#[async_trait::async_trait]
impl QuestionBankRepository for SqliteRepository {
    async fn upsert_plan(&self, plan: &StudyPlan) -> Result<(), StorageError> {
        let plan_id = id_to_i64("plan_id", plan.id().value())?;
        let set_id = id_to_i64("set_id", plan.question_set_id().value())?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
                INSERT INTO question_sets (id, name) VALUES (?1, ?2)
                ON CONFLICT(id) DO UPDATE SET name = excluded.name
            ",
        )
        .bind(set_id)
        .bind(plan.question_set_name())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query(
            r"
                INSERT INTO study_plans (id, set_id) VALUES (?1, ?2)
                ON CONFLICT(id) DO UPDATE SET set_id = excluded.set_id
            ",
        )
        .bind(plan_id)
        .bind(set_id)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        for record in plan.progress() {
            let review_count = i64::from(record.review_count);
            sqlx::query(
                r"
                    INSERT INTO question_progress (
                        plan_id, question_id, difficulty, last_reviewed, review_count
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(plan_id, question_id) DO UPDATE SET
                        difficulty = excluded.difficulty,
                        last_reviewed = excluded.last_reviewed,
                        review_count = excluded.review_count
                ",
            )
            .bind(plan_id)
            .bind(id_to_i64("question_id", record.question_id.value())?)
            .bind(record.difficulty.map(|d| d.as_str()))
            .bind(record.last_reviewed)
            .bind(review_count)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn upsert_question(
        &self,
        set_id: QuestionSetId,
        question: &Question,
    ) -> Result<(), StorageError> {
        let set = id_to_i64("set_id", set_id.value())?;
        let question_id = id_to_i64("question_id", question.id().value())?;
        let correct_index = i64::try_from(question.correct_index())
            .map_err(|_| StorageError::Serialization("correct_index overflow".into()))?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let exists = sqlx::query("SELECT 1 FROM question_sets WHERE id = ?1")
            .bind(set)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        // A question id belongs to one set for its whole life.
        let owner = sqlx::query("SELECT set_id FROM questions WHERE id = ?1")
            .bind(question_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;
        if let Some(row) = owner {
            let owner: i64 = row.try_get("set_id").map_err(ser)?;
            if owner != set {
                log::warn!(
                    "question {} already belongs to set {owner}, refusing to move it to set {set}",
                    question.id()
                );
                return Err(StorageError::Conflict);
            }
        }

        sqlx::query(
            r"
                INSERT INTO questions (id, set_id, prompt, options, correct_index, citation)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    prompt = excluded.prompt,
                    options = excluded.options,
                    correct_index = excluded.correct_index,
                    citation = excluded.citation
            ",
        )
        .bind(question_id)
        .bind(set)
        .bind(question.prompt())
        .bind(options_to_json(question.options())?)
        .bind(correct_index)
        .bind(question.citation())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_plan(&self, id: StudyPlanId) -> Result<Option<StudyPlan>, StorageError> {
        self.load_plan(id).await
    }

    async fn questions_for_set(
        &self,
        set_id: QuestionSetId,
    ) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, prompt, options, correct_index, citation
                FROM questions
                WHERE set_id = ?1
                ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("set_id", set_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(map_question_row(row)?);
        }
        Ok(out)
    }
}
