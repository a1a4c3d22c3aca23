use sqlx::Row;
use study_core::model::{
    Difficulty, Question, QuestionId, QuestionProgress, QuestionSetId,
};

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn set_id_from_i64(v: i64) -> Result<QuestionSetId, StorageError> {
    Ok(QuestionSetId::new(i64_to_u64("set_id", v)?))
}

/// Options are stored as a JSON array of strings.
pub(crate) fn options_to_json(options: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let options_json: String = row.try_get("options").map_err(ser)?;
    let options: Vec<String> = serde_json::from_str(&options_json).map_err(ser)?;

    let correct_i64: i64 = row.try_get("correct_index").map_err(ser)?;
    let correct_index = usize::try_from(correct_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid correct_index: {correct_i64}"))
    })?;

    Question::new(
        question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("prompt").map_err(ser)?,
        options,
        correct_index,
        row.try_get::<Option<String>, _>("citation").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<QuestionProgress, StorageError> {
    let difficulty = row
        .try_get::<Option<String>, _>("difficulty")
        .map_err(ser)?
        .map(|label| label.parse::<Difficulty>().map_err(ser))
        .transpose()?;

    let review_count_i64: i64 = row.try_get("review_count").map_err(ser)?;
    let review_count: u32 = u32::try_from(review_count_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid review_count: {review_count_i64}"))
    })?;

    Ok(QuestionProgress::from_persisted(
        question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        difficulty,
        row.try_get("last_reviewed").map_err(ser)?,
        review_count,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_ids_are_rejected() {
        assert!(matches!(
            question_id_from_i64(-1),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn options_encode_as_json_array() {
        let json = options_to_json(&["a".to_string(), "b \"c\"".to_string()]).unwrap();
        assert_eq!(json, r#"["a","b \"c\""]"#);
    }
}
