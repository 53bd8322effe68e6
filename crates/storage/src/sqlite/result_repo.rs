use quiz_core::model::ResultSummary;
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{LeaderboardRepository, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<ResultSummary, StorageError> {
    let score = u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
    let created_at = row.try_get("created_at").map_err(ser)?;
    let time_spent: i64 = row.try_get("time_spent_secs").map_err(ser)?;
    let time_spent = u64::try_from(time_spent)
        .map_err(|_| StorageError::Serialization(format!("invalid time_spent_secs: {time_spent}")))?;
    let questions = u32_from_i64(
        "questions_answered",
        row.try_get::<i64, _>("questions_answered").map_err(ser)?,
    )?;

    Ok(ResultSummary::from_persisted(
        score, created_at, time_spent, questions,
    ))
}

#[async_trait::async_trait]
impl LeaderboardRepository for SqliteRepository {
    async fn append_result(&self, result: &ResultSummary) -> Result<i64, StorageError> {
        let time_spent = i64::try_from(result.time_spent_secs())
            .map_err(|_| StorageError::Serialization("time_spent_secs overflow".into()))?;

        let res = sqlx::query(
            r"
                INSERT INTO quiz_results (
                    score, created_at, time_spent_secs, questions_answered
                )
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(i64::from(result.score()))
        .bind(result.created_at())
        .bind(time_spent)
        .bind(i64::from(result.questions_answered()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn list_results(&self) -> Result<Vec<ResultSummary>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT score, created_at, time_spent_secs, questions_answered
                FROM quiz_results
                ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_result_row).collect()
    }

    async fn clear_results(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM quiz_results")
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
