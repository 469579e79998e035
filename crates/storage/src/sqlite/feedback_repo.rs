use spacey_core::model::FeedbackEntry;

use super::SqliteRepository;
use super::mapping::conn;
use crate::repository::{FeedbackRepository, StorageError};

#[async_trait::async_trait]
impl FeedbackRepository for SqliteRepository {
    async fn append_feedback(&self, entry: &FeedbackEntry) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO feedback (user_id, message, rating, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(entry.user_id().map(|id| id.as_str().to_string()))
        .bind(entry.message())
        .bind(i64::from(entry.rating()))
        .bind(entry.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }
}
