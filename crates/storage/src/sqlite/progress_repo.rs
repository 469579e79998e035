use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use spacey_core::model::{LessonProgress, LessonSlug, UserId};

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{ProgressRepository, StorageError};

fn progress_from_row(row: &SqliteRow) -> Result<LessonProgress, StorageError> {
    let user_id: String = row.try_get("user_id").map_err(ser)?;
    let lesson_slug: String = row.try_get("lesson_slug").map_err(ser)?;
    let lesson_title: String = row.try_get("lesson_title").map_err(ser)?;
    let last_section_index: i64 = row.try_get("last_section_index").map_err(ser)?;
    let total_sections: i64 = row.try_get("total_sections").map_err(ser)?;
    let last_accessed: DateTime<Utc> = row.try_get("last_accessed").map_err(ser)?;

    LessonProgress::new(
        UserId::new(&user_id).map_err(ser)?,
        LessonSlug::new(&lesson_slug).map_err(ser)?,
        lesson_title,
        usize::try_from(last_section_index).map_err(ser)?,
        usize::try_from(total_sections).map_err(ser)?,
        last_accessed,
    )
    .map_err(ser)
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn upsert_progress(&self, progress: &LessonProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lesson_progress
                (doc_id, user_id, lesson_slug, lesson_title, last_section_index, total_sections, percentage, last_accessed)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(doc_id) DO UPDATE SET
                lesson_title = excluded.lesson_title,
                last_section_index = excluded.last_section_index,
                total_sections = excluded.total_sections,
                percentage = excluded.percentage,
                last_accessed = excluded.last_accessed
            ",
        )
        .bind(progress.doc_id())
        .bind(progress.user_id().as_str())
        .bind(progress.lesson_slug().as_str())
        .bind(progress.lesson_title())
        .bind(i64::try_from(progress.last_section_index()).map_err(ser)?)
        .bind(i64::try_from(progress.total_sections()).map_err(ser)?)
        .bind(i64::from(progress.percentage()))
        .bind(progress.last_accessed())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_progress(
        &self,
        user_id: &UserId,
        slug: &LessonSlug,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, lesson_slug, lesson_title, last_section_index, total_sections, last_accessed
            FROM lesson_progress
            WHERE doc_id = ?1
            ",
        )
        .bind(format!("{user_id}_{slug}"))
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(progress_from_row).transpose()
    }

    async fn list_progress_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, lesson_slug, lesson_title, last_section_index, total_sections, last_accessed
            FROM lesson_progress
            WHERE user_id = ?1
            ORDER BY last_accessed DESC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(progress_from_row).collect()
    }
}
