use sqlx::Row;

use spacey_core::model::{Lesson, LessonSlug};

use super::SqliteRepository;
use super::mapping::{conn, section_from_row, section_to_columns, ser};
use crate::repository::{LessonRepository, LessonSummary, StorageError};

#[async_trait::async_trait]
impl LessonRepository for SqliteRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO lessons (slug, title, description)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(slug) DO UPDATE SET
                title = excluded.title,
                description = excluded.description
            ",
        )
        .bind(lesson.slug().as_str())
        .bind(lesson.title())
        .bind(lesson.description())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        // The section list is part of the document; replace it wholesale so
        // reordering and deletions in the authoring tool take effect.
        sqlx::query("DELETE FROM lesson_sections WHERE lesson_slug = ?1")
            .bind(lesson.slug().as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, section) in lesson.sections().iter().enumerate() {
            let cols = section_to_columns(section);
            sqlx::query(
                r"
                INSERT INTO lesson_sections
                    (lesson_slug, position, section_id, kind, body, audio_path, speak, image_path, caption, duration_ms)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ",
            )
            .bind(lesson.slug().as_str())
            .bind(i64::try_from(position).map_err(ser)?)
            .bind(section.id().as_str())
            .bind(cols.kind)
            .bind(cols.body)
            .bind(cols.audio_path)
            .bind(cols.speak)
            .bind(cols.image_path)
            .bind(cols.caption)
            .bind(cols.duration_ms)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)
    }

    async fn get_lesson(&self, slug: &LessonSlug) -> Result<Option<Lesson>, StorageError> {
        let lesson_row = sqlx::query("SELECT slug, title, description FROM lessons WHERE slug = ?1")
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(lesson_row) = lesson_row else {
            return Ok(None);
        };

        let section_rows = sqlx::query(
            r"
            SELECT section_id, kind, body, audio_path, speak, image_path, caption, duration_ms
            FROM lesson_sections
            WHERE lesson_slug = ?1
            ORDER BY position
            ",
        )
        .bind(slug.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let sections = section_rows
            .iter()
            .map(section_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let title: String = lesson_row.try_get("title").map_err(ser)?;
        let description: Option<String> = lesson_row.try_get("description").map_err(ser)?;

        Lesson::new(slug.clone(), title, description, sections)
            .map(Some)
            .map_err(ser)
    }

    async fn list_lessons(&self, limit: u32) -> Result<Vec<LessonSummary>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT l.slug, l.title, l.description, COUNT(s.section_id) AS section_count
            FROM lessons l
            LEFT JOIN lesson_sections s ON s.lesson_slug = l.slug
            GROUP BY l.slug
            ORDER BY l.slug
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                let slug: String = row.try_get("slug").map_err(ser)?;
                let count: i64 = row.try_get("section_count").map_err(ser)?;
                Ok(LessonSummary {
                    slug: LessonSlug::new(&slug).map_err(ser)?,
                    title: row.try_get("title").map_err(ser)?,
                    description: row.try_get("description").map_err(ser)?,
                    total_sections: usize::try_from(count).unwrap_or(0),
                })
            })
            .collect()
    }
}
