use chrono::{DateTime, Utc};
use sqlx::Row;

use spacey_core::model::{EarnedBadge, LessonSlug, UserId};

use super::SqliteRepository;
use super::mapping::{badge_tier_from_name, conn, ser};
use crate::repository::{BadgeRepository, StorageError};

#[async_trait::async_trait]
impl BadgeRepository for SqliteRepository {
    async fn upsert_badge(&self, badge: &EarnedBadge) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO earned_badges
                (doc_id, user_id, lesson_slug, badge_name, badge_description, earned_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(doc_id) DO UPDATE SET
                badge_description = excluded.badge_description,
                earned_at = excluded.earned_at
            ",
        )
        .bind(badge.doc_id())
        .bind(badge.user_id.as_str())
        .bind(badge.lesson_slug.as_str())
        .bind(badge.tier.name())
        .bind(&badge.description)
        .bind(badge.earned_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn list_badges_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<EarnedBadge>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, lesson_slug, badge_name, badge_description, earned_at
            FROM earned_badges
            WHERE user_id = ?1
            ORDER BY earned_at DESC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                let user_id: String = row.try_get("user_id").map_err(ser)?;
                let lesson_slug: String = row.try_get("lesson_slug").map_err(ser)?;
                let badge_name: String = row.try_get("badge_name").map_err(ser)?;
                let description: String = row.try_get("badge_description").map_err(ser)?;
                let earned_at: DateTime<Utc> = row.try_get("earned_at").map_err(ser)?;
                Ok(EarnedBadge {
                    user_id: UserId::new(&user_id).map_err(ser)?,
                    lesson_slug: LessonSlug::new(&lesson_slug).map_err(ser)?,
                    tier: badge_tier_from_name(&badge_name)?,
                    description,
                    earned_at,
                })
            })
            .collect()
    }
}
