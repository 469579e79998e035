use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema: lessons with ordered sections, quiz banks with
/// questions and options, per-user progress, earned badges, and feedback.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lessons (
                    slug TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lesson_sections (
                    lesson_slug TEXT NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    section_id TEXT NOT NULL,
                    kind TEXT NOT NULL CHECK (kind IN ('audio_text', 'text', 'image')),
                    body TEXT,
                    audio_path TEXT,
                    speak INTEGER NOT NULL DEFAULT 0,
                    image_path TEXT,
                    caption TEXT,
                    duration_ms INTEGER,
                    PRIMARY KEY (lesson_slug, position),
                    UNIQUE (lesson_slug, section_id),
                    FOREIGN KEY (lesson_slug) REFERENCES lessons(slug) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quiz_banks (
                    slug TEXT PRIMARY KEY,
                    title TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quiz_questions (
                    bank_slug TEXT NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    question_id TEXT NOT NULL,
                    kind TEXT NOT NULL CHECK (kind IN ('mcq', 'normal')),
                    text TEXT NOT NULL,
                    explanation TEXT NOT NULL DEFAULT '',
                    PRIMARY KEY (bank_slug, position),
                    UNIQUE (bank_slug, question_id),
                    FOREIGN KEY (bank_slug) REFERENCES quiz_banks(slug) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quiz_options (
                    bank_slug TEXT NOT NULL,
                    question_id TEXT NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    option_id TEXT NOT NULL,
                    text TEXT NOT NULL,
                    is_correct INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (bank_slug, question_id, position),
                    FOREIGN KEY (bank_slug, question_id)
                        REFERENCES quiz_questions(bank_slug, question_id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lesson_progress (
                    doc_id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    lesson_slug TEXT NOT NULL,
                    lesson_title TEXT NOT NULL,
                    last_section_index INTEGER NOT NULL CHECK (last_section_index >= 0),
                    total_sections INTEGER NOT NULL CHECK (total_sections > 0),
                    percentage INTEGER NOT NULL CHECK (percentage BETWEEN 0 AND 100),
                    last_accessed TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_progress_user ON lesson_progress(user_id, last_accessed DESC);",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS earned_badges (
                    doc_id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    lesson_slug TEXT NOT NULL,
                    badge_name TEXT NOT NULL,
                    badge_description TEXT NOT NULL,
                    earned_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_badges_user ON earned_badges(user_id, earned_at DESC);",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS feedback (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT,
                    message TEXT NOT NULL,
                    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (1, ?1)")
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
    }

    Ok(())
}
