use sqlx::Row;

use spacey_core::model::{ChoiceOption, LessonSlug, QuestionBank, QuestionKind};

use super::SqliteRepository;
use super::mapping::{conn, question_from_row, ser};
use crate::repository::{QuizRepository, StorageError};

fn question_kind_str(kind: QuestionKind) -> &'static str {
    match kind {
        QuestionKind::MultipleChoice => "mcq",
        QuestionKind::Open => "normal",
    }
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn upsert_bank(&self, bank: &QuestionBank) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO quiz_banks (slug, title)
            VALUES (?1, ?2)
            ON CONFLICT(slug) DO UPDATE SET title = excluded.title
            ",
        )
        .bind(bank.slug().as_str())
        .bind(bank.title())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM quiz_questions WHERE bank_slug = ?1")
            .bind(bank.slug().as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, question) in bank.questions().iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO quiz_questions (bank_slug, position, question_id, kind, text, explanation)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(bank.slug().as_str())
            .bind(i64::try_from(position).map_err(ser)?)
            .bind(question.id().as_str())
            .bind(question_kind_str(question.kind()))
            .bind(question.text())
            .bind(question.explanation())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            for (opt_position, option) in question.options().iter().enumerate() {
                sqlx::query(
                    r"
                    INSERT INTO quiz_options (bank_slug, question_id, position, option_id, text, is_correct)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ",
                )
                .bind(bank.slug().as_str())
                .bind(question.id().as_str())
                .bind(i64::try_from(opt_position).map_err(ser)?)
                .bind(&option.id)
                .bind(&option.text)
                .bind(i64::from(option.is_correct))
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }
        }

        tx.commit().await.map_err(conn)
    }

    async fn get_bank(&self, slug: &LessonSlug) -> Result<Option<QuestionBank>, StorageError> {
        let bank_row = sqlx::query("SELECT slug, title FROM quiz_banks WHERE slug = ?1")
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(bank_row) = bank_row else {
            return Ok(None);
        };

        let question_rows = sqlx::query(
            r"
            SELECT question_id, kind, text, explanation
            FROM quiz_questions
            WHERE bank_slug = ?1
            ORDER BY position
            ",
        )
        .bind(slug.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut questions = Vec::with_capacity(question_rows.len());
        for row in &question_rows {
            let question_id: String = row.try_get("question_id").map_err(ser)?;
            let option_rows = sqlx::query(
                r"
                SELECT option_id, text, is_correct
                FROM quiz_options
                WHERE bank_slug = ?1 AND question_id = ?2
                ORDER BY position
                ",
            )
            .bind(slug.as_str())
            .bind(&question_id)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

            let options = option_rows
                .iter()
                .map(|opt| {
                    let is_correct: i64 = opt.try_get("is_correct").map_err(ser)?;
                    Ok(ChoiceOption {
                        id: opt.try_get("option_id").map_err(ser)?,
                        text: opt.try_get("text").map_err(ser)?,
                        is_correct: is_correct != 0,
                    })
                })
                .collect::<Result<Vec<_>, StorageError>>()?;

            questions.push(question_from_row(row, options)?);
        }

        let title: Option<String> = bank_row.try_get("title").map_err(ser)?;
        QuestionBank::new(slug.clone(), title, questions)
            .map(Some)
            .map_err(ser)
    }
}
