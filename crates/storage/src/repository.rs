use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use spacey_core::model::{
    EarnedBadge, FeedbackEntry, Lesson, LessonProgress, LessonSlug, QuestionBank, UserId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Lightweight lesson listing row for the browse view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonSummary {
    pub slug: LessonSlug,
    pub title: String,
    pub description: Option<String>,
    pub total_sections: usize,
}

/// Repository contract for lesson documents. Lessons are authored elsewhere
/// and read-only to the player, so the write side exists for seeding and the
/// authoring pipeline.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Persist or replace a lesson document (sections included, in order).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Fetch a lesson by slug.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; a missing slug is `Ok(None)`.
    async fn get_lesson(&self, slug: &LessonSlug) -> Result<Option<Lesson>, StorageError>;

    /// List lessons for the browse view, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_lessons(&self, limit: u32) -> Result<Vec<LessonSummary>, StorageError>;
}

/// Repository contract for quiz question banks, keyed by lesson slug.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Persist or replace a question bank.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bank cannot be stored.
    async fn upsert_bank(&self, bank: &QuestionBank) -> Result<(), StorageError>;

    /// Fetch the question bank for a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; a missing slug is `Ok(None)`.
    async fn get_bank(&self, slug: &LessonSlug) -> Result<Option<QuestionBank>, StorageError>;
}

/// Repository contract for per-user lesson progress.
///
/// Writes are upsert-merge on the `{user}_{slug}` document id: fields not in
/// the snapshot are left untouched, re-writing updates rather than duplicates.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Upsert-merge a progress snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn upsert_progress(&self, progress: &LessonProgress) -> Result<(), StorageError>;

    /// Fetch one user's progress for one lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; no record yet is `Ok(None)`.
    async fn get_progress(
        &self,
        user_id: &UserId,
        slug: &LessonSlug,
    ) -> Result<Option<LessonProgress>, StorageError>;

    /// All progress records for a user, most recently accessed first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_progress_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LessonProgress>, StorageError>;
}

/// Repository contract for earned badges.
///
/// Upsert-merge on the composed `{user}_{slug}_{badge}` id makes re-earning
/// idempotent: one record per user+lesson+badge, latest win overwrites.
#[async_trait]
pub trait BadgeRepository: Send + Sync {
    /// Upsert-merge a badge record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the badge cannot be stored.
    async fn upsert_badge(&self, badge: &EarnedBadge) -> Result<(), StorageError>;

    /// All badges for a user, most recently earned first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_badges_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<EarnedBadge>, StorageError>;
}

/// Repository contract for user feedback. Append-only.
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Append a feedback entry, returning its storage id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn append_feedback(&self, entry: &FeedbackEntry) -> Result<i64, StorageError>;
}

/// Simple in-memory implementation backing service tests and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    lessons: Arc<Mutex<HashMap<LessonSlug, Lesson>>>,
    banks: Arc<Mutex<HashMap<LessonSlug, QuestionBank>>>,
    progress: Arc<Mutex<HashMap<String, LessonProgress>>>,
    badges: Arc<Mutex<HashMap<String, EarnedBadge>>>,
    feedback: Arc<Mutex<Vec<FeedbackEntry>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock<T>(guard: &Arc<Mutex<T>>) -> Result<std::sync::MutexGuard<'_, T>, StorageError> {
        guard
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.lessons)?;
        guard.insert(lesson.slug().clone(), lesson.clone());
        Ok(())
    }

    async fn get_lesson(&self, slug: &LessonSlug) -> Result<Option<Lesson>, StorageError> {
        let guard = Self::lock(&self.lessons)?;
        Ok(guard.get(slug).cloned())
    }

    async fn list_lessons(&self, limit: u32) -> Result<Vec<LessonSummary>, StorageError> {
        let guard = Self::lock(&self.lessons)?;
        let mut summaries: Vec<LessonSummary> = guard
            .values()
            .map(|lesson| LessonSummary {
                slug: lesson.slug().clone(),
                title: lesson.title().to_string(),
                description: lesson.description().map(ToString::to_string),
                total_sections: lesson.total_sections(),
            })
            .collect();
        summaries.sort_by(|a, b| a.slug.cmp(&b.slug));
        summaries.truncate(limit as usize);
        Ok(summaries)
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn upsert_bank(&self, bank: &QuestionBank) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.banks)?;
        guard.insert(bank.slug().clone(), bank.clone());
        Ok(())
    }

    async fn get_bank(&self, slug: &LessonSlug) -> Result<Option<QuestionBank>, StorageError> {
        let guard = Self::lock(&self.banks)?;
        Ok(guard.get(slug).cloned())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn upsert_progress(&self, progress: &LessonProgress) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.progress)?;
        guard.insert(progress.doc_id(), progress.clone());
        Ok(())
    }

    async fn get_progress(
        &self,
        user_id: &UserId,
        slug: &LessonSlug,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let guard = Self::lock(&self.progress)?;
        Ok(guard.get(&format!("{user_id}_{slug}")).cloned())
    }

    async fn list_progress_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let guard = Self::lock(&self.progress)?;
        let mut records: Vec<LessonProgress> = guard
            .values()
            .filter(|p| p.user_id() == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.last_accessed().cmp(&a.last_accessed()));
        Ok(records)
    }
}

#[async_trait]
impl BadgeRepository for InMemoryRepository {
    async fn upsert_badge(&self, badge: &EarnedBadge) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.badges)?;
        guard.insert(badge.doc_id(), badge.clone());
        Ok(())
    }

    async fn list_badges_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<EarnedBadge>, StorageError> {
        let guard = Self::lock(&self.badges)?;
        let mut records: Vec<EarnedBadge> = guard
            .values()
            .filter(|b| &b.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.earned_at.cmp(&a.earned_at));
        Ok(records)
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryRepository {
    async fn append_feedback(&self, entry: &FeedbackEntry) -> Result<i64, StorageError> {
        let mut guard = Self::lock(&self.feedback)?;
        guard.push(entry.clone());
        i64::try_from(guard.len()).map_err(|_| StorageError::Serialization("id overflow".into()))
    }
}

/// Aggregates the collection repositories behind trait objects so backends
/// can be swapped wholesale.
#[derive(Clone)]
pub struct Storage {
    pub lessons: Arc<dyn LessonRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub badges: Arc<dyn BadgeRepository>,
    pub feedback: Arc<dyn FeedbackRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            lessons: Arc::new(repo.clone()),
            quizzes: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            badges: Arc::new(repo.clone()),
            feedback: Arc::new(repo),
        }
    }
}
