use std::sync::Arc;

use spacey_core::model::{Lesson, LessonSlug};
use storage::repository::{LessonRepository, LessonSummary};

use crate::error::LessonServiceError;

/// Read access to lesson documents.
#[derive(Clone)]
pub struct LessonService {
    lessons: Arc<dyn LessonRepository>,
}

impl LessonService {
    #[must_use]
    pub fn new(lessons: Arc<dyn LessonRepository>) -> Self {
        Self { lessons }
    }

    /// Fetch a lesson by slug.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::NotFound` for an unknown slug — terminal
    /// and user-visible, no retry.
    pub async fn get(&self, slug: &LessonSlug) -> Result<Lesson, LessonServiceError> {
        self.lessons
            .get_lesson(slug)
            .await?
            .ok_or_else(|| LessonServiceError::NotFound(slug.clone()))
    }

    /// Lesson summaries for the browse view.
    ///
    /// # Errors
    ///
    /// Returns `Storage` for backend failures.
    pub async fn browse(&self, limit: u32) -> Result<Vec<LessonSummary>, LessonServiceError> {
        Ok(self.lessons.list_lessons(limit).await?)
    }
}
