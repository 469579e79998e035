use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{LessonSlug, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("lesson has no sections, cannot track progress")]
    ZeroSections,

    #[error("section index {index} is out of range for {total} sections")]
    IndexOutOfRange { index: usize, total: usize },
}

/// Per-user, per-lesson progress snapshot.
///
/// The section index ranges over `[0, total]`; `index == total` is the
/// one-past-the-end sentinel meaning the lesson was finished, not an
/// out-of-bounds access. Created on first access, updated on every advance,
/// never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonProgress {
    user_id: UserId,
    lesson_slug: LessonSlug,
    lesson_title: String,
    last_section_index: usize,
    total_sections: usize,
    percentage: u8,
    last_accessed: DateTime<Utc>,
}

impl LessonProgress {
    /// Build a progress snapshot for the given position.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` for a zero-section lesson or an index past the
    /// completion sentinel.
    pub fn new(
        user_id: UserId,
        lesson_slug: LessonSlug,
        lesson_title: impl Into<String>,
        last_section_index: usize,
        total_sections: usize,
        last_accessed: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        if total_sections == 0 {
            return Err(ProgressError::ZeroSections);
        }
        if last_section_index > total_sections {
            return Err(ProgressError::IndexOutOfRange {
                index: last_section_index,
                total: total_sections,
            });
        }
        Ok(Self {
            user_id,
            lesson_slug,
            lesson_title: lesson_title.into(),
            last_section_index,
            total_sections,
            percentage: percentage(last_section_index, total_sections),
            last_accessed,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn lesson_slug(&self) -> &LessonSlug {
        &self.lesson_slug
    }

    #[must_use]
    pub fn lesson_title(&self) -> &str {
        &self.lesson_title
    }

    #[must_use]
    pub fn last_section_index(&self) -> usize {
        self.last_section_index
    }

    #[must_use]
    pub fn total_sections(&self) -> usize {
        self.total_sections
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    #[must_use]
    pub fn last_accessed(&self) -> DateTime<Utc> {
        self.last_accessed
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.last_section_index == self.total_sections
    }

    /// Stable document id, one record per user+lesson.
    #[must_use]
    pub fn doc_id(&self) -> String {
        format!("{}_{}", self.user_id, self.lesson_slug)
    }
}

/// `min(100, round(100 * index / total))`, clamped into `[0, 100]`.
#[must_use]
pub fn percentage(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let raw = (100.0 * index as f64 / total as f64).round();
    raw.clamp(0.0, 100.0) as u8
}
