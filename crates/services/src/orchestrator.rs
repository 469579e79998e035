use chrono::{DateTime, Utc};

use spacey_core::model::{Lesson, LessonProgress, ProgressError, Section, UserId};

/// Owns the active section index for one lesson.
///
/// The index ranges over `[0, total]`; reaching `total` is the completion
/// sentinel, not an out-of-bounds position. Exactly one section is active at
/// a time (`current_section` is `None` only once the lesson is finished).
#[derive(Debug, Clone)]
pub struct LessonOrchestrator {
    lesson: Lesson,
    index: usize,
}

impl LessonOrchestrator {
    #[must_use]
    pub fn new(lesson: Lesson) -> Self {
        Self { lesson, index: 0 }
    }

    /// Resume a lesson from a previously persisted index, clamped into range.
    #[must_use]
    pub fn with_start_index(lesson: Lesson, index: usize) -> Self {
        let index = index.min(lesson.total_sections());
        Self { lesson, index }
    }

    #[must_use]
    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn total_sections(&self) -> usize {
        self.lesson.total_sections()
    }

    #[must_use]
    pub fn current_section(&self) -> Option<&Section> {
        self.lesson.section_at(self.index)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.index == self.lesson.total_sections()
    }

    /// Step forward. Stepping onto the sentinel marks the lesson finished;
    /// further calls are no-ops.
    pub fn advance(&mut self) -> bool {
        if self.index < self.lesson.total_sections() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Step back, flooring at the first section.
    pub fn retreat(&mut self) -> bool {
        if self.index > 0 {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        spacey_core::model::percentage(self.index, self.lesson.total_sections())
    }

    /// Progress snapshot for persistence at the current position.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` only for degenerate lessons; a validated
    /// lesson always yields a snapshot.
    pub fn progress_snapshot(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<LessonProgress, ProgressError> {
        LessonProgress::new(
            user_id,
            self.lesson.slug().clone(),
            self.lesson.title(),
            self.index,
            self.lesson.total_sections(),
            now,
        )
    }
}
