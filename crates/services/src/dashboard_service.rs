use std::sync::Arc;

use spacey_core::model::{EarnedBadge, LessonProgress, UserId};
use storage::repository::{BadgeRepository, ProgressRepository, StorageError};

/// Everything the dashboard view needs for one user.
#[derive(Debug, Clone)]
pub struct DashboardOverview {
    /// Lesson progress, most recently accessed first.
    pub progress: Vec<LessonProgress>,
    /// Earned badges, most recent first.
    pub badges: Vec<EarnedBadge>,
}

impl DashboardOverview {
    #[must_use]
    pub fn completed_lessons(&self) -> usize {
        self.progress.iter().filter(|p| p.is_finished()).count()
    }

    #[must_use]
    pub fn lessons_in_progress(&self) -> usize {
        self.progress.len() - self.completed_lessons()
    }
}

/// Aggregates progress and badges for the user dashboard.
#[derive(Clone)]
pub struct DashboardService {
    progress: Arc<dyn ProgressRepository>,
    badges: Arc<dyn BadgeRepository>,
}

impl DashboardService {
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressRepository>, badges: Arc<dyn BadgeRepository>) -> Self {
        Self { progress, badges }
    }

    /// Load the dashboard for one user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    pub async fn overview(&self, user_id: &UserId) -> Result<DashboardOverview, StorageError> {
        let progress = self.progress.list_progress_for_user(user_id).await?;
        let badges = self.badges.list_badges_for_user(user_id).await?;
        Ok(DashboardOverview { progress, badges })
    }
}
