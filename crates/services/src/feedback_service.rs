use std::sync::Arc;

use spacey_core::Clock;
use spacey_core::model::{FeedbackEntry, UserProfile};
use storage::repository::FeedbackRepository;

use crate::error::FeedbackServiceError;

/// Accepts user feedback: validated, then appended. Anonymous is fine.
#[derive(Clone)]
pub struct FeedbackService {
    clock: Clock,
    feedback: Arc<dyn FeedbackRepository>,
}

impl FeedbackService {
    #[must_use]
    pub fn new(clock: Clock, feedback: Arc<dyn FeedbackRepository>) -> Self {
        Self { clock, feedback }
    }

    /// Validate and store one feedback entry, returning its storage id.
    ///
    /// # Errors
    ///
    /// Returns `Feedback` for a blank message or out-of-range rating and
    /// `Storage` for persistence failures.
    pub async fn submit(
        &self,
        user: Option<&UserProfile>,
        message: &str,
        rating: u8,
    ) -> Result<i64, FeedbackServiceError> {
        let entry = FeedbackEntry::new(
            user.map(|u| u.id.clone()),
            message,
            rating,
            self.clock.now(),
        )?;
        Ok(self.feedback.append_feedback(&entry).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacey_core::model::FeedbackError;
    use spacey_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn rejects_invalid_input_and_stores_valid() {
        let service = FeedbackService::new(fixed_clock(), Arc::new(InMemoryRepository::new()));

        let err = service.submit(None, "  ", 4).await.unwrap_err();
        assert!(matches!(
            err,
            FeedbackServiceError::Feedback(FeedbackError::EmptyMessage)
        ));

        let id = service.submit(None, "Loved the satellite lesson!", 5).await.unwrap();
        assert_eq!(id, 1);
    }
}
