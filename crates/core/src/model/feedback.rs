use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FeedbackError {
    #[error("feedback message cannot be empty")]
    EmptyMessage,

    #[error("rating {0} is outside 1..=5")]
    RatingOutOfRange(u8),
}

/// One user-submitted feedback entry. Append-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackEntry {
    user_id: Option<UserId>,
    message: String,
    rating: u8,
    created_at: DateTime<Utc>,
}

impl FeedbackEntry {
    /// Build a validated entry. Anonymous feedback is allowed.
    ///
    /// # Errors
    ///
    /// Returns `FeedbackError` for a blank message or a rating outside 1–5.
    pub fn new(
        user_id: Option<UserId>,
        message: impl Into<String>,
        rating: u8,
        created_at: DateTime<Utc>,
    ) -> Result<Self, FeedbackError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(FeedbackError::EmptyMessage);
        }
        if !(1..=5).contains(&rating) {
            return Err(FeedbackError::RatingOutOfRange(rating));
        }
        Ok(Self {
            user_id,
            message,
            rating,
            created_at,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn rating(&self) -> u8 {
        self.rating
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
