use std::collections::HashMap;

use async_trait::async_trait;

use spacey_core::model::{Question, QuestionId, QuizResult};

use crate::error::{AiClientError, GradingError};

mod client;

pub use client::{GeminiClient, GeminiConfig};

/// Collaborator answering learner questions with lesson context.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// Answer `query` in the context of the current lesson.
    ///
    /// # Errors
    ///
    /// Returns `AiClientError` when the provider is unconfigured, the
    /// request fails, or the response is empty.
    async fn answer(&self, query: &str, lesson_context: &str) -> Result<String, AiClientError>;
}

/// Collaborator grading a quiz submission. The client never grades locally.
#[async_trait]
pub trait QuizGrader: Send + Sync {
    /// Grade the submission, returning a 0–100 score and feedback.
    ///
    /// # Errors
    ///
    /// Returns `GradingError` for request failures or a verdict that is not
    /// strict JSON with an in-range score.
    async fn grade(
        &self,
        lesson_slug: &str,
        questions: &[Question],
        answers: &HashMap<QuestionId, String>,
    ) -> Result<QuizResult, GradingError>;
}
