//! Shared error types for the services crate.

use thiserror::Error;

use spacey_core::model::{FeedbackError, LessonSlug, ProgressError, QuizError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the generative-language client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AiClientError {
    #[error("generative AI is not configured")]
    Disabled,
    #[error("generative AI returned an empty response")]
    EmptyResponse,
    #[error("generative AI request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by the quiz grading path.
///
/// These block the results flow: without a verdict there is no score to show,
/// so the submission surface reports them instead of advancing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GradingError {
    #[error(transparent)]
    Client(#[from] AiClientError),
    #[error("grader did not return valid JSON")]
    MalformedResponse { raw: String },
    #[error("grader returned score {0} outside 0..=100")]
    InvalidScore(i64),
}

/// Errors emitted by `LessonService` and the lesson loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonServiceError {
    #[error("lesson \"{0}\" not found")]
    NotFound(LessonSlug),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("quiz for lesson \"{0}\" not found")]
    NotFound(LessonSlug),
    #[error("no questions available for lesson \"{0}\"")]
    EmptyBank(LessonSlug),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Grading(#[from] GradingError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `FeedbackService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FeedbackServiceError {
    #[error(transparent)]
    Feedback(#[from] FeedbackError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
