use thiserror::Error;

use crate::model::{
    FeedbackError, LessonError, MediaPathError, ParseIdError, ProgressError, QuizError,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    MediaPath(#[from] MediaPathError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Feedback(#[from] FeedbackError),
}
