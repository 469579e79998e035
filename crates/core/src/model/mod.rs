mod badge;
mod feedback;
mod ids;
mod lesson;
mod media;
mod progress;
mod quiz;
mod user;

pub use badge::{BadgeTier, EarnedBadge};
pub use feedback::{FeedbackEntry, FeedbackError};
pub use ids::{AttemptId, LessonSlug, ParseIdError, QuestionId, SectionId, UserId};
pub use lesson::{DEFAULT_IMAGE_DURATION, Lesson, LessonError, Section, SectionKind};
pub use media::{MediaPath, MediaPathError};
pub use progress::{LessonProgress, ProgressError, percentage};
pub use quiz::{
    ChoiceOption, Question, QuestionBank, QuestionKind, QuizAttempt, QuizError, QuizResult,
};
pub use user::UserProfile;
