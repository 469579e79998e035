#![forbid(unsafe_code)]

pub mod ai;
pub mod app_services;
pub mod auth;
pub mod avatar;
pub mod dashboard_service;
pub mod error;
pub mod feedback_service;
pub mod lesson_loop;
pub mod lesson_service;
pub mod orchestrator;
pub mod player;
pub mod progress;
pub mod quiz_service;

pub use spacey_core::Clock;

pub use ai::{AnswerProvider, GeminiClient, GeminiConfig, QuizGrader};
pub use app_services::AppServices;
pub use auth::{SessionContext, SessionWatch};
pub use avatar::{AvatarInteraction, AvatarOutcome, SpeechRecognizer};
pub use dashboard_service::{DashboardOverview, DashboardService};
pub use error::{
    AiClientError, AppServicesError, FeedbackServiceError, GradingError, LessonServiceError,
    QuizServiceError,
};
pub use feedback_service::FeedbackService;
pub use lesson_loop::{LessonLoopService, LessonRun};
pub use lesson_service::LessonService;
pub use orchestrator::LessonOrchestrator;
pub use player::{PlaybackState, SectionCompleted, SectionPlayer};
pub use progress::ProgressWriter;
pub use quiz_service::{QuizService, QuizSubmission};
