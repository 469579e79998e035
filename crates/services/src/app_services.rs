use std::sync::Arc;

use storage::media::MediaStore;
use storage::repository::Storage;

use crate::Clock;
use crate::ai::{AnswerProvider, GeminiClient, QuizGrader};
use crate::auth::SessionContext;
use crate::avatar::{AvatarInteraction, SpeechRecognizer};
use crate::dashboard_service::DashboardService;
use crate::error::AppServicesError;
use crate::feedback_service::FeedbackService;
use crate::lesson_loop::LessonLoopService;
use crate::lesson_service::LessonService;
use crate::player::{AudioSink, SpeechSynth};
use crate::quiz_service::QuizService;

/// Assembles the app-facing services over one storage backend.
///
/// The session context lives here (application root); everything downstream
/// receives an explicit watch handle rather than reading globals.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    storage: Storage,
    session: Arc<SessionContext>,
    ai: Arc<GeminiClient>,
    lessons: Arc<LessonService>,
    quiz: Arc<QuizService>,
    dashboard: Arc<DashboardService>,
    feedback: Arc<FeedbackService>,
    avatar: Arc<AvatarInteraction>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::assemble(storage, clock, recognizer))
    }

    /// Build services over in-memory storage (tests, prototyping).
    #[must_use]
    pub fn new_in_memory(clock: Clock, recognizer: Option<Arc<dyn SpeechRecognizer>>) -> Self {
        Self::assemble(Storage::in_memory(), clock, recognizer)
    }

    fn assemble(
        storage: Storage,
        clock: Clock,
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
    ) -> Self {
        let ai = Arc::new(GeminiClient::from_env());
        let grader: Arc<dyn QuizGrader> = ai.clone();
        let answers: Arc<dyn AnswerProvider> = ai.clone();

        let lessons = Arc::new(LessonService::new(Arc::clone(&storage.lessons)));
        let quiz = Arc::new(QuizService::new(
            clock,
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.badges),
            grader,
        ));
        let dashboard = Arc::new(DashboardService::new(
            Arc::clone(&storage.progress),
            Arc::clone(&storage.badges),
        ));
        let feedback = Arc::new(FeedbackService::new(clock, Arc::clone(&storage.feedback)));
        let avatar = Arc::new(AvatarInteraction::new(answers, recognizer));

        Self {
            clock,
            storage,
            session: Arc::new(SessionContext::new()),
            ai,
            lessons,
            quiz,
            dashboard,
            feedback,
            avatar,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn session(&self) -> Arc<SessionContext> {
        Arc::clone(&self.session)
    }

    #[must_use]
    pub fn lessons(&self) -> Arc<LessonService> {
        Arc::clone(&self.lessons)
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizService> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard)
    }

    #[must_use]
    pub fn feedback(&self) -> Arc<FeedbackService> {
        Arc::clone(&self.feedback)
    }

    #[must_use]
    pub fn avatar(&self) -> Arc<AvatarInteraction> {
        Arc::clone(&self.avatar)
    }

    #[must_use]
    pub fn answer_provider(&self) -> Arc<dyn AnswerProvider> {
        self.ai.clone()
    }

    #[must_use]
    pub fn quiz_grader(&self) -> Arc<dyn QuizGrader> {
        self.ai.clone()
    }

    /// Build a lesson playback loop over this storage and the given
    /// platform backends (media store, audio sink, optional synthesis).
    #[must_use]
    pub fn lesson_loop(
        &self,
        media: Arc<dyn MediaStore>,
        sink: Arc<dyn AudioSink>,
        synth: Option<Arc<dyn SpeechSynth>>,
    ) -> LessonLoopService {
        LessonLoopService::new(
            self.clock,
            Arc::clone(&self.storage.lessons),
            Arc::clone(&self.storage.progress),
            media,
            sink,
            synth,
        )
    }
}
