use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use spacey_core::Clock;
use spacey_core::model::LessonSlug;
use storage::media::MediaStore;
use storage::repository::{LessonRepository, ProgressRepository};

use crate::auth::SessionWatch;
use crate::error::LessonServiceError;
use crate::orchestrator::LessonOrchestrator;
use crate::player::{ActivationId, AudioSink, SectionCompleted, SectionPlayer, SpeechSynth};
use crate::progress::{PROGRESS_DEBOUNCE, ProgressWriter};

/// Orchestrates one lesson playback session end to end: fetches the lesson
/// document, drives the section player, advances on completion signals, and
/// debounces progress persistence.
#[derive(Clone)]
pub struct LessonLoopService {
    clock: Clock,
    lessons: Arc<dyn LessonRepository>,
    progress: Arc<dyn ProgressRepository>,
    media: Arc<dyn MediaStore>,
    sink: Arc<dyn AudioSink>,
    synth: Option<Arc<dyn SpeechSynth>>,
    debounce: Duration,
}

impl LessonLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        lessons: Arc<dyn LessonRepository>,
        progress: Arc<dyn ProgressRepository>,
        media: Arc<dyn MediaStore>,
        sink: Arc<dyn AudioSink>,
        synth: Option<Arc<dyn SpeechSynth>>,
    ) -> Self {
        Self {
            clock,
            lessons,
            progress,
            media,
            sink,
            synth,
            debounce: PROGRESS_DEBOUNCE,
        }
    }

    #[must_use]
    pub fn with_progress_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Fetch the lesson and begin playback at its first section.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::NotFound` for an unknown slug (terminal,
    /// surfaced full-page, no retry) and `Storage` for backend failures.
    pub async fn start(
        &self,
        slug: &LessonSlug,
        session: SessionWatch,
    ) -> Result<LessonRun, LessonServiceError> {
        let lesson = self
            .lessons
            .get_lesson(slug)
            .await?
            .ok_or_else(|| LessonServiceError::NotFound(slug.clone()))?;

        let (player, completions) = SectionPlayer::new(
            Arc::clone(&self.media),
            Arc::clone(&self.sink),
            self.synth.clone(),
        );
        let writer = ProgressWriter::new(Arc::clone(&self.progress)).with_delay(self.debounce);

        let mut run = LessonRun {
            clock: self.clock,
            orchestrator: LessonOrchestrator::new(lesson),
            player,
            completions,
            writer,
            session,
            current_activation: None,
        };
        run.begin();
        Ok(run)
    }
}

/// One in-flight lesson playback session.
pub struct LessonRun {
    clock: Clock,
    orchestrator: LessonOrchestrator,
    player: SectionPlayer,
    completions: mpsc::UnboundedReceiver<SectionCompleted>,
    writer: ProgressWriter,
    session: SessionWatch,
    current_activation: Option<ActivationId>,
}

impl std::fmt::Debug for LessonRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LessonRun")
            .field("current_activation", &self.current_activation)
            .finish_non_exhaustive()
    }
}

impl LessonRun {
    fn begin(&mut self) {
        self.activate_current();
        self.schedule_progress();
    }

    #[must_use]
    pub fn orchestrator(&self) -> &LessonOrchestrator {
        &self.orchestrator
    }

    #[must_use]
    pub fn player(&self) -> &SectionPlayer {
        &self.player
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.orchestrator.is_finished()
    }

    /// Play/pause the active section.
    pub fn toggle_playback(&self) {
        self.player.toggle();
    }

    /// Manual forward navigation.
    pub fn next_section(&mut self) {
        if self.orchestrator.advance() {
            self.after_index_change();
        }
    }

    /// Manual backward navigation.
    pub fn previous_section(&mut self) {
        if self.orchestrator.retreat() {
            self.after_index_change();
        }
    }

    /// Apply one completion signal from the player.
    ///
    /// Signals from a superseded activation (the user navigated while the
    /// notice was in flight) are dropped.
    pub fn handle_completion(&mut self, notice: &SectionCompleted) {
        if self.current_activation != Some(notice.activation) {
            return;
        }
        self.next_section();
    }

    /// Drive the lesson until the completion sentinel, then flush progress.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the final progress flush fails.
    pub async fn run_to_end(&mut self) -> Result<(), LessonServiceError> {
        while !self.orchestrator.is_finished() {
            let Some(notice) = self.completions.recv().await else {
                break;
            };
            self.handle_completion(&notice);
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Write any pending progress immediately (shutdown path).
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the write fails.
    pub async fn flush_progress(&self) -> Result<(), LessonServiceError> {
        self.writer.flush().await?;
        Ok(())
    }

    fn after_index_change(&mut self) {
        self.activate_current();
        self.schedule_progress();
    }

    fn activate_current(&mut self) {
        match self.orchestrator.current_section().cloned() {
            Some(section) => {
                self.current_activation = Some(self.player.activate(section));
            }
            None => {
                self.player.deactivate();
                self.current_activation = None;
            }
        }
    }

    fn schedule_progress(&self) {
        // Progress is only persisted for signed-in users.
        let Some(user) = self.session.current() else {
            return;
        };
        match self.orchestrator.progress_snapshot(user.id, self.clock.now()) {
            Ok(snapshot) => self.writer.schedule(snapshot),
            Err(err) => warn!(error = %err, "skipping progress snapshot"),
        }
    }
}
