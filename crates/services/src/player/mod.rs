//! The section player: a pure state machine per activation plus the async
//! driver that owns the shared audio/synthesis backends, timers, and the
//! avatar-speaking signal.

mod backend;
mod state;

pub use backend::{AudioSink, AudioSinkError, SpeechSynth, SpeechSynthError};
pub use state::{
    ERROR_ADVANCE_DELAY, FALLBACK_ADVANCE_DELAY, MIN_TEXT_DISPLAY, PlaybackState, SectionPlayback,
    TEXT_MS_PER_CHAR, ToggleAction, reading_time,
};

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::warn;

use spacey_core::model::{MediaPath, Section, SectionId};
use storage::media::MediaStore;

/// Identity of one section activation.
///
/// Every async callback carries the activation it was registered against and
/// is honored only while that activation is still the live one. This is the
/// core guard against stale loads, timers, and media events mutating state
/// after the user has navigated away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivationId(u64);

impl fmt::Display for ActivationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completion signal delivered to the orchestration layer, at most once per
/// activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionCompleted {
    pub activation: ActivationId,
    pub section_id: SectionId,
}

struct PlayerInner {
    generation: u64,
    playback: Option<SectionPlayback>,
    tasks: Vec<JoinHandle<()>>,
}

enum PendingJob {
    LoadAudio(MediaPath),
    CompleteAfter(Duration),
}

/// Async driver for section playback.
///
/// Cheap to clone; all clones share the same activation state and backends.
#[derive(Clone)]
pub struct SectionPlayer {
    inner: Arc<Mutex<PlayerInner>>,
    media: Arc<dyn MediaStore>,
    sink: Arc<dyn AudioSink>,
    synth: Option<Arc<dyn SpeechSynth>>,
    speaking: Arc<watch::Sender<bool>>,
    completions: mpsc::UnboundedSender<SectionCompleted>,
}

impl SectionPlayer {
    /// Build a player plus the receiver of its completion signals.
    #[must_use]
    pub fn new(
        media: Arc<dyn MediaStore>,
        sink: Arc<dyn AudioSink>,
        synth: Option<Arc<dyn SpeechSynth>>,
    ) -> (Self, mpsc::UnboundedReceiver<SectionCompleted>) {
        let (completions, rx) = mpsc::unbounded_channel();
        let (speaking, _) = watch::channel(false);
        let player = Self {
            inner: Arc::new(Mutex::new(PlayerInner {
                generation: 0,
                playback: None,
                tasks: Vec::new(),
            })),
            media,
            sink,
            synth,
            speaking: Arc::new(speaking),
            completions,
        };
        (player, rx)
    }

    /// Shared "avatar speaking" flag, true while narrated content plays.
    #[must_use]
    pub fn speaking_watch(&self) -> watch::Receiver<bool> {
        self.speaking.subscribe()
    }

    /// Current playback state, `Idle` when no section is active.
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.lock()
            .playback
            .as_ref()
            .map_or(PlaybackState::Idle, SectionPlayback::state)
    }

    /// Last playback error for display, if any.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.lock()
            .playback
            .as_ref()
            .and_then(|pb| pb.error().map(ToString::to_string))
    }

    /// Transcript/content/caption of the active section.
    #[must_use]
    pub fn display_text(&self) -> Option<String> {
        self.lock()
            .playback
            .as_ref()
            .map(|pb| pb.section().display_text().to_string())
    }

    /// Whether the active section accepts a play/pause toggle.
    #[must_use]
    pub fn can_toggle(&self) -> bool {
        self.lock()
            .playback
            .as_ref()
            .is_some_and(|pb| pb.section().is_pausable())
    }

    /// Hand a new section to the player.
    ///
    /// The previous activation is cancelled synchronously: its callbacks are
    /// invalidated, its tasks aborted, and the audio/synthesis backends
    /// silenced before the new section begins loading.
    pub fn activate(&self, section: Section) -> ActivationId {
        let activation = {
            let mut inner = self.lock();
            inner.generation += 1;
            for task in inner.tasks.drain(..) {
                task.abort();
            }
            inner.playback = None;
            ActivationId(inner.generation)
        };
        self.sink.stop();
        if let Some(synth) = &self.synth {
            synth.cancel();
        }
        let _ = self.speaking.send(false);

        let mut playback = SectionPlayback::new(section);
        playback.begin_loading();

        let job = match playback.section().clone() {
            Section::AudioText {
                audio_path: Some(path),
                ..
            } => Some(PendingJob::LoadAudio(path)),
            Section::AudioText {
                audio_path: None,
                text,
                id,
            } => {
                let preview: String = if text.trim().is_empty() {
                    id.to_string()
                } else {
                    text.chars().take(20).collect()
                };
                warn!(section = %id, "audio section has no audio path, will auto-advance");
                playback.fail(format!("Audio path missing for section: \"{preview}\"."));
                Some(PendingJob::CompleteAfter(ERROR_ADVANCE_DELAY))
            }
            _ => {
                let delay = {
                    playback.resource_ready();
                    playback.auto_advance_delay(self.synth.is_some())
                };
                delay.map(PendingJob::CompleteAfter)
            }
        };

        {
            let mut inner = self.lock();
            if inner.generation != activation.0 {
                // A newer activation raced in; this one is already dead.
                return activation;
            }
            inner.playback = Some(playback);
        }

        match job {
            Some(PendingJob::LoadAudio(path)) => self.spawn_audio_load(activation, path),
            Some(PendingJob::CompleteAfter(delay)) => {
                self.spawn_delayed_completion(activation, delay);
            }
            None => {}
        }

        activation
    }

    /// Tear down the active section without starting a new one (unmount).
    pub fn deactivate(&self) {
        {
            let mut inner = self.lock();
            inner.generation += 1;
            for task in inner.tasks.drain(..) {
                task.abort();
            }
            inner.playback = None;
        }
        self.sink.stop();
        if let Some(synth) = &self.synth {
            synth.cancel();
        }
        let _ = self.speaking.send(false);
    }

    /// Play/pause toggle for the active section. Ignored for timed kinds and
    /// while loading.
    pub fn toggle(&self) {
        let (action, activation, speech_text) = {
            let mut inner = self.lock();
            let activation = ActivationId(inner.generation);
            let Some(pb) = inner.playback.as_mut() else {
                return;
            };
            let action = pb.toggle();
            let speech_text = match pb.section() {
                Section::Text { content, .. } => content.clone(),
                _ => String::new(),
            };
            (action, activation, speech_text)
        };

        match action {
            ToggleAction::StartAudio => {
                let _ = self.speaking.send(true);
                self.spawn_audio_playback(activation);
            }
            ToggleAction::PauseAudio => {
                self.sink.pause();
                let _ = self.speaking.send(false);
            }
            ToggleAction::ResumeAudio => {
                self.sink.resume();
                let _ = self.speaking.send(true);
            }
            ToggleAction::StartSpeech => {
                if self.synth.is_some() {
                    let _ = self.speaking.send(true);
                    self.spawn_speech(activation, speech_text);
                }
            }
            ToggleAction::PauseSpeech => {
                if let Some(synth) = &self.synth {
                    synth.pause();
                }
                let _ = self.speaking.send(false);
            }
            ToggleAction::ResumeSpeech => {
                if let Some(synth) = &self.synth {
                    synth.resume();
                }
                let _ = self.speaking.send(true);
            }
            ToggleAction::Ignored => {}
        }
    }

    fn spawn_audio_load(&self, activation: ActivationId, path: MediaPath) {
        let player = self.clone();
        let handle = tokio::spawn(async move {
            match player.media.resolve(&path).await {
                Ok(url) => {
                    if !player.is_live(activation) {
                        return;
                    }
                    match player.sink.load(&url).await {
                        Ok(()) => {
                            player.with_playback(activation, |pb| {
                                pb.resource_ready();
                            });
                        }
                        Err(err) => {
                            player.fail_and_complete(activation, format!("Audio Error: {err}"));
                        }
                    }
                }
                Err(err) => {
                    warn!(path = %path, error = %err, "audio url resolution failed");
                    player.fail_and_complete(
                        activation,
                        format!("Failed to load audio: {path}. Check path, permissions, or network."),
                    );
                }
            }
        });
        self.register_task(activation, handle);
    }

    fn spawn_audio_playback(&self, activation: ActivationId) {
        let player = self.clone();
        let handle = tokio::spawn(async move {
            match player.sink.play_to_end().await {
                Ok(()) => player.complete_if_live(activation),
                Err(err) => player.fail_and_complete(activation, format!("Audio Error: {err}")),
            }
        });
        self.register_task(activation, handle);
    }

    fn spawn_speech(&self, activation: ActivationId, text: String) {
        let Some(synth) = self.synth.clone() else {
            return;
        };
        let player = self.clone();
        let handle = tokio::spawn(async move {
            match synth.speak_to_end(&text).await {
                Ok(()) => player.complete_if_live(activation),
                Err(_) => player.fail_and_complete(activation, "Error speaking content.".to_string()),
            }
        });
        self.register_task(activation, handle);
    }

    fn spawn_delayed_completion(&self, activation: ActivationId, delay: Duration) {
        let player = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            player.complete_if_live(activation);
        });
        self.register_task(activation, handle);
    }

    fn register_task(&self, activation: ActivationId, handle: JoinHandle<()>) {
        let mut inner = self.lock();
        if inner.generation == activation.0 {
            inner.tasks.push(handle);
        } else {
            handle.abort();
        }
    }

    fn is_live(&self, activation: ActivationId) -> bool {
        self.lock().generation == activation.0
    }

    fn with_playback(&self, activation: ActivationId, f: impl FnOnce(&mut SectionPlayback)) {
        let mut inner = self.lock();
        if inner.generation != activation.0 {
            return;
        }
        if let Some(pb) = inner.playback.as_mut() {
            f(pb);
        }
    }

    fn fail_and_complete(&self, activation: ActivationId, message: String) {
        let fired = {
            let mut inner = self.lock();
            if inner.generation != activation.0 {
                return;
            }
            let Some(pb) = inner.playback.as_mut() else {
                return;
            };
            warn!(error = %message, "section playback failed, advancing");
            pb.fail(message);
            pb.finish().then(|| pb.section().id().clone())
        };
        let _ = self.speaking.send(false);
        if let Some(section_id) = fired {
            let _ = self.completions.send(SectionCompleted {
                activation,
                section_id,
            });
        }
    }

    fn complete_if_live(&self, activation: ActivationId) {
        let fired = {
            let mut inner = self.lock();
            if inner.generation != activation.0 {
                return;
            }
            let Some(pb) = inner.playback.as_mut() else {
                return;
            };
            pb.finish().then(|| pb.section().id().clone())
        };
        let _ = self.speaking.send(false);
        if let Some(section_id) = fired {
            let _ = self.completions.send(SectionCompleted {
                activation,
                section_id,
            });
        }
    }

    fn lock(&self) -> MutexGuard<'_, PlayerInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
