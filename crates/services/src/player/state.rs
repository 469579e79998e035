use std::fmt;
use std::time::Duration;

use spacey_core::model::Section;

/// Floor for timer-driven text display.
pub const MIN_TEXT_DISPLAY: Duration = Duration::from_millis(2000);

/// Reading pace for non-spoken text sections.
pub const TEXT_MS_PER_CHAR: u64 = 70;

/// Delay before auto-advancing past a section with a missing required field.
pub const ERROR_ADVANCE_DELAY: Duration = Duration::from_millis(2000);

/// Minimal delay for sections that have nothing to present (e.g. spoken text
/// when no synthesis engine exists). Keeps playback from ever stalling.
pub const FALLBACK_ADVANCE_DELAY: Duration = Duration::from_millis(100);

/// Ephemeral playback state of the active section. Never persisted;
/// reconstructed on every activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Completed,
    Errored,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Ready => "ready",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Completed => "completed",
            PlaybackState::Errored => "errored",
        };
        write!(f, "{label}")
    }
}

/// What the driver must do with the shared audio/synthesis backends after a
/// play/pause toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    StartAudio,
    PauseAudio,
    ResumeAudio,
    StartSpeech,
    PauseSpeech,
    ResumeSpeech,
    Ignored,
}

/// Pure state machine for one section activation.
///
/// Owns the transition rules and the fire-once completion latch; all side
/// effects (backends, timers, channels) live in the driver so every
/// transition is testable without audio hardware.
#[derive(Debug)]
pub struct SectionPlayback {
    section: Section,
    state: PlaybackState,
    error: Option<String>,
    completion_fired: bool,
}

impl SectionPlayback {
    #[must_use]
    pub fn new(section: Section) -> Self {
        Self {
            section,
            state: PlaybackState::Idle,
            error: None,
            completion_fired: false,
        }
    }

    #[must_use]
    pub fn section(&self) -> &Section {
        &self.section
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// A new section has been handed over; resource resolution begins.
    pub fn begin_loading(&mut self) {
        self.state = PlaybackState::Loading;
    }

    /// The underlying resource became available. Only honored while still
    /// loading; stale readiness reports are dropped.
    pub fn resource_ready(&mut self) -> bool {
        if self.state == PlaybackState::Loading {
            self.state = PlaybackState::Ready;
            true
        } else {
            false
        }
    }

    /// Record a playback failure with a human-readable message.
    ///
    /// Errored is not terminal for the lesson: the driver still completes the
    /// section so progress is never blocked on a broken resource.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.state == PlaybackState::Completed {
            return;
        }
        self.error = Some(message.into());
        self.state = PlaybackState::Errored;
    }

    /// Play/pause toggle. Valid only for narrated kinds; timed kinds ignore
    /// it and auto-advance.
    pub fn toggle(&mut self) -> ToggleAction {
        use PlaybackState::{Paused, Playing, Ready};

        if !self.section.is_pausable() {
            return ToggleAction::Ignored;
        }
        let speech = matches!(self.section, Section::Text { .. });
        match self.state {
            Ready => {
                self.state = Playing;
                if speech {
                    ToggleAction::StartSpeech
                } else {
                    ToggleAction::StartAudio
                }
            }
            Playing => {
                self.state = Paused;
                if speech {
                    ToggleAction::PauseSpeech
                } else {
                    ToggleAction::PauseAudio
                }
            }
            Paused => {
                self.state = Playing;
                if speech {
                    ToggleAction::ResumeSpeech
                } else {
                    ToggleAction::ResumeAudio
                }
            }
            _ => ToggleAction::Ignored,
        }
    }

    /// Transition to `Completed`, returning whether the completion signal
    /// should fire. Fires at most once per activation, no matter how many
    /// events (media end, timer, error skip) race in.
    pub fn finish(&mut self) -> bool {
        self.state = PlaybackState::Completed;
        if self.completion_fired {
            return false;
        }
        self.completion_fired = true;
        true
    }

    /// Whether the avatar should be shown as speaking right now.
    #[must_use]
    pub fn is_narrating(&self) -> bool {
        self.state == PlaybackState::Playing && self.section.is_pausable()
    }

    /// Timer the driver should arm once the section is `Ready`, for kinds
    /// that advance without user interaction. `None` means playback waits
    /// for an explicit toggle.
    #[must_use]
    pub fn auto_advance_delay(&self, synth_available: bool) -> Option<Duration> {
        match &self.section {
            Section::Image { duration, .. } => Some(*duration),
            Section::Text { speak: false, content, .. } => Some(reading_time(content)),
            Section::Text { speak: true, .. } => {
                if synth_available {
                    None
                } else {
                    Some(FALLBACK_ADVANCE_DELAY)
                }
            }
            Section::AudioText { .. } => None,
        }
    }
}

/// Display time for a non-spoken text section, proportional to length with a
/// 2 second floor.
#[must_use]
pub fn reading_time(content: &str) -> Duration {
    let chars = content.chars().count() as u64;
    MIN_TEXT_DISPLAY.max(Duration::from_millis(chars * TEXT_MS_PER_CHAR))
}
