use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Failure modes of the audio pipeline, phrased for direct display.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AudioSinkError {
    #[error("Audio playback aborted.")]
    Aborted,
    #[error("A network error caused audio download to fail.")]
    Network,
    #[error("Audio decoding error or unsupported features.")]
    Decode,
    #[error("Audio source not supported or invalid URL.")]
    Unsupported,
    #[error("{0}")]
    Other(String),
}

/// The single shared audio output.
///
/// Exactly one section owns the sink at a time; ownership transfers only
/// after the previous owner has been stopped. `pause`/`resume`/`stop` are
/// synchronous so cleanup can silence the pipeline before the next section
/// starts loading.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Begin loading `url`; resolves once the pipeline reports it can play
    /// through to the end.
    async fn load(&self, url: &Url) -> Result<(), AudioSinkError>;

    /// Start (or restart) playback; resolves when the media ends.
    async fn play_to_end(&self) -> Result<(), AudioSinkError>;

    fn pause(&self);

    fn resume(&self);

    /// Stop playback and unload the current source immediately.
    fn stop(&self);
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SpeechSynthError {
    #[error("speech synthesis failed: {0}")]
    Failed(String),
}

/// The single shared speech-synthesis engine.
///
/// Absent entirely on runtimes without synthesis support; the player then
/// falls back to timer-driven advancement for spoken text.
#[async_trait]
pub trait SpeechSynth: Send + Sync {
    /// Speak `text` as one utterance; resolves when the utterance ends.
    async fn speak_to_end(&self, text: &str) -> Result<(), SpeechSynthError>;

    fn pause(&self);

    fn resume(&self);

    /// Cancel any in-flight utterance immediately.
    fn cancel(&self);
}
