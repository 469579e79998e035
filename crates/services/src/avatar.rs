use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::ai::AnswerProvider;

/// Shown in place of an answer when the provider fails. The interaction
/// never propagates the failure further than this text.
pub const APOLOGY_MESSAGE: &str = "Sorry, I couldn't process your question.";

/// Label for the disabled voice control on runtimes without speech capture.
pub const VOICE_UNSUPPORTED_LABEL: &str = "Voice input is not supported on this device.";

/// Lesson context fallback when a lesson has neither description nor title.
pub const GENERIC_LESSON_CONTEXT: &str = "General space knowledge";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RecognitionError {
    #[error("could not start voice recognition")]
    Start,
    #[error("speech error: {0}")]
    Capture(String),
}

/// Speech-to-text capability. Absent entirely on unsupported runtimes.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Capture one utterance: single-shot, non-continuous recognition.
    async fn recognize_once(&self) -> Result<String, RecognitionError>;
}

/// One question/answer round trip with the AI tutor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarExchange {
    pub user_query: String,
    pub answer: String,
    /// True when `answer` is the apology text rather than a real answer.
    pub failed: bool,
}

/// Result of asking the avatar a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarOutcome {
    Answered(AvatarExchange),
    /// Voice capture failed; the user may retry or type instead.
    RecognitionFailed(String),
    /// A recognition session or answer request is already in flight.
    Busy,
    /// The runtime has no speech recognition.
    Unsupported,
    /// Blank input, nothing to send.
    EmptyQuery,
}

#[derive(Default)]
struct AvatarState {
    listening: bool,
    pending: bool,
}

/// Voice/text Q&A with the AI tutor.
///
/// At most one recognition session and at most one outstanding answer
/// request exist at a time; attempts to start another are no-ops.
#[derive(Clone)]
pub struct AvatarInteraction {
    answers: Arc<dyn AnswerProvider>,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    state: Arc<Mutex<AvatarState>>,
}

impl AvatarInteraction {
    #[must_use]
    pub fn new(
        answers: Arc<dyn AnswerProvider>,
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
    ) -> Self {
        Self {
            answers,
            recognizer,
            state: Arc::new(Mutex::new(AvatarState::default())),
        }
    }

    #[must_use]
    pub fn voice_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Explanatory label for the voice control when capture is unsupported.
    #[must_use]
    pub fn voice_disabled_label(&self) -> Option<&'static str> {
        if self.voice_supported() {
            None
        } else {
            Some(VOICE_UNSUPPORTED_LABEL)
        }
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.lock().listening
    }

    /// True while an answer request is outstanding; both voice and text
    /// input are disabled meanwhile.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.lock().pending
    }

    /// Capture an utterance and forward it to the tutor.
    pub async fn ask_by_voice(&self, lesson_context: &str) -> AvatarOutcome {
        let Some(recognizer) = self.recognizer.clone() else {
            return AvatarOutcome::Unsupported;
        };
        {
            let mut state = self.lock();
            if state.listening || state.pending {
                return AvatarOutcome::Busy;
            }
            state.listening = true;
        }

        let captured = recognizer.recognize_once().await;
        self.lock().listening = false;

        match captured {
            Ok(utterance) => self.ask_by_text(&utterance, lesson_context).await,
            Err(err) => {
                warn!(error = %err, "speech recognition failed");
                AvatarOutcome::RecognitionFailed(err.to_string())
            }
        }
    }

    /// Send a typed (or recognized) question to the tutor.
    pub async fn ask_by_text(&self, query: &str, lesson_context: &str) -> AvatarOutcome {
        let query = query.trim();
        if query.is_empty() {
            return AvatarOutcome::EmptyQuery;
        }
        {
            let mut state = self.lock();
            if state.pending {
                return AvatarOutcome::Busy;
            }
            state.pending = true;
        }

        let answered = self.answers.answer(query, lesson_context).await;
        self.lock().pending = false;

        match answered {
            Ok(answer) => AvatarOutcome::Answered(AvatarExchange {
                user_query: query.to_string(),
                answer,
                failed: false,
            }),
            Err(err) => {
                warn!(error = %err, "AI answer request failed");
                AvatarOutcome::Answered(AvatarExchange {
                    user_query: query.to_string(),
                    answer: APOLOGY_MESSAGE.to_string(),
                    failed: true,
                })
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, AvatarState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AiClientError;
    use tokio::sync::Notify;

    struct FakeProvider {
        fail: bool,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl AnswerProvider for FakeProvider {
        async fn answer(&self, query: &str, context: &str) -> Result<String, AiClientError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                return Err(AiClientError::EmptyResponse);
            }
            Ok(format!("About {context}: {query} explained."))
        }
    }

    struct FakeRecognizer {
        utterance: Result<String, RecognitionError>,
    }

    #[async_trait]
    impl SpeechRecognizer for FakeRecognizer {
        async fn recognize_once(&self) -> Result<String, RecognitionError> {
            self.utterance.clone()
        }
    }

    fn provider(fail: bool) -> Arc<FakeProvider> {
        Arc::new(FakeProvider { fail, gate: None })
    }

    #[tokio::test]
    async fn voice_path_answers_with_lesson_context() {
        let avatar = AvatarInteraction::new(
            provider(false),
            Some(Arc::new(FakeRecognizer {
                utterance: Ok("Why do satellites not fall?".into()),
            })),
        );

        let outcome = avatar.ask_by_voice("Orbital mechanics").await;
        let AvatarOutcome::Answered(exchange) = outcome else {
            panic!("expected an answer");
        };
        assert_eq!(exchange.user_query, "Why do satellites not fall?");
        assert!(exchange.answer.contains("Orbital mechanics"));
        assert!(!exchange.failed);
        assert!(!avatar.is_listening());
    }

    #[tokio::test]
    async fn missing_recognizer_disables_voice_with_label() {
        let avatar = AvatarInteraction::new(provider(false), None);
        assert!(!avatar.voice_supported());
        assert_eq!(avatar.voice_disabled_label(), Some(VOICE_UNSUPPORTED_LABEL));
        assert_eq!(
            avatar.ask_by_voice("anything").await,
            AvatarOutcome::Unsupported
        );
    }

    #[tokio::test]
    async fn recognition_failure_is_recoverable() {
        let avatar = AvatarInteraction::new(
            provider(false),
            Some(Arc::new(FakeRecognizer {
                utterance: Err(RecognitionError::Capture("no-speech".into())),
            })),
        );

        let outcome = avatar.ask_by_voice("ctx").await;
        assert!(matches!(outcome, AvatarOutcome::RecognitionFailed(msg) if msg.contains("no-speech")));

        // Typing still works afterwards.
        let retry = avatar.ask_by_text("What is thrust?", "ctx").await;
        assert!(matches!(retry, AvatarOutcome::Answered(_)));
    }

    #[tokio::test]
    async fn provider_failure_yields_apology_not_error() {
        let avatar = AvatarInteraction::new(provider(true), None);
        let outcome = avatar.ask_by_text("What is thrust?", "ctx").await;
        let AvatarOutcome::Answered(exchange) = outcome else {
            panic!("expected an apology answer");
        };
        assert_eq!(exchange.answer, APOLOGY_MESSAGE);
        assert!(exchange.failed);
        assert!(!avatar.is_pending());
    }

    #[tokio::test]
    async fn at_most_one_outstanding_query() {
        let gate = Arc::new(Notify::new());
        let avatar = AvatarInteraction::new(
            Arc::new(FakeProvider {
                fail: false,
                gate: Some(gate.clone()),
            }),
            Some(Arc::new(FakeRecognizer {
                utterance: Ok("ignored".into()),
            })),
        );

        let first = {
            let avatar = avatar.clone();
            tokio::spawn(async move { avatar.ask_by_text("first question", "ctx").await })
        };
        // Let the first request reach the provider.
        tokio::task::yield_now().await;
        assert!(avatar.is_pending());

        assert_eq!(avatar.ask_by_text("second", "ctx").await, AvatarOutcome::Busy);
        assert_eq!(avatar.ask_by_voice("ctx").await, AvatarOutcome::Busy);

        gate.notify_one();
        let outcome = first.await.unwrap();
        assert!(matches!(outcome, AvatarOutcome::Answered(_)));
        assert!(!avatar.is_pending());
    }

    #[tokio::test]
    async fn blank_queries_are_ignored() {
        let avatar = AvatarInteraction::new(provider(false), None);
        assert_eq!(
            avatar.ask_by_text("   ", "ctx").await,
            AvatarOutcome::EmptyQuery
        );
    }
}
