//! Shared fakes for service integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use url::Url;

use services::ai::QuizGrader;
use services::error::GradingError;
use services::player::{AudioSink, AudioSinkError};
use spacey_core::model::{Question, QuestionId, QuizResult};

/// Audio sink that loads instantly and never ends on its own. Lessons built
/// from timed sections never touch it.
pub struct SilentSink;

#[async_trait]
impl AudioSink for SilentSink {
    async fn load(&self, _url: &Url) -> Result<(), AudioSinkError> {
        Ok(())
    }

    async fn play_to_end(&self) -> Result<(), AudioSinkError> {
        std::future::pending::<()>().await;
        Ok(())
    }

    fn pause(&self) {}

    fn resume(&self) {}

    fn stop(&self) {}
}

/// Grader returning a fixed verdict, counting invocations.
pub struct FixedGrader {
    score: i64,
    calls: AtomicUsize,
}

impl FixedGrader {
    pub fn new(score: i64) -> Arc<Self> {
        Arc::new(Self {
            score,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuizGrader for FixedGrader {
    async fn grade(
        &self,
        _lesson_slug: &str,
        _questions: &[Question],
        _answers: &HashMap<QuestionId, String>,
    ) -> Result<QuizResult, GradingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        QuizResult::from_grader(self.score, "Good effort, cadet.")
            .map_err(|_| GradingError::InvalidScore(self.score))
    }
}

/// Grader that always returns an unparseable verdict.
pub struct BrokenGrader;

#[async_trait]
impl QuizGrader for BrokenGrader {
    async fn grade(
        &self,
        _lesson_slug: &str,
        _questions: &[Question],
        _answers: &HashMap<QuestionId, String>,
    ) -> Result<QuizResult, GradingError> {
        Err(GradingError::MalformedResponse {
            raw: "I'd give this an A+".into(),
        })
    }
}
