use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;

use spacey_core::Clock;
use spacey_core::model::{
    BadgeTier, EarnedBadge, LessonSlug, Question, QuestionBank, QuestionKind, QuizAttempt,
    QuizResult, UserProfile,
};
use storage::repository::{BadgeRepository, QuizRepository};

use crate::ai::QuizGrader;
use crate::error::QuizServiceError;

/// Multiple-choice questions per attempt.
pub const MCQ_QUOTA: usize = 2;

/// Open-response questions per attempt.
pub const OPEN_QUOTA: usize = 1;

/// A graded submission, with the badge it earned (if any).
#[derive(Debug, Clone)]
pub struct QuizSubmission {
    pub result: QuizResult,
    pub badge: Option<EarnedBadge>,
}

/// Quiz flow: sample an attempt from the bank, gate submission on complete
/// answers, delegate grading, award badges.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    badges: Arc<dyn BadgeRepository>,
    grader: Arc<dyn QuizGrader>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        badges: Arc<dyn BadgeRepository>,
        grader: Arc<dyn QuizGrader>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            badges,
            grader,
        }
    }

    /// Sample a fresh attempt from the lesson's question bank.
    ///
    /// Every call resamples: retrying a quiz draws and orders questions
    /// independently of previous attempts.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown slug and `EmptyBank` when sampling
    /// produced no questions.
    pub async fn start_attempt(&self, slug: &LessonSlug) -> Result<QuizAttempt, QuizServiceError> {
        let bank = self
            .quizzes
            .get_bank(slug)
            .await?
            .ok_or_else(|| QuizServiceError::NotFound(slug.clone()))?;

        let questions = sample_questions(&bank);
        if questions.is_empty() {
            return Err(QuizServiceError::EmptyBank(slug.clone()));
        }
        Ok(QuizAttempt::new(slug.clone(), questions))
    }

    /// Submit a completed attempt for grading and award any badge earned.
    ///
    /// Badge writes merge on the composed id, so re-earning on retry
    /// overwrites instead of duplicating.
    ///
    /// # Errors
    ///
    /// Returns `Quiz` when answers are incomplete (submission stays
    /// disabled), `Grading` when the collaborator fails or returns a
    /// malformed verdict (blocking; the user may retry), and `Storage` for
    /// persistence failures.
    pub async fn submit(
        &self,
        attempt: &QuizAttempt,
        user: Option<&UserProfile>,
    ) -> Result<QuizSubmission, QuizServiceError> {
        attempt.ensure_ready()?;

        let result = self
            .grader
            .grade(attempt.slug().as_str(), attempt.questions(), attempt.answers())
            .await?;

        let badge = match (user, BadgeTier::for_score(result.score())) {
            (Some(user), Some(tier)) => {
                let quiz_title = self
                    .quizzes
                    .get_bank(attempt.slug())
                    .await?
                    .map_or_else(|| attempt.slug().to_string(), |b| b.title_or_default());
                let badge = EarnedBadge::new(
                    user.id.clone(),
                    attempt.slug().clone(),
                    tier,
                    &quiz_title,
                    self.clock.now(),
                );
                self.badges.upsert_badge(&badge).await?;
                Some(badge)
            }
            _ => None,
        };

        Ok(QuizSubmission { result, badge })
    }
}

/// Sample the presented subset: shuffle each type partition independently
/// (Fisher–Yates), take the per-type quotas, then shuffle the combined order.
#[must_use]
pub fn sample_questions(bank: &QuestionBank) -> Vec<Question> {
    let mut rng = rand::rng();
    sample_with_rng(bank, &mut rng)
}

fn sample_with_rng<R: Rng + ?Sized>(bank: &QuestionBank, rng: &mut R) -> Vec<Question> {
    let mut mcqs = bank.of_kind(QuestionKind::MultipleChoice);
    let mut opens = bank.of_kind(QuestionKind::Open);
    mcqs.shuffle(rng);
    opens.shuffle(rng);
    mcqs.truncate(MCQ_QUOTA);
    opens.truncate(OPEN_QUOTA);

    let mut sampled = mcqs;
    sampled.append(&mut opens);
    sampled.shuffle(rng);
    sampled
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacey_core::model::{ChoiceOption, QuestionId};

    fn qid(raw: &str) -> QuestionId {
        QuestionId::new(raw).unwrap()
    }

    fn mcq(id: &str) -> Question {
        Question::MultipleChoice {
            id: qid(id),
            text: format!("MCQ {id}"),
            options: vec![
                ChoiceOption {
                    id: "a".into(),
                    text: "Option A".into(),
                    is_correct: true,
                },
                ChoiceOption {
                    id: "b".into(),
                    text: "Option B".into(),
                    is_correct: false,
                },
            ],
            explanation: String::new(),
        }
    }

    fn open(id: &str) -> Question {
        Question::Open {
            id: qid(id),
            text: format!("Open {id}"),
            explanation: String::new(),
        }
    }

    fn bank(mcqs: usize, opens: usize) -> QuestionBank {
        let mut questions = Vec::new();
        for i in 0..mcqs {
            questions.push(mcq(&format!("m{i}")));
        }
        for i in 0..opens {
            questions.push(open(&format!("o{i}")));
        }
        QuestionBank::new(
            LessonSlug::new("build-your-own-satellite").unwrap(),
            Some("Satellite Quiz".into()),
            questions,
        )
        .unwrap()
    }

    #[test]
    fn sampling_takes_two_mcq_and_one_open() {
        let bank = bank(6, 4);
        for _ in 0..10 {
            let sampled = sample_questions(&bank);
            assert_eq!(sampled.len(), 3);
            let mcq_count = sampled
                .iter()
                .filter(|q| q.kind() == QuestionKind::MultipleChoice)
                .count();
            assert_eq!(mcq_count, 2);
            assert_eq!(sampled.len() - mcq_count, 1);
        }
    }

    #[test]
    fn sampling_degrades_when_bank_is_short() {
        let sampled = sample_questions(&bank(1, 0));
        assert_eq!(sampled.len(), 1);
        assert_eq!(sampled[0].kind(), QuestionKind::MultipleChoice);

        let sampled = sample_questions(&bank(0, 1));
        assert_eq!(sampled.len(), 1);
    }

    #[test]
    fn consecutive_samplings_differ_with_high_probability() {
        let bank = bank(6, 3);
        let first: Vec<_> = sample_questions(&bank)
            .iter()
            .map(|q| q.id().clone())
            .collect();

        // A fixed draw repeating 20 times in a row is ~impossible for this
        // bank size; any difference proves resampling is independent.
        let differs = (0..20).any(|_| {
            let next: Vec<_> = sample_questions(&bank)
                .iter()
                .map(|q| q.id().clone())
                .collect();
            next != first
        });
        assert!(differs);
    }
}
