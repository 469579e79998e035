use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AttemptId, LessonSlug, QuestionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("duplicate question id within bank: {0}")]
    DuplicateQuestionId(QuestionId),

    #[error("question {0} is not part of this attempt")]
    UnknownQuestion(QuestionId),

    #[error("answer cannot be empty")]
    EmptyAnswer,

    #[error("{unanswered} of {total} questions are still unanswered")]
    Incomplete { unanswered: usize, total: usize },

    #[error("score {0} is outside 0..=100")]
    ScoreOutOfRange(i64),
}

/// One selectable option of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// A quiz question. The wire shape (`type` tag, `mcq`/`normal`) matches what
/// the authoring tool stores and what the grading endpoint receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Question {
    #[serde(rename = "mcq")]
    MultipleChoice {
        id: QuestionId,
        text: String,
        options: Vec<ChoiceOption>,
        #[serde(default)]
        explanation: String,
    },
    #[serde(rename = "normal")]
    Open {
        id: QuestionId,
        text: String,
        #[serde(default)]
        explanation: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionKind {
    MultipleChoice,
    Open,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> &QuestionId {
        match self {
            Question::MultipleChoice { id, .. } | Question::Open { id, .. } => id,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Question::MultipleChoice { text, .. } | Question::Open { text, .. } => text,
        }
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        match self {
            Question::MultipleChoice { explanation, .. } | Question::Open { explanation, .. } => {
                explanation
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        match self {
            Question::MultipleChoice { .. } => QuestionKind::MultipleChoice,
            Question::Open { .. } => QuestionKind::Open,
        }
    }

    #[must_use]
    pub fn options(&self) -> &[ChoiceOption] {
        match self {
            Question::MultipleChoice { options, .. } => options,
            Question::Open { .. } => &[],
        }
    }
}

/// The full question pool for one lesson, as authored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    slug: LessonSlug,
    title: Option<String>,
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Build a validated bank.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::DuplicateQuestionId` if two questions share an id.
    pub fn new(
        slug: LessonSlug,
        title: Option<String>,
        questions: Vec<Question>,
    ) -> Result<Self, QuizError> {
        let mut seen = HashSet::new();
        for question in &questions {
            if !seen.insert(question.id().clone()) {
                return Err(QuizError::DuplicateQuestionId(question.id().clone()));
            }
        }
        Ok(Self {
            slug,
            title,
            questions,
        })
    }

    #[must_use]
    pub fn slug(&self) -> &LessonSlug {
        &self.slug
    }

    /// Display title, falling back to a generated one like the authoring
    /// tool does.
    #[must_use]
    pub fn title_or_default(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("Quiz for {}", self.slug))
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn of_kind(&self, kind: QuestionKind) -> Vec<Question> {
        self.questions
            .iter()
            .filter(|q| q.kind() == kind)
            .cloned()
            .collect()
    }
}

/// An in-flight quiz: the sampled questions plus the user's answers so far.
///
/// Ephemeral; submitted once, graded remotely, then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAttempt {
    id: AttemptId,
    slug: LessonSlug,
    questions: Vec<Question>,
    answers: HashMap<QuestionId, String>,
}

impl QuizAttempt {
    #[must_use]
    pub fn new(slug: LessonSlug, questions: Vec<Question>) -> Self {
        Self {
            id: AttemptId::generate(),
            slug,
            questions,
            answers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn slug(&self) -> &LessonSlug {
        &self.slug
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &HashMap<QuestionId, String> {
        &self.answers
    }

    /// Record an answer: an option id for multiple-choice, free text for
    /// open questions. Overwrites any previous answer.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::UnknownQuestion` for an id outside this attempt
    /// and `QuizError::EmptyAnswer` for blank input.
    pub fn record_answer(
        &mut self,
        question_id: &QuestionId,
        answer: impl AsRef<str>,
    ) -> Result<(), QuizError> {
        if !self.questions.iter().any(|q| q.id() == question_id) {
            return Err(QuizError::UnknownQuestion(question_id.clone()));
        }
        let answer = answer.as_ref().trim();
        if answer.is_empty() {
            return Err(QuizError::EmptyAnswer);
        }
        self.answers.insert(question_id.clone(), answer.to_string());
        Ok(())
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Submission is enabled only once every sampled question has a
    /// non-empty answer.
    #[must_use]
    pub fn is_ready_to_submit(&self) -> bool {
        self.questions
            .iter()
            .all(|q| self.answers.contains_key(q.id()))
    }

    /// Check readiness, reporting how many questions still need answers.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Incomplete` when any question is unanswered.
    pub fn ensure_ready(&self) -> Result<(), QuizError> {
        let unanswered = self
            .questions
            .iter()
            .filter(|q| !self.answers.contains_key(q.id()))
            .count();
        if unanswered > 0 {
            return Err(QuizError::Incomplete {
                unanswered,
                total: self.questions.len(),
            });
        }
        Ok(())
    }
}

/// Verdict returned by the grading collaborator. The client never grades.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    score: u8,
    feedback: String,
}

impl QuizResult {
    /// Accept a grader verdict.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::ScoreOutOfRange` unless `score` is in `0..=100`.
    pub fn from_grader(score: i64, feedback: impl Into<String>) -> Result<Self, QuizError> {
        if !(0..=100).contains(&score) {
            return Err(QuizError::ScoreOutOfRange(score));
        }
        Ok(Self {
            score: score as u8,
            feedback: feedback.into(),
        })
    }

    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }

    #[must_use]
    pub fn feedback(&self) -> &str {
        &self.feedback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qid(raw: &str) -> QuestionId {
        QuestionId::new(raw).unwrap()
    }

    fn slug() -> LessonSlug {
        LessonSlug::new("build-your-own-satellite").unwrap()
    }

    fn mcq(id: &str) -> Question {
        Question::MultipleChoice {
            id: qid(id),
            text: "Which force keeps a satellite in orbit?".into(),
            options: vec![
                ChoiceOption {
                    id: "a".into(),
                    text: "Gravity".into(),
                    is_correct: true,
                },
                ChoiceOption {
                    id: "b".into(),
                    text: "Magnetism".into(),
                    is_correct: false,
                },
            ],
            explanation: "Gravity provides the centripetal force.".into(),
        }
    }

    fn open(id: &str) -> Question {
        Question::Open {
            id: qid(id),
            text: "Describe what a payload is.".into(),
            explanation: "The instruments a satellite carries.".into(),
        }
    }

    #[test]
    fn bank_rejects_duplicate_ids() {
        let err = QuestionBank::new(slug(), None, vec![mcq("q1"), open("q1")]).unwrap_err();
        assert!(matches!(err, QuizError::DuplicateQuestionId(id) if id.as_str() == "q1"));
    }

    #[test]
    fn bank_title_falls_back_to_slug() {
        let bank = QuestionBank::new(slug(), None, vec![mcq("q1")]).unwrap();
        assert_eq!(bank.title_or_default(), "Quiz for build-your-own-satellite");
    }

    #[test]
    fn attempt_gates_submission_on_complete_answers() {
        let mut attempt = QuizAttempt::new(slug(), vec![mcq("q1"), open("q2")]);
        assert!(!attempt.is_ready_to_submit());
        assert!(matches!(
            attempt.ensure_ready(),
            Err(QuizError::Incomplete {
                unanswered: 2,
                total: 2
            })
        ));

        attempt.record_answer(&qid("q1"), "a").unwrap();
        attempt.record_answer(&qid("q2"), "It carries instruments.").unwrap();
        assert!(attempt.is_ready_to_submit());
        attempt.ensure_ready().unwrap();
    }

    #[test]
    fn attempt_rejects_blank_and_unknown_answers() {
        let mut attempt = QuizAttempt::new(slug(), vec![mcq("q1")]);
        assert!(matches!(
            attempt.record_answer(&qid("q1"), "   "),
            Err(QuizError::EmptyAnswer)
        ));
        assert!(matches!(
            attempt.record_answer(&qid("zz"), "a"),
            Err(QuizError::UnknownQuestion(_))
        ));
    }

    #[test]
    fn grader_score_bounds() {
        assert!(QuizResult::from_grader(100, "perfect").is_ok());
        assert!(matches!(
            QuizResult::from_grader(101, "x"),
            Err(QuizError::ScoreOutOfRange(101))
        ));
        assert!(matches!(
            QuizResult::from_grader(-1, "x"),
            Err(QuizError::ScoreOutOfRange(-1))
        ));
    }

    #[test]
    fn question_wire_shape_matches_authoring_tool() {
        let json = serde_json::to_value(mcq("q1")).unwrap();
        assert_eq!(json["type"], "mcq");
        assert_eq!(json["options"][0]["isCorrect"], true);

        let parsed: Question = serde_json::from_value(serde_json::json!({
            "type": "normal",
            "id": "q9",
            "text": "Why do rockets stage?"
        }))
        .unwrap();
        assert_eq!(parsed.kind(), QuestionKind::Open);
        assert_eq!(parsed.explanation(), "");
    }
}
