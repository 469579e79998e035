use std::collections::HashMap;
use std::env;
use std::fmt::Write as _;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use spacey_core::model::{Question, QuestionId, QuizResult};

use super::{AnswerProvider, QuizGrader};
use crate::error::{AiClientError, GradingError};

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl GeminiConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("SPACEY_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("SPACEY_AI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
        let model = env::var("SPACEY_AI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Client for the generative-language collaborator, used both for learner
/// Q&A and quiz grading. No timeouts and no automatic retries; a hung
/// request is left to the user to re-issue.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    config: Option<GeminiConfig>,
}

impl GeminiClient {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(GeminiConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<GeminiConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Generate text from a prompt.
    ///
    /// # Errors
    ///
    /// Returns `AiClientError` when the client is disabled, the request
    /// fails, or the response carries no text.
    pub async fn generate(&self, prompt: &str) -> Result<String, AiClientError> {
        let config = self.config.as_ref().ok_or(AiClientError::Disabled)?;

        let url = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );
        let payload = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AiClientError::HttpStatus(response.status()));
        }

        let body: GenerateResponse = response.json().await?;
        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or(AiClientError::EmptyResponse)?;

        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl AnswerProvider for GeminiClient {
    async fn answer(&self, query: &str, lesson_context: &str) -> Result<String, AiClientError> {
        let context = if lesson_context.trim().is_empty() {
            "general space topics"
        } else {
            lesson_context
        };
        let prompt = format!(
            "You are an AI assistant for a space education platform.\n\
             A student is currently learning about: \"{context}\".\n\
             The student has the following question: \"{query}\"\n\
             Please provide a simple, clear, and short answer suitable for a learner.\n\
             Focus on explaining the core concept directly related to the question and context."
        );
        self.generate(&prompt).await
    }
}

#[async_trait]
impl QuizGrader for GeminiClient {
    async fn grade(
        &self,
        lesson_slug: &str,
        questions: &[Question],
        answers: &HashMap<QuestionId, String>,
    ) -> Result<QuizResult, GradingError> {
        let prompt = build_grading_prompt(lesson_slug, questions, answers);
        let raw = self.generate(&prompt).await.map_err(GradingError::Client)?;
        parse_grade(raw)
    }
}

fn build_grading_prompt(
    lesson_slug: &str,
    questions: &[Question],
    answers: &HashMap<QuestionId, String>,
) -> String {
    let mut prompt = format!(
        "You are an AI quiz evaluator. Evaluate the following quiz submission for the lesson \"{lesson_slug}\".\n\
         For each question, I will provide the question text, its type, the user's answer, and the correct answer or explanation.\n\
         Please provide an overall score (as an integer out of 100) and constructive feedback for the user.\n\n\
         Here is the quiz data:\n"
    );

    for (index, question) in questions.iter().enumerate() {
        let _ = write!(prompt, "\n--- Question {} ---\n", index + 1);
        let _ = writeln!(prompt, "Text: {}", question.text());
        let answer = answers.get(question.id()).map(String::as_str);

        match question {
            Question::MultipleChoice {
                options,
                explanation,
                ..
            } => {
                let _ = writeln!(prompt, "Type: mcq");
                let selected = answer
                    .and_then(|a| options.iter().find(|opt| opt.id == a))
                    .map_or("Invalid option selected or not answered", |opt| {
                        opt.text.as_str()
                    });
                let correct = options
                    .iter()
                    .find(|opt| opt.is_correct)
                    .map_or("N/A", |opt| opt.text.as_str());
                let _ = writeln!(prompt, "User's Answer: {selected}");
                let _ = writeln!(prompt, "Correct Answer: {correct}");
                let _ = writeln!(prompt, "Explanation: {explanation}");
            }
            Question::Open { explanation, .. } => {
                let _ = writeln!(prompt, "Type: normal");
                let _ = writeln!(prompt, "User's Answer: {}", answer.unwrap_or("Not answered"));
                let _ = writeln!(prompt, "Expected Answer/Guidance: {explanation}");
            }
        }
    }

    prompt.push_str(
        "\nBased on this submission, please provide your evaluation strictly in the following JSON format:\n\
         {\n  \"score\": <integer_score_out_of_100>,\n  \"feedback\": \"<string_feedback_for_the_user>\"\n}\n\
         Do not include any other text or markdown formatting outside of this JSON structure.",
    );

    prompt
}

/// Parse the grader's verdict: strict JSON, tolerating one enclosing
/// markdown code fence which is stripped before parsing.
fn parse_grade(raw: String) -> Result<QuizResult, GradingError> {
    let json = strip_code_fence(&raw);
    let verdict: GradeVerdict = serde_json::from_str(json)
        .map_err(|_| GradingError::MalformedResponse { raw: raw.clone() })?;
    QuizResult::from_grader(verdict.score, verdict.feedback)
        .map_err(|_| GradingError::InvalidScore(verdict.score))
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    inner.trim()
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GradeVerdict {
    score: i64,
    feedback: String,
}
