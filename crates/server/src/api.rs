//! HTTP endpoints for the AI collaborators.
//!
//! The surface is deliberately thin: validate the request shape, delegate to
//! the answer/grading providers, map failures onto the status codes the
//! client expects.
//!
//! # Endpoints
//!
//! - `POST /api/learn/query` - Answer a learner question with lesson context
//! - `POST /api/quiz` - Grade a quiz submission

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use services::ai::{AnswerProvider, QuizGrader};
use spacey_core::model::{Question, QuestionId};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for the learn query endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnQueryRequest {
    pub query: Option<String>,
    pub lesson_context: Option<String>,
}

/// Response body for the learn query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnQueryResponse {
    pub answer: String,
    pub user_query: String,
}

/// Request body for the quiz grading endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmissionRequest {
    pub lesson_slug: Option<String>,
    pub questions: Option<Vec<Question>>,
    /// Unanswered multiple-choice questions arrive as explicit nulls.
    pub user_answers: Option<HashMap<QuestionId, Option<String>>>,
}

/// Response body for the quiz grading endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmissionResponse {
    pub score: u8,
    pub feedback: String,
    pub user_answers: HashMap<QuestionId, Option<String>>,
}

/// Error body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared state for the HTTP server: the two AI collaborators.
#[derive(Clone)]
pub struct AppState {
    pub answers: Arc<dyn AnswerProvider>,
    pub grader: Arc<dyn QuizGrader>,
}

impl AppState {
    #[must_use]
    pub fn new(answers: Arc<dyn AnswerProvider>, grader: Arc<dyn QuizGrader>) -> Self {
        Self { answers, grader }
    }
}

// ============================================================================
// API Error Type
// ============================================================================

enum ApiError {
    /// Required fields are missing from the request body.
    BadRequest(String),
    /// The AI collaborator failed or returned unusable data.
    Provider(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Provider(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with both endpoints, request tracing, and
/// permissive CORS for development.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/learn/query", post(handle_learn_query))
        .route("/quiz", post(handle_quiz_submission));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `POST /api/learn/query`.
async fn handle_learn_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LearnQueryRequest>,
) -> Result<Json<LearnQueryResponse>, ApiError> {
    let query = request
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing query in the request.".to_string()))?;

    let context = request
        .lesson_context
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("general space topics");

    info!(query_len = query.len(), "learn query received");

    match state.answers.answer(query, context).await {
        Ok(answer) => Ok(Json(LearnQueryResponse {
            answer,
            user_query: query.to_string(),
        })),
        Err(err) => {
            warn!(error = %err, "learn query failed");
            Err(ApiError::Provider(
                "An error occurred while I was trying to understand your question. Please try again."
                    .to_string(),
            ))
        }
    }
}

/// Handler for `POST /api/quiz`.
async fn handle_quiz_submission(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QuizSubmissionRequest>,
) -> Result<Json<QuizSubmissionResponse>, ApiError> {
    let (Some(questions), Some(user_answers)) = (request.questions, request.user_answers) else {
        return Err(ApiError::BadRequest(
            "Missing questions or userAnswers in the request.".to_string(),
        ));
    };

    let lesson_slug = request.lesson_slug.unwrap_or_default();
    info!(
        lesson = %lesson_slug,
        questions = questions.len(),
        "quiz submission received"
    );

    let answered: HashMap<QuestionId, String> = user_answers
        .iter()
        .filter_map(|(id, answer)| {
            answer
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(|a| (id.clone(), a.to_string()))
        })
        .collect();

    match state
        .grader
        .grade(&lesson_slug, &questions, &answered)
        .await
    {
        Ok(result) => Ok(Json(QuizSubmissionResponse {
            score: result.score(),
            feedback: result.feedback().to_string(),
            user_answers,
        })),
        Err(err) => {
            warn!(error = %err, "quiz grading failed");
            let message = match err {
                services::error::GradingError::MalformedResponse { .. } => {
                    "Failed to parse AI response. The AI did not return valid JSON.".to_string()
                }
                _ => "An error occurred while evaluating the quiz with AI.".to_string(),
            };
            Err(ApiError::Provider(message))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use services::error::{AiClientError, GradingError};
    use spacey_core::model::QuizResult;
    use tower::util::ServiceExt;

    struct FakeAnswers {
        fail: bool,
    }

    #[async_trait]
    impl AnswerProvider for FakeAnswers {
        async fn answer(&self, query: &str, context: &str) -> Result<String, AiClientError> {
            if self.fail {
                return Err(AiClientError::EmptyResponse);
            }
            Ok(format!("[{context}] {query} answered"))
        }
    }

    enum FakeVerdict {
        Score(i64),
        Malformed,
    }

    struct FakeGrader {
        verdict: FakeVerdict,
    }

    #[async_trait]
    impl QuizGrader for FakeGrader {
        async fn grade(
            &self,
            _lesson_slug: &str,
            _questions: &[Question],
            _answers: &HashMap<QuestionId, String>,
        ) -> Result<QuizResult, GradingError> {
            match self.verdict {
                FakeVerdict::Score(score) => Ok(QuizResult::from_grader(score, "Well done.")
                    .map_err(|_| GradingError::InvalidScore(score))?),
                FakeVerdict::Malformed => Err(GradingError::MalformedResponse {
                    raw: "not json".into(),
                }),
            }
        }
    }

    fn router(fail_answers: bool, verdict: FakeVerdict) -> Router {
        create_router(AppState::new(
            Arc::new(FakeAnswers { fail: fail_answers }),
            Arc::new(FakeGrader { verdict }),
        ))
    }

    async fn post_json(router: Router, uri: &str, body: serde_json::Value) -> (StatusCode, Vec<u8>) {
        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn learn_query_answers_with_context() {
        let (status, body) = post_json(
            router(false, FakeVerdict::Score(0)),
            "/api/learn/query",
            serde_json::json!({
                "query": "Why do satellites stay up?",
                "lessonContext": "Orbital mechanics"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let response: LearnQueryResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response.user_query, "Why do satellites stay up?");
        assert!(response.answer.contains("Orbital mechanics"));
    }

    #[tokio::test]
    async fn learn_query_without_query_is_400() {
        let (status, body) = post_json(
            router(false, FakeVerdict::Score(0)),
            "/api/learn/query",
            serde_json::json!({ "lessonContext": "Orbits" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.message, "Missing query in the request.");
    }

    #[tokio::test]
    async fn learn_query_provider_failure_is_500() {
        let (status, body) = post_json(
            router(true, FakeVerdict::Score(0)),
            "/api/learn/query",
            serde_json::json!({ "query": "hello" }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(error.message.contains("trying to understand your question"));
    }

    fn submission_body() -> serde_json::Value {
        serde_json::json!({
            "lessonSlug": "build-your-own-satellite",
            "questions": [
                {
                    "type": "mcq",
                    "id": "q1",
                    "text": "Which force keeps a satellite in orbit?",
                    "options": [
                        { "id": "a", "text": "Gravity", "isCorrect": true },
                        { "id": "b", "text": "Magnetism", "isCorrect": false }
                    ],
                    "explanation": "Gravity."
                },
                { "type": "normal", "id": "q2", "text": "What is a payload?" }
            ],
            "userAnswers": { "q1": "a", "q2": "Instruments." }
        })
    }

    #[tokio::test]
    async fn quiz_submission_returns_score_feedback_and_answers() {
        let (status, body) = post_json(
            router(false, FakeVerdict::Score(85)),
            "/api/quiz",
            submission_body(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let response: QuizSubmissionResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response.score, 85);
        assert_eq!(response.feedback, "Well done.");
        assert_eq!(
            response.user_answers[&QuestionId::new("q1").unwrap()],
            Some("a".to_string())
        );
    }

    #[tokio::test]
    async fn quiz_submission_missing_fields_is_400() {
        let (status, body) = post_json(
            router(false, FakeVerdict::Score(85)),
            "/api/quiz",
            serde_json::json!({ "lessonSlug": "x" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            error.message,
            "Missing questions or userAnswers in the request."
        );
    }

    #[tokio::test]
    async fn quiz_grading_parse_failure_is_500() {
        let (status, body) = post_json(
            router(false, FakeVerdict::Malformed),
            "/api/quiz",
            submission_body(),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(error.message.contains("did not return valid JSON"));
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = router(false, FakeVerdict::Score(0))
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/api/unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
