use crate::error::{AppError, ErrorDetail, ErrorKind};
use crate::models::{Difficulty, Question, QuizRequest, QuizSource};
use crate::state::AppState;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

pub const SERVICE_NAME: &str = "Quiz AI Service";
pub const DEFAULT_QUESTION_COUNT: usize = 5;
pub const MAX_QUESTION_COUNT: usize = 50;

const CHAT_PREAMBLE: &str = "You are the quiz platform AI assistant, a helpful expert \
ready to assist users with creating and running quizzes.";

fn request_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
        "provider": state.generator.provider().kind(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "active",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let provider = state.generator.provider();
    let ai_ready = provider.client().is_some();
    Json(json!({
        "status": "active",
        "provider": provider.kind(),
        "init_error": provider.init_error(),
        "fallback_reason": (!ai_ready).then(|| provider.unavailable_reason()),
        "features": {
            "pdf_quiz_generation": true,
            "pptx_quiz_generation": true,
            "ai_generation": ai_ready,
            "chat": ai_ready,
        },
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizParams {
    pub num_questions: usize,
    pub difficulty: Difficulty,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateQuizResponse {
    pub message: String,
    pub filename: String,
    pub params: QuizParams,
    pub quiz_data: Vec<Question>,
    pub source: QuizSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ErrorKind>,
}

/// Oversized bodies become 413; anything else is a malformed form.
fn multipart_error(err: MultipartError, context: &str, req_id: &str) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "PAYLOAD_TOO_LARGE",
            format!("upload exceeds the size limit: {}", err.body_text()),
            req_id,
        );
    }
    AppError::bad_request(format!("failed to read {}: {}", context, err), req_id)
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

/// Multipart upload (`file`, `num_questions`, `difficulty`) turned into a quiz.
///
/// Generation failures degrade to fallback questions; only a malformed form or
/// failing to store the upload produce an error response.
pub async fn generate_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<GenerateQuizResponse>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let mut upload: Option<Upload> = None;
    let mut num_questions = DEFAULT_QUESTION_COUNT;
    let mut difficulty = Difficulty::Medium;
    let mut issues = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "multipart", &req_id))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, "file", &req_id))?;
                upload = Some(Upload { filename, bytes: bytes.to_vec() });
            }
            "num_questions" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, "num_questions", &req_id))?;
                match raw.trim().parse::<usize>() {
                    Ok(n) if (1..=MAX_QUESTION_COUNT).contains(&n) => num_questions = n,
                    _ => issues.push(ErrorDetail {
                        field: "num_questions".into(),
                        issue: format!("must be an integer between 1 and {MAX_QUESTION_COUNT}"),
                    }),
                }
            }
            "difficulty" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, "difficulty", &req_id))?;
                match raw.parse::<Difficulty>() {
                    Ok(d) => difficulty = d,
                    Err(_) => issues.push(ErrorDetail {
                        field: "difficulty".into(),
                        issue: "must be one of easy, medium, hard".into(),
                    }),
                }
            }
            other => warn!(field = %other, "ignoring unknown multipart field"),
        }
    }

    let Some(upload) = upload else {
        issues.push(ErrorDetail {
            field: "file".into(),
            issue: "is required".into(),
        });
        return Err(AppError::bad_request("no file uploaded", req_id).with_details(issues));
    };
    if !issues.is_empty() {
        return Err(AppError::bad_request("invalid quiz parameters", req_id).with_details(issues));
    }

    let path = state.upload_path(&upload.filename).ok_or_else(|| {
        AppError::bad_request("invalid file name", req_id.clone()).with_details(vec![ErrorDetail {
            field: "file".into(),
            issue: "file name must not be empty or hidden".into(),
        }])
    })?;

    tokio::fs::create_dir_all(&state.config.upload_dir)
        .await
        .map_err(|e| AppError::internal(format!("failed to prepare upload directory: {}", e), req_id.clone()))?;
    store_upload(&path, &upload.bytes, &req_id)
        .await
        .map_err(|e| AppError::internal(format!("failed to save upload: {}", e), req_id.clone()))?;
    info!(request_id = %req_id, file = %path.display(), bytes = upload.bytes.len(), "upload stored");

    let outcome = state
        .generator
        .generate(&QuizRequest::new(&path, num_questions, difficulty))
        .await;

    remove_upload(&path, &req_id).await;

    let message = match outcome.source {
        QuizSource::Generated => "Quiz generated successfully",
        QuizSource::Fallback => "Quiz generation degraded to fallback questions",
    };

    Ok(Json(GenerateQuizResponse {
        message: message.to_string(),
        filename: upload.filename,
        params: QuizParams { num_questions, difficulty },
        quiz_data: outcome.questions,
        source: outcome.source,
        reason: outcome.reason,
    }))
}

/// Writes the upload; a failed write leaves nothing behind.
async fn store_upload(path: &Path, bytes: &[u8], req_id: &str) -> std::io::Result<()> {
    let written = async {
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(bytes).await?;
        file.flush().await
    }
    .await;
    if written.is_err() {
        remove_upload(path, req_id).await;
    }
    written
}

async fn remove_upload(path: &Path, req_id: &str) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(request_id = %req_id, file = %path.display(), error = %err, "failed to delete upload"),
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatPayload {
    pub message: String,
}

pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChatPayload>,
) -> Result<Json<Value>, AppError> {
    let req_id = request_id_from_headers(&headers);
    if payload.message.trim().is_empty() {
        return Err(AppError::bad_request("message must not be empty", req_id));
    }

    let client = state.generator.provider().client().cloned().ok_or_else(|| {
        AppError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "AI_UNAVAILABLE",
            "no AI provider configured",
            req_id.clone(),
        )
    })?;

    let prompt = format!("{}\n\nUser Query: {}\n", CHAT_PREAMBLE, payload.message.trim());
    let response = client.complete(&prompt).await.map_err(|e| {
        warn!(request_id = %req_id, error = %format!("{e:#}"), "chat completion failed");
        AppError::new(
            StatusCode::BAD_GATEWAY,
            "UPSTREAM_ERROR",
            format!("ai provider failed: {}", e),
            req_id.clone(),
        )
    })?;

    Ok(Json(json!({ "response": response })))
}
