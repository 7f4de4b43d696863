use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure inside the quiz generation pipeline.
///
/// None of these ever reach the HTTP caller of `generate-quiz`; the generator
/// turns every one of them into a fallback outcome tagged with [`ErrorKind`].
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to extract text from {path}: {message}")]
    Extraction { path: String, message: String },
    #[error("provider call failed: {0}")]
    ProviderCall(String),
    #[error("malformed provider response: {message}")]
    MalformedResponse {
        message: String,
        details: Vec<ErrorDetail>,
    },
    #[error("provider initialization failed: {0}")]
    ProviderInit(String),
    #[error("no AI provider configured")]
    NoProvider,
}

impl QuizError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::Extraction { .. } => ErrorKind::ExtractionFailure,
            Self::ProviderCall(_) => ErrorKind::ProviderCallFailure,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::ProviderInit(_) => ErrorKind::ProviderInitFailure,
            Self::NoProvider => ErrorKind::NoProvider,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedFormat,
    ExtractionFailure,
    ProviderCallFailure,
    MalformedResponse,
    ProviderInitFailure,
    NoProvider,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnsupportedFormat => "unsupported_format",
            Self::ExtractionFailure => "extraction_failure",
            Self::ProviderCallFailure => "provider_call_failure",
            Self::MalformedResponse => "malformed_response",
            Self::ProviderInitFailure => "provider_init_failure",
            Self::NoProvider => "no_provider",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorDetail {
    pub field: String,
    pub issue: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
    pub request_id: String,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Vec<ErrorDetail>,
    pub request_id: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: Vec::new(),
            request_id: request_id.into(),
        }
    }

    pub fn with_details(mut self, details: Vec<ErrorDetail>) -> Self {
        self.details = details;
        self
    }

    pub fn bad_request(message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message, request_id)
    }

    pub fn internal(message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message, request_id)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let payload = ErrorBody {
            error: ErrorPayload {
                code: self.code,
                message: self.message,
                details: self.details,
                request_id: self.request_id,
            },
        };
        (self.status, Json(payload)).into_response()
    }
}
