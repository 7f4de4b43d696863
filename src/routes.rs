use crate::handlers;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

fn cors_layer(state: &AppState) -> CorsLayer {
    if state.config.allows_any_origin() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid allowed origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_credentials(true)
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderName::from_static("x-request-id"),
        ])
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state);
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/generate-quiz", post(handlers::generate_quiz))
        .route("/chat", post(handlers::chat))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::generator::QuizGenerator;
    use crate::parser::QuestionParser;
    use crate::provider::ProviderState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn router(config: Config) -> Router {
        let generator = QuizGenerator::new(ProviderState::fallback(), QuestionParser::from_contract().unwrap());
        build_router(AppState::new(config, generator))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn status_reports_fallback_provider() {
        let response = router(Config::default())
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["provider"], "fallback");
        assert_eq!(body["features"]["ai_generation"], false);
        assert_eq!(body["fallback_reason"], "no_provider");
    }

    #[tokio::test]
    async fn chat_without_provider_is_unavailable() {
        let response = router(Config::default())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header("content-type", "application/json")
                    .header("x-request-id", "chat-1")
                    .body(Body::from(r#"{"message":"hello"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "AI_UNAVAILABLE");
        assert_eq!(body["error"]["request_id"], "chat-1");
    }

    fn multipart_request(parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
        let boundary = "quiz-boundary";
        let mut body = Vec::new();
        for (name, filename, content) in parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            let disposition = match filename {
                Some(f) => format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\r\n"),
                None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"),
            };
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/generate-quiz")
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .header("x-request-id", "upload-7")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn oversized_upload_is_payload_too_large() {
        let config = Config {
            max_upload_bytes: 1024,
            ..Config::default()
        };
        let big = vec![b'x'; 4096];
        let response = router(config)
            .oneshot(multipart_request(&[
                ("num_questions", None, &b"3"[..]),
                ("file", Some("huge.pdf"), &big[..]),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(body["error"]["request_id"], "upload-7");
    }

    #[tokio::test]
    async fn truncated_form_field_is_bad_request() {
        // no closing boundary, so the field body never ends
        let body = "--quiz-boundary\r\nContent-Disposition: form-data; name=\"difficulty\"\r\n\r\neas";
        let request = Request::builder()
            .method("POST")
            .uri("/generate-quiz")
            .header("content-type", "multipart/form-data; boundary=quiz-boundary")
            .body(Body::from(body))
            .unwrap();

        let response = router(Config::default()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        let message = body["error"]["message"].as_str().unwrap();
        assert!(message.starts_with("failed to read"), "{message}");
        assert!(body["error"]["details"].as_array().map_or(true, |d| d.is_empty()));
    }

    #[tokio::test]
    async fn cors_echoes_configured_origin() {
        let config = Config {
            allowed_origins: vec!["http://localhost:3000".into()],
            ..Config::default()
        };
        let response = router(config)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
    }
}
