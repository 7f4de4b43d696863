//! Provider selection and the HTTP clients for each LLM backend.

use crate::config::{mask_secret, Config};
use crate::error::{ErrorKind, QuizError};
use crate::prompt::SYSTEM_INSTRUCTION;
use anyhow::{anyhow, bail, Context};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A backend that turns a prompt into free-form text.
pub trait LlmClient: Send + Sync {
    fn complete(&self, prompt: &str) -> BoxFuture<'static, anyhow::Result<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "fallback")]
    Fallback,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Fallback => "fallback",
        })
    }
}

/// The provider chosen at startup. Immutable afterwards and shared by all requests.
#[derive(Clone)]
pub struct ProviderState {
    kind: ProviderKind,
    client: Option<Arc<dyn LlmClient>>,
    init_error: Option<String>,
}

impl ProviderState {
    pub fn fallback() -> Self {
        Self {
            kind: ProviderKind::Fallback,
            client: None,
            init_error: None,
        }
    }

    fn failed(error: QuizError) -> Self {
        Self {
            kind: ProviderKind::Fallback,
            client: None,
            init_error: Some(error.to_string()),
        }
    }

    pub fn with_client(kind: ProviderKind, client: Arc<dyn LlmClient>) -> Self {
        Self {
            kind,
            client: Some(client),
            init_error: None,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn client(&self) -> Option<&Arc<dyn LlmClient>> {
        self.client.as_ref()
    }

    pub fn init_error(&self) -> Option<&str> {
        self.init_error.as_deref()
    }

    /// Why no client is available: a failed startup or simply no credentials.
    pub fn unavailable_reason(&self) -> ErrorKind {
        if self.init_error.is_some() {
            ErrorKind::ProviderInitFailure
        } else {
            ErrorKind::NoProvider
        }
    }
}

impl fmt::Debug for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderState")
            .field("kind", &self.kind)
            .field("has_client", &self.client.is_some())
            .field("init_error", &self.init_error)
            .finish()
    }
}

/// Picks the active provider once, in priority order Gemini, OpenAI, fallback.
///
/// A Gemini key that fails to initialise does not fall through to OpenAI.
pub fn init_providers(config: &Config) -> ProviderState {
    let gemini_key = config.usable_gemini_key().filter(|_| cfg!(feature = "gemini"));
    let openai_key = config.usable_openai_key().filter(|_| cfg!(feature = "openai"));

    if let Some(key) = gemini_key {
        return match GeminiClient::new(config, key) {
            Ok(client) => {
                info!(provider = "gemini", model = %config.gemini_model, key = %mask_secret(key), "ai provider initialized");
                ProviderState::with_client(ProviderKind::Gemini, Arc::new(client))
            }
            Err(err) => {
                warn!(provider = "gemini", error = %format!("{err:#}"), "gemini initialization failed, using fallback questions");
                ProviderState::failed(QuizError::ProviderInit(format!("{err:#}")))
            }
        };
    }

    if let Some(key) = openai_key {
        return match OpenAiClient::new(config, key) {
            Ok(client) => {
                info!(provider = "openai", model = %config.openai_model, key = %mask_secret(key), "ai provider initialized");
                ProviderState::with_client(ProviderKind::OpenAi, Arc::new(client))
            }
            Err(err) => {
                warn!(provider = "openai", error = %format!("{err:#}"), "openai initialization failed, using fallback questions");
                ProviderState::failed(QuizError::ProviderInit(format!("{err:#}")))
            }
        };
    }

    warn!(
        gemini_compiled = cfg!(feature = "gemini"),
        openai_compiled = cfg!(feature = "openai"),
        gemini_key_present = config.gemini_api_key.is_some(),
        openai_key_present = config.openai_api_key.is_some(),
        "no valid AI API key found, using fallback questions"
    );
    ProviderState::fallback()
}

fn http_client(config: &Config) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.llm_connect_timeout_secs))
        .timeout(Duration::from_secs(config.llm_timeout_secs))
        .build()
        .context("building http client")
}

fn checked_base_url(raw: &str) -> anyhow::Result<String> {
    let url = reqwest::Url::parse(raw).with_context(|| format!("invalid base url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("unsupported scheme in base url '{raw}'");
    }
    Ok(raw.trim_end_matches('/').to_string())
}

async fn error_for_status(provider: &str, response: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(300).collect();
    Err(anyhow!("{provider} returned {status}: {snippet}"))
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &Config, api_key: &str) -> anyhow::Result<Self> {
        let base_url = checked_base_url(&config.gemini_base_url)?;
        let model = config.gemini_model.trim_start_matches("models/");
        Ok(Self {
            http: http_client(config)?,
            endpoint: format!("{base_url}/models/{model}:generateContent"),
            api_key: api_key.to_string(),
        })
    }
}

impl LlmClient for GeminiClient {
    fn complete(&self, prompt: &str) -> BoxFuture<'static, anyhow::Result<String>> {
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt.to_string() }],
            }],
            generation_config: GeminiGenerationConfig { temperature: 0.7 },
        };

        Box::pin(async move {
            let response = http
                .post(&endpoint)
                .query(&[("key", api_key.as_str())])
                .json(&request)
                .send()
                .await
                .context("gemini request failed")?;
            let response = error_for_status("gemini", response).await?;
            let body: GeminiResponse = response.json().await.context("decoding gemini response")?;

            let text = body
                .candidates
                .into_iter()
                .next()
                .map(|c| c.content.parts.into_iter().map(|p| p.text).collect::<String>())
                .unwrap_or_default();
            if text.trim().is_empty() {
                bail!("gemini returned empty content");
            }
            Ok(text)
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &Config, api_key: &str) -> anyhow::Result<Self> {
        let base_url = checked_base_url(&config.openai_base_url)?;
        Ok(Self {
            http: http_client(config)?,
            endpoint: format!("{base_url}/chat/completions"),
            api_key: api_key.to_string(),
            model: config.openai_model.clone(),
        })
    }
}

impl LlmClient for OpenAiClient {
    fn complete(&self, prompt: &str) -> BoxFuture<'static, anyhow::Result<String>> {
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(SYSTEM_INSTRUCTION.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(prompt.to_string()),
                },
            ],
            temperature: 0.7,
            max_tokens: 2000,
        };

        Box::pin(async move {
            let response = http
                .post(&endpoint)
                .bearer_auth(&api_key)
                .json(&request)
                .send()
                .await
                .context("openai request failed")?;
            let response = error_for_status("openai", response).await?;
            let body: ChatResponse = response.json().await.context("decoding openai response")?;

            let text = body
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .unwrap_or_default();
            if text.trim().is_empty() {
                bail!("openai returned empty content");
            }
            Ok(text)
        })
    }
}
