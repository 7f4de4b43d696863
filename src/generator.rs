//! The quiz generation pipeline.
//!
//! `Extracting -> Truncating -> Prompting -> AwaitingProvider -> Parsing -> Done`,
//! with any failure landing in the fallback bank. [`QuizGenerator::generate`]
//! never returns an error; the outcome says whether the questions were generated
//! or are the canned fallback, and why.

use crate::error::QuizError;
use crate::extract::{self, ExtractedContent, MAX_CONTENT_CHARS};
use crate::models::{Difficulty, Question, QuizOutcome, QuizRequest};
use crate::parser::QuestionParser;
use crate::prompt::build_prompt;
use crate::provider::ProviderState;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

const LOW_CONTENT_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    Truncating,
    Prompting,
    AwaitingProvider,
    Parsing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Extracting => "extracting",
            Stage::Truncating => "truncating",
            Stage::Prompting => "prompting",
            Stage::AwaitingProvider => "awaiting_provider",
            Stage::Parsing => "parsing",
        })
    }
}

pub struct QuizGenerator {
    provider: ProviderState,
    parser: QuestionParser,
}

impl QuizGenerator {
    pub fn new(provider: ProviderState, parser: QuestionParser) -> Self {
        Self { provider, parser }
    }

    pub fn provider(&self) -> &ProviderState {
        &self.provider
    }

    /// Untagged entry point: always a non-empty list of questions.
    pub async fn generate_quiz(&self, file_path: impl AsRef<Path>, question_count: usize, difficulty: &str) -> Vec<Question> {
        let request = QuizRequest::new(file_path.as_ref(), question_count, Difficulty::parse_lenient(difficulty));
        self.generate(&request).await.questions
    }

    pub async fn generate(&self, request: &QuizRequest) -> QuizOutcome {
        info!(
            file = %request.source_path.display(),
            questions = request.requested_count,
            difficulty = %request.difficulty,
            provider = %self.provider.kind(),
            "quiz generation requested"
        );

        match self.run(request).await {
            Ok(questions) => {
                info!(count = questions.len(), "quiz generated");
                QuizOutcome::generated(questions)
            }
            Err((stage, err)) => {
                warn!(stage = %stage, reason = %err.kind(), error = %err, "returning fallback questions");
                QuizOutcome::fallback(err.kind())
            }
        }
    }

    async fn run(&self, request: &QuizRequest) -> Result<Vec<Question>, (Stage, QuizError)> {
        let path = request.source_path.clone();
        let mut content = tokio::task::spawn_blocking(move || extract::extract(&path))
            .await
            .map_err(|e| {
                let err = QuizError::Extraction {
                    path: request.source_path.display().to_string(),
                    message: format!("extraction task failed: {e}"),
                };
                (Stage::Extracting, err)
            })?
            .map_err(|e| (Stage::Extracting, e))?;

        log_content(&content);

        if content.truncate(MAX_CONTENT_CHARS) {
            debug!(stage = %Stage::Truncating, limit = MAX_CONTENT_CHARS, "content truncated");
        }

        let prompt = build_prompt(&content.raw_text, request.requested_count, request.difficulty);
        debug!(stage = %Stage::Prompting, prompt_chars = prompt.chars().count(), "prompt rendered");

        let Some(client) = self.provider.client() else {
            let err = match self.provider.init_error() {
                Some(message) => QuizError::ProviderInit(message.to_string()),
                None => QuizError::NoProvider,
            };
            return Err((Stage::AwaitingProvider, err));
        };

        let raw = client
            .complete(&prompt)
            .await
            .map_err(|e| (Stage::AwaitingProvider, QuizError::ProviderCall(format!("{e:#}"))))?;
        let preview: String = raw.chars().take(200).collect();
        debug!(stage = %Stage::AwaitingProvider, preview = %preview, "provider responded");

        self.parser.parse(&raw).map_err(|e| {
            if let QuizError::MalformedResponse { details, .. } = &e {
                debug!(stage = %Stage::Parsing, ?details, "response rejected");
            }
            (Stage::Parsing, e)
        })
    }
}

fn log_content(content: &ExtractedContent) {
    let preview: String = content.raw_text.chars().take(200).collect();
    if content.character_count < LOW_CONTENT_CHARS {
        warn!(
            chars = content.character_count,
            preview = %preview,
            "very little text extracted, document may be image-only"
        );
    } else {
        info!(chars = content.character_count, "text extracted");
        debug!(preview = %preview, "extracted text preview");
    }
}
