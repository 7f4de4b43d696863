//! Recovers the question array from free-form provider output.
//!
//! Models often wrap JSON in a markdown fence or add a sentence around it, so
//! the text is unwrapped first: fence markers are stripped, then the span from
//! the first `[` to the last `]` is kept. What remains must satisfy the
//! embedded contract (`contracts/quiz_questions.schema.json`) and the semantic
//! checks in [`validate_questions`].

use crate::error::{ErrorDetail, QuizError};
use crate::models::{validate_questions, Question};
use anyhow::anyhow;
use jsonschema::Validator;
use serde_json::Value;

const FENCE: &str = "```";

pub struct QuestionParser {
    validator: Validator,
}

impl QuestionParser {
    pub fn from_contract() -> anyhow::Result<Self> {
        let schema_raw = include_str!("../contracts/quiz_questions.schema.json");
        let schema: Value = serde_json::from_str(schema_raw)?;
        let validator = jsonschema::draft202012::new(&schema)
            .map_err(|e| anyhow!("question contract does not compile: {e}"))?;
        Ok(Self { validator })
    }

    pub fn parse(&self, raw: &str) -> Result<Vec<Question>, QuizError> {
        let candidate = slice_array(strip_fences(raw));
        if candidate.is_empty() {
            return Err(QuizError::malformed("provider returned no content"));
        }

        let value: Value = serde_json::from_str(candidate)
            .map_err(|e| QuizError::malformed(format!("response is not valid json: {e}")))?;

        if !self.validator.is_valid(&value) {
            let details = self
                .validator
                .iter_errors(&value)
                .map(|e| {
                    let path = e.instance_path.to_string();
                    ErrorDetail {
                        field: if path.is_empty() { "$".to_string() } else { path },
                        issue: e.to_string(),
                    }
                })
                .collect();
            return Err(QuizError::MalformedResponse {
                message: "response does not match the question contract".to_string(),
                details,
            });
        }

        let questions: Vec<Question> = serde_json::from_value(value)
            .map_err(|e| QuizError::malformed(format!("cannot decode questions: {e}")))?;

        validate_questions(&questions).map_err(|issues| QuizError::MalformedResponse {
            message: "question validation failed".to_string(),
            details: issues
                .into_iter()
                .map(|i| ErrorDetail {
                    field: i.field,
                    issue: i.issue,
                })
                .collect(),
        })?;

        Ok(questions)
    }
}

/// Removes a leading fence (with an optional language tag) and a trailing fence.
pub fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix(FENCE) {
        text = match rest.split_once('\n') {
            Some((tag, body)) if is_language_tag(tag) => body,
            None if is_language_tag(rest) => "",
            _ => rest,
        };
    }

    text = text.trim_end();
    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest;
    }
    text.trim()
}

/// Narrows `text` to the span between the first `[` and the last `]`, if both exist.
pub fn slice_array(text: &str) -> &str {
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

fn is_language_tag(s: &str) -> bool {
    s.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '.'))
}
