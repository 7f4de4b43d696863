use crate::error::ErrorKind;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const OPTIONS_PER_QUESTION: usize = 4;

/// One multiple-choice question. Serialized as `{"q", "options", "correct"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    #[serde(rename = "q")]
    pub text: String,
    pub options: Vec<String>,
    #[serde(rename = "correct", deserialize_with = "whole_number_index")]
    pub correct_index: u8,
}

/// Accepts `2` and `2.0` alike; JSON Schema treats both as integers.
fn whole_number_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if value.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(&value) {
        Ok(value as u8)
    } else {
        Err(de::Error::custom(format!("expected a whole number between 0 and 255, got {value}")))
    }
}

impl Question {
    pub fn new(text: &str, options: [&str; OPTIONS_PER_QUESTION], correct_index: u8) -> Self {
        Self {
            text: text.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_index,
        }
    }

    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_index as usize).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    /// Parses a user supplied level, falling back to [`Difficulty::Medium`].
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| {
            tracing::warn!(difficulty = %raw, "unknown difficulty, using medium");
            Difficulty::Medium
        })
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuizRequest {
    pub source_path: PathBuf,
    pub requested_count: usize,
    pub difficulty: Difficulty,
}

impl QuizRequest {
    pub fn new(source_path: impl Into<PathBuf>, requested_count: usize, difficulty: Difficulty) -> Self {
        Self {
            source_path: source_path.into(),
            requested_count: requested_count.max(1),
            difficulty,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuizSource {
    Generated,
    Fallback,
}

/// Result of one generation call: the questions plus where they came from.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QuizOutcome {
    pub questions: Vec<Question>,
    pub source: QuizSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ErrorKind>,
}

impl QuizOutcome {
    pub fn generated(questions: Vec<Question>) -> Self {
        Self {
            questions,
            source: QuizSource::Generated,
            reason: None,
        }
    }

    pub fn fallback(reason: ErrorKind) -> Self {
        Self {
            questions: crate::fallback::fallback_questions(),
            source: QuizSource::Fallback,
            reason: Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == QuizSource::Fallback
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub issue: String,
}

/// Checks the rules the wire contract cannot express on its own.
pub fn validate_questions(questions: &[Question]) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    if questions.is_empty() {
        issues.push(ValidationIssue {
            field: "$".into(),
            issue: "must contain at least one question".into(),
        });
    }

    for (i, q) in questions.iter().enumerate() {
        if q.text.trim().is_empty() {
            issues.push(ValidationIssue {
                field: format!("[{i}].q"),
                issue: "must not be empty".into(),
            });
        }
        if q.options.len() != OPTIONS_PER_QUESTION {
            issues.push(ValidationIssue {
                field: format!("[{i}].options"),
                issue: format!("must contain exactly {OPTIONS_PER_QUESTION} options"),
            });
        }
        let mut seen = HashSet::new();
        for (j, opt) in q.options.iter().enumerate() {
            if opt.trim().is_empty() {
                issues.push(ValidationIssue {
                    field: format!("[{i}].options[{j}]"),
                    issue: "must not be empty".into(),
                });
            }
            if !seen.insert(opt.trim()) {
                issues.push(ValidationIssue {
                    field: format!("[{i}].options[{j}]"),
                    issue: "must be distinct".into(),
                });
            }
        }
        if q.correct_option().is_none() {
            issues.push(ValidationIssue {
                field: format!("[{i}].correct"),
                issue: "must reference an existing option".into(),
            });
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
