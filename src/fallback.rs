//! Canned questions served whenever generation cannot produce a quiz.

use crate::models::Question;
use once_cell::sync::Lazy;

static FALLBACK_QUESTIONS: Lazy<Vec<Question>> = Lazy::new(|| {
    vec![
        Question::new(
            "What is the primary architectural style of this application?",
            ["Monolithic", "Microservices (Client, Realtime, AI)", "Serverless only", "Mainframe"],
            1,
        ),
        Question::new(
            "Which mechanism delivers live quiz events to players?",
            ["WebSocket events", "Email", "FTP uploads", "Cron jobs"],
            0,
        ),
        Question::new(
            "What is the role of the AI service?",
            ["Host the UI", "Generate questions from files", "Manage the database", "Authenticate users"],
            1,
        ),
        Question::new(
            "Which document formats can be turned into a quiz?",
            ["DOCX and ODT", "PNG and JPEG", "PDF and PPTX", "CSV and XLSX"],
            2,
        ),
        Question::new(
            "Where is the active quiz state kept during a game?",
            ["PostgreSQL", "Redis", "In memory", "Browser local storage"],
            2,
        ),
        Question::new(
            "What format does the AI service return for generated quizzes?",
            ["Plain text", "XML", "JSON array", "CSV"],
            2,
        ),
        Question::new(
            "How many answer options does every generated question have?",
            ["Two", "Three", "Four", "Five"],
            2,
        ),
        Question::new(
            "Which setting decides the AI provider used for generation?",
            ["The configured API keys", "The uploaded file name", "The requested difficulty", "The client browser"],
            0,
        ),
        Question::new(
            "What happens when the AI provider fails during generation?",
            ["An empty list is returned", "The request crashes", "Default questions are returned", "It retries forever"],
            2,
        ),
        Question::new(
            "Why is the uploaded file deleted after quiz generation?",
            ["It is no longer needed", "The server caches it elsewhere", "The client still needs it", "It is stored in a database"],
            0,
        ),
    ]
});

pub fn fallback_questions() -> Vec<Question> {
    FALLBACK_QUESTIONS.clone()
}

/// Callers that only hold the question list can detect degraded output here.
pub fn is_fallback(questions: &[Question]) -> bool {
    questions == FALLBACK_QUESTIONS.as_slice()
}
