use crate::models::Difficulty;

pub const EASY_GUIDANCE: &str = "Focus on definitions, basic concepts, and direct facts from the content";
pub const MEDIUM_GUIDANCE: &str = "Require understanding and application of concepts";
pub const HARD_GUIDANCE: &str = "Test deep comprehension, analysis, and synthesis of information";

/// System message sent alongside the prompt to chat-style providers.
pub const SYSTEM_INSTRUCTION: &str = "You are a professional quiz generator that outputs only valid JSON arrays. \
Never include markdown formatting or explanations.";

pub fn guidance(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => EASY_GUIDANCE,
        Difficulty::Medium => MEDIUM_GUIDANCE,
        Difficulty::Hard => HARD_GUIDANCE,
    }
}

/// Renders the generation prompt. Output depends only on the three arguments.
pub fn build_prompt(content: &str, count: usize, difficulty: Difficulty) -> String {
    format!(
        r#"You are an expert quiz generator for technical presentations and educational content.

CONTENT TO ANALYZE:
{content}

TASK:
Generate {count} high-quality multiple-choice questions based strictly on the content above.

DIFFICULTY LEVEL: {level}
- Easy: {easy}
- Medium: {medium}
- Hard: {hard}
For this quiz: {selected}.

REQUIREMENTS:
1. Questions must be directly answerable from the provided content
2. Each question should test a unique concept or fact
3. All 4 options must be plausible but only one correct
4. Avoid ambiguous or trick questions
5. Use clear, professional language
6. Ensure diversity in question types (what, how, why, which, etc.)

OUTPUT FORMAT:
Return ONLY a valid JSON array with NO markdown formatting, NO code blocks, NO explanations.
Each object must have exactly these fields:
- "q": The question text (string)
- "options": Array of exactly 4 distinct answer options (strings)
- "correct": Index (0-3) of the correct option (integer)

EXAMPLE:
[
    {{"q": "What is the primary benefit of microservices architecture?", "options": ["Monolithic design", "Independent scalability", "Single database", "Tight coupling"], "correct": 1}}
]

Generate {count} questions now:
"#,
        level = difficulty,
        easy = EASY_GUIDANCE,
        medium = MEDIUM_GUIDANCE,
        hard = HARD_GUIDANCE,
        selected = guidance(difficulty),
    )
}
