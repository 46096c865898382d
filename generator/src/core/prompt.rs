//! Prompt text and structured-output contract sent with every chunk

use serde_json::{json, Value};
use shared::{GenerationRequest, ItemKind};

/// Field order the backend is asked to follow
pub const PROPERTY_ORDERING: [&str; 3] = ["question", "options", "answer"];

/// Option labels every question must provide
pub const OPTION_LABELS: [&str; 4] = ["A", "B", "C", "D"];

/// Build the instruction text for one chunk
pub fn build_prompt(request: &GenerationRequest, items_per_chunk: usize) -> String {
    let kind = request.item_kind();
    let language = request.language().display_name();
    let level = request.difficulty();

    let (shape_hint, example_question) = match kind {
        ItemKind::SingleChoice => (
            "Each question should have four answer choices labeled as A, B, C, and D.",
            "What is X?",
        ),
        ItemKind::FillInTheBlank => (
            "Each question should have four answer choices labeled as A, B, C, and D. \
             The question must contain a blank represented by \"_____\".",
            "X is _____, in Hanoi.",
        ),
    };

    format!(
        "Generate {items_per_chunk} {kind} questions based on the document file.\n\
         {shape_hint}\n\
         Return a JSON array where each element looks like:\n\
         [{{\"question\": \"{example_question}\", \"options\": {{\"A\": \"...\", \"B\": \"...\", \"C\": \"...\", \"D\": \"...\"}}, \"answer\": \"A\"}}]\n\
         Ensure:\n\
         - The language used in the questions and answers is {language}.\n\
         - Difficulty ranges from 1 (very easy) to 5 (very difficult); all questions must be at level {level}.\n\
         - The correct answer is a single letter: \"A\", \"B\", \"C\", or \"D\".\n\
         - The response is a valid JSON array with no markdown, code fences or extra explanation."
    )
}

/// Declared response schema: an array of question objects
pub fn response_schema() -> Value {
    let option_properties: serde_json::Map<String, Value> = OPTION_LABELS
        .iter()
        .map(|label| (label.to_string(), json!({ "type": "STRING" })))
        .collect();

    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "question": { "type": "STRING" },
                "options": {
                    "type": "OBJECT",
                    "properties": option_properties,
                    "required": OPTION_LABELS,
                },
                "answer": { "type": "STRING" },
            },
            "propertyOrdering": PROPERTY_ORDERING,
        }
    })
}
