//! Test fixtures and canned backend replies

use lopdf::{dictionary, Document, Object, Stream};
use serde_json::{json, Map, Value};
use shared::{DifficultyLevel, GenerationRequest, ItemKind, Language, SessionId};

/// Standard test data
pub struct TestFixtures;

impl TestFixtures {
    pub const SESSION_1: &'static str = "550e8400-e29b-41d4-a716-446655440001";
    pub const SESSION_2: &'static str = "550e8400-e29b-41d4-a716-446655440002";

    pub fn session_1() -> SessionId {
        SessionId::parse_uuid(Self::SESSION_1).unwrap()
    }

    pub fn session_2() -> SessionId {
        SessionId::parse_uuid(Self::SESSION_2).unwrap()
    }

    /// A fresh session id so tests sharing a registry never collide
    pub fn unique_session() -> SessionId {
        SessionId::generate()
    }

    pub fn save_data() -> Map<String, Value> {
        let mut save_data = Map::new();
        save_data.insert("userId".to_string(), json!("u-42"));
        save_data.insert("folder".to_string(), json!({"id": 7}));
        save_data
    }

    pub fn request(target: i64) -> GenerationRequest {
        GenerationRequest::new(
            target,
            ItemKind::SingleChoice,
            Language::En,
            DifficultyLevel::default(),
            Self::save_data(),
        )
        .unwrap()
    }

    /// One well-formed question object
    pub fn question(label: &str) -> Value {
        json!({
            "question": format!("What is {label}?"),
            "options": {"A": "one", "B": "two", "C": "three", "D": "four"},
            "answer": "A",
        })
    }

    /// Reply text holding `count` questions labelled after the chunk's first page
    pub fn reply_for(first_page: usize, count: usize) -> String {
        let questions: Vec<Value> = (0..count)
            .map(|n| Self::question(&format!("p{first_page}-{n}")))
            .collect();
        Value::Array(questions).to_string()
    }

    /// In-memory PDF whose page N draws the text "Page N"
    pub fn sample_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for number in 1..=pages {
            let content = format!("BT /F1 24 Tf 72 720 Td (Page {number}) Tj ET");
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    /// Gemini `generateContent` reply wrapping `text`
    pub fn gemini_reply(text: &str) -> Value {
        json!({
            "candidates": [
                {
                    "content": {
                        "role": "model",
                        "parts": [{ "text": text }]
                    },
                    "finishReason": "STOP"
                }
            ],
            "usageMetadata": { "promptTokenCount": 120, "candidatesTokenCount": 80 }
        })
    }
}
