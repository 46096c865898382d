//! Test fixtures for webserver integration tests

use lopdf::{dictionary, Document, Object, Stream};

/// Standard test data
pub struct TestFixtures;

impl TestFixtures {
    pub const SESSION_1: &'static str = "6f1c2b1e-9d3a-4c55-8e0f-0a1b2c3d4e01";
    pub const SESSION_2: &'static str = "6f1c2b1e-9d3a-4c55-8e0f-0a1b2c3d4e02";
    pub const SAVE_DATA: &'static str = r#"{"userId":"u-42","folder":{"id":7}}"#;

    /// In-memory PDF with `pages` pages
    pub fn sample_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for number in 1..=pages {
            let content = format!("BT /F1 18 Tf 72 700 Td (Chapter {number}) Tj ET");
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

    /// A complete upload form for `session` asking for `count` questions
    pub fn upload_form(session: &str, count: u32, pages: usize) -> MultipartBody {
        MultipartBody::new()
            .text("sessionId", session)
            .text("questionType", "single_choice")
            .text("numberOfQuestions", &count.to_string())
            .text("language", "en")
            .text("level", "3")
            .text("saveData", Self::SAVE_DATA)
            .file("file", "notes.pdf", "application/pdf", &Self::sample_pdf(pages))
    }
}

/// Hand-built `multipart/form-data` body
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "----quizgen-test-boundary-7MA4YWxkTrZu0gW".to_string(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        let header = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n",
            self.boundary, name
        );
        self.body.extend_from_slice(header.as_bytes());
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        let header = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            self.boundary, name, file_name, content_type
        );
        self.body.extend_from_slice(header.as_bytes());
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn finish(mut self) -> (String, Vec<u8>) {
        let closing = format!("--{}--\r\n", self.boundary);
        self.body.extend_from_slice(closing.as_bytes());
        (self.content_type(), self.body)
    }
}
