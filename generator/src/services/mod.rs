//! Generator services implementations

pub mod gemini_backend;
pub mod pdf_extractor;
pub mod session_registry;
pub mod structured_client;

pub use gemini_backend::GeminiBackend;
pub use pdf_extractor::{PdfChunkExtractor, PDF_MIME_TYPE};
pub use session_registry::{EventStream, SessionChannel, SessionRegistry};
pub use structured_client::StructuredClient;
