//! PDF page-range extraction backed by lopdf

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use lopdf::{Document, Object, ObjectId};
use tracing::debug;

use crate::error::ExtractionError;
use crate::traits::ChunkExtractor;
use crate::types::ChunkPayload;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Page attributes a page may take from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Parsed source PDF; every chunk is cut from a private copy
pub struct PdfChunkExtractor {
    document: Arc<Document>,
    page_count: usize,
}

impl PdfChunkExtractor {
    /// Parse an uploaded PDF
    pub fn load(bytes: &[u8]) -> Result<Self, ExtractionError> {
        let document = Document::load_mem(bytes).map_err(invalid_document)?;
        if document.is_encrypted() {
            return Err(ExtractionError::InvalidDocument {
                message: "encrypted documents are not supported".to_string(),
            });
        }

        let page_count = document.get_pages().len();
        debug!(page_count, size = bytes.len(), "Loaded PDF document");

        Ok(Self {
            document: Arc::new(document),
            page_count,
        })
    }

    /// Reject empty, repeated or out-of-range selections; any order is fine
    pub fn validate_selection(pages: &[usize], page_count: usize) -> Result<(), ExtractionError> {
        if pages.is_empty() {
            return Err(ExtractionError::EmptySelection);
        }
        if let Some(&index) = pages.iter().find(|&&index| index >= page_count) {
            return Err(ExtractionError::PageOutOfRange { index, page_count });
        }
        let mut seen = HashSet::with_capacity(pages.len());
        if let Some(&index) = pages.iter().find(|&&index| !seen.insert(index)) {
            return Err(ExtractionError::DuplicatePage { index });
        }
        Ok(())
    }
}

fn invalid_document(e: lopdf::Error) -> ExtractionError {
    ExtractionError::InvalidDocument {
        message: e.to_string(),
    }
}

/// Attributes `page_id` inherits from its ancestors and does not set itself
fn inherited_attributes(doc: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, Object)> {
    let mut found = Vec::new();
    let Ok(page) = doc.get_dictionary(page_id) else {
        return found;
    };

    let mut missing: Vec<&[u8]> = INHERITABLE_KEYS
        .iter()
        .copied()
        .filter(|key| !page.has(key))
        .collect();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut visited = HashSet::new();

    while let Some(node_id) = parent {
        if missing.is_empty() || !visited.insert(node_id) {
            break;
        }
        let Ok(node) = doc.get_dictionary(node_id) else {
            break;
        };
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                found.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    found
}

/// Copy of `source` whose page tree holds exactly `pages`, in that order
fn cut_pages(source: &Document, pages: &[usize]) -> Result<Vec<u8>, ExtractionError> {
    let mut chunk = source.clone();

    let page_ids: Vec<ObjectId> = chunk.get_pages().into_values().collect();
    let selected = pages
        .iter()
        .map(|&index| {
            page_ids.get(index).copied().ok_or(ExtractionError::PageOutOfRange {
                index,
                page_count: page_ids.len(),
            })
        })
        .collect::<Result<Vec<ObjectId>, _>>()?;

    let root_id = chunk
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .and_then(|catalog_id| chunk.get_dictionary(catalog_id))
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(invalid_document)?;

    // flatten the page tree so the root lists the selection directly
    let inherited: Vec<_> = selected
        .iter()
        .map(|&page_id| inherited_attributes(&chunk, page_id))
        .collect();
    for (&page_id, attributes) in selected.iter().zip(inherited) {
        let page = chunk.get_dictionary_mut(page_id).map_err(invalid_document)?;
        for (key, value) in attributes {
            page.set(key, value);
        }
        page.set("Parent", Object::Reference(root_id));
    }

    let root = chunk.get_dictionary_mut(root_id).map_err(invalid_document)?;
    let kids: Vec<Object> = selected.iter().map(|&id| Object::Reference(id)).collect();
    root.set("Kids", kids);
    root.set("Count", selected.len() as i64);

    chunk.prune_objects();
    chunk.compress();

    let mut buffer = Vec::new();
    chunk
        .save_to(&mut buffer)
        .map_err(|e| ExtractionError::Serialization { message: e.to_string() })?;
    Ok(buffer)
}

#[async_trait]
impl ChunkExtractor for PdfChunkExtractor {
    fn page_count(&self) -> usize {
        self.page_count
    }

    async fn extract(&self, pages: &[usize]) -> Result<ChunkPayload, ExtractionError> {
        Self::validate_selection(pages, self.page_count)?;

        let document = Arc::clone(&self.document);
        let selection = pages.to_vec();
        let data = tokio::task::spawn_blocking(move || cut_pages(&document, &selection))
            .await
            .map_err(|e| ExtractionError::TaskFailed { message: e.to_string() })??;

        debug!(pages = ?pages, size = data.len(), "Extracted PDF chunk");
        Ok(ChunkPayload::new(data, PDF_MIME_TYPE, pages.to_vec()))
    }
}
