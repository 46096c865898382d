//! Document upload, event stream and cancellation endpoints

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::{Stream, StreamExt};
use generator::{GenerationBackend, PdfChunkExtractor, PDF_MIME_TYPE};
use shared::{session_info, SessionEvent};

use crate::error::{WebServerError, WebServerResult};
use crate::state::AppState;
use crate::types::{
    CancelResponse, SessionQuery, UploadFields, UploadResponse, UploadedFile, FIELD_FILE,
};

/// Body-limit failures keep their 413; anything else is a malformed request
fn multipart_error(e: MultipartError, max_bytes: usize, context: &str) -> WebServerError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        WebServerError::PayloadTooLarge { limit: max_bytes }
    } else {
        WebServerError::invalid(format!("{}: {}", context, e))
    }
}

/// Drain the multipart body into raw fields
async fn read_fields(mut multipart: Multipart, max_bytes: usize) -> WebServerResult<UploadFields> {
    let mut fields = UploadFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes, "Malformed multipart body"))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == FIELD_FILE {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| multipart_error(e, max_bytes, "Failed to read file"))?;
            if bytes.len() > max_bytes {
                return Err(WebServerError::PayloadTooLarge { limit: max_bytes });
            }
            fields.file = Some(UploadedFile {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| multipart_error(e, max_bytes, &format!("Failed to read field {}", name)))?;
            if !fields.set_text(&name, value) {
                tracing::debug!(field = %name, "Ignoring unknown form field");
            }
        }
    }

    Ok(fields)
}

fn check_file(file: Option<UploadedFile>) -> WebServerResult<UploadedFile> {
    let file = file.ok_or(WebServerError::MissingField { field: FIELD_FILE })?;
    if file.content_type.as_deref() != Some(PDF_MIME_TYPE) {
        return Err(WebServerError::UnsupportedMediaType {
            content_type: file.content_type.unwrap_or_else(|| "unknown".to_string()),
        });
    }
    if file.bytes.is_empty() {
        return Err(WebServerError::invalid("Uploaded file is empty"));
    }
    Ok(file)
}

/// POST /documents/upload
pub async fn upload<B: GenerationBackend + 'static>(
    State(state): State<AppState<B>>,
    multipart: Multipart,
) -> WebServerResult<Json<UploadResponse>> {
    let mut fields = read_fields(multipart, state.config.max_upload_bytes).await?;

    let session_id = fields.session_id()?;
    let request = fields.generation_request()?;
    let file = check_file(fields.file.take())?;

    let size = file.bytes.len();
    let extractor = tokio::task::spawn_blocking(move || PdfChunkExtractor::load(&file.bytes))
        .await
        .map_err(|e| WebServerError::InternalError(format!("Document parsing task failed: {}", e)))??;

    session_info!(
        session_id,
        size,
        target = request.target_item_count(),
        kind = %request.item_kind(),
        language = %request.language(),
        level = %request.difficulty(),
        "Document uploaded"
    );

    state
        .pipeline
        .start_generation(Arc::new(extractor), session_id, request)
        .await?;

    Ok(Json(UploadResponse { successfully: true }))
}

/// GET /documents/stream
pub async fn stream<B: GenerationBackend + 'static>(
    State(state): State<AppState<B>>,
    Query(query): Query<SessionQuery>,
) -> WebServerResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let session_id = query.session_id()?;
    session_info!(session_id, "Stream subscriber attached");

    let events = state
        .pipeline
        .attach_to_session(&session_id)
        .await
        .take_until(state.shutdown.clone().cancelled_owned())
        .map(|event| Ok(to_sse_event(&event)));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn to_sse_event(event: &SessionEvent) -> Event {
    let payload = event.payload();
    Event::default()
        .event(event.event_name())
        .data(payload.to_string())
}

/// POST /documents/cancel
pub async fn cancel<B: GenerationBackend + 'static>(
    State(state): State<AppState<B>>,
    Query(query): Query<SessionQuery>,
) -> WebServerResult<Json<CancelResponse>> {
    let session_id = query.session_id()?;
    let cancelled = state.pipeline.cancel(&session_id).await;
    session_info!(session_id, cancelled, "Cancel requested");

    Ok(Json(CancelResponse { cancelled }))
}
