//! Router harness, fake backend and response readers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use futures_util::StreamExt;
use generator::{
    ApiFailure, ContentRequest, GenerationBackend, GenerationPipeline, PipelineConfig,
    SessionConfig, SessionRegistry,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use webserver::{AppState, ServerConfig, WebServer};

use super::fixtures::MultipartBody;

/// Backend answering every request with exactly the requested number of questions
pub struct CannedBackend {
    delay: Duration,
    calls: AtomicUsize,
}

impl CannedBackend {
    pub fn new() -> Self {
        Self::with_delay(Duration::from_millis(1))
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for CannedBackend {
    async fn generate_content(&self, request: &ContentRequest) -> Result<String, ApiFailure> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;

        let questions: Vec<Value> = (0..request.items_requested)
            .map(|n| {
                json!({
                    "question": format!("Question {call}.{n}?"),
                    "options": {"A": "alpha", "B": "beta", "C": "gamma", "D": "delta"},
                    "answer": "B",
                })
            })
            .collect();
        Ok(Value::Array(questions).to_string())
    }
}

/// Router plus handles on what sits behind it
pub struct TestServer {
    pub router: Router,
    pub registry: Arc<SessionRegistry>,
    pub backend: Arc<CannedBackend>,
}

impl TestServer {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post(&self, uri: &str) -> Response {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn upload(&self, form: MultipartBody) -> Response {
        let (content_type, body) = form.finish();
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri("/documents/upload")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }
}

pub fn test_server() -> TestServer {
    test_server_with(CannedBackend::new(), ServerConfig::default())
}

pub fn test_server_with(backend: CannedBackend, config: ServerConfig) -> TestServer {
    let backend = Arc::new(backend);
    let server = web_server(Arc::clone(&backend), config);

    TestServer {
        router: server.build_router(),
        registry: Arc::clone(server.state().registry()),
        backend,
    }
}

/// Fully wired server over `backend`, for tests that need a real listener
pub fn web_server(backend: Arc<CannedBackend>, config: ServerConfig) -> WebServer<CannedBackend> {
    let registry = Arc::new(SessionRegistry::new(SessionConfig::default()));
    let pipeline = GenerationPipeline::new(registry, backend, PipelineConfig::default()).unwrap();
    WebServer::new(AppState::new(pipeline, config))
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// One decoded server-sent event
#[derive(Debug, Clone)]
pub struct SseFrame {
    pub event: String,
    pub data: Value,
}

fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data = String::new();
    for line in raw.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event = Some(name.trim().to_string());
        } else if let Some(chunk) = line.strip_prefix("data:") {
            data.push_str(chunk.trim_start());
        }
    }
    let event = event?;
    Some(SseFrame {
        event,
        data: serde_json::from_str(&data).unwrap(),
    })
}

/// Read frames off an open SSE response until an event named `until` arrives
pub async fn read_events(response: Response, until: &str) -> Vec<SseFrame> {
    let mut body = response.into_body().into_data_stream();
    let mut buffer = String::new();
    let mut frames = Vec::new();

    let read = async {
        while let Some(chunk) = body.next().await {
            buffer.push_str(std::str::from_utf8(&chunk.unwrap()).unwrap());
            while let Some(end) = buffer.find("\n\n") {
                let raw: String = buffer.drain(..end + 2).collect();
                if let Some(frame) = parse_frame(&raw) {
                    let done = frame.event == until;
                    frames.push(frame);
                    if done {
                        return;
                    }
                }
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(10), read)
        .await
        .expect("stream did not deliver the expected event in time");

    frames
}
