//! Fake collaborators and stream helpers for pipeline tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use generator::{ApiFailure, ChunkExtractor, ChunkPayload, ContentRequest, EventStream, ExtractionError, GenerationBackend};
use shared::{ItemEvent, RunFinished, SessionEvent};

use super::fixtures::TestFixtures;

/// Tracks how many calls are in flight at once
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    max: AtomicUsize,
}

pub struct InFlightGuard<'a>(&'a InFlight);

impl InFlight {
    pub fn enter(&self) -> InFlightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(self)
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory extractor over `page_count` pages
pub struct FakeExtractor {
    page_count: usize,
    failing_pages: HashSet<usize>,
    delay: Duration,
    pub in_flight: InFlight,
    pub calls: AtomicUsize,
}

impl FakeExtractor {
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            failing_pages: HashSet::new(),
            delay: Duration::from_millis(1),
            in_flight: InFlight::default(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail any chunk that contains `page`
    pub fn failing_on(mut self, page: usize) -> Self {
        self.failing_pages.insert(page);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ChunkExtractor for FakeExtractor {
    fn page_count(&self) -> usize {
        self.page_count
    }

    async fn extract(&self, pages: &[usize]) -> Result<ChunkPayload, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _guard = self.in_flight.enter();
        tokio::time::sleep(self.delay).await;

        if pages.iter().any(|page| self.failing_pages.contains(page)) {
            return Err(ExtractionError::InvalidDocument {
                message: format!("page {:?} is corrupt", pages),
            });
        }

        let data = format!("pages:{:?}", pages).into_bytes();
        Ok(ChunkPayload::new(data, "application/pdf", pages.to_vec()))
    }
}

type ReplyFn = dyn Fn(&ContentRequest, usize) -> Result<String, ApiFailure> + Send + Sync;
type DelayFn = dyn Fn(&ContentRequest) -> Duration + Send + Sync;

/// Backend whose replies are computed from the request
pub struct ScriptedBackend {
    reply: Box<ReplyFn>,
    delay: Box<DelayFn>,
    pub in_flight: InFlight,
    pub calls: AtomicUsize,
}

impl ScriptedBackend {
    /// `reply` receives the request and the 1-based global call number
    pub fn new<F>(reply: F) -> Self
    where
        F: Fn(&ContentRequest, usize) -> Result<String, ApiFailure> + Send + Sync + 'static,
    {
        Self {
            reply: Box::new(reply),
            delay: Box::new(|_: &ContentRequest| Duration::from_millis(2)),
            in_flight: InFlight::default(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Reply with exactly the requested number of questions
    pub fn well_behaved() -> Self {
        Self::new(|request, _| Ok(TestFixtures::reply_for(request.payload.pages[0], request.items_requested)))
    }

    pub fn with_delay<F>(mut self, delay: F) -> Self
    where
        F: Fn(&ContentRequest) -> Duration + Send + Sync + 'static,
    {
        self.delay = Box::new(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate_content(&self, request: &ContentRequest) -> Result<String, ApiFailure> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = self.in_flight.enter();
        tokio::time::sleep((self.delay)(request)).await;
        (self.reply)(request, call)
    }
}

/// Read a session stream until its `Finished` event
pub async fn collect_run(stream: &mut EventStream) -> (Vec<ItemEvent>, RunFinished) {
    let mut items = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), stream.next())
            .await
            .expect("run finishes in time")
            .expect("stream stays open");
        match event {
            SessionEvent::Item(item) => items.push(item),
            SessionEvent::Finished(finished) => return (items, finished),
        }
    }
}

