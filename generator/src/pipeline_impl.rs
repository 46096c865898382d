//! Generation pipeline: bounded chunk workers feeding a single aggregator

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;
use shared::{
    session_debug, session_error, session_info, session_warn, GenerationRequest, ItemEvent,
    ProgressEvent, RunFinished, SessionEvent, SessionId,
};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::core::planner::{ChunkPlan, ChunkPlanner};
use crate::core::processor::{flatten_items, merge_save_data};
use crate::core::prompt::{build_prompt, response_schema};
use crate::error::{ChunkError, GeneratorError, GeneratorResult};
use crate::services::session_registry::{EventStream, SessionRegistry};
use crate::services::structured_client::StructuredClient;
use crate::traits::{ChunkExtractor, GenerationBackend};
use crate::types::{ChunkOutcome, ContentRequest, RunSummary};

/// Handle to a spawned run
pub struct RunHandle {
    session_id: SessionId,
    plan: ChunkPlan,
    token: CancellationToken,
    handle: JoinHandle<RunSummary>,
}

impl RunHandle {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn plan(&self) -> ChunkPlan {
        self.plan
    }

    /// Stop dispatching chunks; the run still publishes its summary
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run to terminate
    pub async fn join(self) -> GeneratorResult<RunSummary> {
        Ok(self.handle.await?)
    }
}

/// State shared by every worker of one run
struct RunInputs<B: GenerationBackend> {
    extractor: Arc<dyn ChunkExtractor>,
    client: Arc<StructuredClient<B>>,
    buckets: Vec<Vec<usize>>,
    cursor: AtomicUsize,
    prompt: String,
    schema: Value,
    items_per_chunk: usize,
}

impl<B: GenerationBackend> RunInputs<B> {
    /// Next bucket in dispatch order, if any remain
    fn next_bucket(&self) -> Option<(usize, &[usize])> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.buckets.get(index).map(|pages| (index, pages.as_slice()))
    }

    async fn process_chunk(&self, pages: &[usize]) -> Result<Vec<Value>, ChunkError> {
        let payload = self.extractor.extract(pages).await?;
        let request = ContentRequest {
            prompt: self.prompt.clone(),
            payload,
            items_requested: self.items_per_chunk,
            response_schema: self.schema.clone(),
        };
        let value = self.client.generate(&request).await?;
        Ok(flatten_items(value))
    }
}

async fn chunk_worker<B: GenerationBackend + 'static>(
    inputs: Arc<RunInputs<B>>,
    outcomes: mpsc::Sender<ChunkOutcome>,
    token: CancellationToken,
) {
    while !token.is_cancelled() {
        let Some((index, pages)) = inputs.next_bucket() else {
            break;
        };

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = inputs.process_chunk(pages) => result,
        };

        let outcome = ChunkOutcome {
            index,
            pages: pages.to_vec(),
            result,
        };
        if outcomes.send(outcome).await.is_err() {
            break;
        }
    }
}

/// Session-scoped question generation over chunked documents
pub struct GenerationPipeline<B: GenerationBackend + 'static> {
    registry: Arc<SessionRegistry>,
    client: Arc<StructuredClient<B>>,
    planner: ChunkPlanner,
    config: PipelineConfig,
}

impl<B: GenerationBackend + 'static> Clone for GenerationPipeline<B> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            client: Arc::clone(&self.client),
            planner: self.planner,
            config: self.config.clone(),
        }
    }
}

impl<B: GenerationBackend + 'static> GenerationPipeline<B> {
    pub fn new(
        registry: Arc<SessionRegistry>,
        backend: Arc<B>,
        config: PipelineConfig,
    ) -> GeneratorResult<Self> {
        config.validate()?;
        let client = StructuredClient::with_parse_retries(backend, config.parse_retries);

        Ok(Self {
            registry,
            client: Arc::new(client),
            planner: ChunkPlanner::new(config.limits),
            config,
        })
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Plan and spawn a run, returning as soon as it is scheduled
    pub async fn start_generation(
        &self,
        extractor: Arc<dyn ChunkExtractor>,
        session_id: SessionId,
        request: GenerationRequest,
    ) -> GeneratorResult<RunHandle> {
        let page_count = extractor.page_count();
        if page_count == 0 {
            return Err(GeneratorError::EmptyDocument);
        }

        let plan = self
            .planner
            .plan(page_count, request.target_item_count() as usize);
        let token = CancellationToken::new();
        let run_id = self.registry.register_run(&session_id, token.clone()).await;

        session_info!(
            session_id,
            pages = page_count,
            target = request.target_item_count(),
            pages_per_chunk = plan.pages_per_chunk,
            total_chunks = plan.total_chunks,
            items_per_chunk = plan.items_per_chunk,
            concurrency = plan.concurrency,
            "Starting generation run"
        );

        let pipeline = self.clone();
        let run_session = session_id.clone();
        let run_token = token.clone();
        let handle = tokio::spawn(async move {
            let summary = pipeline
                .execute(extractor, &run_session, request, plan, run_token)
                .await;
            pipeline.registry.finish_run(&run_session, run_id).await;
            summary
        });

        Ok(RunHandle {
            session_id,
            plan,
            token,
            handle,
        })
    }

    /// Run to completion
    pub async fn run(
        &self,
        extractor: Arc<dyn ChunkExtractor>,
        session_id: SessionId,
        request: GenerationRequest,
    ) -> GeneratorResult<RunSummary> {
        self.start_generation(extractor, session_id, request)
            .await?
            .join()
            .await
    }

    /// Subscribe to a session's events
    pub async fn attach_to_session(&self, session_id: &SessionId) -> EventStream {
        self.registry.subscribe(session_id).await
    }

    /// Cancel the session's active run
    pub async fn cancel(&self, session_id: &SessionId) -> bool {
        self.registry.cancel(session_id).await
    }

    async fn execute(
        &self,
        extractor: Arc<dyn ChunkExtractor>,
        session_id: &SessionId,
        request: GenerationRequest,
        plan: ChunkPlan,
        token: CancellationToken,
    ) -> RunSummary {
        let target = request.target_item_count();
        let inputs = Arc::new(RunInputs {
            buckets: plan.buckets(extractor.page_count()),
            extractor,
            client: Arc::clone(&self.client),
            cursor: AtomicUsize::new(0),
            prompt: build_prompt(&request, plan.items_per_chunk),
            schema: response_schema(),
            items_per_chunk: plan.items_per_chunk,
        });

        let workers_token = token.child_token();
        let (outcome_tx, mut outcome_rx) = mpsc::channel(plan.concurrency);
        let mut workers = JoinSet::new();
        for _ in 0..plan.concurrency {
            workers.spawn(chunk_worker(
                Arc::clone(&inputs),
                outcome_tx.clone(),
                workers_token.clone(),
            ));
        }
        drop(outcome_tx);

        let mut generated: u32 = 0;
        let mut dropped_chunks: u32 = 0;
        let mut consecutive_backend_failures: u32 = 0;
        let mut cancelled = false;

        while generated < target {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    session_info!(session_id, generated, "Run cancelled");
                    cancelled = true;
                    break;
                }
                outcome = outcome_rx.recv() => match outcome {
                    Some(outcome) => outcome,
                    None => break,
                },
            };

            match outcome.result {
                Ok(items) => {
                    consecutive_backend_failures = 0;
                    let received = items.len();
                    for item in items {
                        if generated >= target {
                            break;
                        }
                        let Some(question) = merge_save_data(item, request.save_data()) else {
                            session_warn!(session_id, chunk = outcome.index, "Dropping non-object item");
                            continue;
                        };

                        generated += 1;
                        let event = SessionEvent::Item(ItemEvent {
                            question,
                            progress: ProgressEvent::new(generated, target),
                        });
                        self.registry.publish(session_id, event).await;
                    }
                    session_debug!(
                        session_id,
                        chunk = outcome.index,
                        received,
                        generated,
                        "Chunk published"
                    );
                }
                Err(e) => {
                    dropped_chunks += 1;
                    session_warn!(
                        session_id,
                        chunk = outcome.index,
                        pages = ?outcome.pages,
                        "Chunk dropped: {}",
                        e
                    );

                    if e.is_backend_failure() {
                        consecutive_backend_failures += 1;
                        if let Some(threshold) = self.config.backend_failure_threshold {
                            if consecutive_backend_failures >= threshold {
                                session_error!(
                                    session_id,
                                    failures = consecutive_backend_failures,
                                    "Backend keeps failing, cancelling run"
                                );
                                cancelled = true;
                                break;
                            }
                        }
                    } else {
                        consecutive_backend_failures = 0;
                    }
                }
            }
        }

        workers_token.cancel();
        drop(outcome_rx);
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                session_error!(session_id, "Chunk worker failed: {}", e);
            }
        }

        let finished = RunFinished {
            generated,
            total: target,
            dropped_chunks,
            cancelled,
        };
        self.registry
            .publish(session_id, SessionEvent::Finished(finished))
            .await;

        session_info!(
            session_id,
            generated,
            target,
            dropped_chunks,
            cancelled,
            "Generation run finished"
        );

        RunSummary {
            plan,
            target,
            generated,
            dropped_chunks,
            cancelled,
        }
    }
}
