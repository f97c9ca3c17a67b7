//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::job::CrawlJob;
use crate::job_queue::{JobQueue, QueueDepths};
use crate::models::{CrawlResult, ExtractionCandidate, RenderedPage};
use crate::strategy::{RenderRequest, Strategy};
use crate::traits::{ContentExtractor, Renderer, RendererFactory};
use crate::worker::{WorkerEvent, WorkerReporter};

// ---------------------------------------------------------------------------
// MockRenderer
// ---------------------------------------------------------------------------

/// Mock renderer with one canned response per strategy.
///
/// Responses are cloned on every call, so the same renderer can serve
/// several jobs. Strategies without a response fail with a render error.
#[derive(Clone, Default)]
pub struct MockRenderer {
    responses: Arc<Mutex<HashMap<Strategy, Result<RenderedPage, String>>>>,
    pub requests: Arc<Mutex<Vec<RenderRequest>>>,
    pub shutdowns: Arc<Mutex<usize>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, strategy: Strategy, page: RenderedPage) -> Self {
        self.responses.lock().unwrap().insert(strategy, Ok(page));
        self
    }

    pub fn with_failure(self, strategy: Strategy, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(strategy, Err(message.to_string()));
        self
    }

    /// Strategies attempted so far, in call order.
    pub fn attempted(&self) -> Vec<Strategy> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.strategy)
            .collect()
    }

    pub fn requests(&self) -> Vec<RenderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn shutdown_count(&self) -> usize {
        *self.shutdowns.lock().unwrap()
    }
}

impl Renderer for MockRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedPage, AppError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.responses.lock().unwrap().get(&request.strategy) {
            Some(Ok(page)) => Ok(page.clone()),
            Some(Err(message)) => Err(AppError::RenderError(message.clone())),
            None => Err(AppError::RenderError("no response configured".into())),
        }
    }

    async fn shutdown(self) {
        *self.shutdowns.lock().unwrap() += 1;
    }
}

// ---------------------------------------------------------------------------
// MockRendererFactory
// ---------------------------------------------------------------------------

/// Mock factory handing out clones of one shared MockRenderer.
#[derive(Clone)]
pub struct MockRendererFactory {
    pub renderer: MockRenderer,
    create_error: Arc<Mutex<Option<AppError>>>,
    pub created: Arc<Mutex<usize>>,
}

impl MockRendererFactory {
    pub fn new(renderer: MockRenderer) -> Self {
        Self {
            renderer,
            create_error: Arc::new(Mutex::new(None)),
            created: Arc::new(Mutex::new(0)),
        }
    }

    /// First `create` call fails with `error`; later calls succeed.
    pub fn with_create_error(error: AppError) -> Self {
        Self {
            renderer: MockRenderer::new(),
            create_error: Arc::new(Mutex::new(Some(error))),
            created: Arc::new(Mutex::new(0)),
        }
    }

    pub fn created_count(&self) -> usize {
        *self.created.lock().unwrap()
    }
}

impl RendererFactory for MockRendererFactory {
    type Renderer = MockRenderer;

    async fn create(&self) -> Result<MockRenderer, AppError> {
        if let Some(e) = self.create_error.lock().unwrap().take() {
            return Err(e);
        }
        *self.created.lock().unwrap() += 1;
        Ok(self.renderer.clone())
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor returning queued candidates.
///
/// Once the queue is empty it falls back to passthrough: the whole markup
/// becomes the content, so text and markup sizes are equal.
#[derive(Clone, Default)]
pub struct MockExtractor {
    responses: Arc<Mutex<Vec<Result<ExtractionCandidate, AppError>>>>,
    pub domains: Arc<Mutex<Vec<String>>>,
}

impl MockExtractor {
    pub fn passthrough() -> Self {
        Self::default()
    }

    pub fn with_candidates(responses: Vec<Result<ExtractionCandidate, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            domains: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_candidates(vec![Err(error)])
    }
}

impl ContentExtractor for MockExtractor {
    fn extract(&self, page: &RenderedPage, domain: &str) -> Result<ExtractionCandidate, AppError> {
        self.domains.lock().unwrap().push(domain.to_string());

        let mut responses = self.responses.lock().unwrap();
        if !responses.is_empty() {
            return responses.remove(0);
        }

        Ok(ExtractionCandidate {
            title: "Test Page".to_string(),
            content: page.html.clone(),
            html_size: page.html.len(),
            text_size: page.html.len(),
            ..Default::default()
        })
    }
}

// ---------------------------------------------------------------------------
// MockJobQueue
// ---------------------------------------------------------------------------

/// In-memory job queue storing raw JSON entries, like the real backend.
#[derive(Clone, Default)]
pub struct MockJobQueue {
    jobs: Arc<Mutex<VecDeque<String>>>,
    results: Arc<Mutex<Vec<String>>>,
    pop_error: Arc<Mutex<Option<AppError>>>,
    push_result_error: Arc<Mutex<Option<AppError>>>,
    ping_error: Arc<Mutex<Option<AppError>>>,
    pub take_calls: Arc<Mutex<usize>>,
}

impl MockJobQueue {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Queue with one job waiting at the head.
    pub fn with_job(job: CrawlJob) -> Self {
        let queue = Self::default();
        queue.push_raw_job(&serde_json::to_string(&job).unwrap());
        queue
    }

    /// First `pop_job` call fails with `error`.
    pub fn with_pop_error(error: AppError) -> Self {
        let queue = Self::default();
        *queue.pop_error.lock().unwrap() = Some(error);
        queue
    }

    /// First `push_result` call fails with `error`.
    pub fn with_push_result_error(self, error: AppError) -> Self {
        *self.push_result_error.lock().unwrap() = Some(error);
        self
    }

    /// Every `ping` fails with `error`.
    pub fn with_ping_error(error: AppError) -> Self {
        let queue = Self::default();
        *queue.ping_error.lock().unwrap() = Some(error);
        queue
    }

    pub fn push_raw_job(&self, raw: &str) {
        self.jobs.lock().unwrap().push_back(raw.to_string());
    }

    pub fn push_raw_result(&self, raw: &str) {
        self.results.lock().unwrap().push(raw.to_string());
    }

    pub fn pending_jobs(&self) -> Vec<CrawlJob> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .filter_map(|raw| serde_json::from_str(raw).ok())
            .collect()
    }

    pub fn stored_results(&self) -> Vec<CrawlResult> {
        self.results
            .lock()
            .unwrap()
            .iter()
            .filter_map(|raw| serde_json::from_str(raw).ok())
            .collect()
    }

    pub fn raw_result_count(&self) -> usize {
        self.results.lock().unwrap().len()
    }

    pub fn take_call_count(&self) -> usize {
        *self.take_calls.lock().unwrap()
    }
}

impl JobQueue for MockJobQueue {
    async fn push_job(&self, job: &CrawlJob) -> Result<(), AppError> {
        self.push_raw_job(&serde_json::to_string(job)?);
        Ok(())
    }

    async fn pop_job(&self, wait: Duration) -> Result<Option<CrawlJob>, AppError> {
        if let Some(e) = self.pop_error.lock().unwrap().take() {
            return Err(e);
        }

        let raw = self.jobs.lock().unwrap().pop_front();
        match raw {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(job) => Ok(Some(job)),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed job entry");
                    Ok(None)
                }
            },
            None => {
                tokio::time::sleep(wait).await;
                Ok(None)
            }
        }
    }

    async fn push_result(&self, result: &CrawlResult) -> Result<(), AppError> {
        if let Some(e) = self.push_result_error.lock().unwrap().take() {
            return Err(e);
        }
        self.push_raw_result(&serde_json::to_string(result)?);
        Ok(())
    }

    async fn take_result(&self, job_id: &str) -> Result<Option<CrawlResult>, AppError> {
        *self.take_calls.lock().unwrap() += 1;

        let mut results = self.results.lock().unwrap();
        let found = results.iter().enumerate().find_map(|(i, raw)| {
            serde_json::from_str::<CrawlResult>(raw)
                .ok()
                .filter(|r| r.job_id == job_id)
                .map(|r| (i, r))
        });

        Ok(found.map(|(i, result)| {
            results.remove(i);
            result
        }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        match self.ping_error.lock().unwrap().as_ref() {
            Some(e) => Err(AppError::QueueError(e.to_string())),
            None => Ok(()),
        }
    }

    async fn queue_depths(&self) -> Result<QueueDepths, AppError> {
        Ok(QueueDepths {
            jobs: self.jobs.lock().unwrap().len(),
            results: self.results.lock().unwrap().len(),
        })
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock worker reporter that records events.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl WorkerReporter for MockReporter {
    fn report(&self, event: WorkerEvent<'_>) {
        let label = match &event {
            WorkerEvent::Started { .. } => "Started",
            WorkerEvent::Polling => "Polling",
            WorkerEvent::JobReceived { .. } => "JobReceived",
            WorkerEvent::JobCompleted { .. } => "JobCompleted",
            WorkerEvent::JobFailed { .. } => "JobFailed",
            WorkerEvent::ResultPublished { .. } => "ResultPublished",
            WorkerEvent::ShuttingDown { .. } => "ShuttingDown",
            WorkerEvent::Stopped { .. } => "Stopped",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a job for a URL with a path, so every strategy has work to do.
pub fn make_test_job() -> CrawlJob {
    CrawlJob::new("https://example.com/pricing")
}

/// Page whose markup is `size` bytes of marker-free filler.
pub fn make_page(size: usize) -> RenderedPage {
    RenderedPage::new("https://example.com/pricing", "x".repeat(size))
}

/// Candidate with `text_size` bytes of content over `html_size` bytes of markup.
pub fn make_candidate(text_size: usize, html_size: usize) -> ExtractionCandidate {
    ExtractionCandidate {
        title: "Test Page".to_string(),
        description: "A page used in tests".to_string(),
        content: "x".repeat(text_size),
        headings: "H1: Test Page".to_string(),
        html_size,
        text_size,
        is_error_page: false,
    }
}
