use std::future::Future;

use crate::error::AppError;
use crate::models::{ExtractionCandidate, RenderedPage};
use crate::strategy::RenderRequest;

/// Renders a page according to a strategy's request.
///
/// A renderer value is one session: the engine borrows it exclusively for
/// the duration of a job, and the owner shuts it down afterwards.
pub trait Renderer: Send + Sync {
    /// Load, wait, run the optional script, and return the rendered markup.
    ///
    /// An `Err` means the page load itself failed for this strategy.
    fn render(
        &self,
        request: &RenderRequest,
    ) -> impl Future<Output = Result<RenderedPage, AppError>> + Send;

    /// Release the session's resources.
    fn shutdown(self) -> impl Future<Output = ()> + Send
    where
        Self: Sized;
}

/// Creates a fresh renderer session per job.
///
/// Mirrors the per-job extractor creation of the worker: each job gets its
/// own session, never shared with another job.
pub trait RendererFactory: Send + Sync + Clone {
    type Renderer: Renderer;

    fn create(&self) -> impl Future<Output = Result<Self::Renderer, AppError>> + Send;
}

/// Parses rendered markup into structured fields.
pub trait ContentExtractor: Send + Sync + Clone {
    /// `domain` is the crawl target's host, used to skip site-name headings.
    fn extract(
        &self,
        page: &RenderedPage,
        domain: &str,
    ) -> Result<ExtractionCandidate, AppError>;
}
