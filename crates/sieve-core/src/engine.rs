use url::Url;

use crate::config::EngineConfig;
use crate::job::{CrawlJob, validate_url};
use crate::models::{CrawlResult, truncate_chars};
use crate::quality::contains_error_marker;
use crate::strategy::Strategy;
use crate::traits::{ContentExtractor, Renderer};

/// Error message of the terminal result when no strategy produced acceptable content.
pub const EXHAUSTED_MESSAGE: &str = "All crawl strategies failed";

/// Drives one URL through the configured strategies: render → extract → gate.
///
/// Stops at the first accepted candidate. Per-strategy failures are logged
/// and swallowed; only the final outcome is returned.
#[derive(Clone)]
pub struct StrategyEngine<X>
where
    X: ContentExtractor,
{
    extractor: X,
    config: EngineConfig,
}

impl<X> StrategyEngine<X>
where
    X: ContentExtractor,
{
    pub fn new(extractor: X, config: EngineConfig) -> Self {
        Self { extractor, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run every strategy in order against `job.url` using `renderer`.
    ///
    /// Always yields a result record: success with the winning strategy, or
    /// error with [`EXHAUSTED_MESSAGE`] (or the URL validation message).
    pub async fn run<R: Renderer>(&self, renderer: &R, job: &CrawlJob) -> CrawlResult {
        let target = match validate_url(&job.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(job_id = %job.job_id, url = %job.url, error = %e, "Rejecting job");
                return CrawlResult::failure(job, e.to_string());
            }
        };
        let domain = target.host_str().unwrap_or_default().to_string();
        let total = self.config.strategies.len();

        for (i, &strategy) in self.config.strategies.iter().enumerate() {
            tracing::info!(
                job_id = %job.job_id,
                %strategy,
                attempt = i + 1,
                total,
                "Trying strategy"
            );

            if let Some(result) = self
                .attempt(renderer, job, &target, &domain, strategy)
                .await
            {
                return result;
            }
        }

        tracing::warn!(job_id = %job.job_id, url = %job.url, "{EXHAUSTED_MESSAGE}");
        CrawlResult::failure(job, EXHAUSTED_MESSAGE)
    }

    async fn attempt<R: Renderer>(
        &self,
        renderer: &R,
        job: &CrawlJob,
        target: &Url,
        domain: &str,
        strategy: Strategy,
    ) -> Option<CrawlResult> {
        let request = self.config.plan(strategy, target);

        let page = match renderer.render(&request).await {
            Ok(page) => page,
            Err(e) if e.is_render_failure() => {
                tracing::warn!(job_id = %job.job_id, %strategy, error = %e, "Render failed");
                return None;
            }
            Err(e) => {
                tracing::error!(job_id = %job.job_id, %strategy, error = %e, "Renderer error");
                return None;
            }
        };

        let mut candidate = match self.extractor.extract(&page, domain) {
            Ok(candidate) => candidate,
            Err(e) => {
                tracing::warn!(job_id = %job.job_id, %strategy, error = %e, "Extraction failed");
                return None;
            }
        };

        let verdict = self.config.quality_gate().evaluate(&candidate);
        if !verdict.is_accepted() {
            tracing::warn!(
                job_id = %job.job_id,
                %strategy,
                reason = %verdict,
                html_size = candidate.html_size,
                text_size = candidate.text_size,
                "Candidate rejected"
            );
            return None;
        }

        if self.config.strict_error_scan
            && contains_error_marker(&candidate.title, &candidate.content)
        {
            tracing::warn!(
                job_id = %job.job_id,
                %strategy,
                title = %candidate.title,
                "Detected error page, trying next strategy"
            );
            return None;
        }

        if candidate.content.chars().count() > self.config.max_content_chars {
            candidate.content =
                truncate_chars(&candidate.content, self.config.max_content_chars).to_string();
        }

        tracing::info!(
            job_id = %job.job_id,
            %strategy,
            title = %candidate.title,
            text_size = candidate.text_size,
            "Strategy succeeded"
        );

        let snapshot = truncate_chars(&page.html, self.config.html_snapshot_chars).to_string();
        Some(CrawlResult::success(job, strategy, candidate, snapshot))
    }
}
