use std::time::Duration;

use tokio::time::Instant;

use crate::error::AppError;
use crate::job::{CrawlJob, validate_url};
use crate::job_queue::{JobQueue, QueueDepths};
use crate::models::CrawlResult;

/// Requester-side settings.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Pause between scans of the result queue.
    pub poll_interval: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl BrokerConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Requester side of the queue: submits jobs and waits for their results.
#[derive(Clone)]
pub struct CrawlBroker<Q>
where
    Q: JobQueue,
{
    queue: Q,
    config: BrokerConfig,
}

impl<Q> CrawlBroker<Q>
where
    Q: JobQueue,
{
    pub fn new(queue: Q) -> Self {
        Self::with_config(queue, BrokerConfig::default())
    }

    pub fn with_config(queue: Q, config: BrokerConfig) -> Self {
        Self { queue, config }
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Validate `url` and enqueue a job for it. Returns the new job id.
    ///
    /// An invalid URL is rejected before the queue is touched.
    pub async fn submit(&self, url: &str) -> Result<String, AppError> {
        validate_url(url)?;

        let job = CrawlJob::new(url);
        self.queue.push_job(&job).await?;

        tracing::info!(job_id = %job.job_id, %url, "Crawl job submitted");
        Ok(job.job_id)
    }

    /// Scan the result queue for `job_id` until it shows up or `timeout` elapses.
    ///
    /// The matching entry is removed from the queue. `Ok(None)` means the
    /// window closed without a result; the job itself stays wherever it is.
    pub async fn await_result(
        &self,
        job_id: &str,
        timeout: Duration,
    ) -> Result<Option<CrawlResult>, AppError> {
        let deadline = deadline_after(timeout);
        tracing::debug!(%job_id, timeout_secs = timeout.as_secs(), "Waiting for crawl result");

        loop {
            if let Some(result) = self.queue.take_result(job_id).await? {
                tracing::info!(%job_id, status = %result.status, "Crawl result received");
                return Ok(Some(result));
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(%job_id, timeout_secs = timeout.as_secs(), "No crawl result before timeout");
                return Ok(None);
            }

            tokio::time::sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }

    /// Submit and wait in one call.
    ///
    /// A timed-out wait yields a `pending` record instead of `None`.
    pub async fn crawl(&self, url: &str, timeout: Duration) -> Result<CrawlResult, AppError> {
        let job_id = self.submit(url).await?;

        match self.await_result(&job_id, timeout).await? {
            Some(result) => Ok(result),
            None => Ok(CrawlResult::pending(job_id, url, timeout.as_secs())),
        }
    }

    /// Whether the queue backend answers a ping.
    pub async fn health(&self) -> bool {
        match self.queue.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Queue health check failed");
                false
            }
        }
    }

    pub async fn queue_depths(&self) -> Result<QueueDepths, AppError> {
        self.queue.queue_depths().await
    }
}

/// `now + timeout`, saturating at roughly thirty years out.
fn deadline_after(timeout: Duration) -> Instant {
    const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now + FAR_FUTURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResultStatus;
    use crate::testutil::*;

    #[tokio::test]
    async fn submit_rejects_bad_scheme_without_touching_queue() {
        let queue = MockJobQueue::empty();
        let broker = CrawlBroker::new(queue.clone());

        let err = broker.submit("ftp://bad").await.unwrap_err();

        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(queue.pending_jobs().is_empty());
    }

    #[tokio::test]
    async fn submit_enqueues_job_at_tail() {
        let queue = MockJobQueue::empty();
        let broker = CrawlBroker::new(queue.clone());

        let first = broker.submit("https://example.com/a").await.unwrap();
        let second = broker.submit("https://example.com/b").await.unwrap();

        let jobs = queue.pending_jobs();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].job_id, first);
        assert_eq!(jobs[1].job_id, second);
        assert_eq!(jobs[1].url, "https://example.com/b");
    }

    #[tokio::test]
    async fn await_result_removes_matching_entry_once() {
        let queue = MockJobQueue::empty();
        let job = CrawlJob::new("https://example.com");
        let other = CrawlJob::new("https://example.org");
        queue.push_result(&CrawlResult::failure(&other, "x")).await.unwrap();
        queue.push_result(&CrawlResult::failure(&job, "boom")).await.unwrap();
        let broker = CrawlBroker::new(queue.clone());

        let result = broker
            .await_result(&job.job_id, Duration::ZERO)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.error.as_deref(), Some("boom"));
        assert_eq!(queue.raw_result_count(), 1);
        assert!(
            broker
                .await_result(&job.job_id, Duration::ZERO)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn await_result_times_out_with_none() {
        let queue = MockJobQueue::empty();
        let broker = CrawlBroker::new(queue.clone());

        let started = Instant::now();
        let result = broker
            .await_result("missing", Duration::from_secs(3))
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        // Scans at 0s, 1s, 2s, and the deadline.
        assert_eq!(queue.take_call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn await_result_picks_up_late_result() {
        let queue = MockJobQueue::empty();
        let broker = CrawlBroker::new(queue.clone());
        let job = CrawlJob::new("https://example.com");

        let publisher = {
            let queue = queue.clone();
            let job = job.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(2500)).await;
                queue
                    .push_result(&CrawlResult::failure(&job, "late"))
                    .await
                    .unwrap();
            })
        };

        let result = broker
            .await_result(&job.job_id, Duration::from_secs(10))
            .await
            .unwrap();
        publisher.await.unwrap();

        assert_eq!(result.unwrap().error.as_deref(), Some("late"));
    }

    #[tokio::test(start_paused = true)]
    async fn await_result_accepts_huge_timeout() {
        let queue = MockJobQueue::empty();
        let job = CrawlJob::new("https://example.com");
        queue.push_result(&CrawlResult::failure(&job, "done")).await.unwrap();
        let broker = CrawlBroker::new(queue.clone());

        let result = broker
            .await_result(&job.job_id, Duration::from_secs(u64::MAX))
            .await
            .unwrap();
        assert_eq!(result.unwrap().error.as_deref(), Some("done"));

        let waiting = tokio::time::timeout(
            Duration::from_millis(200),
            broker.await_result("missing", Duration::from_secs(u64::MAX)),
        )
        .await;
        assert!(waiting.is_err());
    }

    #[tokio::test]
    async fn await_result_skips_malformed_entries() {
        let queue = MockJobQueue::empty();
        queue.push_raw_result("{not json");
        let job = CrawlJob::new("https://example.com");
        queue.push_result(&CrawlResult::failure(&job, "boom")).await.unwrap();
        let broker = CrawlBroker::new(queue.clone());

        let result = broker.await_result(&job.job_id, Duration::ZERO).await.unwrap();

        assert!(result.is_some());
        assert_eq!(queue.raw_result_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn crawl_returns_pending_record_on_timeout() {
        let queue = MockJobQueue::empty();
        let broker = CrawlBroker::with_config(
            queue.clone(),
            BrokerConfig::default().with_poll_interval(Duration::from_millis(250)),
        );

        let result = broker
            .crawl("https://example.com/pricing", Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(result.status, ResultStatus::Pending);
        assert_eq!(result.url, "https://example.com/pricing");
        assert_eq!(
            result.message.as_deref(),
            Some("Crawl job submitted but no result after 2s")
        );
        assert_eq!(queue.pending_jobs()[0].job_id, result.job_id);
    }

    #[tokio::test]
    async fn health_reflects_ping() {
        assert!(CrawlBroker::new(MockJobQueue::empty()).health().await);

        let down = MockJobQueue::with_ping_error(AppError::NetworkError("refused".into()));
        assert!(!CrawlBroker::new(down).health().await);
    }
}
