use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::AppError;

/// A queued request to crawl one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlJob {
    pub job_id: String,
    pub url: String,
}

impl CrawlJob {
    /// Build a job with a freshly generated id. Does not validate the URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            url: url.into(),
        }
    }
}

/// Check the submission precondition: an absolute `http://` or `https://` URL with a host.
pub fn validate_url(url: &str) -> Result<Url, AppError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(AppError::ValidationError(
            "URL must start with http:// or https://".to_string(),
        ));
    }

    let parsed =
        Url::parse(url).map_err(|e| AppError::ValidationError(format!("Invalid URL: {e}")))?;

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(AppError::ValidationError("URL has no host".to_string()));
    }

    Ok(parsed)
}

/// Configuration for a worker process.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    /// Bounded wait on the head of the job queue between liveness checks.
    pub pop_timeout: Duration,
    /// Pause after a queue error before polling again.
    pub error_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("worker-{}", &Uuid::new_v4().to_string()[..8]),
            pop_timeout: Duration::from_secs(5),
            error_backoff: Duration::from_secs(10),
        }
    }
}

impl WorkerConfig {
    pub fn with_worker_id(mut self, id: impl Into<String>) -> Self {
        self.worker_id = id.into();
        self
    }

    pub fn with_pop_timeout(mut self, timeout: Duration) -> Self {
        self.pop_timeout = timeout;
        self
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }
}
