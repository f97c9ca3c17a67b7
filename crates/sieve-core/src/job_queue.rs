use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::job::CrawlJob;
use crate::models::CrawlResult;

/// Number of entries waiting in each queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueDepths {
    pub jobs: usize,
    pub results: usize,
}

/// Shared, ordered hand-off of jobs to workers and results back to requesters.
///
/// Implementations must hand each job to at most one concurrent popper and
/// must remove a result atomically with returning it. Entries that fail to
/// decode are logged and skipped, never fatal.
pub trait JobQueue: Send + Sync + Clone {
    /// Append a job to the tail of the job queue.
    fn push_job(&self, job: &CrawlJob) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Pop the head of the job queue, waiting at most `wait`.
    ///
    /// Returns `None` if nothing arrived in time.
    fn pop_job(
        &self,
        wait: Duration,
    ) -> impl Future<Output = Result<Option<CrawlJob>, AppError>> + Send;

    /// Append a result for its requester to pick up.
    fn push_result(
        &self,
        result: &CrawlResult,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Remove and return one result for `job_id`, if present. Does not wait.
    fn take_result(
        &self,
        job_id: &str,
    ) -> impl Future<Output = Result<Option<CrawlResult>, AppError>> + Send;

    /// Connectivity check against the backend.
    fn ping(&self) -> impl Future<Output = Result<(), AppError>> + Send;

    fn queue_depths(&self) -> impl Future<Output = Result<QueueDepths, AppError>> + Send;
}
