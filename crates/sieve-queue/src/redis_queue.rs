use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};
use sieve_core::error::AppError;
use sieve_core::job::CrawlJob;
use sieve_core::job_queue::{JobQueue, QueueDepths};
use sieve_core::models::CrawlResult;

use crate::config::{QueueConfig, ResultRouting};

fn queue_error(action: &str) -> impl FnOnce(RedisError) -> AppError + '_ {
    move |e| AppError::QueueError(format!("Failed to {action}: {e}"))
}

/// Job and result queues on Redis lists.
///
/// Jobs are appended with `RPUSH` and handed out with `BLPOP`, so each job
/// reaches exactly one worker. Clones share one auto-reconnecting
/// connection; a blocking pop holds it, so a worker should not share its
/// queue handle with unrelated traffic.
#[derive(Clone)]
pub struct RedisQueue {
    conn: ConnectionManager,
    config: QueueConfig,
}

impl RedisQueue {
    /// Connect to Redis with the given configuration.
    pub async fn connect(config: &QueueConfig) -> Result<Self, AppError> {
        let client = redis::Client::open(config.redis_url.as_str())
            .map_err(|e| AppError::ConfigError(format!("Invalid REDIS_URL: {e}")))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::NetworkError(format!("Failed to connect to Redis: {e}")))?;

        tracing::debug!(
            job_queue = %config.job_queue,
            result_queue = %config.result_queue,
            routing = %config.routing,
            "Connected to Redis"
        );

        Ok(Self {
            conn,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    fn result_key(&self, job_id: &str) -> String {
        match self.config.routing {
            ResultRouting::Shared => self.config.result_queue.clone(),
            ResultRouting::PerJob => self.config.per_job_key(job_id),
        }
    }

    /// Scan the shared result list and remove the first entry for `job_id`.
    async fn take_shared(&self, job_id: &str) -> Result<Option<CrawlResult>, AppError> {
        let mut conn = self.conn.clone();
        let key = &self.config.result_queue;

        let entries: Vec<String> = conn
            .lrange(key, 0, -1)
            .await
            .map_err(queue_error("scan result queue"))?;

        for raw in entries {
            let result: CrawlResult = match serde_json::from_str(&raw) {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed result entry");
                    continue;
                }
            };

            if result.job_id != job_id {
                continue;
            }

            let removed: usize = conn
                .lrem(key, 1, &raw)
                .await
                .map_err(queue_error("remove result"))?;

            if removed > 0 {
                return Ok(Some(result));
            }

            // Another poller claimed this entry between LRANGE and LREM.
            tracing::debug!(%job_id, "Result entry already taken, continuing scan");
        }

        Ok(None)
    }

    async fn take_per_job(&self, job_id: &str) -> Result<Option<CrawlResult>, AppError> {
        let mut conn = self.conn.clone();

        let raw: Option<String> = conn
            .lpop(self.config.per_job_key(job_id), None)
            .await
            .map_err(queue_error("pop result"))?;

        Ok(raw.and_then(|raw| match serde_json::from_str(&raw) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(%job_id, error = %e, "Skipping malformed result entry");
                None
            }
        }))
    }
}

impl JobQueue for RedisQueue {
    async fn push_job(&self, job: &CrawlJob) -> Result<(), AppError> {
        let payload = serde_json::to_string(job)?;
        let mut conn = self.conn.clone();

        let _: usize = conn
            .rpush(&self.config.job_queue, payload)
            .await
            .map_err(queue_error("push job"))?;
        Ok(())
    }

    async fn pop_job(&self, wait: Duration) -> Result<Option<CrawlJob>, AppError> {
        let mut conn = self.conn.clone();
        let key = &self.config.job_queue;

        // BLPOP 0 would block forever.
        let raw: Option<String> = if wait.is_zero() {
            conn.lpop(key, None)
                .await
                .map_err(queue_error("pop job"))?
        } else {
            let popped: Option<(String, String)> = conn
                .blpop(key, wait.as_secs_f64())
                .await
                .map_err(queue_error("pop job"))?;
            popped.map(|(_, value)| value)
        };

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(job) => Ok(Some(job)),
            Err(e) => {
                tracing::warn!(error = %e, raw = %raw, "Skipping malformed job entry");
                Ok(None)
            }
        }
    }

    async fn push_result(&self, result: &CrawlResult) -> Result<(), AppError> {
        let payload = serde_json::to_string(result)?;
        let mut conn = self.conn.clone();

        let _: usize = conn
            .rpush(self.result_key(&result.job_id), payload)
            .await
            .map_err(queue_error("push result"))?;
        Ok(())
    }

    async fn take_result(&self, job_id: &str) -> Result<Option<CrawlResult>, AppError> {
        match self.config.routing {
            ResultRouting::Shared => self.take_shared(job_id).await,
            ResultRouting::PerJob => self.take_per_job(job_id).await,
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(queue_error("ping Redis"))?;
        Ok(())
    }

    /// Per-job result lists are not counted.
    async fn queue_depths(&self) -> Result<QueueDepths, AppError> {
        let mut conn = self.conn.clone();

        let jobs: usize = conn
            .llen(&self.config.job_queue)
            .await
            .map_err(queue_error("read job queue length"))?;
        let results: usize = conn
            .llen(&self.config.result_queue)
            .await
            .map_err(queue_error("read result queue length"))?;

        Ok(QueueDepths { jobs, results })
    }
}
