use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::engine::StrategyEngine;
use crate::error::AppError;
use crate::job::{CrawlJob, WorkerConfig};
use crate::job_queue::JobQueue;
use crate::models::{CrawlResult, ResultStatus};
use crate::strategy::Strategy;
use crate::traits::{ContentExtractor, Renderer, RendererFactory};

/// Events emitted by the worker for monitoring/logging.
#[derive(Debug, Clone)]
pub enum WorkerEvent<'a> {
    Started {
        worker_id: &'a str,
    },
    Polling,
    JobReceived {
        job: &'a CrawlJob,
    },
    JobCompleted {
        job_id: &'a str,
        strategy: Strategy,
    },
    JobFailed {
        job_id: &'a str,
        error: &'a str,
    },
    ResultPublished {
        job_id: &'a str,
        status: ResultStatus,
    },
    ShuttingDown {
        worker_id: &'a str,
        jobs_processed: u64,
    },
    Stopped {
        worker_id: &'a str,
    },
}

/// Trait for receiving worker events (decoupled logging).
pub trait WorkerReporter: Send + Sync {
    fn report(&self, event: WorkerEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWorkerReporter;

impl WorkerReporter for TracingWorkerReporter {
    fn report(&self, event: WorkerEvent<'_>) {
        match event {
            WorkerEvent::Started { worker_id } => {
                tracing::info!(%worker_id, "Worker started, waiting for crawl jobs");
            }
            WorkerEvent::Polling => {
                tracing::debug!("Polling for jobs");
            }
            WorkerEvent::JobReceived { job } => {
                tracing::info!(job_id = %job.job_id, url = %job.url, "Received crawl job");
            }
            WorkerEvent::JobCompleted { job_id, strategy } => {
                tracing::info!(%job_id, %strategy, "Job completed");
            }
            WorkerEvent::JobFailed { job_id, error } => {
                tracing::warn!(%job_id, %error, "Job failed");
            }
            WorkerEvent::ResultPublished { job_id, status } => {
                tracing::info!(%job_id, %status, "Result published");
            }
            WorkerEvent::ShuttingDown {
                worker_id,
                jobs_processed,
            } => {
                tracing::info!(%worker_id, %jobs_processed, "Worker shutting down");
            }
            WorkerEvent::Stopped { worker_id } => {
                tracing::info!(%worker_id, "Worker stopped");
            }
        }
    }
}

/// Worker that pops crawl jobs, runs the strategy engine, and publishes results.
pub struct WorkerService<Q, RF, X>
where
    Q: JobQueue,
    RF: RendererFactory,
    X: ContentExtractor,
{
    queue: Q,
    renderer_factory: RF,
    engine: StrategyEngine<X>,
    config: WorkerConfig,
}

impl<Q, RF, X> WorkerService<Q, RF, X>
where
    Q: JobQueue,
    RF: RendererFactory,
    X: ContentExtractor,
{
    pub fn new(
        queue: Q,
        renderer_factory: RF,
        extractor: X,
        engine_config: EngineConfig,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            renderer_factory,
            engine: StrategyEngine::new(extractor, engine_config),
            config,
        }
    }

    /// Run the worker loop until cancellation.
    ///
    /// The pop itself is not interrupted: its bounded wait is what keeps the
    /// loop responsive, and a job already taken off the queue is always
    /// finished and published. Queue errors never end the loop.
    pub async fn run<WR: WorkerReporter>(
        &self,
        cancel_token: CancellationToken,
        reporter: &WR,
    ) -> Result<(), AppError> {
        reporter.report(WorkerEvent::Started {
            worker_id: &self.config.worker_id,
        });

        let mut jobs_processed = 0u64;

        loop {
            if cancel_token.is_cancelled() {
                break;
            }

            reporter.report(WorkerEvent::Polling);

            match self.queue.pop_job(self.config.pop_timeout).await {
                Ok(Some(job)) => {
                    reporter.report(WorkerEvent::JobReceived { job: &job });
                    let result = self.process_job(&job, reporter).await;
                    self.publish(&result, reporter).await;
                    jobs_processed += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Failed to pop crawl job");
                    tokio::select! {
                        () = tokio::time::sleep(self.config.error_backoff) => {}
                        () = cancel_token.cancelled() => break,
                    }
                }
            }
        }

        reporter.report(WorkerEvent::ShuttingDown {
            worker_id: &self.config.worker_id,
            jobs_processed,
        });
        reporter.report(WorkerEvent::Stopped {
            worker_id: &self.config.worker_id,
        });

        Ok(())
    }

    /// Crawl one job in a fresh renderer session. Always yields a result record.
    async fn process_job<WR: WorkerReporter>(&self, job: &CrawlJob, reporter: &WR) -> CrawlResult {
        let session = match self.renderer_factory.create().await {
            Ok(session) => session,
            Err(e) => {
                let error_msg = format!("Failed to start renderer: {e}");
                reporter.report(WorkerEvent::JobFailed {
                    job_id: &job.job_id,
                    error: &error_msg,
                });
                return CrawlResult::failure(job, error_msg);
            }
        };

        let result = self.engine.run(&session, job).await;
        session.shutdown().await;

        match (result.status, result.strategy) {
            (ResultStatus::Success, Some(strategy)) => {
                reporter.report(WorkerEvent::JobCompleted {
                    job_id: &job.job_id,
                    strategy,
                });
            }
            _ => {
                reporter.report(WorkerEvent::JobFailed {
                    job_id: &job.job_id,
                    error: result.error.as_deref().unwrap_or_default(),
                });
            }
        }

        result
    }

    async fn publish<WR: WorkerReporter>(&self, result: &CrawlResult, reporter: &WR) {
        if let Err(e) = self.queue.push_result(result).await {
            tracing::error!(job_id = %result.job_id, error = %e, "Failed to publish crawl result");
            return;
        }
        reporter.report(WorkerEvent::ResultPublished {
            job_id: &result.job_id,
            status: result.status,
        });
    }
}
