pub mod broker;
pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod job_queue;
pub mod models;
pub mod quality;
pub mod strategy;
pub mod traits;
pub mod worker;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use broker::{BrokerConfig, CrawlBroker};
pub use config::EngineConfig;
pub use engine::StrategyEngine;
pub use error::AppError;
pub use job::{CrawlJob, WorkerConfig, validate_url};
pub use job_queue::{JobQueue, QueueDepths};
pub use models::{CrawlResult, ExtractionCandidate, PageMetadata, RenderedPage, ResultStatus};
pub use quality::{QualityGate, Verdict};
pub use strategy::{RenderRequest, Strategy, StrategyPolicy};
pub use traits::{ContentExtractor, Renderer, RendererFactory};
pub use worker::{TracingWorkerReporter, WorkerEvent, WorkerReporter, WorkerService};
