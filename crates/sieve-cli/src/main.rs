use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use sieve_client::{HttpRendererFactory, ScraperExtractor};
use sieve_core::traits::{Renderer, RendererFactory};
use sieve_core::{
    CrawlBroker, CrawlJob, EngineConfig, Strategy, StrategyEngine, TracingWorkerReporter,
    WorkerConfig, WorkerService,
};
use sieve_queue::{QueueConfig, RedisQueue};

#[derive(Parser)]
#[command(name = "sieve", version, about = "Adaptive web-content extraction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a crawl worker that consumes jobs from the queue
    Worker {
        #[command(flatten)]
        engine: EngineArgs,

        /// Worker identifier used in logs (random if omitted)
        #[arg(long, env = "SIEVE_WORKER_ID")]
        worker_id: Option<String>,

        /// Seconds to block waiting for a job before re-checking for shutdown
        #[arg(long, env = "SIEVE_POP_TIMEOUT", default_value_t = 5)]
        pop_timeout: u64,
    },

    /// Enqueue a crawl job and print its id
    Submit {
        /// Target URL (http or https)
        #[arg(short, long)]
        url: String,
    },

    /// Wait for the result of a previously submitted job
    Result {
        /// Job id returned by `submit`
        #[arg(short, long)]
        job_id: String,

        /// Seconds to wait before giving up
        #[arg(short, long, default_value_t = 60)]
        timeout: u64,
    },

    /// Submit a job and wait for its result
    Crawl {
        /// Target URL (http or https)
        #[arg(short, long)]
        url: String,

        /// Seconds to wait before returning a pending record
        #[arg(short, long, default_value_t = 60)]
        timeout: u64,
    },

    /// Run the strategy engine in-process, without the queue
    Extract {
        /// Target URL (http or https)
        #[arg(short, long)]
        url: String,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Check connectivity to the queue backend
    Health,

    /// Show queue depths
    Status,
}

#[derive(Args)]
struct EngineArgs {
    /// Render with headless Chromium (requires the `browser` feature)
    #[arg(long, default_value_t = false)]
    browser: bool,

    /// Minimum extracted text length, in bytes
    #[arg(long, env = "SIEVE_MIN_CONTENT_LENGTH", default_value_t = 200)]
    min_content_length: usize,

    /// Minimum text-to-markup ratio
    #[arg(long, env = "SIEVE_MIN_RATIO", default_value_t = 0.1)]
    min_ratio: f64,

    /// Strategies to try, in order (comma-separated)
    #[arg(long, value_delimiter = ',')]
    strategies: Vec<Strategy>,
}

impl EngineArgs {
    fn engine_config(&self) -> EngineConfig {
        let config = EngineConfig::default()
            .with_min_content_length(self.min_content_length)
            .with_min_ratio(self.min_ratio);

        if self.strategies.is_empty() {
            config
        } else {
            config.with_strategies(self.strategies.clone())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sieve=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Worker {
            engine,
            worker_id,
            pop_timeout,
        } => {
            let mut config =
                WorkerConfig::default().with_pop_timeout(Duration::from_secs(pop_timeout));
            if let Some(id) = worker_id {
                config = config.with_worker_id(id);
            }
            cmd_worker(&engine, config).await?;
        }
        Commands::Submit { url } => {
            let broker = connect_broker().await?;
            let job_id = broker.submit(&url).await.map_err(|e| anyhow::anyhow!(e))?;
            print_json(&serde_json::json!({ "job_id": job_id, "url": url }))?;
        }
        Commands::Result { job_id, timeout } => {
            let broker = connect_broker().await?;
            cmd_result(&broker, &job_id, Duration::from_secs(timeout)).await?;
        }
        Commands::Crawl { url, timeout } => {
            let broker = connect_broker().await?;
            let result = broker
                .crawl(&url, Duration::from_secs(timeout))
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            print_json(&result)?;
        }
        Commands::Extract { url, engine } => {
            cmd_extract(&url, &engine).await?;
        }
        Commands::Health => {
            cmd_health().await?;
        }
        Commands::Status => {
            let broker = connect_broker().await?;
            let depths = broker.queue_depths().await.map_err(|e| anyhow::anyhow!(e))?;
            let config = broker.queue().config();
            print_json(&serde_json::json!({
                "job_queue": config.job_queue,
                "jobs": depths.jobs,
                "result_queue": config.result_queue,
                "results": depths.results,
                "routing": config.routing.as_str(),
            }))?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Connect to Redis using REDIS_URL and the queue-name variables.
async fn connect_queue() -> Result<RedisQueue> {
    let config = QueueConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    RedisQueue::connect(&config)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| format!("Failed to connect to {}", config.redis_url))
}

async fn connect_broker() -> Result<CrawlBroker<RedisQueue>> {
    Ok(CrawlBroker::new(connect_queue().await?))
}

async fn cmd_worker(engine: &EngineArgs, config: WorkerConfig) -> Result<()> {
    let queue = connect_queue().await?;
    let extractor = ScraperExtractor::new().map_err(|e| anyhow::anyhow!(e))?;

    if engine.browser {
        #[cfg(feature = "browser")]
        {
            let factory = sieve_client::ChromiumRendererFactory;
            return run_worker(queue, factory, extractor, engine.engine_config(), config).await;
        }
        #[cfg(not(feature = "browser"))]
        bail!("--browser requires sieve to be built with the `browser` feature");
    }

    let factory = HttpRendererFactory::new().map_err(|e| anyhow::anyhow!(e))?;
    // Plain HTTP cannot run delays or in-page navigation.
    let engine_config = engine.engine_config().without_delays();
    run_worker(queue, factory, extractor, engine_config, config).await
}

async fn run_worker<RF: RendererFactory>(
    queue: RedisQueue,
    factory: RF,
    extractor: ScraperExtractor,
    engine_config: EngineConfig,
    config: WorkerConfig,
) -> Result<()> {
    let worker = WorkerService::new(queue, factory, extractor, engine_config, config);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    worker
        .run(cancel, &TracingWorkerReporter)
        .await
        .map_err(|e| anyhow::anyhow!(e))
}

async fn cmd_result(
    broker: &CrawlBroker<RedisQueue>,
    job_id: &str,
    timeout: Duration,
) -> Result<()> {
    match broker
        .await_result(job_id, timeout)
        .await
        .map_err(|e| anyhow::anyhow!(e))?
    {
        Some(result) => print_json(&result),
        None => print_json(&serde_json::json!({
            "job_id": job_id,
            "status": "pending",
            "message": format!("No result after {}s", timeout.as_secs()),
        })),
    }
}

async fn cmd_extract(url: &str, engine: &EngineArgs) -> Result<()> {
    let extractor = ScraperExtractor::new().map_err(|e| anyhow::anyhow!(e))?;
    let job = CrawlJob::new(url);

    if engine.browser {
        #[cfg(feature = "browser")]
        {
            let factory = sieve_client::ChromiumRendererFactory;
            return extract_with(factory, extractor, engine.engine_config(), &job).await;
        }
        #[cfg(not(feature = "browser"))]
        bail!("--browser requires sieve to be built with the `browser` feature");
    }

    let factory = HttpRendererFactory::new().map_err(|e| anyhow::anyhow!(e))?;
    extract_with(factory, extractor, engine.engine_config().without_delays(), &job).await
}

async fn extract_with<RF: RendererFactory>(
    factory: RF,
    extractor: ScraperExtractor,
    engine_config: EngineConfig,
    job: &CrawlJob,
) -> Result<()> {
    sieve_core::validate_url(&job.url).map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!("Crawling {}", job.url);
    let session = factory.create().await.map_err(|e| anyhow::anyhow!(e))?;
    let engine = StrategyEngine::new(extractor, engine_config);
    let result = engine.run(&session, job).await;
    session.shutdown().await;

    print_json(&result)
}

async fn cmd_health() -> Result<()> {
    let config = QueueConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;

    let healthy = match RedisQueue::connect(&config).await {
        Ok(queue) => CrawlBroker::new(queue).health().await,
        Err(e) => {
            tracing::error!(error = %e, "Redis unreachable");
            false
        }
    };

    print_json(&serde_json::json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "redis": if healthy { "connected" } else { "disconnected" },
    }))?;

    if !healthy {
        bail!("Queue backend is unreachable");
    }
    Ok(())
}
