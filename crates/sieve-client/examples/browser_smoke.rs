/// Smoke-test for `ChromiumRenderer`.
///
/// Launches a headless Chromium, runs the full strategy engine against
/// <https://example.com>, and prints the result record.
///
/// Run with:
///   cargo run -p sieve-client --example browser_smoke --features browser
use sieve_client::{ChromiumRendererFactory, ScraperExtractor};
use sieve_core::traits::{Renderer, RendererFactory};
use sieve_core::{CrawlJob, EngineConfig, StrategyEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Launching headless browser…");
    let session = ChromiumRendererFactory.create().await?;

    // example.com carries less text than the default floor.
    let config = EngineConfig::default().with_min_content_length(50);
    let engine = StrategyEngine::new(ScraperExtractor::new()?, config);

    let job = CrawlJob::new("https://example.com");
    let result = engine.run(&session, &job).await;
    session.shutdown().await;

    assert!(result.is_success(), "crawl failed: {:?}", result.error);
    assert_eq!(result.title.as_deref(), Some("Example Domain"));

    println!("OK: strategy {:?}", result.strategy);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
