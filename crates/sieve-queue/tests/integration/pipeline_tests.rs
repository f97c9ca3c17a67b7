use std::time::Duration;

use sieve_client::ScraperExtractor;
use sieve_core::testutil::{MockRenderer, MockRendererFactory};
use sieve_core::{
    CrawlBroker, EngineConfig, RenderedPage, ResultStatus, Strategy, TracingWorkerReporter,
    WorkerConfig, WorkerService,
};
use sieve_queue::{RedisQueue, ResultRouting};
use tokio_util::sync::CancellationToken;

use crate::integration::common::setup_test_queue;

const STATIC_PAGE: &str = r#"<!doctype html>
<html>
<head>
  <title>Acme Docs</title>
  <meta name="description" content="Getting started with Acme">
</head>
<body>
  <nav><a href="/">Home</a><a href="/docs">Docs</a></nav>
  <main>
    <h1>Getting Started</h1>
    <p>Acme turns a folder of markdown files into a searchable documentation site.
    Install the command line tool, point it at your content directory, and run the
    build command to produce static pages you can host anywhere.</p>
    <h2>Requirements</h2>
    <p>You need a recent toolchain and about five minutes. No database or server
    process is involved; everything is generated ahead of time.</p>
  </main>
  <footer>Copyright Acme</footer>
</body>
</html>"#;

async fn run_pipeline(routing: ResultRouting) {
    let (queue, _container) = setup_test_queue(routing).await;
    let broker = CrawlBroker::new(queue.clone());

    let renderer = MockRenderer::new().with_page(
        Strategy::Direct,
        RenderedPage::new("https://acme.test/docs", STATIC_PAGE),
    );
    // The worker's blocking pop holds its connection, so it gets its own.
    let worker_queue = RedisQueue::connect(queue.config()).await.unwrap();
    let worker = WorkerService::new(
        worker_queue,
        MockRendererFactory::new(renderer),
        ScraperExtractor::new().unwrap(),
        EngineConfig::default().without_delays(),
        WorkerConfig::default()
            .with_worker_id("pipeline-worker")
            .with_pop_timeout(Duration::from_millis(200)),
    );

    let cancel = CancellationToken::new();
    let worker_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { worker.run(cancel, &TracingWorkerReporter).await })
    };

    let result = broker
        .crawl("https://acme.test/docs", Duration::from_secs(10))
        .await
        .unwrap();

    cancel.cancel();
    worker_task.await.unwrap().unwrap();

    assert_eq!(result.status, ResultStatus::Success);
    assert_eq!(result.strategy, Some(Strategy::Direct));
    assert_eq!(result.title.as_deref(), Some("Getting Started"));
    assert_eq!(
        result.description.as_deref(),
        Some("Getting started with Acme")
    );
    let content = result.content.unwrap();
    assert!(content.starts_with("Getting Started\nAcme turns"));
    assert!(!content.contains("Copyright"));
    assert!(content.chars().count() < 10_000);
    assert_eq!(
        result.headings.as_deref(),
        Some("H1: Getting Started\nH2: Requirements")
    );
}

#[tokio::test]
async fn static_page_crawled_end_to_end_shared() {
    run_pipeline(ResultRouting::Shared).await;
}

#[tokio::test]
async fn static_page_crawled_end_to_end_per_job() {
    run_pipeline(ResultRouting::PerJob).await;
}
