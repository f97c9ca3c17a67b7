use std::time::Duration;

use redis::AsyncCommands;
use sieve_core::job::CrawlJob;
use sieve_core::job_queue::JobQueue;
use sieve_core::models::{CrawlResult, ResultStatus};
use sieve_core::{AppError, CrawlBroker};
use sieve_queue::{QueueConfig, RedisQueue, ResultRouting};

use crate::integration::common::setup_test_queue;

/// Raw connection for planting entries the queue API would never write.
async fn raw_connection(queue: &RedisQueue) -> redis::aio::MultiplexedConnection {
    redis::Client::open(queue.config().redis_url.as_str())
        .unwrap()
        .get_multiplexed_async_connection()
        .await
        .unwrap()
}

#[tokio::test]
async fn jobs_pop_in_submission_order() {
    let (queue, _container) = setup_test_queue(ResultRouting::Shared).await;
    let first = CrawlJob::new("https://example.com/one");
    let second = CrawlJob::new("https://example.com/two");

    queue.push_job(&first).await.unwrap();
    queue.push_job(&second).await.unwrap();
    assert_eq!(queue.queue_depths().await.unwrap().jobs, 2);

    let popped = queue.pop_job(Duration::from_secs(1)).await.unwrap();
    assert_eq!(popped, Some(first));
    let popped = queue.pop_job(Duration::ZERO).await.unwrap();
    assert_eq!(popped, Some(second));
    assert_eq!(queue.queue_depths().await.unwrap().jobs, 0);
}

#[tokio::test]
async fn pop_times_out_on_empty_queue() {
    let (queue, _container) = setup_test_queue(ResultRouting::Shared).await;

    let popped = queue.pop_job(Duration::from_millis(200)).await.unwrap();

    assert!(popped.is_none());
}

#[tokio::test]
async fn job_is_delivered_to_one_popper_only() {
    let (queue, _container) = setup_test_queue(ResultRouting::Shared).await;
    let other = RedisQueue::connect(queue.config()).await.unwrap();
    queue
        .push_job(&CrawlJob::new("https://example.com"))
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        queue.pop_job(Duration::from_millis(500)),
        other.pop_job(Duration::from_millis(500)),
    );

    let delivered = [a.unwrap(), b.unwrap()].iter().flatten().count();
    assert_eq!(delivered, 1);
}

#[tokio::test]
async fn malformed_job_is_skipped() {
    let (queue, _container) = setup_test_queue(ResultRouting::Shared).await;
    let mut raw = raw_connection(&queue).await;
    let _: usize = raw.rpush("crawl_jobs", "{not json").await.unwrap();
    let job = CrawlJob::new("https://example.com");
    queue.push_job(&job).await.unwrap();

    assert!(queue.pop_job(Duration::ZERO).await.unwrap().is_none());
    assert_eq!(queue.pop_job(Duration::ZERO).await.unwrap(), Some(job));
}

#[tokio::test]
async fn take_result_removes_exactly_one_matching_entry() {
    let (queue, _container) = setup_test_queue(ResultRouting::Shared).await;
    let job = CrawlJob::new("https://example.com");
    let other = CrawlJob::new("https://example.org");
    queue
        .push_result(&CrawlResult::failure(&other, "other"))
        .await
        .unwrap();
    queue
        .push_result(&CrawlResult::failure(&job, "mine"))
        .await
        .unwrap();

    let result = queue.take_result(&job.job_id).await.unwrap().unwrap();

    assert_eq!(result.job_id, job.job_id);
    assert_eq!(result.error.as_deref(), Some("mine"));
    assert!(queue.take_result(&job.job_id).await.unwrap().is_none());
    assert_eq!(queue.queue_depths().await.unwrap().results, 1);
}

#[tokio::test]
async fn take_result_skips_malformed_entries() {
    let (queue, _container) = setup_test_queue(ResultRouting::Shared).await;
    let mut raw = raw_connection(&queue).await;
    let _: usize = raw.rpush("crawl_results", "garbage").await.unwrap();
    let job = CrawlJob::new("https://example.com");
    queue
        .push_result(&CrawlResult::failure(&job, "boom"))
        .await
        .unwrap();

    let result = queue.take_result(&job.job_id).await.unwrap();

    assert!(result.is_some());
    assert_eq!(queue.queue_depths().await.unwrap().results, 1);
}

#[tokio::test]
async fn per_job_routing_delivers_only_to_matching_job() {
    let (queue, _container) = setup_test_queue(ResultRouting::PerJob).await;
    let job = CrawlJob::new("https://example.com");
    let other = CrawlJob::new("https://example.org");
    queue
        .push_result(&CrawlResult::failure(&other, "other"))
        .await
        .unwrap();

    assert!(queue.take_result(&job.job_id).await.unwrap().is_none());

    queue
        .push_result(&CrawlResult::failure(&job, "mine"))
        .await
        .unwrap();
    let result = queue.take_result(&job.job_id).await.unwrap().unwrap();

    assert_eq!(result.error.as_deref(), Some("mine"));
    let mut raw = raw_connection(&queue).await;
    let len: usize = raw
        .llen(format!("crawl_results:{}", other.job_id))
        .await
        .unwrap();
    assert_eq!(len, 1);
}

#[tokio::test]
async fn broker_round_trip_and_validation() {
    let (queue, _container) = setup_test_queue(ResultRouting::Shared).await;
    let broker = CrawlBroker::new(queue.clone());

    let err = broker.submit("ftp://bad").await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    assert_eq!(queue.queue_depths().await.unwrap().jobs, 0);

    let job_id = broker.submit("https://example.com").await.unwrap();
    let job = queue.pop_job(Duration::ZERO).await.unwrap().unwrap();
    assert_eq!(job.job_id, job_id);

    queue
        .push_result(&CrawlResult::failure(&job, "boom"))
        .await
        .unwrap();
    let result = broker
        .await_result(&job_id, Duration::from_secs(2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.status, ResultStatus::Error);
    assert!(
        broker
            .await_result(&job_id, Duration::ZERO)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn health_and_unreachable_backend() {
    let (queue, _container) = setup_test_queue(ResultRouting::Shared).await;
    assert!(CrawlBroker::new(queue).health().await);

    let config = QueueConfig::default().with_redis_url("redis://127.0.0.1:1/0");
    let err = RedisQueue::connect(&config).await.err().unwrap();
    assert!(err.is_infrastructure());
}
