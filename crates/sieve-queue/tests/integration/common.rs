use sieve_queue::{QueueConfig, RedisQueue, ResultRouting};
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

/// Spins up a Redis container and returns a connected queue.
///
/// The `ContainerAsync` must be kept in scope for the test duration;
/// dropping it will stop the container.
pub async fn setup_test_queue(routing: ResultRouting) -> (RedisQueue, ContainerAsync<GenericImage>) {
    let container = GenericImage::new("redis", "7-alpine")
        .with_exposed_port(ContainerPort::Tcp(6379))
        .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
        .start()
        .await
        .expect("Failed to start Redis container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(6379)
        .await
        .expect("Failed to get port");

    let config = QueueConfig::default()
        .with_redis_url(format!("redis://{host}:{port}/0"))
        .with_routing(routing);

    // Retry connection until container is fully ready
    const MAX_RETRIES: u32 = 30;
    let mut retries = 0;
    let queue = loop {
        match RedisQueue::connect(&config).await {
            Ok(queue) => break queue,
            Err(e) => {
                retries += 1;
                if retries >= MAX_RETRIES {
                    panic!("Failed to connect to Redis after {MAX_RETRIES} retries: {e}");
                }
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    };

    (queue, container)
}
