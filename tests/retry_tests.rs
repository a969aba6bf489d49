use anyhow::{Result, anyhow};
use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};
use tickbook_client::{config::Config, models::retry::RetryConfig, utils::retry_with_backoff};
use tokio::time::Instant;

fn fast_config(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_delay_ms: 20,
        max_delay_ms: 200,
        backoff_multiplier: 2,
    }
}

/// Test: A storage write that succeeds first time is not retried
#[tokio::test]
async fn test_successful_operation_no_retry() -> Result<()> {
    let attempt_count = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempt_count);

    let result = retry_with_backoff(&fast_config(3), || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>("stored")
        }
    })
    .await?;

    assert_eq!(result, "stored");
    assert_eq!(attempt_count.load(Ordering::SeqCst), 1, "Should only attempt once");

    Ok(())
}

/// Test: A gateway that recovers after two 5xx answers is retried until success
#[tokio::test]
async fn test_transient_failures_are_retried() -> Result<()> {
    let attempt_count = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempt_count);

    let result = retry_with_backoff(&fast_config(5), || {
        let counter = Arc::clone(&counter);
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(anyhow!("503 Service Unavailable"))
            } else {
                Ok("page")
            }
        }
    })
    .await?;

    assert_eq!(result, "page");
    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);

    Ok(())
}

/// Test: Persistent failures stop after max_attempts and surface the last error
#[tokio::test]
async fn test_permanent_failure_exhausts_retries() -> Result<()> {
    let attempt_count = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempt_count);

    let result = retry_with_backoff(&fast_config(4), || {
        let counter = Arc::clone(&counter);
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(anyhow!("attempt {} failed", n + 1))
        }
    })
    .await;

    let err = result.expect_err("Should fail after max attempts");
    assert_eq!(err.to_string(), "attempt 4 failed");
    assert_eq!(attempt_count.load(Ordering::SeqCst), 4);

    Ok(())
}

/// Test: Backoff never waits much longer than max_delay_ms between attempts
#[tokio::test]
async fn test_max_delay_cap_respected() -> Result<()> {
    let config = RetryConfig {
        max_attempts: 5,
        initial_delay_ms: 40,
        max_delay_ms: 80,
        backoff_multiplier: 4,
    };

    let start = Instant::now();
    let attempt_times = Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let times = Arc::clone(&attempt_times);

    let _ = retry_with_backoff(&config, || {
        let times = Arc::clone(&times);
        async move {
            times.lock().await.push(start.elapsed().as_millis());
            Err::<(), _>(anyhow!("Fail"))
        }
    })
    .await;

    let times = attempt_times.lock().await;
    assert_eq!(times.len(), 5);

    for pair in times.windows(2).skip(1) {
        let delay = pair[1] - pair[0];
        // Generous upper bound for scheduler noise on loaded machines.
        assert!(delay <= 200, "Delay {} should stay near the 80ms cap", delay);
    }

    Ok(())
}

/// Test: Retry settings come from the environment-derived config
#[tokio::test]
async fn test_retry_config_from_config() -> Result<()> {
    let config = Config::from_vars([
        ("API_BASE_URL", "http://localhost:9000"),
        ("MAX_RETRY_ATTEMPTS", "5"),
        ("INITIAL_RETRY_DELAY_MS", "50"),
        ("MAX_RETRY_DELAY_MS", "400"),
        ("RETRY_BACKOFF_MULTIPLIER", "3"),
    ])?;

    let retry = config.retry_config();

    assert_eq!(retry.max_attempts, 5);
    assert_eq!(retry.initial_delay_ms, 50);
    assert_eq!(retry.max_delay_ms, 400);
    assert_eq!(retry.backoff_multiplier, 3);

    Ok(())
}
