//! Test utility functions for integration tests
//!
//! Provides common utilities for test setup, logging, and waiting on
//! completions.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};
use tracing_subscriber::{fmt, EnvFilter};

/// Result type for integration tests
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Default timeout for test operations
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default poll interval for condition checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// How long a test waits before concluding that nothing was delivered
pub const QUIET_PERIOD: Duration = Duration::from_millis(50);

/// Initialize logging for tests
///
/// Uses RUST_LOG environment variable if set, otherwise defaults to "info"
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Polls `condition` every `poll_interval` until it holds or `limit` elapses.
///
/// Used for effects that happen off the notifier path, such as a detached
/// bearer release.
pub async fn wait_for_condition<F, Fut>(
    mut condition: F,
    limit: Duration,
    poll_interval: Duration,
) -> TestResult
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + limit;
    while !condition().await {
        if Instant::now() >= deadline {
            return Err(format!("condition still false after {limit:?}").into());
        }
        sleep(poll_interval).await;
    }
    Ok(())
}

/// Receives the next message or fails after [`DEFAULT_TEST_TIMEOUT`].
pub async fn recv_within<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> TestResult<T> {
    match timeout(DEFAULT_TEST_TIMEOUT, rx.recv()).await {
        Ok(Some(msg)) => Ok(msg),
        Ok(None) => Err("Channel closed".into()),
        Err(_) => Err("No message within timeout".into()),
    }
}

/// Returns true if nothing arrives on `rx` during [`QUIET_PERIOD`].
pub async fn stays_quiet<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> bool {
    timeout(QUIET_PERIOD, rx.recv()).await.is_err()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_condition_met_after_some_polls() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        wait_for_condition(
            move || {
                let counter = counter.clone();
                async move { counter.fetch_add(1, Ordering::SeqCst) >= 3 }
            },
            DEFAULT_TEST_TIMEOUT,
            Duration::from_millis(1),
        )
        .await
        .unwrap();
        assert_eq!(polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_condition_never_met() {
        let result = wait_for_condition(
            || async { false },
            Duration::from_millis(20),
            Duration::from_millis(5),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_recv_within_and_quiet() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        assert!(stays_quiet(&mut rx).await);
        tx.send(7u32).unwrap();
        assert_eq!(recv_within(&mut rx).await.unwrap(), 7);
        drop(tx);
        assert!(recv_within(&mut rx).await.is_err());
    }
}
