use std::future::Future;
use std::time::Duration;

/// Thin wrapper over the `exponential-backoff` crate's iterator-of-durations
/// API, adapted for async retry loops (the teacher's
/// `journal-client::read::uncommitted::retry::ExponentialBackoff` wraps the
/// same crate for synchronous reads; this is the async-HTTP counterpart).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    min: Duration,
    max: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, min: Duration, max: Duration) -> Self {
        RetryPolicy { max_retries, min, max }
    }

    /// Retries `op` up to `max_retries` times, sleeping for successive
    /// backoff durations between attempts. `should_retry` decides whether a
    /// given error is transient (5xx/429/connection errors, per `spec.md`
    /// §6's normalization service contract) or should be surfaced immediately.
    pub async fn run<T, E, F, Fut, R>(&self, should_retry: R, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
    {
        let backoff = exponential_backoff::Backoff::new(self.max_retries, self.min, Some(self.max));
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !should_retry(&err) {
                        return Err(err);
                    }
                    attempt += 1;
                    match backoff.next(attempt) {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => return Err(err),
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(8, Duration::from_secs(1), Duration::from_secs(300))
    }
}
