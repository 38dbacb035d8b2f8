use std::time::Duration;

use log::warn;
use serde_json::Value;

use super::{QueryExecutor, QueryParams};
use crate::error::TransportError;

/// Retries transient transport failures with exponential backoff.
///
/// Attempt `n` (1-based) waits `backoff_factor * 2^(n-1)` seconds before
/// re-sending. Errors that are not retryable surface immediately.
pub struct RetryingExecutor<E> {
    inner: E,
    max_retries: u32,
    backoff_factor: f64,
}

impl<E> RetryingExecutor<E> {
    pub fn new(inner: E, max_retries: u32, backoff_factor: f64) -> Self {
        Self {
            inner,
            max_retries,
            backoff_factor,
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    fn delay(&self, attempt: u32) -> Duration {
        let factor = 2f64.powi(i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX));
        Duration::try_from_secs_f64(self.backoff_factor * factor).unwrap_or(Duration::ZERO)
    }
}

impl<E: QueryExecutor> QueryExecutor for RetryingExecutor<E> {
    fn api_version(&self) -> &str {
        self.inner.api_version()
    }

    async fn execute_query(
        &self,
        path: &str,
        params: &QueryParams<'_>,
    ) -> Result<Value, TransportError> {
        let mut retry_count = 0;
        loop {
            match self.inner.execute_query(path, params).await {
                Err(e) if e.is_retryable() && retry_count < self.max_retries => {
                    retry_count += 1;
                    let delay = self.delay(retry_count);
                    warn!(
                        "Request to {path} failed ({e}), retrying in {:.1}s ({retry_count}/{})...",
                        delay.as_secs_f64(),
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}
