use std::future::Future;
use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff};
use tracing::warn;

use crate::config::RetrySettings;
use crate::error::PersistenceError;
use crate::metrics::MetricsCtx;

fn backoff_for(settings: &RetrySettings) -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: Duration::from_millis(settings.initial_interval_ms),
        max_interval: Duration::from_millis(settings.max_interval_ms),
        max_elapsed_time: Some(Duration::from_millis(settings.max_elapsed_time_ms)),
        ..Default::default()
    }
}

/// Retries a persistence operation with bounded exponential backoff
/// (a handful of attempts, 50/200/500ms-class delays). Fatal errors are
/// not retried.
pub async fn with_retry<T, F, Fut>(
    settings: &RetrySettings,
    metrics: &MetricsCtx,
    mut op: F,
) -> Result<T, PersistenceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PersistenceError>>,
{
    let mut backoff = backoff_for(settings);
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() => {
                metrics.persistence_retries_total.inc();
                match backoff.next_backoff() {
                    Some(delay) => {
                        warn!("transient persistence failure, retrying in {:?}: {}", delay, e);
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                }
            }
            Err(e) => return Err(e),
        }
    }
}
