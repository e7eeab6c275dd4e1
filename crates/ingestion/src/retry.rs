//! Single retry of transient provider failures.

use mevscope_heuristics::ProviderError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Run `op`, retrying exactly once after `delay` if the first attempt fails
/// with a transient error.
///
/// # Arguments
/// * `operation` - Label used in logs
/// * `delay` - Pause before the retry
/// * `op` - Called with the attempt number, starting at 1
pub async fn retry_once<F, Fut, T>(operation: &str, delay: Duration, mut op: F) -> Result<T, ProviderError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    match op(1).await {
        Err(e) if e.is_transient() => {
            warn!("{} failed ({}), retrying once", operation, e);
            sleep(delay).await;
            op(2).await
        }
        other => other,
    }
}
