//! Async timeout wrappers.

use crate::error::{ProtocolError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// Connect and send timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait for a node to answer a request
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Await `fut`, failing with [`ProtocolError::Timeout`] after `duration`.
pub async fn with_timeout<F, T>(fut: F, duration: Duration) -> Result<T>
where
    F: Future<Output = T>,
{
    timeout(duration, fut).await.map_err(|_| {
        warn!(timeout_ms = duration.as_millis() as u64, "operation timed out");
        ProtocolError::Timeout
    })
}

/// Like [`with_timeout`] for futures that already yield a [`Result`].
pub async fn with_timeout_error<F, T>(fut: F, duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    with_timeout(fut, duration).await?
}
