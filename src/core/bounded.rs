// src/core/bounded.rs
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;

/// Run `operation` until it finishes, `limit` elapses (`TimedOut`) or `cancel`
/// fires (`Cancelled`). The operation future is dropped in the last two cases.
pub async fn bounded<T, F>(
    cancel: &CancellationToken,
    limit: Duration,
    operation: F,
) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        answer = tokio::time::timeout(limit, operation) => {
            answer.unwrap_or(Err(ClientError::TimedOut))
        }
    }
}
