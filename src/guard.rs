//! Cleanup helpers for half-finished BLE setup.

use std::future::Future;
use std::time::Duration;

use crate::{PrinterError, Result};

/// Runs `release` when `result` is an error, then returns `result` unchanged.
pub(crate) async fn release_on_error<T, F, Fut>(result: Result<T>, release: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    if let Err(e) = &result {
        tracing::debug!(error = %e, "Releasing after failed setup");
        release().await;
    }
    result
}

/// Bounds `fut` by `limit`. On expiry the future is dropped, `on_timeout` runs
/// and `ConnectionTimeout` is returned.
pub(crate) async fn timeout_with_cleanup<T, F, C, CFut>(
    limit: Duration,
    fut: F,
    on_timeout: C,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
    C: FnOnce() -> CFut,
    CFut: Future<Output = ()>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            on_timeout().await;
            Err(PrinterError::ConnectionTimeout(limit.as_secs()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_release_runs_only_on_error() {
        let released = AtomicUsize::new(0);

        let ok: Result<u8> = release_on_error(Ok(7), || async {
            released.fetch_add(1, Ordering::SeqCst);
        })
        .await;
        assert_eq!(ok.unwrap(), 7);
        assert_eq!(released.load(Ordering::SeqCst), 0);

        let err: Result<u8> = release_on_error(Err(PrinterError::MissingCharacteristic), || async {
            released.fetch_add(1, Ordering::SeqCst);
        })
        .await;
        assert!(matches!(err, Err(PrinterError::MissingCharacteristic)));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_runs_cleanup() {
        let cleaned = AtomicUsize::new(0);
        let result: Result<()> = timeout_with_cleanup(
            Duration::from_millis(10),
            std::future::pending(),
            || async {
                cleaned.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;
        assert!(matches!(result, Err(PrinterError::ConnectionTimeout(0))));
        assert_eq!(cleaned.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_cleanup_when_future_finishes() {
        let cleaned = AtomicUsize::new(0);
        let result = timeout_with_cleanup(
            Duration::from_secs(5),
            async { Err::<(), _>(PrinterError::NotConnected) },
            || async {
                cleaned.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;
        assert!(matches!(result, Err(PrinterError::NotConnected)));
        assert_eq!(cleaned.load(Ordering::SeqCst), 0);
    }
}
