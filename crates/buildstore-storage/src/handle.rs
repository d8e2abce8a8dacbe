//! Pending results of mutating operations.

use buildstore_core::{Error, Resource, Result};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Handle to the eventual outcome of a mutating operation.
///
/// Resolves exactly once. Dropping the handle does not abort the work behind
/// it: the registry call still runs to completion, only its result is lost.
#[derive(Debug)]
pub struct AsyncResult {
    rx: oneshot::Receiver<Result<Resource>>,
}

impl Future for AsyncResult {
    type Output = Result<Resource>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(Error::Cancelled)))
    }
}

/// Run `work` on a separate task and return a handle to its result.
///
/// Must be called from within a Tokio runtime.
pub fn make_async<F>(work: F) -> AsyncResult
where
    F: Future<Output = Result<Resource>> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        // The receiver may already be gone; the work itself has still happened.
        let _ = tx.send(work.await);
    });
    AsyncResult { rx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildstore_core::Status;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_resolves_with_value() {
        let handle = make_async(async { Ok(Status::success().into()) });
        assert_eq!(handle.await.unwrap(), Resource::Status(Status::success()));
    }

    #[tokio::test]
    async fn test_resolves_with_error() {
        let handle = make_async(async { Err(Error::Storage("disk full".to_string())) });
        assert_eq!(
            handle.await.unwrap_err(),
            Error::Storage("disk full".to_string())
        );
    }

    #[tokio::test]
    async fn test_returns_before_work_completes() {
        let gate = Arc::new(Notify::new());
        let finished = Arc::new(AtomicBool::new(false));

        let handle = {
            let gate = gate.clone();
            let finished = finished.clone();
            make_async(async move {
                gate.notified().await;
                finished.store(true, Ordering::SeqCst);
                Ok(Status::success().into())
            })
        };

        assert!(!finished.load(Ordering::SeqCst));
        gate.notify_one();
        handle.await.unwrap();
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_dropped_handle_still_runs_work() {
        let done = Arc::new(Notify::new());
        let handle = {
            let done = done.clone();
            make_async(async move {
                done.notify_one();
                Ok(Status::success().into())
            })
        };
        drop(handle);
        done.notified().await;
    }

    #[tokio::test]
    async fn test_panicking_work_resolves_cancelled() {
        async fn explode() -> Result<Resource> {
            panic!("boom")
        }

        let handle = make_async(explode());
        assert_eq!(handle.await.unwrap_err(), Error::Cancelled);
    }
}
