//! Single-shot handles for requests running on the tokio runtime.

use crate::error::FetchError;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::task::JoinHandle;

/// A spawned request that resolves exactly once.
///
/// Awaiting the signal yields the request's result. Calling [`Signal::cancel`]
/// or dropping the handle aborts the request; a cancelled signal can no
/// longer deliver anything because the handle is gone.
#[must_use = "a signal does nothing useful unless awaited, and dropping it cancels the request"]
#[derive(Debug)]
pub struct Signal<T> {
    handle: JoinHandle<Result<T, FetchError>>,
}

impl<T: Send + 'static> Signal<T> {
    /// Start `future` on the current tokio runtime.
    ///
    /// Panics if called outside a runtime, like `tokio::spawn`.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        Self { handle: tokio::spawn(future) }
    }
}

impl<T> Signal<T> {
    /// Abort the request. A response that already arrived is discarded.
    pub fn cancel(self) {
        tracing::debug!(finished = self.handle.is_finished(), "cancelling signal");
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<T> Drop for Signal<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl<T> Future for Signal<T> {
    type Output = Result<T, FetchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(err)) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            // Only reachable when the runtime shuts down under us.
            Poll::Ready(Err(_)) => Poll::Ready(Err(FetchError::Cancelled)),
        }
    }
}
