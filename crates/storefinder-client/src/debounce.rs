//! Trailing-edge debounce for async callbacks.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

type Callback<T> = Arc<dyn Fn(T) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Delays a callback until `delay` has passed without another [`Debounce::call`].
///
/// Each call replaces the pending timer, so only the most recent argument in a
/// burst reaches the callback. Once the timer fires the callback runs in its
/// own task; later calls never cancel a callback that already started.
///
/// Must be used from within a tokio runtime.
pub struct Debounce<T> {
    delay: Duration,
    callback: Callback<T>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> Debounce<T> {
    pub fn new<F, Fut>(delay: Duration, callback: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let callback: Callback<T> = Arc::new(
            move |arg: T| -> Pin<Box<dyn Future<Output = ()> + Send>> { Box::pin(callback(arg)) },
        );
        Self {
            delay,
            callback,
            pending: Mutex::new(None),
        }
    }

    /// Schedules the callback with `arg`, superseding any pending call.
    pub fn call(&self, arg: T) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = pending.take() {
            timer.abort();
        }

        let callback = Arc::clone(&self.callback);
        let delay = self.delay;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(callback(arg));
        }));
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<T> Drop for Debounce<T> {
    fn drop(&mut self) {
        let pending = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = pending.take() {
            timer.abort();
        }
    }
}
