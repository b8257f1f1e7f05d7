//! Delayed execution of persisted callbacks.
//!
//! One detached task per callback: sleep out the delay, take a worker permit,
//! dispatch. Detached tasks are never joined on shutdown, so pending
//! callbacks cannot block host termination; abandoning them on exit is
//! accepted behavior.

use crate::dispatch::HttpDispatcher;
use crate::store::CallbackHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

/// Number of callbacks that may dispatch concurrently. Later-due tasks queue
/// on the pool rather than fail.
const WORKER_POOL_SIZE: usize = 50;

/// Bounded pool of background workers firing due callbacks.
pub struct DelayScheduler {
    workers: Arc<Semaphore>,
    dispatcher: Arc<HttpDispatcher>,
}

impl DelayScheduler {
    /// Create a scheduler with the default worker pool size.
    pub fn new(dispatcher: HttpDispatcher) -> Self {
        Self::with_workers(dispatcher, WORKER_POOL_SIZE)
    }

    /// Create a scheduler with an explicit worker pool size.
    pub fn with_workers(dispatcher: HttpDispatcher, workers: usize) -> Self {
        Self {
            workers: Arc::new(Semaphore::new(workers)),
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Enqueue a one-shot timer task for a persisted callback.
    ///
    /// The delay is measured from this call; the task holds only the file
    /// handle while waiting. Must be called from within a tokio runtime.
    pub fn schedule(&self, handle: CallbackHandle, delay: Duration) {
        let workers = Arc::clone(&self.workers);
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match workers.acquire().await {
                Ok(_permit) => dispatcher.run(handle).await,
                Err(_) => debug!("worker pool closed, abandoning callback"),
            }
        });
    }
}
