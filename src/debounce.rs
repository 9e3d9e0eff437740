// Write coalescing for bursty callers
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::Result;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Coalesces a burst of values into a single write of the latest one.
///
/// A value is written once no newer value has arrived for `window`.
/// [`Debouncer::close`] writes any pending value before returning.
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
    worker: JoinHandle<usize>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn spawn<F, Fut>(window: Duration, sink: F) -> Self
    where
        F: Fn(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();

        let worker = tokio::spawn(async move {
            let mut writes = 0;
            while let Some(first) = rx.recv().await {
                let mut latest = first;
                let mut open = true;
                loop {
                    tokio::select! {
                        next = rx.recv() => match next {
                            Some(value) => latest = value,
                            None => {
                                open = false;
                                break;
                            }
                        },
                        _ = tokio::time::sleep(window) => break,
                    }
                }

                match sink(latest).await {
                    Ok(()) => writes += 1,
                    Err(e) => warn!(error = %e, "debounced write failed"),
                }
                if !open {
                    break;
                }
            }
            debug!(writes, "debouncer stopped");
            writes
        });

        Self { tx, worker }
    }

    /// Queue a value; it replaces anything not yet written
    pub fn push(&self, value: T) {
        if self.tx.send(value).is_err() {
            warn!("debouncer worker is gone, dropping value");
        }
    }

    /// Flush the pending value and stop. Returns the number of writes made.
    pub async fn close(self) -> usize {
        drop(self.tx);
        self.worker.await.unwrap_or(0)
    }
}
