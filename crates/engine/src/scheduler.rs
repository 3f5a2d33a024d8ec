//! Debounced write-back of local edits.
//!
//! Every scheduled edit restarts the debounce window; the timer is reset,
//! never stacked, so a burst of edits produces one flush carrying the
//! generation tag of the last edit. Flushes run on the scheduler task one at
//! a time, which serializes writes.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::scope::Generation;

/// Background debounce task.
pub struct PersistenceScheduler {
    sender: mpsc::UnboundedSender<Generation>,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PersistenceScheduler {
    /// Spawn the scheduler task. Must be called inside a tokio runtime.
    ///
    /// `flush` is invoked with the tag of the latest edit once `window` has
    /// elapsed without a newer edit.
    pub fn spawn<F, Fut>(window: Duration, flush: F) -> Self
    where
        F: Fn(Generation) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(window, receiver, cancel.clone(), flush));
        Self {
            sender,
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Record an edit made under `tag` and restart the window.
    ///
    /// Returns `false` if the scheduler has already stopped.
    pub fn schedule(&self, tag: Generation) -> bool {
        self.sender.send(tag).is_ok()
    }

    /// Stop the task, flushing a pending edit first.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Persistence scheduler task failed");
            }
        }
    }
}

async fn run<F, Fut>(
    window: Duration,
    mut receiver: mpsc::UnboundedReceiver<Generation>,
    cancel: CancellationToken,
    flush: F,
) where
    F: Fn(Generation) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut pending: Option<Generation> = None;
    let timer = tokio::time::sleep(window);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                while let Ok(tag) = receiver.try_recv() {
                    pending = Some(tag);
                }
                if let Some(tag) = pending.take() {
                    flush(tag).await;
                }
                tracing::debug!("Persistence scheduler cancelled");
                break;
            }
            msg = receiver.recv() => match msg {
                Some(tag) => {
                    pending = Some(tag);
                    timer.as_mut().reset(Instant::now() + window);
                }
                None => {
                    if let Some(tag) = pending.take() {
                        flush(tag).await;
                    }
                    break;
                }
            },
            _ = &mut timer, if pending.is_some() => {
                if let Some(tag) = pending.take() {
                    flush(tag).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use super::*;
    use crate::scope::ScopeResolver;

    fn recorder() -> (Arc<StdMutex<Vec<u64>>>, impl Fn(Generation) -> std::future::Ready<()>) {
        let calls = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let flush = move |tag: Generation| {
            sink.lock().unwrap().push(tag.get());
            std::future::ready(())
        };
        (calls, flush)
    }

    fn tags(n: usize) -> Vec<Generation> {
        let mut resolver = ScopeResolver::new();
        (0..n)
            .map(|i| {
                resolver.resolve(Some(1), Some(i as i64));
                resolver.generation()
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_flushes_once_with_last_tag() {
        let (calls, flush) = recorder();
        let scheduler = PersistenceScheduler::spawn(Duration::from_millis(1000), flush);

        let tags = tags(5);
        for tag in &tags {
            scheduler.schedule(*tag);
            tokio::time::sleep(Duration::from_millis(40)).await;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(calls.lock().unwrap().is_empty(), "window has not elapsed yet");

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(*calls.lock().unwrap(), vec![5]);
    }

    #[tokio::test(start_paused = true)]
    async fn separated_edits_flush_separately() {
        let (calls, flush) = recorder();
        let scheduler = PersistenceScheduler::spawn(Duration::from_millis(100), flush);
        let tags = tags(2);

        scheduler.schedule(tags[0]);
        tokio::time::sleep(Duration::from_millis(300)).await;
        scheduler.schedule(tags[1]);
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(*calls.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_scheduler_never_flushes() {
        let (calls, flush) = recorder();
        let _scheduler = PersistenceScheduler::spawn(Duration::from_millis(100), flush);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_edit() {
        let (calls, flush) = recorder();
        let scheduler = PersistenceScheduler::spawn(Duration::from_secs(60), flush);

        scheduler.schedule(tags(1)[0]);
        tokio::time::sleep(Duration::from_millis(10)).await;
        scheduler.shutdown().await;

        assert_eq!(*calls.lock().unwrap(), vec![1]);
        assert!(!scheduler.schedule(tags(1)[0]));
    }
}
