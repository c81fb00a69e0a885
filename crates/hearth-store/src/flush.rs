//! Single-flight flush scheduling.
//!
//! Mutations never write to disk themselves. They call
//! [`FlushTrigger::request`], which leaves at most one pending permit no
//! matter how many requests arrive. A per-store flusher task
//! ([`run_flusher`]) waits for that permit, lets the burst settle for a
//! debounce window, then performs one flush on the blocking pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tracing::{debug, error, warn};

use crate::traits::Flush;

#[derive(Debug, Default)]
struct TriggerInner {
    notify: Notify,
    requests: AtomicU64,
}

/// Coalescing flush request handle. Cheap to clone; clones share state.
#[derive(Clone, Debug, Default)]
pub struct FlushTrigger {
    inner: Arc<TriggerInner>,
}

impl FlushTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a flush. Never blocks.
    pub fn request(&self) {
        self.inner.requests.fetch_add(1, Ordering::Relaxed);
        self.inner.notify.notify_one();
    }

    /// Total requests made since creation.
    pub fn requests(&self) -> u64 {
        self.inner.requests.load(Ordering::Relaxed)
    }

    /// Wait until at least one request is pending, consuming it.
    pub async fn requested(&self) {
        self.inner.notify.notified().await;
    }
}

/// Flush `target` and log the outcome. Returns whether it succeeded.
pub fn flush_logged(target: &dyn Flush) -> bool {
    match target.flush() {
        Ok(()) => {
            debug!(store = target.label(), "flushed");
            true
        }
        Err(e) => {
            warn!(store = target.label(), error = %e, "flush failed");
            false
        }
    }
}

/// Run [`flush_logged`] on the blocking pool.
pub async fn flush_in_background(target: Arc<dyn Flush>) -> bool {
    let label = target.label();
    match tokio::task::spawn_blocking(move || flush_logged(target.as_ref())).await {
        Ok(ok) => ok,
        Err(e) => {
            error!(store = label, error = %e, "flush task panicked");
            false
        }
    }
}

/// Drive debounced flushes for one store until `shutdown` turns true or its
/// sender is dropped.
///
/// A shutdown that arrives during the debounce window skips the pending
/// flush; the shutdown path performs its own final flush.
pub async fn run_flusher(
    target: Arc<dyn Flush>,
    debounce: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let trigger = target.flush_trigger();
    debug!(store = target.label(), ?debounce, "flusher started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = trigger.requested() => {}
            _ = shutdown.changed() => break,
        }

        if !debounce.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(debounce) => {}
                _ = shutdown.changed() => break,
            }
        }

        flush_in_background(Arc::clone(&target)).await;
    }

    debug!(store = target.label(), "flusher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PersistError, PersistResult};
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Counting {
        trigger: FlushTrigger,
        flushes: AtomicUsize,
        fail: bool,
    }

    impl Flush for Counting {
        fn label(&self) -> &'static str {
            "counting"
        }

        fn flush(&self) -> PersistResult<()> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(PersistError::Serialization("boom".into()))
            } else {
                Ok(())
            }
        }

        fn flush_trigger(&self) -> FlushTrigger {
            self.trigger.clone()
        }
    }

    #[test]
    fn requests_are_counted() {
        let trigger = FlushTrigger::new();
        let clone = trigger.clone();
        trigger.request();
        clone.request();
        assert_eq!(trigger.requests(), 2);
    }

    #[test]
    fn flush_logged_reports_outcome() {
        let ok = Counting::default();
        assert!(flush_logged(&ok));
        let bad = Counting {
            fail: true,
            ..Default::default()
        };
        assert!(!flush_logged(&bad));
    }

    #[tokio::test]
    async fn pending_request_survives_until_awaited() {
        let trigger = FlushTrigger::new();
        trigger.request();
        tokio::time::timeout(Duration::from_secs(1), trigger.requested())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn burst_coalesces_into_one_flush() {
        let target = Arc::new(Counting::default());
        let (tx, rx) = watch::channel(false);

        for _ in 0..50 {
            target.trigger.request();
        }
        let task = tokio::spawn(run_flusher(
            target.clone() as Arc<dyn Flush>,
            Duration::from_millis(20),
            rx,
        ));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(target.flushes.load(Ordering::SeqCst), 1);

        tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn request_after_flush_schedules_another() {
        let target = Arc::new(Counting::default());
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(run_flusher(
            target.clone() as Arc<dyn Flush>,
            Duration::ZERO,
            rx,
        ));

        target.trigger.request();
        tokio::time::sleep(Duration::from_millis(100)).await;
        target.trigger.request();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(target.flushes.load(Ordering::SeqCst), 2);

        tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn flusher_stops_on_shutdown() {
        let target = Arc::new(Counting::default());
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(run_flusher(
            target.clone() as Arc<dyn Flush>,
            Duration::ZERO,
            rx,
        ));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn flusher_stops_when_sender_dropped() {
        let target = Arc::new(Counting::default());
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(run_flusher(target as Arc<dyn Flush>, Duration::ZERO, rx));
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
