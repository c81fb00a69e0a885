//! Periodic autosave and the shutdown flush.
//!
//! One background task wakes on a fixed interval, evicts expired sessions,
//! and flushes every store in a fixed order. Shutdown stops the timer, waits
//! for an in-flight tick and any attached flusher tasks, then flushes every
//! store one final time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use hearth_store::{flush_logged, AccountStore, Flush};

/// Which stores flushed and which failed, in flush order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    pub flushed: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

impl FlushOutcome {
    /// Returns `true` if every store flushed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Flush each target in order. A failure is logged and does not stop the
/// remaining targets.
pub fn flush_each(targets: &[Arc<dyn Flush>]) -> FlushOutcome {
    let mut outcome = FlushOutcome::default();
    for target in targets {
        if flush_logged(target.as_ref()) {
            outcome.flushed.push(target.label());
        } else {
            outcome.failed.push(target.label());
        }
    }
    outcome
}

async fn flush_each_blocking(targets: Arc<[Arc<dyn Flush>]>) -> FlushOutcome {
    match tokio::task::spawn_blocking(move || flush_each(&targets)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "autosave flush task panicked");
            FlushOutcome::default()
        }
    }
}

/// Builder for the autosave task.
pub struct AutosaveScheduler {
    targets: Vec<Arc<dyn Flush>>,
    interval: Duration,
    sessions: Option<Arc<AccountStore>>,
}

impl AutosaveScheduler {
    /// Flush `targets`, in the given order, every `interval`.
    pub fn new(targets: Vec<Arc<dyn Flush>>, interval: Duration) -> Self {
        Self {
            targets,
            interval,
            sessions: None,
        }
    }

    /// Also evict expired sessions from `accounts` on every tick.
    pub fn sweep_sessions(mut self, accounts: Arc<AccountStore>) -> Self {
        self.sessions = Some(accounts);
        self
    }

    /// Spawn the autosave task on the current runtime.
    pub fn start(self) -> AutosaveHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let targets: Arc<[Arc<dyn Flush>]> = self.targets.into();
        let task = tokio::spawn(run(
            Arc::clone(&targets),
            self.interval,
            self.sessions,
            shutdown_rx,
        ));
        info!(interval = ?self.interval, stores = targets.len(), "autosave started");

        AutosaveHandle {
            shutdown: shutdown_tx,
            task,
            attached: Vec::new(),
            targets,
        }
    }
}

async fn run(
    targets: Arc<[Arc<dyn Flush>]>,
    period: Duration,
    sessions: Option<Arc<AccountStore>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        if let Some(accounts) = &sessions {
            let evicted = accounts.sweep_expired();
            if evicted > 0 {
                debug!(evicted, "expired sessions swept");
            }
        }

        // Awaited outside the select so shutdown waits for it.
        let outcome = flush_each_blocking(Arc::clone(&targets)).await;
        if !outcome.is_clean() {
            warn!(failed = ?outcome.failed, "autosave tick incomplete");
        }

        if *shutdown.borrow() {
            break;
        }
    }
}

/// Running autosave task.
pub struct AutosaveHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    attached: Vec<JoinHandle<()>>,
    targets: Arc<[Arc<dyn Flush>]>,
}

impl AutosaveHandle {
    /// A receiver that turns `true` when shutdown begins. Hand it to tasks
    /// that should stop before the final flush.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Join `task` during shutdown, before the final flush.
    pub fn attach(&mut self, task: JoinHandle<()>) {
        self.attached.push(task);
    }

    /// Stop the timer, wait for in-flight work, then flush every store once
    /// more. Returns the outcome of the final flush.
    pub async fn shutdown(self) -> FlushOutcome {
        info!("autosave shutting down");
        // No receivers left only means every task already stopped.
        let _ = self.shutdown.send(true);

        if let Err(e) = self.task.await {
            error!(error = %e, "autosave task ended abnormally");
        }
        for task in self.attached {
            if let Err(e) = task.await {
                error!(error = %e, "background task ended abnormally");
            }
        }

        let outcome = flush_each_blocking(self.targets).await;
        if outcome.is_clean() {
            info!(stores = ?outcome.flushed, "final flush complete");
        } else {
            error!(failed = ?outcome.failed, "final flush incomplete");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_store::{FlushTrigger, PersistError, PersistResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Recorder {
        label: &'static str,
        fail: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
        count: AtomicUsize,
        trigger: FlushTrigger,
    }

    impl Recorder {
        fn new(label: &'static str, fail: bool, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<Self> {
            Arc::new(Self {
                label,
                fail,
                log: Arc::clone(log),
                count: AtomicUsize::new(0),
                trigger: FlushTrigger::new(),
            })
        }
    }

    impl Flush for Recorder {
        fn label(&self) -> &'static str {
            self.label
        }

        fn flush(&self) -> PersistResult<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(self.label);
            if self.fail {
                Err(PersistError::Serialization("disk on fire".into()))
            } else {
                Ok(())
            }
        }

        fn flush_trigger(&self) -> FlushTrigger {
            self.trigger.clone()
        }
    }

    #[test]
    fn flush_each_continues_past_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let targets: Vec<Arc<dyn Flush>> = vec![
            Recorder::new("accounts", false, &log),
            Recorder::new("todos", true, &log),
            Recorder::new("blogs", false, &log),
        ];
        let outcome = flush_each(&targets);
        assert_eq!(outcome.flushed, vec!["accounts", "blogs"]);
        assert_eq!(outcome.failed, vec!["todos"]);
        assert!(!outcome.is_clean());
        assert_eq!(*log.lock().unwrap(), vec!["accounts", "todos", "blogs"]);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_flush_every_store_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Recorder::new("accounts", false, &log);
        let t = Recorder::new("todos", false, &log);
        let targets: Vec<Arc<dyn Flush>> = vec![a.clone(), t.clone()];
        let handle = AutosaveScheduler::new(targets, Duration::from_secs(300)).start();

        // Nothing happens before the first interval elapses.
        time::sleep(Duration::from_secs(299)).await;
        assert_eq!(a.count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(2)).await;
        for _ in 0..1000 {
            if t.count.load(Ordering::SeqCst) == 1 {
                break;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(a.count.load(Ordering::SeqCst), 1);
        assert_eq!(t.count.load(Ordering::SeqCst), 1);
        assert_eq!(*log.lock().unwrap(), vec!["accounts", "todos"]);

        let outcome = handle.shutdown().await;
        assert!(outcome.is_clean());
        assert_eq!(outcome.flushed, vec!["accounts", "todos"]);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["accounts", "todos", "accounts", "todos"]
        );
    }

    #[tokio::test]
    async fn tick_runs_and_shutdown_flushes_again() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Recorder::new("accounts", false, &log);
        let b = Recorder::new("blogs", true, &log);
        let targets: Vec<Arc<dyn Flush>> = vec![a.clone(), b.clone()];
        let handle = AutosaveScheduler::new(targets, Duration::from_millis(20)).start();

        time::sleep(Duration::from_millis(150)).await;
        let ticks = a.count.load(Ordering::SeqCst);
        assert!(ticks >= 1, "expected at least one tick, got {ticks}");
        // A failing store does not stop the others.
        assert_eq!(b.count.load(Ordering::SeqCst), ticks);

        let outcome = handle.shutdown().await;
        assert_eq!(outcome.failed, vec!["blogs"]);
        assert_eq!(a.count.load(Ordering::SeqCst), b.count.load(Ordering::SeqCst));
        assert!(a.count.load(Ordering::SeqCst) > ticks);
    }

    #[tokio::test]
    async fn shutdown_joins_attached_tasks_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Recorder::new("accounts", false, &log);
        let mut handle =
            AutosaveScheduler::new(vec![a.clone() as Arc<dyn Flush>], Duration::from_secs(60)).start();

        let mut signal = handle.shutdown_signal();
        let finished = Arc::new(AtomicUsize::new(0));
        let marker = Arc::clone(&finished);
        let log_in_task = Arc::clone(&log);
        handle.attach(tokio::spawn(async move {
            let _ = signal.changed().await;
            log_in_task.lock().unwrap().push("attached");
            marker.fetch_add(1, Ordering::SeqCst);
        }));

        handle.shutdown().await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(*log.lock().unwrap(), vec!["attached", "accounts"]);
    }
}
