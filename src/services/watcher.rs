use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::MissedTickBehavior;

use crate::jobs::{BatchJob, JobError, JobReport};

/// Watcher settings; defaults match the `docsort-watch` CLI
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub watch_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Quiet period that must elapse after the last arrival
    pub debounce: Duration,
    /// How often the countdown is checked
    pub poll_interval: Duration,
    /// Coalescing window applied to raw filesystem events
    pub event_coalesce: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            watch_dir: PathBuf::from("my_docs"),
            output_dir: PathBuf::from("finished"),
            debounce: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
            event_coalesce: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to create watcher: {0}")]
    Init(#[source] notify::Error),

    #[error("failed to watch '{}': {source}", .path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Countdown state: Idle when `last_activity` is `None`, Pending otherwise
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchState {
    last_activity: Option<Instant>,
}

impl WatchState {
    /// Start or restart the countdown. Returns true on Idle -> Pending.
    pub fn record_activity(&mut self, now: Instant) -> bool {
        let started = self.last_activity.is_none();
        self.last_activity = Some(now);
        started
    }

    pub fn is_pending(&self) -> bool {
        self.last_activity.is_some()
    }

    /// Strictly more than `debounce` has passed since the last arrival
    pub fn is_due(&self, now: Instant, debounce: Duration) -> bool {
        match self.last_activity {
            Some(last) => now.saturating_duration_since(last) > debounce,
            None => false,
        }
    }

    pub fn last_activity(&self) -> Option<Instant> {
        self.last_activity
    }

    pub fn reset(&mut self) {
        self.last_activity = None;
    }
}

fn lock_state(state: &Mutex<WatchState>) -> MutexGuard<'_, WatchState> {
    state.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Watch state mutex was poisoned, recovering...");
        poisoned.into_inner()
    })
}

fn record_activity(state: &Mutex<WatchState>, now: Instant) {
    if lock_state(state).record_activity(now) {
        tracing::info!("New file detected, starting countdown");
    } else {
        tracing::debug!("New file detected, countdown reset");
    }
}

/// Files landing in the watched directory: creations and rename targets
fn is_arrival(event: &Event) -> bool {
    match event.kind {
        EventKind::Create(CreateKind::Folder) => false,
        EventKind::Create(_) => event.paths.iter().any(|path| !path.is_dir()),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => true,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().map(|path| !path.is_dir()).unwrap_or(false)
        }
        _ => false,
    }
}

/// Runs a [`BatchJob`] once no file has arrived for the debounce period
pub struct DebounceWatcher {
    config: WatcherConfig,
    state: Arc<Mutex<WatchState>>,
    job: Arc<dyn BatchJob>,
}

impl DebounceWatcher {
    pub fn new(config: WatcherConfig, job: Arc<dyn BatchJob>) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(WatchState::default())),
            job,
        }
    }

    /// Snapshot of the countdown
    pub fn state(&self) -> WatchState {
        *lock_state(&self.state)
    }

    pub fn record_arrival_at(&self, now: Instant) {
        record_activity(&self.state, now);
    }

    pub async fn poll_once(&self) -> Option<Result<JobReport, JobError>> {
        self.poll_at(Instant::now()).await
    }

    /// Run the job if the countdown expired by `now`.
    ///
    /// Returns `None` when nothing was due. After a run the state goes back
    /// to Idle whatever the job's outcome.
    pub async fn poll_at(&self, now: Instant) -> Option<Result<JobReport, JobError>> {
        if !lock_state(&self.state).is_due(now, self.config.debounce) {
            return None;
        }

        tracing::info!(
            debounce_secs = self.config.debounce.as_secs_f64(),
            "Quiet period elapsed, running {}",
            self.job.describe()
        );

        let job = Arc::clone(&self.job);
        let input_dir = self.config.watch_dir.clone();
        let output_dir = self.config.output_dir.clone();
        let outcome = tokio::task::spawn_blocking(move || job.run(&input_dir, &output_dir))
            .await
            .unwrap_or_else(|e| Err(JobError::Task(e.to_string())));

        match &outcome {
            Ok(report) => {
                tracing::info!(
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "Batch job finished"
                );
                if !report.stdout.trim().is_empty() {
                    tracing::debug!("Processor output:\n{}", report.stdout.trim_end());
                }
            }
            Err(e) => {
                tracing::error!("Batch job failed: {}", e);
                if let Some(stderr) = e.stderr() {
                    tracing::error!("Processor stderr:\n{}", stderr.trim_end());
                }
            }
        }

        lock_state(&self.state).reset();
        tracing::info!("Watcher idle, waiting for new files");

        Some(outcome)
    }

    /// Watch until `shutdown` resolves.
    ///
    /// The notify event thread is stopped and joined before this returns.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), WatchError>
    where
        F: Future<Output = ()>,
    {
        let state = Arc::clone(&self.state);
        let mut debouncer = new_debouncer(
            self.config.event_coalesce,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    if events.iter().any(|event| is_arrival(event)) {
                        record_activity(&state, Instant::now());
                    }
                }
                Err(errors) => {
                    for error in errors {
                        tracing::warn!("Watcher error: {:?}", error);
                    }
                }
            },
        )
        .map_err(WatchError::Init)?;

        debouncer
            .watch(&self.config.watch_dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Watch {
                path: self.config.watch_dir.clone(),
                source,
            })?;

        tracing::info!(
            watch_dir = %self.config.watch_dir.display(),
            output_dir = %self.config.output_dir.display(),
            debounce_secs = self.config.debounce.as_secs_f64(),
            "Watching for new files"
        );

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Stopping watcher");
                    break;
                }
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }

        debouncer.stop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SECOND: Duration = Duration::from_secs(1);

    #[derive(Default)]
    struct CountingJob {
        runs: AtomicUsize,
        fail: bool,
    }

    impl BatchJob for CountingJob {
        fn run(&self, _input_dir: &Path, _output_dir: &Path) -> Result<JobReport, JobError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(JobError::Exited {
                    code: Some(1),
                    stderr: "boom".to_string(),
                })
            } else {
                Ok(JobReport::default())
            }
        }

        fn describe(&self) -> String {
            "counting job".to_string()
        }
    }

    fn watcher(job: Arc<CountingJob>, debounce: Duration) -> DebounceWatcher {
        let config = WatcherConfig {
            debounce,
            ..WatcherConfig::default()
        };
        DebounceWatcher::new(config, job)
    }

    #[test]
    fn test_idle_state_is_never_due() {
        let state = WatchState::default();
        assert!(!state.is_pending());
        assert!(!state.is_due(Instant::now() + 3600 * SECOND, 30 * SECOND));
    }

    #[test]
    fn test_countdown_restarts_on_each_arrival() {
        let t = Instant::now();
        let debounce = 30 * SECOND;
        let mut state = WatchState::default();

        assert!(state.record_activity(t));
        assert!(!state.record_activity(t + 10 * SECOND));
        assert!(!state.record_activity(t + 20 * SECOND));

        assert!(!state.is_due(t + 30 * SECOND, debounce));
        assert!(!state.is_due(t + 50 * SECOND, debounce));
        assert!(state.is_due(t + 50 * SECOND + Duration::from_millis(1), debounce));
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let t = Instant::now();
        let mut state = WatchState::default();
        state.record_activity(t);
        state.reset();

        assert!(!state.is_pending());
        assert_eq!(state.last_activity(), None);
        assert!(state.record_activity(t + SECOND));
    }

    #[tokio::test]
    async fn test_poll_before_quiet_period_does_nothing() {
        let job = Arc::new(CountingJob::default());
        let watcher = watcher(job.clone(), 30 * SECOND);
        let t = Instant::now();

        assert!(watcher.poll_at(t).await.is_none());

        watcher.record_arrival_at(t);
        assert!(watcher.poll_at(t + 10 * SECOND).await.is_none());
        assert_eq!(job.runs.load(Ordering::SeqCst), 0);
        assert!(watcher.state().is_pending());
    }

    #[tokio::test]
    async fn test_poll_runs_job_once_and_resets() {
        let job = Arc::new(CountingJob::default());
        let watcher = watcher(job.clone(), 30 * SECOND);
        let t = Instant::now();

        watcher.record_arrival_at(t);
        let outcome = watcher.poll_at(t + 31 * SECOND).await;

        assert!(matches!(outcome, Some(Ok(_))));
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
        assert!(!watcher.state().is_pending());

        // Nothing new arrived, so nothing runs again
        assert!(watcher.poll_at(t + 120 * SECOND).await.is_none());
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_burst_of_arrivals_fires_once_after_last() {
        let job = Arc::new(CountingJob::default());
        let watcher = watcher(job.clone(), 30 * SECOND);
        let t = Instant::now();

        watcher.record_arrival_at(t);
        watcher.record_arrival_at(t + 10 * SECOND);
        watcher.record_arrival_at(t + 20 * SECOND);

        assert!(watcher.poll_at(t + 30 * SECOND).await.is_none());
        assert!(watcher.poll_at(t + 50 * SECOND).await.is_none());
        assert_eq!(job.runs.load(Ordering::SeqCst), 0);

        let outcome = watcher.poll_at(t + 50 * SECOND + Duration::from_millis(1)).await;
        assert!(matches!(outcome, Some(Ok(_))));
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
        assert!(!watcher.state().is_pending());
    }

    #[tokio::test]
    async fn test_failed_job_still_resets() {
        let job = Arc::new(CountingJob {
            fail: true,
            ..CountingJob::default()
        });
        let watcher = watcher(job.clone(), 30 * SECOND);
        let t = Instant::now();

        watcher.record_arrival_at(t);
        let outcome = watcher.poll_at(t + 31 * SECOND).await;

        assert!(matches!(outcome, Some(Err(JobError::Exited { .. }))));
        assert!(!watcher.state().is_pending());

        // A fresh arrival starts a new cycle
        watcher.record_arrival_at(t + 40 * SECOND);
        assert!(watcher.poll_at(t + 50 * SECOND).await.is_none());
        assert!(watcher.poll_at(t + 71 * SECOND).await.is_some());
        assert_eq!(job.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_file_arrival_triggers_job() {
        let temp = tempfile::TempDir::new().unwrap();
        let job = Arc::new(CountingJob::default());
        let config = WatcherConfig {
            watch_dir: temp.path().to_path_buf(),
            output_dir: temp.path().join("out"),
            debounce: Duration::from_millis(300),
            poll_interval: Duration::from_millis(50),
            event_coalesce: Duration::from_millis(50),
        };
        let watcher = DebounceWatcher::new(config, job.clone());
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let driver = async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            std::fs::write(temp.path().join("scan.jpg"), b"image").unwrap();

            let deadline = Instant::now() + Duration::from_secs(10);
            while job.runs.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            let _ = stop_tx.send(());
        };

        let (result, ()) = tokio::join!(
            watcher.run(async {
                let _ = stop_rx.await;
            }),
            driver
        );

        result.unwrap();
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
        assert!(!watcher.state().is_pending());
    }

    #[test]
    fn test_arrival_filter() {
        let folder = Event::new(EventKind::Create(CreateKind::Folder)).add_path(PathBuf::from("/x"));
        assert!(!is_arrival(&folder));

        let file = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/definitely/not/here.jpg"));
        assert!(is_arrival(&file));

        let moved_in = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path(PathBuf::from("/inbox/a.jpg"));
        assert!(is_arrival(&moved_in));

        let removed = Event::new(EventKind::Remove(notify::event::RemoveKind::File))
            .add_path(PathBuf::from("/inbox/a.jpg"));
        assert!(!is_arrival(&removed));
    }
}
