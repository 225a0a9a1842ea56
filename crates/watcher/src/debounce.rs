//! Per-path debounce scheduling
//!
//! Coalesces bursts of change notifications into a single conversion per
//! file. Each `notify` arms (or rearms) a countdown for that path; the
//! conversion runs only once the countdown expires with no further
//! notifications. Last write wins: only the newest notification for a
//! path determines the fire time.

use convert::Converter;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// A live countdown for one path
///
/// At most one of these exists per path. The generation counter lets the
/// timer task detect that it was superseded between its deadline passing
/// and it acquiring the map lock.
struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Debounce scheduler
///
/// Cheap to clone; all clones share the same pending map and converter.
/// `notify` must be called from within a tokio runtime, since it spawns
/// the timer task.
#[derive(Clone)]
pub struct DebounceScheduler {
    /// Idle period before a conversion fires
    delay: Duration,

    /// Injected conversion collaborator
    converter: Arc<dyn Converter>,

    /// Monotonic counter distinguishing rearms of the same path
    generation: Arc<AtomicU64>,

    /// path -> live countdown; None once shut down
    pending: Arc<Mutex<Option<HashMap<PathBuf, Pending>>>>,
}

impl DebounceScheduler {
    /// Create a scheduler firing `converter` after `delay` of idle time
    pub fn new(delay: Duration, converter: Arc<dyn Converter>) -> Self {
        Self {
            delay,
            converter,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Arc::new(Mutex::new(Some(HashMap::new()))),
        }
    }

    /// Record that `path` changed now
    ///
    /// Starts a fresh countdown for the path, cancelling any countdown
    /// already running for it. Returns immediately; the conversion runs
    /// asynchronously when the countdown expires. After `shutdown` this
    /// is a no-op.
    pub fn notify(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        let mut guard = self.pending.lock();
        let map = match guard.as_mut() {
            Some(map) => map,
            None => {
                debug!("scheduler is shut down, dropping change to {}", path.display());
                return;
            }
        };

        if let Some(stale) = map.remove(&path) {
            stale.handle.abort();
        }

        let handle = tokio::spawn(fire_after(self.clone(), path.clone(), generation, self.delay));
        map.insert(path.clone(), Pending { generation, handle });

        info!(
            "scheduled conversion for {} in {} seconds",
            path.display(),
            self.delay.as_secs_f64()
        );
    }

    /// Cancel all outstanding countdowns without firing them
    ///
    /// No timer tasks remain armed after this returns, and subsequent
    /// `notify` calls are ignored. Conversions already in flight are not
    /// interrupted.
    pub fn shutdown(&self) {
        let taken = self.pending.lock().take();
        if let Some(map) = taken {
            let cancelled = map.len();
            for pending in map.into_values() {
                pending.handle.abort();
            }
            if cancelled > 0 {
                info!("cancelled {} pending conversion(s)", cancelled);
            }
        }
    }

    /// Configured debounce delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of countdowns currently armed
    pub fn pending_count(&self) -> usize {
        self.pending.lock().as_ref().map_or(0, |map| map.len())
    }

    /// Remove the entry for `path` if it still belongs to `generation`
    ///
    /// Returns true when the caller owns the fire: the entry existed with
    /// a matching generation and has been removed. A mismatch means a
    /// newer notification rearmed the path while the timer task slept, or
    /// the scheduler shut down.
    fn claim(&self, path: &Path, generation: u64) -> bool {
        let mut guard = self.pending.lock();
        let map = match guard.as_mut() {
            Some(map) => map,
            None => return false,
        };
        match map.get(path) {
            Some(pending) if pending.generation == generation => {
                map.remove(path);
                true
            }
            _ => false,
        }
    }
}

/// Timer task body: wait out the delay, then convert if not superseded
async fn fire_after(
    scheduler: DebounceScheduler,
    path: PathBuf,
    generation: u64,
    delay: Duration,
) {
    tokio::time::sleep(delay).await;

    if !scheduler.claim(&path, generation) {
        return;
    }

    // The entry is already removed, so a notification arriving during the
    // conversion starts a fresh, independent countdown.
    match scheduler.converter.convert(&path).await {
        Ok(output) => info!("converted {} to {}", path.display(), output.display()),
        Err(e) => error!("error converting {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use convert::ConvertError;
    use tokio::time::{advance, sleep, Instant};

    /// Converter that records every call with its virtual timestamp
    #[derive(Default)]
    struct RecordingConverter {
        calls: Mutex<Vec<(PathBuf, Instant)>>,
        fail: bool,
    }

    impl RecordingConverter {
        fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn calls(&self) -> Vec<(PathBuf, Instant)> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl Converter for RecordingConverter {
        async fn convert(&self, input: &Path) -> Result<PathBuf, ConvertError> {
            self.calls.lock().push((input.to_path_buf(), Instant::now()));
            if self.fail {
                Err(ConvertError::InputNotFound(input.to_path_buf()))
            } else {
                Ok(input.with_extension("pdf"))
            }
        }
    }

    fn scheduler_with(
        delay: Duration,
    ) -> (DebounceScheduler, Arc<RecordingConverter>) {
        let converter = Arc::new(RecordingConverter::default());
        let scheduler = DebounceScheduler::new(delay, converter.clone());
        (scheduler, converter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_notify_fires_once_after_delay() {
        let (scheduler, converter) = scheduler_with(Duration::from_secs(10));
        let start = Instant::now();

        scheduler.notify("/docs/a.md");
        assert_eq!(scheduler.pending_count(), 1);

        sleep(Duration::from_secs(9)).await;
        assert!(converter.calls().is_empty());

        sleep(Duration::from_secs(2)).await;
        let calls = converter.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, PathBuf::from("/docs/a.md"));
        assert!(calls[0].1 - start >= Duration::from_secs(10));
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_extends_deadline_to_last_notify() {
        let (scheduler, converter) = scheduler_with(Duration::from_secs(10));
        let start = Instant::now();

        // notify at t=0 and t=5: must fire once at t=15, not t=10
        scheduler.notify("/docs/a.md");
        sleep(Duration::from_secs(5)).await;
        scheduler.notify("/docs/a.md");
        assert_eq!(scheduler.pending_count(), 1);

        sleep(Duration::from_secs(9)).await; // t=14
        assert!(converter.calls().is_empty());

        sleep(Duration::from_secs(2)).await; // t=16
        let calls = converter.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1 - start >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_burst_coalesces_to_one_conversion() {
        let (scheduler, converter) = scheduler_with(Duration::from_secs(10));

        for _ in 0..50 {
            scheduler.notify("/docs/a.md");
            sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(scheduler.pending_count(), 1);

        sleep(Duration::from_secs(11)).await;
        assert_eq!(converter.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paths_debounce_independently() {
        let (scheduler, converter) = scheduler_with(Duration::from_secs(10));

        scheduler.notify("/docs/a.md");
        sleep(Duration::from_secs(5)).await;
        scheduler.notify("/docs/b.md");

        // Rearming a.md must not move b.md's deadline
        sleep(Duration::from_secs(3)).await; // t=8
        scheduler.notify("/docs/a.md");
        assert_eq!(scheduler.pending_count(), 2);

        sleep(Duration::from_secs(8)).await; // t=16: b fired at t=15
        let calls = converter.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, PathBuf::from("/docs/b.md"));

        sleep(Duration::from_secs(3)).await; // t=19: a fired at t=18
        let calls = converter.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0, PathBuf::from("/docs/a.md"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_removed_after_fire_and_renotify_starts_fresh() {
        let (scheduler, converter) = scheduler_with(Duration::from_secs(10));

        scheduler.notify("/docs/a.md");
        sleep(Duration::from_secs(11)).await;
        assert_eq!(converter.calls().len(), 1);
        assert_eq!(scheduler.pending_count(), 0);

        scheduler.notify("/docs/a.md");
        assert_eq!(scheduler.pending_count(), 1);
        sleep(Duration::from_secs(11)).await;
        assert_eq!(converter.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_conversion_removes_entry() {
        let converter = Arc::new(RecordingConverter::failing());
        let scheduler = DebounceScheduler::new(Duration::from_secs(10), converter.clone());

        scheduler.notify("/docs/a.md");
        sleep(Duration::from_secs(11)).await;

        assert_eq!(converter.calls().len(), 1);
        assert_eq!(scheduler.pending_count(), 0);

        // A failed conversion must not block future scheduling
        scheduler.notify("/docs/a.md");
        sleep(Duration::from_secs(11)).await;
        assert_eq!(converter.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_live_countdowns() {
        let (scheduler, converter) = scheduler_with(Duration::from_secs(10));

        scheduler.notify("/docs/a.md");
        scheduler.notify("/docs/b.md");
        sleep(Duration::from_secs(5)).await;

        scheduler.shutdown();
        assert_eq!(scheduler.pending_count(), 0);

        // Well past every deadline: nothing may fire
        sleep(Duration::from_secs(60)).await;
        assert!(converter.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_after_shutdown_is_a_noop() {
        let (scheduler, converter) = scheduler_with(Duration::from_secs(10));

        scheduler.shutdown();
        scheduler.notify("/docs/a.md");
        assert_eq!(scheduler.pending_count(), 0);

        sleep(Duration::from_secs(60)).await;
        assert!(converter.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_fires_asynchronously() {
        let (scheduler, converter) = scheduler_with(Duration::ZERO);

        scheduler.notify("/docs/a.md");
        // Not synchronous with notify
        assert!(converter.calls().is_empty());

        advance(Duration::from_millis(1)).await;
        sleep(Duration::from_millis(1)).await;
        assert_eq!(converter.calls().len(), 1);
    }
}
