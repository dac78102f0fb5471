//! Background sweep of expired entries

use crate::cache::clock::Clock;
use crate::cache::tier::TierBackend;
use crate::cache::types::CacheValue;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Sweep every tier once, one tier lock at a time.
///
/// A tier that errors or panics is logged and skipped; the remaining tiers
/// are still swept.
pub async fn sweep_tiers<V: CacheValue>(
    tiers: &[Arc<dyn TierBackend<V>>],
    now: chrono::DateTime<chrono::Utc>,
) -> usize {
    let mut removed = 0;

    for tier in tiers {
        match AssertUnwindSafe(tier.sweep_expired(now)).catch_unwind().await {
            Ok(Ok(count)) => removed += count,
            Ok(Err(e)) => warn!("Sweep of {} tier failed: {}", tier.level(), e),
            Err(_) => warn!("Sweep of {} tier panicked", tier.level()),
        }
    }

    removed
}

struct RunningTask {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Cancellable periodic sweep.
///
/// The task never outlives its owner: [`shutdown`](Self::shutdown) stops it and
/// waits for any in-flight sweep, and dropping the scheduler aborts it. Sweeps
/// run inline on the task, so aborting it also cancels a sweep in progress.
pub struct CleanupScheduler {
    interval: Duration,
    running: Mutex<Option<RunningTask>>,
}

impl CleanupScheduler {
    /// Spawn the sweep loop. Must be called inside a tokio runtime.
    ///
    /// The first sweep happens one `interval` after start.
    pub fn start<V: CacheValue>(
        tiers: Vec<Arc<dyn TierBackend<V>>>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        info!("Starting cache cleanup task (interval: {:?})", interval);

        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        let removed = sweep_tiers(&tiers, clock.now()).await;
                        if removed > 0 {
                            debug!("Auto cleanup removed {} expired entries", removed);
                        }
                    }
                }
            }

            debug!("Cache cleanup task stopped");
        });

        Self {
            interval,
            running: Mutex::new(Some(RunningTask { stop_tx, task })),
        }
    }

    /// A scheduler that never runs
    pub fn stopped(interval: Duration) -> Self {
        Self {
            interval,
            running: Mutex::new(None),
        }
    }

    /// Configured sweep interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the sweep loop is still scheduled
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Stop the sweep loop and wait for it to finish.
    ///
    /// Once this returns no further sweep runs. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        let running = match self.running.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        let Some(RunningTask { stop_tx, task }) = running else {
            return;
        };

        let _ = stop_tx.send(true);
        if let Err(e) = task.await {
            warn!("Cache cleanup task ended abnormally: {}", e);
        }

        info!("Cache cleanup task shut down");
    }
}

impl Drop for CleanupScheduler {
    fn drop(&mut self) {
        let running = match self.running.get_mut() {
            Ok(running) => running.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(RunningTask { task, .. }) = running {
            task.abort();
        }
    }
}
