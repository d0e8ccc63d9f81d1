//! Background cache pruner.
//!
//! Periodically drops expired entries so that idle keys do not occupy
//! capacity until they happen to be read or evicted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::services::request_coalescer::RequestCoalescer;

/// Status of the pruner.
#[derive(Debug, Clone, Default)]
pub struct PrunerStatus {
    /// Whether the loop is running.
    pub running: bool,
    /// Completed prune passes.
    pub runs: u64,
    /// Entries removed across all passes.
    pub total_pruned: u64,
    /// When the last pass finished.
    pub last_run: Option<Instant>,
}

/// Handle to a running pruner. Dropping it does not stop the task.
pub struct PrunerHandle {
    stop_flag: Arc<AtomicBool>,
    status: Arc<RwLock<PrunerStatus>>,
    task: JoinHandle<()>,
}

impl PrunerHandle {
    /// Request the pruner to stop and wait for the loop to exit.
    pub async fn stop(self) {
        self.stop_flag.store(true, Ordering::Release);
        self.task.abort();
        // An aborted task reports a cancellation error; nothing to propagate.
        let _ = self.task.await;
        self.status.write().await.running = false;
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::Acquire)
    }

    pub async fn status(&self) -> PrunerStatus {
        self.status.read().await.clone()
    }
}

/// Runs `prune()` on a coalescer's cache at a fixed interval.
pub struct CachePruner<V> {
    coalescer: RequestCoalescer<V>,
    interval: Duration,
}

impl<V> CachePruner<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(coalescer: RequestCoalescer<V>, interval: Duration) -> Self {
        Self {
            coalescer,
            interval,
        }
    }

    /// Spawn the prune loop. The first pass runs one interval after start.
    pub fn start(self) -> PrunerHandle {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let status = Arc::new(RwLock::new(PrunerStatus {
            running: true,
            ..Default::default()
        }));

        let task = tokio::spawn(Self::run_loop(
            self.coalescer,
            self.interval,
            Arc::clone(&stop_flag),
            Arc::clone(&status),
        ));

        info!(interval_secs = self.interval.as_secs(), "cache pruner started");
        PrunerHandle {
            stop_flag,
            status,
            task,
        }
    }

    async fn run_loop(
        coalescer: RequestCoalescer<V>,
        period: Duration,
        stop_flag: Arc<AtomicBool>,
        status: Arc<RwLock<PrunerStatus>>,
    ) {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        timer.tick().await;

        loop {
            timer.tick().await;
            if stop_flag.load(Ordering::Acquire) {
                break;
            }

            let removed = coalescer.prune().await;
            if removed > 0 {
                debug!(removed, "pruned expired cache entries");
            }

            let mut status = status.write().await;
            status.runs += 1;
            status.total_pruned += removed as u64;
            status.last_run = Some(Instant::now());
        }

        status.write().await.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cache_store::CacheStore;

    #[tokio::test(start_paused = true)]
    async fn test_prunes_expired_entries_on_interval() {
        let coalescer: RequestCoalescer<u32> =
            RequestCoalescer::new(CacheStore::new(10, Duration::from_secs(60)));
        coalescer.insert("short", 1, Some(Duration::from_secs(5))).await;
        coalescer.insert("long", 2, Some(Duration::from_secs(600))).await;

        let handle = CachePruner::new(coalescer.clone(), Duration::from_secs(10)).start();

        tokio::time::sleep(Duration::from_secs(11)).await;

        let status = handle.status().await;
        assert!(status.running);
        assert_eq!(status.runs, 1);
        assert_eq!(status.total_pruned, 1);
        assert_eq!(coalescer.keys().await, vec!["long".to_string()]);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_loop() {
        let coalescer: RequestCoalescer<u32> =
            RequestCoalescer::new(CacheStore::new(10, Duration::from_secs(60)));
        let handle = CachePruner::new(coalescer, Duration::from_secs(1)).start();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(handle.status().await.runs, 2);
        assert!(!handle.is_stop_requested());

        handle.stop().await;
    }
}
