use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::info;
use workerpool_core::{PoolResult, SchedulerConfig};

use crate::metrics::SchedulerMetrics;
use crate::observer::{TaskObserver, TracingObserver};
use crate::worker::{StopSignal, WorkerPool};

/// Thread bookkeeping, guarded by one lock so start/stop are serialized.
#[derive(Default)]
pub(super) struct Lifecycle {
    /// Signal of the current generation; `Some` while started.
    pub(super) stop: Option<StopSignal>,
    /// Threads of the current generation.
    pub(super) running: Vec<JoinHandle<()>>,
    /// Threads told to stop that may still be finishing a task.
    pub(super) retired: Vec<JoinHandle<()>>,
}

/// Executes client-tagged tasks on a fixed pool of worker threads.
///
/// Tasks of one client run one at a time and in submission order; tasks of
/// different clients run in parallel and idle workers steal from busy ones.
/// All methods take `&self`, so one scheduler can be shared behind an `Arc`
/// by many submitting threads.
pub struct Scheduler {
    pub(super) config: SchedulerConfig,
    /// Fixed worker arena, shared with every worker thread.
    pub(super) pool: Arc<WorkerPool>,
    pub(super) lifecycle: Mutex<Lifecycle>,
    /// Advisory started flag; not linearized against task execution.
    pub(super) started: AtomicBool,
}

impl Scheduler {
    /// Create a scheduler that reports task outcomes through `tracing`.
    ///
    /// Fails with a configuration error (and creates no threads) if the config
    /// is invalid, e.g. `worker_count == 0`.
    pub fn new(config: SchedulerConfig) -> PoolResult<Self> {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    /// Shortcut for a default config with `worker_count` workers.
    pub fn with_workers(worker_count: usize) -> PoolResult<Self> {
        Self::new(SchedulerConfig::with_workers(worker_count))
    }

    /// Create a scheduler that reports task outcomes to `observer`.
    pub fn with_observer(
        config: SchedulerConfig,
        observer: Arc<dyn TaskObserver>,
    ) -> PoolResult<Self> {
        config.validate()?;
        let pool = Arc::new(WorkerPool::new(&config, observer));
        info!(
            workers = pool.len(),
            policy = %config.policy,
            "Task executor created"
        );

        Ok(Self {
            config,
            pool,
            lifecycle: Mutex::new(Lifecycle::default()),
            started: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn worker_count(&self) -> usize {
        self.pool.len()
    }

    /// Whether `start()` was called more recently than `stop()`. Advisory only.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Tasks queued on any worker and not yet dispatched.
    pub fn pending_tasks(&self) -> usize {
        self.pool.workers().iter().map(|w| w.queue().pending()).sum()
    }

    /// Tasks dispatched and not yet finished, pool-wide.
    pub fn in_flight_tasks(&self) -> usize {
        self.pool.workers().iter().map(|w| w.queue().in_flight()).sum()
    }

    /// No queued and no running tasks. Each queue is sampled under its own
    /// lock, so the answer can be stale by the time it is returned.
    pub fn is_idle(&self) -> bool {
        self.pool
            .workers()
            .iter()
            .all(|w| w.queue().pending() == 0 && w.queue().in_flight() == 0)
    }

    /// Get a snapshot of the current scheduler metrics.
    pub fn metrics(&self) -> SchedulerMetrics {
        let workers = self
            .pool
            .workers()
            .iter()
            .map(|w| {
                w.stats()
                    .snapshot(w.index(), w.queue().pending(), w.queue().in_flight())
            })
            .collect();
        SchedulerMetrics::new(self.is_started(), self.config.policy, workers)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("workers", &self.pool.len())
            .field("policy", &self.config.policy)
            .field("started", &self.is_started())
            .finish()
    }
}
