use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use workerpool_core::DispatchPolicy;

/// Lock-free counters owned by one worker, updated after each task.
#[derive(Debug, Default)]
pub(crate) struct WorkerStats {
    completed: AtomicU64,
    failed: AtomicU64,
    stolen: AtomicU64,
    busy_nanos: AtomicU64,
}

impl WorkerStats {
    /// Record one finished task (successful or not).
    pub(crate) fn record(&self, elapsed: Duration, failed: bool, stolen: bool) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        if stolen {
            self.stolen.fetch_add(1, Ordering::Relaxed);
        }
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.busy_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, index: usize, pending: usize, in_flight: usize) -> WorkerMetrics {
        let completed = self.completed.load(Ordering::Relaxed);
        let busy = Duration::from_nanos(self.busy_nanos.load(Ordering::Relaxed));
        let avg_task_duration = if completed == 0 {
            Duration::ZERO
        } else {
            busy / u32::try_from(completed).unwrap_or(u32::MAX)
        };

        WorkerMetrics {
            index,
            pending,
            in_flight,
            completed,
            failed: self.failed.load(Ordering::Relaxed),
            stolen: self.stolen.load(Ordering::Relaxed),
            busy_time: busy,
            avg_task_duration,
        }
    }
}

/// Point-in-time view of one worker.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerMetrics {
    pub index: usize,
    /// Tasks waiting in this worker's queue.
    pub pending: usize,
    /// Clients of this worker's queue with a task currently running (here or on a thief).
    pub in_flight: usize,
    /// Tasks this worker's thread finished, including failures and stolen ones.
    pub completed: u64,
    pub failed: u64,
    /// Tasks this worker's thread took from a peer's queue.
    pub stolen: u64,
    pub busy_time: Duration,
    pub avg_task_duration: Duration,
}

/// Scheduler operational metrics. Counters are read without a global lock, so
/// totals are approximate while workers are running.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerMetrics {
    pub captured_at: DateTime<Utc>,
    pub started: bool,
    pub policy: DispatchPolicy,
    pub worker_count: usize,
    pub total_pending: usize,
    pub total_in_flight: usize,
    pub workers: Vec<WorkerMetrics>,
}

impl SchedulerMetrics {
    pub(crate) fn new(started: bool, policy: DispatchPolicy, workers: Vec<WorkerMetrics>) -> Self {
        Self {
            captured_at: Utc::now(),
            started,
            policy,
            worker_count: workers.len(),
            total_pending: workers.iter().map(|w| w.pending).sum(),
            total_in_flight: workers.iter().map(|w| w.in_flight).sum(),
            workers,
        }
    }

    pub fn total_completed(&self) -> u64 {
        self.workers.iter().map(|w| w.completed).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.workers.iter().map(|w| w.failed).sum()
    }

    pub fn total_stolen(&self) -> u64 {
        self.workers.iter().map(|w| w.stolen).sum()
    }
}
