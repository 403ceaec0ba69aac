//! Worker threads and their run loop.
//!
//! Each worker owns one [`TaskQueue`] and, while started, one OS thread. The
//! loop is:
//! 1. Dequeue from the worker's own queue
//! 2. Otherwise steal from a peer via the [`StealCoordinator`]
//! 3. Otherwise yield (or sleep, if configured) and retry
//! 4. Run the task, report the outcome, clear the client's in-flight mark
//!
//! Stopping is cooperative: the loop checks its [`StopSignal`] between tasks
//! and never aborts a running one.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, instrument};
use workerpool_core::{ClientId, ClientTask, SchedulerConfig};

use crate::metrics::WorkerStats;
use crate::observer::{TaskEvent, TaskObserver};
use crate::queue::{self, TaskQueue};
use crate::steal::StealCoordinator;

// ── Stop signal ─────────────────────────────────────────────────────

/// Cooperative interruption flag for one generation of worker threads.
///
/// Every `start()` creates a fresh signal, so raising it only affects the
/// threads spawned by that start.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ── Thread-local worker context ─────────────────────────────────────

struct WorkerContext {
    index: usize,
    stop: StopSignal,
}

thread_local! {
    static CONTEXT: RefCell<Option<WorkerContext>> = const { RefCell::new(None) };
}

/// Installs the context for the lifetime of the run loop.
struct ContextGuard;

impl ContextGuard {
    fn install(index: usize, stop: StopSignal) -> Self {
        CONTEXT.with(|c| *c.borrow_mut() = Some(WorkerContext { index, stop }));
        ContextGuard
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CONTEXT.with(|c| c.borrow_mut().take());
    }
}

/// Whether the worker running the current task has been asked to stop.
///
/// Long-running task bodies poll this to end early after `Scheduler::stop()`.
/// Always `false` outside a worker thread.
pub fn stop_requested() -> bool {
    CONTEXT.with(|c| c.borrow().as_ref().is_some_and(|ctx| ctx.stop.is_raised()))
}

/// Index of the worker whose thread is calling, if any.
pub fn current_worker() -> Option<usize> {
    CONTEXT.with(|c| c.borrow().as_ref().map(|ctx| ctx.index))
}

// ── Worker ──────────────────────────────────────────────────────────

/// One slot of the pool: a queue plus its counters. The thread that drives it
/// is owned by the scheduler's lifecycle, not by the worker.
pub(crate) struct Worker {
    index: usize,
    queue: Box<dyn TaskQueue>,
    stats: WorkerStats,
}

impl Worker {
    pub(crate) fn new(index: usize, queue: Box<dyn TaskQueue>) -> Self {
        Self {
            index,
            queue,
            stats: WorkerStats::default(),
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn queue(&self) -> &dyn TaskQueue {
        self.queue.as_ref()
    }

    pub(crate) fn stats(&self) -> &WorkerStats {
        &self.stats
    }
}

/// Clears the in-flight mark on the source queue when dropped.
struct Completion<'a> {
    queue: &'a dyn TaskQueue,
    client_id: ClientId,
}

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        self.queue.complete(self.client_id);
    }
}

// ── Worker pool ─────────────────────────────────────────────────────

/// The fixed, immutable arena of workers shared by every worker thread.
///
/// Workers refer to each other only by index into `workers`; the steal
/// coordinator is built once, after all workers exist.
pub(crate) struct WorkerPool {
    workers: Vec<Worker>,
    coordinator: Option<StealCoordinator>,
    observer: Arc<dyn TaskObserver>,
    idle_sleep: Option<Duration>,
}

impl WorkerPool {
    /// Build every worker for an already validated config.
    pub(crate) fn new(config: &SchedulerConfig, observer: Arc<dyn TaskObserver>) -> Self {
        let workers: Vec<Worker> = (0..config.worker_count)
            .map(|i| Worker::new(i, queue::for_policy(config, i)))
            .collect();
        let coordinator = config
            .policy
            .allows_stealing()
            .then(|| StealCoordinator::new(config.steal_order, workers.len()));

        Self {
            workers,
            coordinator,
            observer,
            idle_sleep: config.idle_sleep(),
        }
    }

    pub(crate) fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    /// Own queue first, then peers.
    fn next_task(&self, index: usize) -> Option<(usize, ClientTask)> {
        if let Some(task) = self.workers[index].queue().dequeue_next() {
            return Some((index, task));
        }
        self.coordinator
            .as_ref()
            .and_then(|c| c.steal(&self.workers, index))
    }

    /// Run one task on the calling thread. Failures are reported and dropped.
    fn execute(&self, index: usize, source: usize, task: ClientTask) {
        let ClientTask { client_id, task } = task;
        let _completion = Completion {
            queue: self.workers[source].queue(),
            client_id,
        };
        let event = TaskEvent {
            worker: index,
            source_worker: source,
            client_id,
        };

        self.notify(&event, |o| o.task_started(&event));
        let started = Instant::now();
        let outcome = task.run();
        let elapsed = started.elapsed();

        match &outcome {
            Ok(()) => self.notify(&event, |o| o.task_finished(&event, elapsed)),
            // TODO: a failed task does not hold back its client's next task; decide
            // whether to quarantine clients whose tasks keep failing.
            Err(e) => self.notify(&event, |o| o.task_failed(&event, e)),
        }
        self.workers[index]
            .stats()
            .record(elapsed, outcome.is_err(), event.stolen());
    }

    /// Call the observer; a panicking observer must not take the worker thread down.
    fn notify(&self, event: &TaskEvent, f: impl FnOnce(&dyn TaskObserver)) {
        let observer = self.observer.as_ref();
        if panic::catch_unwind(AssertUnwindSafe(|| f(observer))).is_err() {
            error!(
                worker = event.worker,
                client_id = event.client_id,
                "Task observer panicked"
            );
        }
    }

    fn idle(&self) {
        match self.idle_sleep {
            Some(d) => thread::sleep(d),
            None => thread::yield_now(),
        }
    }
}

/// Worker thread body. Returns once `stop` is raised and any task in hand has finished.
#[instrument(skip_all, fields(worker = index))]
pub(crate) fn run(pool: Arc<WorkerPool>, index: usize, stop: StopSignal) {
    let _context = ContextGuard::install(index, stop.clone());
    debug!("Worker started");

    while !stop.is_raised() {
        match pool.next_task(index) {
            Some((source, task)) => pool.execute(index, source, task),
            None => pool.idle(),
        }
    }

    debug!("Worker stopped");
}
