//! Task lifecycle reporting.
//!
//! Workers never log task outcomes directly. They report to the
//! [`TaskObserver`] handed to the scheduler at construction, which defaults to
//! [`TracingObserver`].

use std::time::Duration;

use tracing::{debug, error};
use workerpool_core::{ClientId, TaskError};

/// Where a task ran and where it was queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskEvent {
    /// Worker whose thread executed the task.
    pub worker: usize,
    /// Worker whose queue the task was taken from.
    pub source_worker: usize,
    pub client_id: ClientId,
}

impl TaskEvent {
    /// True when the task was taken from a peer's queue.
    pub fn stolen(&self) -> bool {
        self.worker != self.source_worker
    }
}

/// Sink for task lifecycle events. Called on the worker thread, outside any queue lock.
pub trait TaskObserver: Send + Sync {
    fn task_started(&self, _event: &TaskEvent) {}

    fn task_finished(&self, _event: &TaskEvent, _elapsed: Duration) {}

    /// The task returned an error or panicked. The error is discarded afterwards.
    fn task_failed(&self, event: &TaskEvent, error: &TaskError);
}

/// Default observer: forwards everything to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TaskObserver for TracingObserver {
    fn task_started(&self, event: &TaskEvent) {
        debug!(
            worker = event.worker,
            client_id = event.client_id,
            stolen = event.stolen(),
            "Task started"
        );
    }

    fn task_finished(&self, event: &TaskEvent, elapsed: Duration) {
        debug!(
            worker = event.worker,
            client_id = event.client_id,
            elapsed_ms = elapsed.as_millis() as u64,
            "Task finished"
        );
    }

    fn task_failed(&self, event: &TaskEvent, error: &TaskError) {
        error!(
            worker = event.worker,
            source_worker = event.source_worker,
            client_id = event.client_id,
            error = %error,
            "Error executing task"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stolen_when_workers_differ() {
        let local = TaskEvent { worker: 1, source_worker: 1, client_id: 5 };
        let stolen = TaskEvent { worker: 0, source_worker: 1, client_id: 5 };
        assert!(!local.stolen());
        assert!(stolen.stolen());
    }

    #[test]
    fn tracing_observer_accepts_all_events() {
        let obs = TracingObserver;
        let ev = TaskEvent { worker: 0, source_worker: 0, client_id: -2 };
        obs.task_started(&ev);
        obs.task_finished(&ev, Duration::from_millis(3));
        obs.task_failed(&ev, &TaskError::Panicked("x".into()));
    }
}
