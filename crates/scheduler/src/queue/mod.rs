//! Per-worker task queues.
//!
//! Every worker owns exactly one queue. The queue is the only state touched by
//! more than one thread: the owning worker dequeues from it, submitters
//! enqueue into it, and idle peers steal from it. Each queue carries its own
//! lock, held only for the duration of a single operation.
//!
//! Two dispatch policies share the same worker machinery:
//! - [`ClientQueue`]: unbounded, skip-scan dequeue, used with work stealing.
//! - [`BoundedQueue`]: fixed capacity, strict FIFO, no stealing.

mod bounded;
mod client;

use std::collections::{HashSet, VecDeque};

use workerpool_core::{ClientId, ClientTask, DispatchPolicy, PoolResult, SchedulerConfig};

pub use bounded::BoundedQueue;
pub use client::ClientQueue;

/// The capability set a dispatch policy provides to a worker.
///
/// Implementations must guarantee that at most one task per client is handed
/// out between a `dequeue_next` returning it and the matching `complete`.
pub trait TaskQueue: Send + Sync {
    /// Append a task at the tail.
    fn enqueue(&self, task: ClientTask) -> PoolResult<()>;

    /// Remove and return the next task eligible to run, marking its client in flight.
    fn dequeue_next(&self) -> Option<ClientTask>;

    /// Completion hook: the task for `client_id` has returned, failed, or panicked.
    fn complete(&self, client_id: ClientId);

    /// Drop every pending task. In-flight marks are untouched. Returns the number dropped.
    fn clear(&self) -> usize;

    /// Number of queued, not yet dispatched tasks.
    fn pending(&self) -> usize;

    /// Number of clients currently marked in flight.
    fn in_flight(&self) -> usize;
}

/// Build the queue for one worker according to the configured policy.
pub fn for_policy(config: &SchedulerConfig, worker: usize) -> Box<dyn TaskQueue> {
    match config.policy {
        DispatchPolicy::WorkStealing => Box::new(ClientQueue::new()),
        DispatchPolicy::Partitioned => Box::new(BoundedQueue::new(worker, config.queue_capacity)),
    }
}

/// Lock-guarded contents shared by both queue flavours.
#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<ClientTask>,
    in_flight: HashSet<ClientId>,
}

impl QueueState {
    /// Remove the entry at `pos` and mark its client in flight.
    fn take_at(&mut self, pos: usize) -> Option<ClientTask> {
        let task = self.pending.remove(pos)?;
        let newly_marked = self.in_flight.insert(task.client_id);
        debug_assert!(newly_marked, "client {} dispatched twice", task.client_id);
        Some(task)
    }

    fn is_blocked(&self, client_id: ClientId) -> bool {
        self.in_flight.contains(&client_id)
    }

    fn release(&mut self, client_id: ClientId) {
        self.in_flight.remove(&client_id);
    }

    fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workerpool_core::Task;

    #[test]
    fn policy_selects_queue_flavour() {
        let stealing = for_policy(&SchedulerConfig::default(), 0);
        for i in 0..500 {
            stealing.enqueue(ClientTask::new(i, Task::new(|| {}))).unwrap();
        }
        assert_eq!(stealing.pending(), 500);

        let mut cfg = SchedulerConfig::default();
        cfg.policy = DispatchPolicy::Partitioned;
        cfg.queue_capacity = 2;
        let bounded = for_policy(&cfg, 3);
        bounded.enqueue(ClientTask::new(1, Task::new(|| {}))).unwrap();
        bounded.enqueue(ClientTask::new(2, Task::new(|| {}))).unwrap();
        assert!(bounded.enqueue(ClientTask::new(3, Task::new(|| {}))).is_err());
    }

    #[test]
    fn take_at_marks_client() {
        let mut state = QueueState::default();
        state.pending.push_back(ClientTask::new(4, Task::new(|| {})));
        let task = state.take_at(0).unwrap();
        assert_eq!(task.client_id, 4);
        assert!(state.is_blocked(4));
        state.release(4);
        assert!(!state.is_blocked(4));
        assert!(state.take_at(0).is_none());
    }
}
