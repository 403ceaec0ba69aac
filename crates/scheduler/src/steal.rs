//! Cross-worker stealing.
//!
//! An idle worker asks the [`StealCoordinator`] for work; the coordinator
//! probes each peer's queue with the normal `dequeue_next`, so a stolen task
//! is marked in flight on the queue it came from and per-client exclusivity
//! holds no matter which thread runs it. Only one queue lock is taken at a time.

use workerpool_core::{ClientTask, StealOrder};

use crate::worker::Worker;

/// Probes peers in a deterministic order. Holds no references to the workers
/// themselves; callers pass the pool's immutable worker slice.
#[derive(Debug, Clone, Copy)]
pub struct StealCoordinator {
    order: StealOrder,
    worker_count: usize,
}

impl StealCoordinator {
    pub fn new(order: StealOrder, worker_count: usize) -> Self {
        Self {
            order,
            worker_count,
        }
    }

    pub fn order(&self) -> StealOrder {
        self.order
    }

    /// Indices of the peers `requester` probes, in probe order.
    pub fn victims(&self, requester: usize) -> impl Iterator<Item = usize> {
        let n = self.worker_count;
        let start = match self.order {
            StealOrder::Fixed => 0,
            StealOrder::Rotating => requester + 1,
        };
        (0..n)
            .map(move |k| (start + k) % n)
            .filter(move |&i| i != requester)
    }

    /// Take the first runnable task any peer offers, with the index of the
    /// queue it came from.
    pub(crate) fn steal(&self, workers: &[Worker], requester: usize) -> Option<(usize, ClientTask)> {
        self.victims(requester).find_map(|victim| {
            workers[victim]
                .queue()
                .dequeue_next()
                .map(|task| (victim, task))
        })
    }
}
