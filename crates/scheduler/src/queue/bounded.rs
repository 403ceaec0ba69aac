use parking_lot::Mutex;

use workerpool_core::{ClientId, ClientTask, PoolError, PoolResult};

use super::{QueueState, TaskQueue};

/// Fixed-capacity FIFO queue for the partitioned policy.
///
/// Only the head entry is ever eligible. A full queue rejects new work with
/// [`PoolError::QueueFull`] rather than blocking the submitter. In-flight
/// clients are still tracked so that a worker thread restarted after `stop()`
/// cannot overlap a task its retired predecessor is still running.
#[derive(Debug)]
pub struct BoundedQueue {
    worker: usize,
    capacity: usize,
    state: Mutex<QueueState>,
}

impl BoundedQueue {
    pub fn new(worker: usize, capacity: usize) -> Self {
        Self {
            worker,
            capacity,
            state: Mutex::new(QueueState::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl TaskQueue for BoundedQueue {
    fn enqueue(&self, task: ClientTask) -> PoolResult<()> {
        let mut state = self.state.lock();
        if state.pending.len() >= self.capacity {
            return Err(PoolError::QueueFull {
                worker: self.worker,
                capacity: self.capacity,
                client_id: task.client_id,
            });
        }
        state.pending.push_back(task);
        Ok(())
    }

    fn dequeue_next(&self) -> Option<ClientTask> {
        let mut state = self.state.lock();
        let head = state.pending.front()?.client_id;
        if state.is_blocked(head) {
            return None;
        }
        state.take_at(0)
    }

    fn complete(&self, client_id: ClientId) {
        self.state.lock().release(client_id);
    }

    fn clear(&self) -> usize {
        self.state.lock().clear()
    }

    fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }
}
