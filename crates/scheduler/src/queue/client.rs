use parking_lot::Mutex;

use workerpool_core::{ClientId, ClientTask, PoolResult};

use super::{QueueState, TaskQueue};

/// Unbounded queue that tracks which clients are in flight.
///
/// `dequeue_next` scans from the head and skips entries whose client already
/// has a task running, so one busy client never starves the others queued
/// behind it. The scan is linear in the number of pending entries.
#[derive(Debug, Default)]
pub struct ClientQueue {
    state: Mutex<QueueState>,
}

impl ClientQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskQueue for ClientQueue {
    fn enqueue(&self, task: ClientTask) -> PoolResult<()> {
        self.state.lock().pending.push_back(task);
        Ok(())
    }

    fn dequeue_next(&self) -> Option<ClientTask> {
        let mut state = self.state.lock();
        let pos = state
            .pending
            .iter()
            .position(|t| !state.is_blocked(t.client_id))?;
        state.take_at(pos)
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
