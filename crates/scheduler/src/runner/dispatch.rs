use tracing::{debug, info};
use workerpool_core::{ClientId, ClientTask, PoolResult, Task};

use super::Scheduler;

/// Home worker of a client: `|client_id| mod worker_count`.
///
/// Deterministic for the pool's lifetime, defined for every `i64` including
/// `i64::MIN`. `worker_count` must be positive.
pub fn route(client_id: ClientId, worker_count: usize) -> usize {
    (client_id.unsigned_abs() % worker_count as u64) as usize
}

impl Scheduler {
    /// Index of the worker whose queue receives `client_id`'s tasks.
    pub fn worker_for(&self, client_id: ClientId) -> usize {
        route(client_id, self.pool.len())
    }

    /// Queue a task for `client_id`. Legal whether started or stopped.
    ///
    /// Only fails under the partitioned policy, when the client's worker queue is full.
    pub fn add_task<F>(&self, client_id: ClientId, f: F) -> PoolResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(ClientTask::new(client_id, Task::new(f)))
    }

    /// Queue a task whose `Err` is reported like a panic would be.
    pub fn add_fallible_task<F>(&self, client_id: ClientId, f: F) -> PoolResult<()>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.submit(ClientTask::new(client_id, Task::fallible(f)))
    }

    /// Route an already built [`ClientTask`] to its home worker.
    pub fn submit(&self, task: ClientTask) -> PoolResult<()> {
        let client_id = task.client_id;
        let worker = self.worker_for(client_id);
        self.pool.workers()[worker].queue().enqueue(task)?;
        debug!(client_id, worker, "Task added");
        Ok(())
    }

    /// Discard every queued task on every worker. Running tasks are not
    /// affected. Returns how many tasks were dropped.
    pub fn remove_all_tasks(&self) -> usize {
        let removed: usize = self
            .pool
            .workers()
            .iter()
            .map(|w| w.queue().clear())
            .sum();
        info!(removed, "All tasks removed");
        removed
    }
}
