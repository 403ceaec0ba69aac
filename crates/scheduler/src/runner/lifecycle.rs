use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};
use workerpool_core::{PoolError, PoolResult};

use crate::worker::{self, StopSignal};

use super::Scheduler;

const IDLE_POLL: Duration = Duration::from_millis(1);

impl Scheduler {
    /// Spawn one thread per worker. No-op if already started.
    ///
    /// Tasks queued while stopped (or before the first start) are picked up by
    /// the new threads. If the OS refuses a thread, the threads spawned by this
    /// call are told to stop and the scheduler stays stopped.
    pub fn start(&self) -> PoolResult<()> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.stop.is_some() {
            return Ok(());
        }

        let stop = StopSignal::new();
        let mut handles = Vec::with_capacity(self.pool.len());
        for index in 0..self.pool.len() {
            let pool = Arc::clone(&self.pool);
            let signal = stop.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", self.config.thread_name, index))
                .spawn(move || worker::run(pool, index, signal));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    stop.raise();
                    lifecycle.retired.extend(handles);
                    error!(worker = index, error = %source, "Failed to spawn worker thread");
                    return Err(PoolError::Spawn {
                        worker: index,
                        source,
                    });
                }
            }
        }

        lifecycle.stop = Some(stop);
        lifecycle.running = handles;
        self.started.store(true, Ordering::Release);
        info!("Task executor started with {} workers", self.pool.len());
        Ok(())
    }

    /// Ask every worker thread to stop after its current task. No-op if
    /// already stopped. Does not wait; queued tasks stay queued for the next
    /// `start()`.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        let Some(stop) = lifecycle.stop.take() else {
            return;
        };

        stop.raise();
        let (finished, busy): (Vec<_>, Vec<_>) = std::mem::take(&mut lifecycle.retired)
            .into_iter()
            .partition(|h| h.is_finished());
        lifecycle.retired = busy;
        for handle in finished {
            reap(handle);
        }
        let running = std::mem::take(&mut lifecycle.running);
        lifecycle.retired.extend(running);
        self.started.store(false, Ordering::Release);
        info!("Task executor stopped");
    }

    /// Wait for every thread retired by `stop()` to exit.
    ///
    /// Blocks for as long as a running task takes to notice the stop (see
    /// [`stop_requested`](crate::stop_requested)). Must not be called from a task.
    pub fn join(&self) {
        let retired = std::mem::take(&mut self.lifecycle.lock().retired);
        for handle in retired {
            reap(handle);
        }
    }

    /// Poll until no task is queued or running, or `timeout` elapses.
    /// Returns whether the scheduler went idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_idle() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(IDLE_POLL);
        }
    }
}

/// Join one worker thread, logging if it died by panicking. Returns whether it exited cleanly.
pub(super) fn reap(handle: JoinHandle<()>) -> bool {
    let name = handle.thread().name().unwrap_or("worker").to_string();
    let clean = handle.join().is_ok();
    if !clean {
        warn!(thread = %name, "Worker thread panicked");
    }
    clean
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
