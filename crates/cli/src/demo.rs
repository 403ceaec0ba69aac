use std::thread;
use std::time::{Duration, Instant};

use tracing::info;
use workerpool_scheduler::{stop_requested, ClientId, PoolResult, Scheduler};

/// The demo script: (client, task label) in submission order.
pub const SCRIPT: &[(ClientId, &str)] = &[
    (1, "1-1"),
    (1, "1-2"),
    (5, "5-1"),
    (5, "5-2"),
    (4, "4-1"),
    (4, "4-2"),
    (1, "1-3"),
    (1, "1-4"),
    (5, "5-3"),
    (1, "1-5"),
];

const STOP_POLL: Duration = Duration::from_millis(10);

/// Sleep for `duration`, returning early with `false` if the worker is asked to stop.
fn cooperative_sleep(duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        if stop_requested() {
            return false;
        }
        thread::sleep(STOP_POLL.min(deadline.saturating_duration_since(Instant::now())));
    }
    true
}

/// Queue every scripted task on `scheduler`.
pub fn submit_script(scheduler: &Scheduler, task_duration: Duration) -> PoolResult<()> {
    for &(client_id, label) in SCRIPT {
        scheduler.add_task(client_id, move || {
            info!(task = label, "Task started");
            if cooperative_sleep(task_duration) {
                info!(task = label, "Task finished");
            } else {
                info!(task = label, "Task interrupted");
            }
        })?;
    }
    Ok(())
}
