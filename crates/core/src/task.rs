use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

/// Identifier of the logical owner of a task sequence.
///
/// Not guaranteed positive, and many tasks share one id. All tasks with the
/// same id are executed one at a time, in submission order.
pub type ClientId = i64;

type TaskBody = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// Error produced by a task body. Contained by the worker that ran it.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("task failed: {0:#}")]
    Failed(#[source] anyhow::Error),

    #[error("task panicked: {0}")]
    Panicked(String),
}

/// An opaque, one-shot unit of work supplied by the caller.
///
/// The pool never looks inside a task; it only learns whether running it
/// returned normally, returned an error, or panicked.
pub struct Task {
    body: TaskBody,
}

impl Task {
    /// Wrap a plain closure. A panic inside it is reported as [`TaskError::Panicked`].
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            body: Box::new(move || {
                f();
                Ok(())
            }),
        }
    }

    /// Wrap a closure that reports failure by value.
    pub fn fallible<F>(f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Self { body: Box::new(f) }
    }

    /// Run the task on the current thread, catching panics.
    pub fn run(self) -> Result<(), TaskError> {
        match panic::catch_unwind(AssertUnwindSafe(self.body)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TaskError::Failed(e)),
            Err(payload) => Err(TaskError::Panicked(panic_message(&*payload))),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// A task tagged with the client it belongs to; the unit stored in queues.
#[derive(Debug)]
pub struct ClientTask {
    pub client_id: ClientId,
    pub task: Task,
}

impl ClientTask {
    pub fn new(client_id: ClientId, task: Task) -> Self {
        Self { client_id, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn plain_task_runs_body() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let task = Task::new(move || flag.store(true, Ordering::SeqCst));

        assert!(task.run().is_ok());
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn fallible_task_error_is_returned() {
        let task = Task::fallible(|| Err(anyhow::anyhow!("disk on fire")));
        let err = task.run().unwrap_err();

        assert!(matches!(err, TaskError::Failed(_)));
        assert!(err.to_string().contains("disk on fire"));
    }

    #[test]
    fn panic_is_caught_with_message() {
        let task = Task::new(|| panic!("boom {}", 42));
        match task.run() {
            Err(TaskError::Panicked(msg)) => assert_eq!(msg, "boom 42"),
            other => panic!("expected Panicked, got {other:?}"),
        }
    }

    #[test]
    fn static_str_panic_payload() {
        let task = Task::new(|| panic!("static message"));
        let err = task.run().unwrap_err();
        assert_eq!(err.to_string(), "task panicked: static message");
    }

    #[test]
    fn client_task_keeps_client_id() {
        let ct = ClientTask::new(-7, Task::new(|| {}));
        assert_eq!(ct.client_id, -7);
        assert!(format!("{ct:?}").contains("-7"));
    }
}
