//! Client-ordered work-stealing scheduler.
//!
//! Tasks are tagged with a [`ClientId`]. Each client's tasks execute strictly
//! in submission order and never concurrently with each other, while tasks of
//! different clients spread across a fixed pool of worker threads. A client is
//! routed to a home worker by `|client_id| mod worker_count`; workers whose own
//! queue has nothing runnable steal from their peers.

pub mod metrics;
pub mod observer;
pub mod queue;
pub mod runner;
pub mod steal;
pub mod worker;

pub use metrics::{SchedulerMetrics, WorkerMetrics};
pub use observer::{TaskEvent, TaskObserver, TracingObserver};
pub use queue::{BoundedQueue, ClientQueue, TaskQueue};
pub use runner::{route, Scheduler};
pub use steal::StealCoordinator;
pub use worker::{current_worker, stop_requested, StopSignal};

pub use workerpool_core::{
    ClientId, ClientTask, DispatchPolicy, PoolError, PoolResult, SchedulerConfig, StealOrder, Task,
    TaskError,
};
