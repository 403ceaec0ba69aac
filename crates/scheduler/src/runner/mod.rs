//! Scheduler facade -- owns the worker pool and drives its threads.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, constructors, and read-only accessors
//! - `lifecycle`: start/stop of worker threads, joining, idle waiting
//! - `dispatch`: client routing, task submission, and bulk removal

mod core;
mod dispatch;
mod lifecycle;

pub use self::core::Scheduler;
pub use self::dispatch::route;
