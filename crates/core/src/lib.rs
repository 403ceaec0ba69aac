pub mod config;
pub mod error;
pub mod task;

pub use config::{DispatchPolicy, SchedulerConfig, StealOrder};
pub use error::*;
pub use task::*;
