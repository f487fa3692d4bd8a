//! Configuration models for the scheduler and its worker pool.

pub mod pool;
pub mod scheduler;

pub use pool::WorkerPoolConfig;
pub use scheduler::{OverlapPolicy, SchedulerConfig};
