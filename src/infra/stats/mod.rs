//! Stats sink backends.

pub mod jsonl;
pub mod log;
pub mod memory;

pub use jsonl::JsonLinesStatsSink;
pub use log::LogStatsSink;
pub use memory::{GlobalStats, InMemoryStats, TaskStats};
