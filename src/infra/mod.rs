//! Infrastructure adapters for execution statistics.

pub mod stats;

pub use stats::{InMemoryStats, JsonLinesStatsSink, LogStatsSink};
