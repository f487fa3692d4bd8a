//! Utility helpers for time and telemetry.

pub mod clock;
pub mod telemetry;

pub use clock::*;
pub use telemetry::*;
