//! Transparency module.
//!
//! Tracks what a pipeline has captured so the operator can see it at exit.

pub mod stats;

// Re-export commonly used types
pub use stats::{CaptureStats, CaptureStatsSnapshot};
