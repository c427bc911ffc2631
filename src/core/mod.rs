//! Core capture pipeline.
//!
//! This module contains:
//! - The log record model and its JSONL line format
//! - The append-only log writer
//! - Keyboard and mouse normalizers (with move debounce)
//! - The loop that drives a pipeline from an input source

pub mod clock;
pub mod keyboard;
pub mod mouse;
pub mod pipeline;
pub mod record;
pub mod writer;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use keyboard::KeyboardNormalizer;
pub use mouse::{ClickStyle, MouseNormalizer, MouseSettings, MoveOutcome};
pub use pipeline::{run_pipeline, HandleOutcome, InputHandler, PipelineExit, PipelineKind};
pub use record::{EventKind, FieldValue, Fields, LogRecord};
pub use writer::{LogError, LogWriter};
