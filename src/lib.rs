//! Inputlog - system-wide keyboard and mouse capture to JSONL.
//!
//! Raw input events from an OS hook are normalized into timestamped records
//! and appended, one JSON object per line, to a log file. Keyboard and mouse
//! run as independent pipelines, each with its own source, normalizer and
//! file.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Collector   │──▶│  Normalizer  │──▶│  LogWriter   │──▶ log_*.txt
//! │ (OS hook)    │   │ (debounce)   │   │ (append)     │
//! └──────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use inputlog::collector::{Collector, CollectorConfig, InputSource};
//! use inputlog::core::{run_pipeline, KeyboardNormalizer, LogWriter, PipelineKind};
//! use inputlog::transparency::CaptureStats;
//! use std::sync::atomic::AtomicBool;
//!
//! let writer = LogWriter::initialize("keys.txt").expect("log file");
//! let mut keyboard = KeyboardNormalizer::new(writer);
//!
//! let mut collector = Collector::new(CollectorConfig::keyboard());
//! collector.start().expect("Failed to start collector");
//!
//! let stats = CaptureStats::new(PipelineKind::Keyboard);
//! let running = AtomicBool::new(true);
//! run_pipeline(&mut keyboard, collector.receiver(), &running, &stats).expect("capture");
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use collector::{Collector, CollectorConfig, CollectorError, InputEvent, InputSource};
pub use config::{Config, WriterConfig};
pub use crate::core::{
    EventKind, KeyboardNormalizer, LogError, LogRecord, LogWriter, MouseNormalizer, MouseSettings,
};
pub use transparency::{CaptureStats, CaptureStatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Notice shown to whoever runs the capture.
pub const CAPTURE_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                  INPUTLOG - CAPTURE NOTICE                       ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This tool records input events system-wide, not only for        ║
║  its own window.                                                 ║
║                                                                  ║
║  ✓ WHAT IS RECORDED:                                             ║
║    • Which keys are pressed and released, with timestamps        ║
║    • Pointer position (sampled, at most every debounce period)   ║
║    • Clicks and scrolls, with position and button                ║
║                                                                  ║
║  ✗ WHAT IS NOT RECORDED:                                         ║
║    • Screen content                                              ║
║    • Which application had focus                                 ║
║                                                                  ║
║  Key records can contain passwords and messages. Records are     ║
║  written only to the file given on the command line and are      ║
║  never sent anywhere.                                            ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
