//! Per-pipeline capture counters.

use crate::core::pipeline::PipelineKind;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one running pipeline.
#[derive(Debug)]
pub struct CaptureStats {
    pipeline: PipelineKind,
    /// Lines appended to the log file
    records_written: AtomicU64,
    /// Move events dropped by the debounce
    moves_suppressed: AtomicU64,
    /// Events that belong to the other pipeline
    events_ignored: AtomicU64,
    /// Appends that failed
    failures: AtomicU64,
    session_start: DateTime<Utc>,
}

impl CaptureStats {
    pub fn new(pipeline: PipelineKind) -> Self {
        Self {
            pipeline,
            records_written: AtomicU64::new(0),
            moves_suppressed: AtomicU64::new(0),
            events_ignored: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    pub fn record_written(&self) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_suppressed(&self) {
        self.moves_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.events_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> CaptureStatsSnapshot {
        CaptureStatsSnapshot {
            pipeline: self.pipeline.as_str().to_string(),
            records_written: self.records_written.load(Ordering::Relaxed),
            moves_suppressed: self.moves_suppressed.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        let mut summary = format!(
            "Capture Statistics ({}):\n\
             - Records written: {}\n",
            stats.pipeline, stats.records_written
        );
        if self.pipeline == PipelineKind::Mouse {
            summary.push_str(&format!(
                "- Moves suppressed by debounce: {}\n",
                stats.moves_suppressed
            ));
        }
        if stats.failures > 0 {
            summary.push_str(&format!("- Failed writes: {}\n", stats.failures));
        }
        summary.push_str(&format!(
            "- Session duration: {} seconds",
            stats.session_duration_secs
        ));
        summary
    }
}

/// Point-in-time copy of [`CaptureStats`].
#[derive(Debug, Clone)]
pub struct CaptureStatsSnapshot {
    pub pipeline: String,
    pub records_written: u64,
    pub moves_suppressed: u64,
    pub events_ignored: u64,
    pub failures: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}
