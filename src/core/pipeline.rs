//! Drives one capture pipeline.
//!
//! A pipeline pulls raw events from its source's channel and hands them, one
//! at a time, to its normalizer. Keyboard and mouse pipelines never share a
//! source, a normalizer or a file.

use crate::collector::types::InputEvent;
use crate::core::keyboard::KeyboardNormalizer;
use crate::core::mouse::{MouseNormalizer, MoveOutcome};
use crate::core::writer::LogError;
use crate::transparency::CaptureStats;
use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How often the loop wakes to check the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Which pipeline a process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Keyboard,
    Mouse,
}

impl PipelineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::Keyboard => "keyboard",
            PipelineKind::Mouse => "mouse",
        }
    }

    /// File name used when the operator points at a directory.
    pub fn default_file_name(&self, now: DateTime<Utc>) -> String {
        format!("log_{}_{}.txt", self.as_str(), now.timestamp_millis())
    }

    /// Resolve the operator's output argument to a file path.
    ///
    /// An existing directory gets a timestamped file inside it; anything else
    /// is used as given.
    pub fn resolve_output(&self, output: &Path, now: DateTime<Utc>) -> PathBuf {
        if output.is_dir() {
            output.join(self.default_file_name(now))
        } else {
            output.to_path_buf()
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a handler did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// A line was appended.
    Recorded,
    /// Dropped on purpose (debounce).
    Suppressed,
    /// Not an event this pipeline handles.
    Ignored,
}

/// Why a pipeline returned without a write failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineExit {
    /// The stop flag was cleared.
    Stopped,
    /// Every sender went away while the stop flag was still set.
    SourceClosed,
}

/// Consumes raw events for one pipeline.
pub trait InputHandler {
    fn handle(&mut self, event: &InputEvent) -> Result<HandleOutcome, LogError>;
}

impl InputHandler for KeyboardNormalizer {
    fn handle(&mut self, event: &InputEvent) -> Result<HandleOutcome, LogError> {
        match event {
            InputEvent::KeyDown(key) => self.on_key_down(key)?,
            InputEvent::KeyUp(key) => self.on_key_up(key)?,
            _ => return Ok(HandleOutcome::Ignored),
        }
        Ok(HandleOutcome::Recorded)
    }
}

impl InputHandler for MouseNormalizer {
    fn handle(&mut self, event: &InputEvent) -> Result<HandleOutcome, LogError> {
        match *event {
            InputEvent::Move { x, y } => match self.on_move(x, y)? {
                MoveOutcome::Recorded => return Ok(HandleOutcome::Recorded),
                MoveOutcome::Suppressed => return Ok(HandleOutcome::Suppressed),
            },
            InputEvent::Button {
                x,
                y,
                button,
                pressed,
            } => self.on_button(x, y, button, pressed)?,
            InputEvent::Scroll { x, y, dx, dy } => self.on_scroll(x, y, dx, dy)?,
            InputEvent::KeyDown(_) | InputEvent::KeyUp(_) => return Ok(HandleOutcome::Ignored),
        }
        Ok(HandleOutcome::Recorded)
    }
}

/// Run a pipeline until `running` is cleared or the source disconnects.
///
/// Events already queued when the stop flag clears are still handled. The
/// first write failure stops the pipeline and is returned. A source whose
/// listener dies drops its sender, which ends the loop with
/// [`PipelineExit::SourceClosed`].
pub fn run_pipeline<H: InputHandler + ?Sized>(
    handler: &mut H,
    receiver: &Receiver<InputEvent>,
    running: &AtomicBool,
    stats: &CaptureStats,
) -> Result<PipelineExit, LogError> {
    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(POLL_INTERVAL) {
            Ok(event) => dispatch(handler, &event, stats)?,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!("input source disconnected");
                return Ok(PipelineExit::SourceClosed);
            }
        }
    }

    for event in receiver.try_iter() {
        dispatch(handler, &event, stats)?;
    }

    Ok(PipelineExit::Stopped)
}

fn dispatch<H: InputHandler + ?Sized>(
    handler: &mut H,
    event: &InputEvent,
    stats: &CaptureStats,
) -> Result<(), LogError> {
    match handler.handle(event) {
        Ok(HandleOutcome::Recorded) => stats.record_written(),
        Ok(HandleOutcome::Suppressed) => stats.record_suppressed(),
        Ok(HandleOutcome::Ignored) => stats.record_ignored(),
        Err(e) => {
            stats.record_failure();
            tracing::error!("pipeline stopped: {e}");
            return Err(e);
        }
    }
    Ok(())
}
