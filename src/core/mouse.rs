//! Mouse event normalizer.
//!
//! Raw move events can fire hundreds of times per second, so moves go
//! through a leading-edge debounce: a move is recorded only when more than
//! the threshold has passed since the last recorded move. Positions in
//! between are dropped. Clicks, releases and scrolls are always recorded.

use crate::collector::types::MouseButton;
use crate::core::clock::{Clock, SystemClock};
use crate::core::record::{EventKind, Fields};
use crate::core::writer::{LogError, LogWriter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// How button press and release are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickStyle {
    /// `MOUSE_CLICK` on press, `MOUSE_RELEASE` on release.
    #[default]
    Split,
    /// `MOUSE_CLICK` for both, with a `pressed` field.
    Combined,
}

impl FromStr for ClickStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "split" => Ok(ClickStyle::Split),
            "combined" => Ok(ClickStyle::Combined),
            other => Err(format!(
                "unknown click style '{other}' (expected split or combined)"
            )),
        }
    }
}

/// Settings for the mouse pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouseSettings {
    /// Minimum gap between two recorded moves (exclusive)
    #[serde(with = "crate::config::duration_millis")]
    pub debounce: Duration,

    pub click_style: ClickStyle,
}

impl Default for MouseSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            click_style: ClickStyle::Split,
        }
    }
}

/// What the normalizer did with a move event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Recorded,
    Suppressed,
}

/// Turns pointer notifications into `MOUSE_*` records.
pub struct MouseNormalizer {
    writer: LogWriter,
    clock: Box<dyn Clock>,
    settings: MouseSettings,
    debounce: chrono::Duration,
    /// Time of the last recorded move; only moves update it
    last_emitted: Option<DateTime<Utc>>,
}

impl MouseNormalizer {
    pub fn new(writer: LogWriter, settings: MouseSettings) -> Self {
        Self::with_clock(writer, settings, SystemClock)
    }

    pub fn with_clock(
        writer: LogWriter,
        settings: MouseSettings,
        clock: impl Clock + 'static,
    ) -> Self {
        let debounce =
            chrono::Duration::from_std(settings.debounce).unwrap_or(chrono::Duration::MAX);
        Self {
            writer,
            clock: Box::new(clock),
            settings,
            debounce,
            last_emitted: None,
        }
    }

    pub fn settings(&self) -> &MouseSettings {
        &self.settings
    }

    pub fn writer(&self) -> &LogWriter {
        &self.writer
    }

    /// Record a move unless one was recorded within the debounce threshold.
    pub fn on_move(&mut self, x: i32, y: i32) -> Result<MoveOutcome, LogError> {
        let now = self.clock.now();

        if let Some(last) = self.last_emitted {
            let elapsed = now - last;
            if elapsed <= self.debounce {
                tracing::trace!(
                    x,
                    y,
                    elapsed_ms = elapsed.num_milliseconds(),
                    "move suppressed"
                );
                return Ok(MoveOutcome::Suppressed);
            }
        }

        let fields = Fields::new().with("x", x).with("y", y);
        self.writer.append_at(now, EventKind::MouseMove, fields)?;
        self.last_emitted = Some(now);
        Ok(MoveOutcome::Recorded)
    }

    /// Record a button press or release.
    pub fn on_button(
        &mut self,
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    ) -> Result<(), LogError> {
        let fields = Fields::new()
            .with("x", x)
            .with("y", y)
            .with("button", button.render());

        let (event, fields) = match self.settings.click_style {
            ClickStyle::Split if pressed => (EventKind::MouseClick, fields),
            ClickStyle::Split => (EventKind::MouseRelease, fields),
            ClickStyle::Combined => (EventKind::MouseClick, fields.with("pressed", pressed)),
        };

        self.writer.append_at(self.clock.now(), event, fields)
    }

    /// Record a scroll.
    pub fn on_scroll(&mut self, x: i32, y: i32, dx: i32, dy: i32) -> Result<(), LogError> {
        let fields = Fields::new()
            .with("x", x)
            .with("y", y)
            .with("dx", dx)
            .with("dy", dy);
        self.writer
            .append_at(self.clock.now(), EventKind::MouseScroll, fields)
    }
}
