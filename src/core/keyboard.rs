//! Keyboard event normalizer.

use crate::collector::types::RawKey;
use crate::core::clock::{Clock, SystemClock};
use crate::core::record::{EventKind, Fields};
use crate::core::writer::{LogError, LogWriter};

/// Turns key-down/key-up notifications into `KEY_PRESS`/`KEY_RELEASE` records.
///
/// Every key event is recorded; there is no filtering.
pub struct KeyboardNormalizer {
    writer: LogWriter,
    clock: Box<dyn Clock>,
}

impl KeyboardNormalizer {
    pub fn new(writer: LogWriter) -> Self {
        Self::with_clock(writer, SystemClock)
    }

    pub fn with_clock(writer: LogWriter, clock: impl Clock + 'static) -> Self {
        Self {
            writer,
            clock: Box::new(clock),
        }
    }

    pub fn on_key_down(&mut self, key: &RawKey) -> Result<(), LogError> {
        self.emit(EventKind::KeyPress, key)
    }

    pub fn on_key_up(&mut self, key: &RawKey) -> Result<(), LogError> {
        self.emit(EventKind::KeyRelease, key)
    }

    pub fn writer(&self) -> &LogWriter {
        &self.writer
    }

    fn emit(&mut self, event: EventKind, key: &RawKey) -> Result<(), LogError> {
        let fields = Fields::new().with("key", key.render());
        self.writer.append_at(self.clock.now(), event, fields)
    }
}
