//! The log record model and its line format.
//!
//! A record is one JSON object per line:
//!
//! ```text
//! {"timestamp": 1716213045123, "event": "MOUSE_CLICK", "x": 512, "y": 340, "button": "Button.left"}
//! ```
//!
//! `timestamp` and `event` always come first, then the event's fields in the
//! order the normalizer supplied them.

use serde::de::{Error as _, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io;

/// The fixed set of event tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    KeyPress,
    KeyRelease,
    MouseMove,
    MouseClick,
    MouseRelease,
    MouseScroll,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::KeyPress => "KEY_PRESS",
            EventKind::KeyRelease => "KEY_RELEASE",
            EventKind::MouseMove => "MOUSE_MOVE",
            EventKind::MouseClick => "MOUSE_CLICK",
            EventKind::MouseRelease => "MOUSE_RELEASE",
            EventKind::MouseScroll => "MOUSE_SCROLL",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(i64::from(v))
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

/// Event-specific fields, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<(String, FieldValue)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One persisted log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Milliseconds since the Unix epoch, wall clock
    pub timestamp: i64,
    pub event: EventKind,
    pub fields: Fields,
}

impl LogRecord {
    pub fn new(timestamp: i64, event: EventKind, fields: Fields) -> Self {
        Self {
            timestamp,
            event,
            fields,
        }
    }

    /// Render the record as a complete line, trailing newline included.
    pub fn to_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut buf = Vec::with_capacity(96);
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
        self.serialize(&mut ser)?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Parse one line of a capture file.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim_end_matches(&['\r', '\n'][..]))
    }
}

impl Serialize for LogRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + self.fields.len()))?;
        map.serialize_entry("timestamp", &self.timestamp)?;
        map.serialize_entry("event", &self.event)?;
        for (key, value) in self.fields.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LogRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(LogRecordVisitor)
    }
}

struct LogRecordVisitor;

impl<'de> Visitor<'de> for LogRecordVisitor {
    type Value = LogRecord;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a log record object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<LogRecord, A::Error> {
        let mut timestamp = None;
        let mut event = None;
        let mut fields = Fields::new();

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "timestamp" => timestamp = Some(map.next_value::<i64>()?),
                "event" => event = Some(map.next_value::<EventKind>()?),
                _ => {
                    let value = map.next_value::<FieldValue>()?;
                    fields.push(key, value);
                }
            }
        }

        Ok(LogRecord {
            timestamp: timestamp.ok_or_else(|| A::Error::missing_field("timestamp"))?,
            event: event.ok_or_else(|| A::Error::missing_field("event"))?,
            fields,
        })
    }
}

/// Compact JSON with `", "` and `": "` separators.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}
