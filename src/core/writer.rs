//! Append-only JSONL log writer.
//!
//! The writer owns one destination file. Every append reopens the file in
//! append mode, writes one whole line, flushes and closes it again, so a
//! crash loses at most the line in flight and another process can tail the
//! file at any time.

use crate::core::record::{EventKind, Fields, LogRecord};
use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Errors raised while creating or appending to a log file.
#[derive(Debug)]
pub enum LogError {
    /// The destination could not be created or opened.
    Open { path: PathBuf, source: io::Error },
    /// The destination was opened but the line could not be written.
    Write { path: PathBuf, source: io::Error },
    /// The record could not be rendered.
    Serialize(serde_json::Error),
}

impl std::fmt::Display for LogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogError::Open { path, source } => {
                write!(f, "cannot open log file {}: {source}", path.display())
            }
            LogError::Write { path, source } => {
                write!(f, "cannot write log file {}: {source}", path.display())
            }
            LogError::Serialize(e) => write!(f, "cannot serialize record: {e}"),
        }
    }
}

impl std::error::Error for LogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LogError::Open { source, .. } | LogError::Write { source, .. } => Some(source),
            LogError::Serialize(e) => Some(e),
        }
    }
}

/// Writes [`LogRecord`]s to a single file, one line each.
#[derive(Debug)]
pub struct LogWriter {
    path: PathBuf,
    sync: bool,
    records_written: u64,
}

impl LogWriter {
    /// Make sure the destination exists, creating it empty if missing.
    ///
    /// Existing content is never truncated. Fails if the parent directory
    /// does not exist or is not writable.
    pub fn initialize(path: impl Into<PathBuf>) -> Result<Self, LogError> {
        let path = path.into();

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LogError::Open {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "log file ready");

        Ok(Self {
            path,
            sync: false,
            records_written: 0,
        })
    }

    /// Also `fsync` file data before each append returns.
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines this writer has appended.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Append a record stamped with the current wall-clock time.
    pub fn append(&mut self, event: EventKind, fields: Fields) -> Result<(), LogError> {
        self.append_at(Utc::now(), event, fields)
    }

    /// Append a record stamped with `timestamp`.
    pub fn append_at(
        &mut self,
        timestamp: DateTime<Utc>,
        event: EventKind,
        fields: Fields,
    ) -> Result<(), LogError> {
        let record = LogRecord::new(timestamp.timestamp_millis(), event, fields);
        self.write_record(&record)
    }

    /// Append an already-built record.
    pub fn write_record(&mut self, record: &LogRecord) -> Result<(), LogError> {
        // Rendered up front: a serialization failure must not touch the file
        let line = record.to_line().map_err(LogError::Serialize)?;

        // No `create`: a file removed mid-run is an error, not a fresh log
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|source| LogError::Open {
                path: self.path.clone(),
                source,
            })?;

        let written = file.write_all(&line).and_then(|_| file.flush()).and_then(|_| {
            if self.sync {
                file.sync_data()
            } else {
                Ok(())
            }
        });

        written.map_err(|source| LogError::Write {
            path: self.path.clone(),
            source,
        })?;

        self.records_written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");

        let writer = LogWriter::initialize(&path).unwrap();

        assert_eq!(writer.path(), path.as_path());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(&path, "existing line\n").unwrap();

        LogWriter::initialize(&path).unwrap();
        LogWriter::initialize(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing line\n");
    }

    #[test]
    fn test_initialize_missing_parent_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("log.txt");

        let err = LogWriter::initialize(&path).unwrap_err();
        assert!(matches!(err, LogError::Open { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_append_adds_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let mut writer = LogWriter::initialize(&path).unwrap();

        let at = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        writer
            .append_at(at, EventKind::KeyPress, Fields::new().with("key", "a"))
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\"timestamp\": 1700000000000, \"event\": \"KEY_PRESS\", \"key\": \"a\"}\n"
        );
        assert_eq!(writer.records_written(), 1);
    }

    #[test]
    fn test_append_uses_current_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let mut writer = LogWriter::initialize(&path).unwrap().with_sync(true);

        let before = Utc::now().timestamp_millis();
        writer
            .append(EventKind::KeyRelease, Fields::new().with("key", "Key.esc"))
            .unwrap();
        let after = Utc::now().timestamp_millis();

        let content = std::fs::read_to_string(&path).unwrap();
        let record = LogRecord::from_line(&content).unwrap();
        assert!(record.timestamp >= before && record.timestamp <= after);
    }

    #[test]
    fn test_append_after_delete_fails_without_recreating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let mut writer = LogWriter::initialize(&path).unwrap();

        std::fs::remove_file(&path).unwrap();

        let err = writer
            .append(EventKind::KeyPress, Fields::new().with("key", "a"))
            .unwrap_err();
        assert!(matches!(err, LogError::Open { .. }));
        assert!(!path.exists());
        assert_eq!(writer.records_written(), 0);
    }

    #[test]
    fn test_error_display_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("log.txt");
        let err = LogWriter::initialize(&path).unwrap_err();
        assert!(err.to_string().contains("log.txt"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
