//! # Diagnostic Logging
//!
//! Write sessions report lifecycle events as structured [`LogEvent`]s. Logging
//! is advisory: loggers cannot fail a write, and [`NdjsonLogger`] drops events
//! it cannot emit.
//!
//! ## Events
//!
//! | Event | Level | When |
//! |-------|-------|------|
//! | `write_session_started` | info | envelope opened |
//! | `record_fast_path` | debug | cached serialized form copied verbatim |
//! | `record_written` | debug | record coerced and serialized |
//! | `write_session_finished` | info | envelope closed and sink flushed |
//! | `write_session_aborted` | error | coercion or sink failure |
//! | `writer_dropped_open` | warn | writer dropped without `close` |
//!
//! ## Example
//!
//! ```rust,ignore
//! let logger = NdjsonLogger::new(std::io::stderr());
//! let writer = JsonRecordSetWriter::builder(schema)
//!     .logger(logger)
//!     .build(sink)?;
//! ```

use std::io::Write;
use std::sync::{Arc, Mutex};

use jsonrecord_core::UtcDateTime;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Event as reported by the writer, before sequencing.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub event: &'static str,
    pub session: Uuid,
    pub fields: Map<String, Value>,
}

impl LogEntry {
    pub fn new(level: LogLevel, event: &'static str, session: Uuid) -> Self {
        Self {
            level,
            event,
            session,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_owned(), value.into());
        self
    }
}

/// A sequenced, timestamped log line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    /// Monotonically increasing per logger, starting from 1.
    pub seq: u64,
    pub ts: UtcDateTime,
    pub level: LogLevel,
    pub event: &'static str,
    pub session: Uuid,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
}

impl LogEvent {
    fn sequenced(entry: LogEntry, seq: u64) -> Self {
        Self {
            seq,
            ts: UtcDateTime::now(),
            level: entry.level,
            event: entry.event,
            session: entry.session,
            fields: entry.fields,
        }
    }
}

/// Receives writer diagnostics.
pub trait WriterLogger {
    fn log(&mut self, entry: LogEntry);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl WriterLogger for NoopLogger {
    fn log(&mut self, _entry: LogEntry) {}
}

/// Emits one JSON object per line.
///
/// Not thread-safe; give each writer its own logger.
#[derive(Debug)]
pub struct NdjsonLogger<W: Write> {
    writer: W,
    min_level: LogLevel,
    next_seq: u64,
}

impl<W: Write> NdjsonLogger<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            min_level: LogLevel::Info,
            next_seq: 1,
        }
    }

    pub fn with_min_level(mut self, min_level: LogLevel) -> Self {
        self.min_level = min_level;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> WriterLogger for NdjsonLogger<W> {
    fn log(&mut self, entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        let event = LogEvent::sequenced(entry, self.next_seq);
        self.next_seq += 1;

        let Ok(mut line) = serde_json::to_vec(&event) else {
            return;
        };
        line.push(b'\n');
        let _ = self.writer.write_all(&line);
        let _ = self.writer.flush();
    }
}

/// Collects events in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.events().iter().map(|event| event.event).collect()
    }
}

impl WriterLogger for MemoryLogger {
    fn log(&mut self, entry: LogEntry) {
        if let Ok(mut events) = self.events.lock() {
            let seq = events.len() as u64 + 1;
            events.push(LogEvent::sequenced(entry, seq));
        }
    }
}
