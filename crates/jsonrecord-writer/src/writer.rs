//! # Streaming Record-Set Writer
//!
//! [`JsonRecordSetWriter`] writes records one at a time to a byte sink and
//! wraps them in exactly one document envelope.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──begin──▶ Open ──write_record*──▶ Open ──finish──▶ Closed
//!                  │                                        ▲
//!                  └──── coercion / sink error ──▶ Failed ──┘ (close releases the sink)
//! ```
//!
//! ## Output
//!
//! | Grouping | Empty | Two records |
//! |----------|-------|-------------|
//! | `Array` | `[]` (`[ ]` pretty) | `[{..},{..}]` (`[ {..}, {..} ]` pretty) |
//! | `OneLinePerObject` | nothing | `{..}\n{..}\n` |
//! | `SingleRecord` | nothing | rejected |
//!
//! A record carrying a serialized form whose mime type equals the writer's
//! mime type is copied verbatim, without coercion or validation.
//!
//! ## Example
//!
//! ```rust
//! use jsonrecord_core::{Field, FieldType, Record, RecordSet, Schema};
//! use jsonrecord_writer::{JsonRecordSetWriter, WriterConfig};
//!
//! let schema = Schema::new(vec![Field::new("id", FieldType::Long)])
//!     .expect("schema")
//!     .into_ref();
//! let records = RecordSet::of(
//!     schema.clone(),
//!     vec![Record::new(schema.clone()).with_value("id", 7_i64)],
//! );
//!
//! let mut writer = JsonRecordSetWriter::new(schema, Vec::new(), WriterConfig::default())
//!     .expect("valid config");
//! let result = writer.write_record_set(records).expect("write");
//! let output = writer.close().expect("close");
//!
//! assert_eq!(result.record_count, 1);
//! assert_eq!(output, br#"[{"id":7}]"#);
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::marker::PhantomData;

use jsonrecord_core::{Record, RecordSet, SchemaRef};
use serde::Serialize;
use uuid::Uuid;

use crate::coerce::Coercer;
use crate::config::{OutputGrouping, WriterConfig};
use crate::error::WriteError;
use crate::logging::{LogEntry, LogLevel, NoopLogger, WriterLogger};
use crate::schema_access::{NoSchemaAccess, SchemaAccessWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Idle,
    Open,
    Closed,
    Failed,
}

/// Summary of a finished write session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteResult {
    pub record_count: usize,
    /// Opaque attributes contributed by the schema access strategy.
    pub attributes: BTreeMap<String, String>,
    pub mime_type: String,
}

/// Builds a [`JsonRecordSetWriter`] for a sink of type `W`.
///
/// `W` is fixed by the sink handed to [`build`](Self::build).
pub struct JsonRecordSetWriterBuilder<W> {
    schema: SchemaRef,
    config: WriterConfig,
    schema_access: Box<dyn SchemaAccessWriter>,
    logger: Box<dyn WriterLogger>,
    sink: PhantomData<fn() -> W>,
}

impl<W: Write> JsonRecordSetWriterBuilder<W> {
    pub fn new(schema: SchemaRef) -> Self {
        Self {
            schema,
            config: WriterConfig::default(),
            schema_access: Box::new(NoSchemaAccess),
            logger: Box::new(NoopLogger),
            sink: PhantomData,
        }
    }

    pub fn config(mut self, config: WriterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn schema_access(mut self, schema_access: impl SchemaAccessWriter + 'static) -> Self {
        self.schema_access = Box::new(schema_access);
        self
    }

    pub fn logger(mut self, logger: impl WriterLogger + 'static) -> Self {
        self.logger = Box::new(logger);
        self
    }

    /// Validates the configuration and takes ownership of `sink`.
    pub fn build(self, sink: W) -> Result<JsonRecordSetWriter<W>, WriteError> {
        self.config.validate()?;
        let coercer = Coercer::new(&self.config)?;

        Ok(JsonRecordSetWriter {
            schema: self.schema,
            sink: Some(sink),
            coercer,
            config: self.config,
            schema_access: self.schema_access,
            logger: self.logger,
            session: Uuid::new_v4(),
            state: WriterState::Idle,
            records_written: 0,
            attributes: BTreeMap::new(),
        })
    }
}

/// Writes a record set as one JSON document.
///
/// Single-threaded and single-use: one writer serves one write session.
pub struct JsonRecordSetWriter<W: Write> {
    schema: SchemaRef,
    sink: Option<W>,
    coercer: Coercer,
    config: WriterConfig,
    schema_access: Box<dyn SchemaAccessWriter>,
    logger: Box<dyn WriterLogger>,
    session: Uuid,
    state: WriterState,
    records_written: usize,
    attributes: BTreeMap<String, String>,
}

impl<W: Write> JsonRecordSetWriter<W> {
    pub fn builder(schema: SchemaRef) -> JsonRecordSetWriterBuilder<W> {
        JsonRecordSetWriterBuilder::new(schema)
    }

    pub fn new(schema: SchemaRef, sink: W, config: WriterConfig) -> Result<Self, WriteError> {
        Self::builder(schema).config(config).build(sink)
    }

    pub fn mime_type(&self) -> &str {
        &self.config.mime_type
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn session_id(&self) -> Uuid {
        self.session
    }

    /// Opens the envelope. Called implicitly by the first `write_record`.
    pub fn begin_record_set(&mut self) -> Result<(), WriteError> {
        if self.state != WriterState::Idle {
            return Err(self.protocol_violation("record set already begun"));
        }

        let result = self.open_envelope();
        self.guard(result)
    }

    pub fn write_record(&mut self, record: &Record) -> Result<(), WriteError> {
        match self.state {
            WriterState::Idle => self.begin_record_set()?,
            WriterState::Open => {}
            WriterState::Closed => return Err(self.protocol_violation("write after close")),
            WriterState::Failed => {
                return Err(self.protocol_violation("write after an aborted write"))
            }
        }

        if self.config.output_grouping == OutputGrouping::SingleRecord && self.records_written > 0
        {
            return Err(self.protocol_violation("single-record writer already wrote its record"));
        }

        let result = self.emit_record(record);
        self.guard(result)
    }

    /// Closes the envelope and flushes the sink.
    pub fn finish_record_set(&mut self) -> Result<WriteResult, WriteError> {
        match self.state {
            WriterState::Idle => self.begin_record_set()?,
            WriterState::Open => {}
            WriterState::Closed => {
                return Err(self.protocol_violation("record set already finished"))
            }
            WriterState::Failed => {
                return Err(self.protocol_violation("cannot finish an aborted write"))
            }
        }

        let result = self.close_envelope();
        self.guard(result)?;
        self.state = WriterState::Closed;
        self.log(
            LogEntry::new(LogLevel::Info, "write_session_finished", self.session)
                .with_field("records", self.records_written),
        );

        Ok(WriteResult {
            record_count: self.records_written,
            attributes: self.attributes.clone(),
            mime_type: self.config.mime_type.clone(),
        })
    }

    /// Streams every record of `records`, then finishes the envelope.
    pub fn write_record_set(&mut self, records: RecordSet<'_>) -> Result<WriteResult, WriteError> {
        if self.state == WriterState::Idle {
            self.begin_record_set()?;
        }
        for record in records {
            self.write_record(&record)?;
        }
        self.finish_record_set()
    }

    /// Finishes an open session, flushes, and hands the sink back.
    ///
    /// A failing flush is returned as [`WriteError::Sink`] in every state.
    pub fn close(mut self) -> Result<W, WriteError> {
        match self.state {
            WriterState::Idle | WriterState::Open => {
                self.finish_record_set()?;
            }
            WriterState::Closed => {}
            WriterState::Failed => {
                self.sink()?.flush()?;
            }
        }

        self.sink
            .take()
            .ok_or_else(|| WriteError::ProtocolViolation(String::from("sink already released")))
    }

    fn open_envelope(&mut self) -> Result<(), WriteError> {
        self.schema_access.validate_schema(&self.schema)?;
        self.attributes = self.schema_access.attributes(&self.schema)?;

        if self.config.output_grouping == OutputGrouping::Array {
            self.sink()?.write_all(b"[")?;
        }
        self.state = WriterState::Open;
        self.log(
            LogEntry::new(LogLevel::Info, "write_session_started", self.session)
                .with_field("grouping", format!("{:?}", self.config.output_grouping))
                .with_field("mime_type", self.config.mime_type.clone()),
        );
        Ok(())
    }

    fn emit_record(&mut self, record: &Record) -> Result<(), WriteError> {
        let index = self.records_written;
        let fast_path = record
            .serialized_form()
            .filter(|form| form.mime_type() == self.config.mime_type);

        if let Some(form) = fast_path {
            self.write_prefix(index)?;
            self.sink()?.write_all(form.as_bytes())?;
            self.write_suffix()?;
            self.log(
                LogEntry::new(LogLevel::Debug, "record_fast_path", self.session)
                    .with_field("index", index)
                    .with_field("bytes", form.as_bytes().len()),
            );
        } else {
            // Coerce before touching the sink so a bad record adds no bytes.
            let json = self.coercer.coerce_record(record)?;
            let pretty = self.config.pretty_print
                && self.config.output_grouping != OutputGrouping::OneLinePerObject;
            self.write_prefix(index)?;
            let sink = self.sink()?;
            if pretty {
                serde_json::to_writer_pretty(&mut *sink, &json)?;
            } else {
                serde_json::to_writer(&mut *sink, &json)?;
            }
            self.write_suffix()?;
            self.log(
                LogEntry::new(LogLevel::Debug, "record_written", self.session)
                    .with_field("index", index),
            );
        }

        self.records_written += 1;
        Ok(())
    }

    fn write_prefix(&mut self, index: usize) -> Result<(), WriteError> {
        if self.config.output_grouping != OutputGrouping::Array {
            return Ok(());
        }
        let prefix: &[u8] = match (index, self.config.pretty_print) {
            (0, false) => b"",
            (0, true) => b" ",
            (_, false) => b",",
            (_, true) => b", ",
        };
        self.sink()?.write_all(prefix)?;
        Ok(())
    }

    fn write_suffix(&mut self) -> Result<(), WriteError> {
        if self.config.output_grouping == OutputGrouping::OneLinePerObject {
            self.sink()?.write_all(b"\n")?;
        }
        Ok(())
    }

    fn close_envelope(&mut self) -> Result<(), WriteError> {
        if self.config.output_grouping == OutputGrouping::Array {
            let close: &[u8] = if self.config.pretty_print { b" ]" } else { b"]" };
            self.sink()?.write_all(close)?;
        }
        self.sink()?.flush()?;
        Ok(())
    }

    fn sink(&mut self) -> Result<&mut W, WriteError> {
        self.sink
            .as_mut()
            .ok_or_else(|| WriteError::ProtocolViolation(String::from("sink already released")))
    }

    /// Moves the writer to `Failed` on error and attempts to flush the sink.
    fn guard<T>(&mut self, result: Result<T, WriteError>) -> Result<T, WriteError> {
        match &result {
            Ok(_) | Err(WriteError::ProtocolViolation(_)) => {}
            Err(error) => self.abort(error.to_string()),
        }
        result
    }

    fn abort(&mut self, message: String) {
        self.state = WriterState::Failed;
        if let Some(sink) = self.sink.as_mut() {
            let _ = sink.flush();
        }
        self.log(
            LogEntry::new(LogLevel::Error, "write_session_aborted", self.session)
                .with_field("records", self.records_written)
                .with_field("error", message),
        );
    }

    fn protocol_violation(&self, message: &str) -> WriteError {
        WriteError::ProtocolViolation(format!("{message} (state: {:?})", self.state))
    }

    fn log(&mut self, entry: LogEntry) {
        self.logger.log(entry);
    }
}

impl<W: Write> Drop for JsonRecordSetWriter<W> {
    fn drop(&mut self) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };

        match self.state {
            WriterState::Open => {
                let close: &[u8] = match (self.config.output_grouping, self.config.pretty_print) {
                    (OutputGrouping::Array, true) => b" ]",
                    (OutputGrouping::Array, false) => b"]",
                    _ => b"",
                };
                let completed = sink.write_all(close).and_then(|()| sink.flush()).is_ok();
                self.logger.log(
                    LogEntry::new(LogLevel::Warn, "writer_dropped_open", self.session)
                        .with_field("records", self.records_written)
                        .with_field("completed", completed),
                );
            }
            WriterState::Failed => {
                let _ = sink.flush();
            }
            WriterState::Idle | WriterState::Closed => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NullSuppression;
    use crate::error::CoercionError;
    use crate::logging::MemoryLogger;
    use crate::schema_access::{SchemaNameAsAttribute, SchemaReferenceAttributes};
    use jsonrecord_core::{Field, FieldType, Schema, SchemaIdentifier, SerializedForm, Value};
    use std::io;

    fn person_schema() -> SchemaRef {
        Schema::new(vec![
            Field::new("name", FieldType::String),
            Field::new("age", FieldType::Int),
        ])
        .expect("schema")
        .into_ref()
    }

    fn person(schema: &SchemaRef, name: &str, age: i32) -> Record {
        Record::new(schema.clone())
            .with_value("name", name)
            .with_value("age", age)
    }

    fn write_all(config: WriterConfig, records: Vec<Record>) -> String {
        let schema = person_schema();
        let mut writer =
            JsonRecordSetWriter::new(schema.clone(), Vec::new(), config).expect("writer");
        writer
            .write_record_set(RecordSet::of(schema, records))
            .expect("write");
        String::from_utf8(writer.close().expect("close")).expect("utf8")
    }

    #[test]
    fn empty_array_envelopes() {
        assert_eq!(write_all(WriterConfig::default(), Vec::new()), "[]");
        assert_eq!(write_all(WriterConfig::default().pretty(true), Vec::new()), "[ ]");
        assert_eq!(
            write_all(
                WriterConfig::default().grouping(OutputGrouping::SingleRecord),
                Vec::new()
            ),
            ""
        );
    }

    #[test]
    fn compact_array_separates_records() {
        let schema = person_schema();
        let output = write_all(
            WriterConfig::default(),
            vec![person(&schema, "Ann", 30), person(&schema, "Bob", 41)],
        );
        assert_eq!(output, r#"[{"name":"Ann","age":30},{"name":"Bob","age":41}]"#);
    }

    #[test]
    fn one_line_per_object_is_ndjson() {
        let schema = person_schema();
        let output = write_all(
            WriterConfig::default()
                .grouping(OutputGrouping::OneLinePerObject)
                .pretty(true),
            vec![person(&schema, "Ann", 30), person(&schema, "Bob", 41)],
        );
        assert_eq!(
            output,
            "{\"name\":\"Ann\",\"age\":30}\n{\"name\":\"Bob\",\"age\":41}\n"
        );
    }

    #[test]
    fn single_record_mode_rejects_a_second_record() {
        let schema = person_schema();
        let mut writer = JsonRecordSetWriter::new(
            schema.clone(),
            Vec::new(),
            WriterConfig::default().grouping(OutputGrouping::SingleRecord),
        )
        .expect("writer");

        writer.write_record(&person(&schema, "Ann", 30)).expect("first");
        let err = writer
            .write_record(&person(&schema, "Bob", 41))
            .expect_err("second record");
        assert!(matches!(err, WriteError::ProtocolViolation(_)));
        assert_eq!(writer.state(), WriterState::Open);

        let output = writer.close().expect("close");
        assert_eq!(output, br#"{"name":"Ann","age":30}"#);
    }

    #[test]
    fn writing_after_finish_is_a_protocol_violation() {
        let schema = person_schema();
        let mut writer =
            JsonRecordSetWriter::new(schema.clone(), Vec::new(), WriterConfig::default())
                .expect("writer");
        writer.finish_record_set().expect("finish");
        let err = writer
            .write_record(&person(&schema, "Ann", 30))
            .expect_err("closed");
        assert!(matches!(err, WriteError::ProtocolViolation(_)));
        assert!(writer.finish_record_set().is_err());
    }

    #[test]
    fn fast_path_requires_exact_mime_type() {
        let schema = person_schema();
        let cached = person(&schema, "Ann", 30).with_serialized_form(SerializedForm::from_text(
            "{ \"cached\" : 1 }",
            "application/json",
        ));
        let other_mime = person(&schema, "Bob", 41)
            .with_serialized_form(SerializedForm::from_text("<bob/>", "application/xml"));

        let output = write_all(WriterConfig::default(), vec![cached, other_mime]);
        assert_eq!(output, r#"[{ "cached" : 1 },{"name":"Bob","age":41}]"#);
    }

    #[test]
    fn coercion_failure_aborts_without_partial_record() {
        let schema = person_schema();
        let logger = MemoryLogger::new();
        let mut writer = JsonRecordSetWriter::builder(schema.clone())
            .logger(logger.clone())
            .build(Vec::new())
            .expect("writer");

        writer.write_record(&person(&schema, "Ann", 30)).expect("first");
        let bad = Record::new(schema.clone()).with_value("age", "old");
        let err = writer.write_record(&bad).expect_err("bad age");
        assert!(matches!(
            err,
            WriteError::TypeCoercion(CoercionError::Incompatible { .. })
        ));
        assert_eq!(writer.state(), WriterState::Failed);
        assert!(matches!(
            writer.write_record(&person(&schema, "Bob", 41)),
            Err(WriteError::ProtocolViolation(_))
        ));

        let output = writer.close().expect("release");
        assert_eq!(output, br#"[{"name":"Ann","age":30}"#);
        assert!(logger.event_names().contains(&"write_session_aborted"));
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_failure_is_surfaced() {
        let schema = person_schema();
        let mut writer =
            JsonRecordSetWriter::new(schema.clone(), FailingSink, WriterConfig::default())
                .expect("writer");
        let err = writer
            .write_record_set(RecordSet::of(schema.clone(), vec![person(&schema, "Ann", 30)]))
            .expect_err("broken pipe");
        assert!(matches!(err, WriteError::Sink(_)));
        assert_eq!(writer.state(), WriterState::Failed);
        assert!(writer.close().is_ok());
    }

    struct UnflushableSink;

    impl Write for UnflushableSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "flush refused"))
        }
    }

    #[test]
    fn close_after_failure_reports_flush_error() {
        let schema = person_schema();
        let mut writer =
            JsonRecordSetWriter::new(schema.clone(), UnflushableSink, WriterConfig::default())
                .expect("writer");
        writer
            .write_record(&person(&schema, "Ann", 30))
            .expect_err("write fails");
        assert_eq!(writer.state(), WriterState::Failed);

        let err = writer.close().err().expect("flush error surfaces");
        assert!(matches!(
            err,
            WriteError::Sink(ref error) if error.kind() == io::ErrorKind::BrokenPipe
        ));
    }

    #[test]
    fn schema_access_attributes_are_returned() {
        let schema = Schema::new(vec![Field::new("id", FieldType::Long)])
            .expect("schema")
            .with_identifier(SchemaIdentifier::named("ids"))
            .into_ref();
        let mut writer = JsonRecordSetWriter::builder(schema.clone())
            .schema_access(SchemaNameAsAttribute)
            .build(Vec::new())
            .expect("writer");

        let result = writer
            .write_record_set(RecordSet::of(
                schema.clone(),
                vec![Record::new(schema).with_value("id", 1_i64)],
            ))
            .expect("write");
        assert_eq!(result.record_count, 1);
        assert_eq!(result.mime_type, "application/json");
        assert_eq!(result.attributes["schema.name"], "ids");
    }

    #[test]
    fn anonymous_schema_writes_without_a_name_attribute() {
        let schema = person_schema();
        let mut writer = JsonRecordSetWriter::builder(schema.clone())
            .schema_access(SchemaNameAsAttribute)
            .build(Vec::new())
            .expect("writer");

        let result = writer
            .write_record_set(RecordSet::of(schema.clone(), vec![person(&schema, "Ann", 30)]))
            .expect("anonymous schema is accepted");
        assert!(result.attributes.is_empty());
        assert_eq!(writer.close().expect("close"), br#"[{"name":"Ann","age":30}]"#);
    }

    #[test]
    fn schema_access_rejection_happens_before_output() {
        let schema = person_schema();
        let mut writer = JsonRecordSetWriter::builder(schema.clone())
            .schema_access(SchemaReferenceAttributes::new())
            .build(Vec::new())
            .expect("writer");
        let err = writer.begin_record_set().expect_err("anonymous schema");
        assert!(matches!(err, WriteError::SchemaAccess(_)));
        assert!(writer.close().expect("release").is_empty());
    }

    #[test]
    fn drop_completes_an_open_envelope() {
        let schema = person_schema();
        let mut sink = Vec::new();
        {
            let mut writer =
                JsonRecordSetWriter::new(schema.clone(), &mut sink, WriterConfig::default())
                    .expect("writer");
            writer.write_record(&person(&schema, "Ann", 30)).expect("write");
        }
        assert_eq!(sink, br#"[{"name":"Ann","age":30}]"#);
    }

    #[test]
    fn null_suppression_reaches_the_output() {
        let schema = person_schema();
        let config = WriterConfig {
            null_suppression: NullSuppression::Always,
            ..WriterConfig::default()
        };
        let output = write_all(
            config,
            vec![Record::new(schema).with_value("name", Value::Null).with_value("age", 5_i32)],
        );
        assert_eq!(output, r#"[{"age":5}]"#);
    }

    #[test]
    fn session_events_are_logged_in_order() {
        let schema = person_schema();
        let logger = MemoryLogger::new();
        let mut writer = JsonRecordSetWriter::builder(schema.clone())
            .logger(logger.clone())
            .build(Vec::new())
            .expect("writer");
        writer
            .write_record_set(RecordSet::of(schema.clone(), vec![person(&schema, "Ann", 30)]))
            .expect("write");

        assert_eq!(
            logger.event_names(),
            vec!["write_session_started", "record_written", "write_session_finished"]
        );
        assert!(logger
            .events()
            .iter()
            .all(|event| event.session == writer.session_id()));
    }
}
