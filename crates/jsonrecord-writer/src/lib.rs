//! # jsonrecord-writer
//!
//! Streams schema-typed records to a byte sink as JSON.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Writer options, temporal patterns and output grouping |
//! | [`coerce`] | Declared-type coercion and CHOICE resolution |
//! | [`schema_access`] | Strategies that publish schema metadata as attributes |
//! | [`writer`] | The streaming record-set writer and its lifecycle |
//! | [`logging`] | NDJSON diagnostics for write sessions |
//! | [`error`] | Configuration, coercion, sink and protocol errors |
//!
//! ## Example
//!
//! ```rust
//! use jsonrecord_core::{Field, FieldType, Record, Schema};
//! use jsonrecord_writer::{JsonRecordSetWriter, WriterConfig};
//!
//! let schema = Schema::new(vec![
//!     Field::new("name", FieldType::String),
//!     Field::new("tags", FieldType::array(FieldType::String)),
//! ])
//! .expect("schema")
//! .into_ref();
//!
//! let record = Record::new(schema.clone())
//!     .with_value("name", "John Doe")
//!     .with_value("tags", vec!["a", "b"]);
//!
//! let mut writer = JsonRecordSetWriter::new(schema, Vec::new(), WriterConfig::default().pretty(true))
//!     .expect("valid config");
//! writer.write_record(&record).expect("write");
//! writer.finish_record_set().expect("finish");
//!
//! let output = String::from_utf8(writer.close().expect("close")).expect("utf8");
//! assert!(output.starts_with("[ {"));
//! assert!(output.ends_with("} ]"));
//! ```

pub mod coerce;
pub mod config;
pub mod error;
pub mod logging;
pub mod schema_access;
pub mod writer;

pub use coerce::{is_compatible, resolve_choice, Coercer};
pub use config::{NullSuppression, OutputGrouping, TemporalFormats, TemporalKind, WriterConfig};
pub use error::{CoercionError, ConfigurationError, SchemaAccessError, WriteError};
pub use logging::{LogEntry, LogEvent, LogLevel, MemoryLogger, NdjsonLogger, NoopLogger, WriterLogger};
pub use schema_access::{
    NoSchemaAccess, SchemaAccessWriter, SchemaNameAsAttribute, SchemaReferenceAttributes,
    SchemaTextAsAttribute,
};
pub use writer::{JsonRecordSetWriter, JsonRecordSetWriterBuilder, WriteResult, WriterState};
