use thiserror::Error;

/// Invalid writer configuration, detected while the writer is built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("invalid {kind} format '{pattern}': {message}")]
    InvalidPattern {
        kind: &'static str,
        pattern: String,
        message: String,
    },

    #[error("{kind} format '{pattern}' cannot format a UTC instant: {message}")]
    UnformattablePattern {
        kind: &'static str,
        pattern: String,
        message: String,
    },

    #[error("utc offset of {seconds}s is out of range")]
    InvalidOffset { seconds: i32 },

    #[error("mime type cannot be empty")]
    EmptyMimeType,
}

/// A value that cannot be represented as its declared type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoercionError {
    #[error("field '{path}': {kind} value matches none of the choice alternatives [{alternatives}]")]
    NoMatchingChoice {
        path: String,
        kind: &'static str,
        alternatives: String,
    },

    #[error("field '{path}': cannot coerce {kind} value to {expected}")]
    Incompatible {
        path: String,
        kind: &'static str,
        expected: String,
    },

    #[error("field '{path}': value {value} is out of range for {expected}")]
    OutOfRange {
        path: String,
        value: String,
        expected: &'static str,
    },

    #[error("field '{path}': non-finite value {value} has no JSON representation")]
    NonFinite { path: String, value: String },

    #[error("field '{path}': epoch millis {millis} cannot be formatted: {message}")]
    Temporal {
        path: String,
        millis: i64,
        message: String,
    },
}

/// Schema access strategy rejected the schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaAccessError {
    #[error("schema has no name; '{strategy}' requires one")]
    MissingSchemaName { strategy: &'static str },

    #[error("schema has no version; '{strategy}' requires one")]
    MissingSchemaVersion { strategy: &'static str },

    #[error("schema could not be serialized: {0}")]
    Serialization(String),
}

/// Top-level error for write sessions.
///
/// None of these are retried internally; output written before the error is
/// not a valid document.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    TypeCoercion(#[from] CoercionError),

    #[error("sink error: {0}")]
    Sink(#[from] std::io::Error),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error(transparent)]
    SchemaAccess(#[from] SchemaAccessError),
}

impl From<serde_json::Error> for WriteError {
    fn from(error: serde_json::Error) -> Self {
        Self::Sink(error.into())
    }
}
