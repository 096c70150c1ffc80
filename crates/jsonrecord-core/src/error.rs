use thiserror::Error;

/// Schema and value-model errors exposed by `jsonrecord-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("field '{name}' is declared more than once")]
    DuplicateField { name: String },

    #[error("field '{name}' is not declared in the schema")]
    FieldNotFound { name: String },

    #[error("'{value}' is not a valid integer")]
    InvalidBigInteger { value: String },
}
