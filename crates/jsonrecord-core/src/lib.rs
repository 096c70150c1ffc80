//! # jsonrecord-core
//!
//! Type model and record containers for the jsonrecord writer.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Closed set of field types, including parameterized array/map/choice/record |
//! | [`schema`] | Ordered, named field declarations shared by reference |
//! | [`value`] | Runtime value union and arbitrary-precision integers |
//! | [`record`] | Records, cached serialized forms and single-pass record sets |
//! | [`timestamp`] | UTC timestamp helper |
//! | [`error`] | Core error types |
//!
//! ## Example
//!
//! ```rust
//! use jsonrecord_core::{Field, FieldType, Record, RecordSet, Schema};
//!
//! let schema = Schema::new(vec![
//!     Field::new("name", FieldType::String),
//!     Field::new("age", FieldType::Int),
//! ])
//! .expect("unique field names")
//! .into_ref();
//!
//! let record = Record::new(schema.clone())
//!     .with_value("name", "John Doe")
//!     .with_value("age", 42_i32);
//!
//! let set = RecordSet::of(schema, vec![record]);
//! assert_eq!(set.count(), 1);
//! ```

pub mod error;
pub mod record;
pub mod schema;
pub mod timestamp;
pub mod types;
pub mod value;

pub use error::SchemaError;
pub use record::{Record, RecordSet, SerializedForm};
pub use schema::{Field, Schema, SchemaIdentifier, SchemaRef};
pub use timestamp::UtcDateTime;
pub use types::FieldType;
pub use value::{BigInteger, Value};
