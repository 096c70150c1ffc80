//! # Schema Access Strategies
//!
//! A write session asks its strategy once for attributes describing the schema
//! the records were written with. The writer does not interpret them; they are
//! handed back in [`WriteResult::attributes`](crate::WriteResult).
//!
//! | Strategy | Attributes |
//! |----------|------------|
//! | [`NoSchemaAccess`] | none |
//! | [`SchemaNameAsAttribute`] | `schema.name`, when the schema is named |
//! | [`SchemaReferenceAttributes`] | `schema.identifier`, `schema.version`, `schema.protocol.version` |
//! | [`SchemaTextAsAttribute`] | `schema.text` |

use std::collections::BTreeMap;

use jsonrecord_core::Schema;

use crate::error::SchemaAccessError;

pub const SCHEMA_NAME_ATTRIBUTE: &str = "schema.name";
pub const SCHEMA_IDENTIFIER_ATTRIBUTE: &str = "schema.identifier";
pub const SCHEMA_VERSION_ATTRIBUTE: &str = "schema.version";
pub const SCHEMA_PROTOCOL_VERSION_ATTRIBUTE: &str = "schema.protocol.version";
pub const SCHEMA_TEXT_ATTRIBUTE: &str = "schema.text";

/// Publishes how a consumer can find the schema of written records.
pub trait SchemaAccessWriter {
    /// Rejects schemas the strategy cannot describe.
    fn validate_schema(&self, schema: &Schema) -> Result<(), SchemaAccessError>;

    fn attributes(&self, schema: &Schema) -> Result<BTreeMap<String, String>, SchemaAccessError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoSchemaAccess;

impl SchemaAccessWriter for NoSchemaAccess {
    fn validate_schema(&self, _schema: &Schema) -> Result<(), SchemaAccessError> {
        Ok(())
    }

    fn attributes(&self, _schema: &Schema) -> Result<BTreeMap<String, String>, SchemaAccessError> {
        Ok(BTreeMap::new())
    }
}

/// Publishes `schema.name` when the schema has one; anonymous schemas get no
/// attribute.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaNameAsAttribute;

impl SchemaAccessWriter for SchemaNameAsAttribute {
    fn validate_schema(&self, _schema: &Schema) -> Result<(), SchemaAccessError> {
        Ok(())
    }

    fn attributes(&self, schema: &Schema) -> Result<BTreeMap<String, String>, SchemaAccessError> {
        let mut attributes = BTreeMap::new();
        if let Ok(name) = schema_name(schema, "schema-name-attribute") {
            attributes.insert(String::from(SCHEMA_NAME_ATTRIBUTE), name.to_owned());
        }
        Ok(attributes)
    }
}

/// Name, version and protocol version, for registry lookups.
#[derive(Debug, Clone, Copy)]
pub struct SchemaReferenceAttributes {
    protocol_version: u32,
}

impl SchemaReferenceAttributes {
    pub const PROTOCOL_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            protocol_version: Self::PROTOCOL_VERSION,
        }
    }
}

impl Default for SchemaReferenceAttributes {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaAccessWriter for SchemaReferenceAttributes {
    fn validate_schema(&self, schema: &Schema) -> Result<(), SchemaAccessError> {
        schema_name(schema, "schema-reference-attributes")?;
        schema_version(schema, "schema-reference-attributes").map(|_| ())
    }

    fn attributes(&self, schema: &Schema) -> Result<BTreeMap<String, String>, SchemaAccessError> {
        let name = schema_name(schema, "schema-reference-attributes")?;
        let version = schema_version(schema, "schema-reference-attributes")?;
        Ok(BTreeMap::from([
            (String::from(SCHEMA_IDENTIFIER_ATTRIBUTE), name.to_owned()),
            (String::from(SCHEMA_VERSION_ATTRIBUTE), version.to_string()),
            (
                String::from(SCHEMA_PROTOCOL_VERSION_ATTRIBUTE),
                self.protocol_version.to_string(),
            ),
        ]))
    }
}

/// Full schema as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaTextAsAttribute;

impl SchemaAccessWriter for SchemaTextAsAttribute {
    fn validate_schema(&self, _schema: &Schema) -> Result<(), SchemaAccessError> {
        Ok(())
    }

    fn attributes(&self, schema: &Schema) -> Result<BTreeMap<String, String>, SchemaAccessError> {
        let text = serde_json::to_string(schema)
            .map_err(|error| SchemaAccessError::Serialization(error.to_string()))?;
        Ok(BTreeMap::from([(String::from(SCHEMA_TEXT_ATTRIBUTE), text)]))
    }
}

fn schema_name<'a>(
    schema: &'a Schema,
    strategy: &'static str,
) -> Result<&'a str, SchemaAccessError> {
    schema
        .identifier()
        .name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .ok_or(SchemaAccessError::MissingSchemaName { strategy })
}

fn schema_version(schema: &Schema, strategy: &'static str) -> Result<u32, SchemaAccessError> {
    schema
        .identifier()
        .version
        .ok_or(SchemaAccessError::MissingSchemaVersion { strategy })
}
