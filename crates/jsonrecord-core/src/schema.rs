use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{FieldType, SchemaError};

/// Shared, read-only handle to a schema.
pub type SchemaRef = Arc<Schema>;

/// A named, typed field declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }
}

/// Optional name/version pair published by schema access strategies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaIdentifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl SchemaIdentifier {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            version: None,
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }
}

/// Ordered field declarations with constant-time lookup by name.
///
/// Names are case-sensitive and unique within one schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSchema")]
pub struct Schema {
    #[serde(default, skip_serializing_if = "is_anonymous")]
    identifier: SchemaIdentifier,
    fields: Vec<Field>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

fn is_anonymous(identifier: &SchemaIdentifier) -> bool {
    identifier.name.is_none() && identifier.version.is_none()
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Result<Self, SchemaError> {
        let mut index = HashMap::with_capacity(fields.len());
        for (position, field) in fields.iter().enumerate() {
            if index.insert(field.name.clone(), position).is_some() {
                return Err(SchemaError::DuplicateField {
                    name: field.name.clone(),
                });
            }
        }

        Ok(Self {
            identifier: SchemaIdentifier::default(),
            fields,
            index,
        })
    }

    pub fn with_identifier(mut self, identifier: SchemaIdentifier) -> Self {
        self.identifier = identifier;
        self
    }

    /// Wraps the schema for sharing across records.
    pub fn into_ref(self) -> SchemaRef {
        Arc::new(self)
    }

    pub fn identifier(&self) -> &SchemaIdentifier {
        &self.identifier
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(Field::name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn field(&self, name: &str) -> Result<&Field, SchemaError> {
        self.index_of(name)
            .map(|position| &self.fields[position])
            .ok_or_else(|| SchemaError::FieldNotFound {
                name: name.to_owned(),
            })
    }
}

#[derive(Deserialize)]
struct RawSchema {
    #[serde(default)]
    identifier: SchemaIdentifier,
    fields: Vec<Field>,
}

impl TryFrom<RawSchema> for Schema {
    type Error = SchemaError;

    fn try_from(raw: RawSchema) -> Result<Self, Self::Error> {
        Ok(Schema::new(raw.fields)?.with_identifier(raw.identifier))
    }
}
