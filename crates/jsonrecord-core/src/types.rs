use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{SchemaRef, Value};

/// Semantic type of a schema field.
///
/// Parameterized shapes carry their parameter inside the variant: an array of
/// ints and an array of strings are different types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    String,
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    #[serde(rename = "bigint")]
    BigInt,
    Float,
    Double,
    Date,
    Time,
    Timestamp,
    /// Nested record. When the schema is absent the nested record's own schema is used.
    Record {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema: Option<SchemaRef>,
    },
    Array { element: Box<FieldType> },
    Map { values: Box<FieldType> },
    /// Sum type; alternatives are tried in declaration order.
    Choice { alternatives: Vec<FieldType> },
}

impl FieldType {
    pub fn array(element: FieldType) -> Self {
        Self::Array {
            element: Box::new(element),
        }
    }

    pub fn map(values: FieldType) -> Self {
        Self::Map {
            values: Box::new(values),
        }
    }

    pub fn choice(alternatives: Vec<FieldType>) -> Self {
        Self::Choice { alternatives }
    }

    pub fn record(schema: SchemaRef) -> Self {
        Self::Record {
            schema: Some(schema),
        }
    }

    pub fn any_record() -> Self {
        Self::Record { schema: None }
    }

    /// Returns `true` for scalar types (everything but record, array, map and choice).
    pub fn is_simple(&self) -> bool {
        !matches!(
            self,
            Self::Record { .. } | Self::Array { .. } | Self::Map { .. } | Self::Choice { .. }
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::Timestamp)
    }

    pub fn element_type(&self) -> Option<&FieldType> {
        match self {
            Self::Array { element } => Some(element),
            _ => None,
        }
    }

    pub fn value_type(&self) -> Option<&FieldType> {
        match self {
            Self::Map { values } => Some(values),
            _ => None,
        }
    }

    pub fn alternatives(&self) -> Option<&[FieldType]> {
        match self {
            Self::Choice { alternatives } => Some(alternatives),
            _ => None,
        }
    }

    pub fn record_schema(&self) -> Option<&SchemaRef> {
        match self {
            Self::Record { schema } => schema.as_ref(),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Boolean => "BOOLEAN",
            Self::Byte => "BYTE",
            Self::Char => "CHAR",
            Self::Short => "SHORT",
            Self::Int => "INT",
            Self::Long => "LONG",
            Self::BigInt => "BIGINT",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Record { .. } => "RECORD",
            Self::Array { .. } => "ARRAY",
            Self::Map { .. } => "MAP",
            Self::Choice { .. } => "CHOICE",
        }
    }

    /// Infers a declared type for a value that has no schema field.
    ///
    /// Null infers STRING, which serializes null regardless.
    pub fn infer(value: &Value) -> FieldType {
        match value {
            Value::Null | Value::String(_) => Self::String,
            Value::Boolean(_) => Self::Boolean,
            Value::Byte(_) => Self::Byte,
            Value::Short(_) => Self::Short,
            Value::Int(_) => Self::Int,
            Value::Long(_) => Self::Long,
            Value::BigInt(_) => Self::BigInt,
            Value::Float(_) => Self::Float,
            Value::Double(_) => Self::Double,
            Value::Char(_) => Self::Char,
            Value::Date(_) => Self::Date,
            Value::Time(_) => Self::Time,
            Value::Timestamp(_) => Self::Timestamp,
            Value::Array(items) => Self::array(first_non_null(items.iter())),
            Value::Map(entries) => Self::map(first_non_null(entries.iter().map(|(_, v)| v))),
            Value::Record(record) => Self::record(record.schema().clone()),
        }
    }
}

fn first_non_null<'a>(mut values: impl Iterator<Item = &'a Value>) -> FieldType {
    values
        .find(|value| !value.is_null())
        .map(FieldType::infer)
        .unwrap_or(FieldType::String)
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array { element } => write!(f, "ARRAY[{element}]"),
            Self::Map { values } => write!(f, "MAP[{values}]"),
            Self::Choice { alternatives } => {
                f.write_str("CHOICE[")?;
                for (index, alternative) in alternatives.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{alternative}")?;
                }
                f.write_str("]")
            }
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BigInteger, Field, Record, Schema};
    use std::sync::Arc;

    #[test]
    fn parameterized_types_expose_their_parameter() {
        let array = FieldType::array(FieldType::Int);
        assert_eq!(array.element_type(), Some(&FieldType::Int));
        assert_eq!(array.value_type(), None);

        let map = FieldType::map(FieldType::Double);
        assert_eq!(map.value_type(), Some(&FieldType::Double));

        let choice = FieldType::choice(vec![FieldType::Int, FieldType::Long]);
        assert_eq!(
            choice.alternatives(),
            Some(&[FieldType::Int, FieldType::Long][..])
        );
        assert_ne!(array, FieldType::array(FieldType::String));
    }

    #[test]
    fn only_scalars_are_simple() {
        assert!(FieldType::Timestamp.is_simple());
        assert!(FieldType::BigInt.is_simple());
        assert!(!FieldType::any_record().is_simple());
        assert!(!FieldType::array(FieldType::Int).is_simple());
        assert!(!FieldType::choice(vec![FieldType::Int]).is_simple());
    }

    #[test]
    fn display_renders_nested_parameters() {
        let ty = FieldType::map(FieldType::choice(vec![
            FieldType::Int,
            FieldType::array(FieldType::String),
        ]));
        assert_eq!(ty.to_string(), "MAP[CHOICE[INT, ARRAY[STRING]]]");
    }

    #[test]
    fn infers_types_from_values() {
        assert_eq!(FieldType::infer(&Value::Long(1)), FieldType::Long);
        assert_eq!(
            FieldType::infer(&Value::BigInt(BigInteger::from(7_i64))),
            FieldType::BigInt
        );
        assert_eq!(
            FieldType::infer(&Value::Array(vec![Value::Null, Value::Double(1.5)])),
            FieldType::array(FieldType::Double)
        );
        assert_eq!(
            FieldType::infer(&Value::Map(Vec::new())),
            FieldType::map(FieldType::String)
        );

        let schema = Arc::new(
            Schema::new(vec![Field::new("x", FieldType::Int)]).expect("schema"),
        );
        let record = Record::new(schema.clone());
        assert_eq!(
            FieldType::infer(&Value::Record(record)),
            FieldType::record(schema)
        );
    }

    #[test]
    fn serializes_as_tagged_object() {
        let ty = FieldType::array(FieldType::BigInt);
        let json = serde_json::to_value(&ty).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({ "type": "array", "element": { "type": "bigint" } })
        );

        let back: FieldType = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, ty);
    }
}
