use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};

use crate::{SchemaRef, Value};

/// Bytes a record was materialized from, tagged with their mime type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedForm {
    bytes: Vec<u8>,
    mime_type: String,
}

impl SerializedForm {
    pub fn from_text(text: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: text.into().into_bytes(),
            mime_type: mime_type.into(),
        }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// Named values conforming to one shared schema.
///
/// Values are stored as given; coercion to the declared types happens when the
/// record is written.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: SchemaRef,
    values: HashMap<String, Value>,
    serialized: Option<SerializedForm>,
}

impl Record {
    pub fn new(schema: SchemaRef) -> Self {
        Self {
            schema,
            values: HashMap::new(),
            serialized: None,
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn with_values(mut self, values: HashMap<String, Value>) -> Self {
        self.values.extend(values);
        self
    }

    pub fn with_serialized_form(mut self, serialized: SerializedForm) -> Self {
        self.serialized = Some(serialized);
        self
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Value stored under `name`; `None` when the name was never set.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    pub fn serialized_form(&self) -> Option<&SerializedForm> {
        self.serialized.as_ref()
    }

    /// Names present in the value map but not declared by the schema, sorted.
    pub fn unknown_field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .values
            .keys()
            .map(String::as_str)
            .filter(|name| !self.schema.contains(name))
            .collect();
        names.sort_unstable();
        names
    }
}

/// Forward-only, single-pass sequence of records sharing a schema.
///
/// The set is consumed by iteration and cannot be restarted.
pub struct RecordSet<'a> {
    schema: SchemaRef,
    records: Box<dyn Iterator<Item = Record> + 'a>,
}

impl<'a> RecordSet<'a> {
    pub fn of(schema: SchemaRef, records: Vec<Record>) -> Self {
        Self::from_records(schema, records)
    }

    pub fn from_records<I>(schema: SchemaRef, records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
        I::IntoIter: 'a,
    {
        Self {
            schema,
            records: Box::new(records.into_iter()),
        }
    }

    pub fn empty(schema: SchemaRef) -> Self {
        Self::of(schema, Vec::new())
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn next_record(&mut self) -> Option<Record> {
        self.records.next()
    }
}

impl Iterator for RecordSet<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}

impl Debug for RecordSet<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSet")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Field, FieldType, Schema};

    fn schema() -> SchemaRef {
        Schema::new(vec![
            Field::new("name", FieldType::String),
            Field::new("age", FieldType::Int),
        ])
        .expect("schema")
        .into_ref()
    }

    #[test]
    fn absent_and_null_are_distinct() {
        let record = Record::new(schema()).with_value("name", Value::Null);
        assert_eq!(record.get("name"), Some(&Value::Null));
        assert_eq!(record.get("age"), None);
    }

    #[test]
    fn reports_unknown_fields_sorted() {
        let record = Record::new(schema())
            .with_value("zeta", 1_i32)
            .with_value("name", "Ann")
            .with_value("alpha", true);
        assert_eq!(record.unknown_field_names(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn serialized_form_keeps_raw_bytes() {
        let form = SerializedForm::from_text("{ \"a\":  1 }", "application/json");
        let record = Record::new(schema()).with_serialized_form(form.clone());
        assert_eq!(
            record.serialized_form().map(SerializedForm::as_bytes),
            Some(&b"{ \"a\":  1 }"[..])
        );
        assert_eq!(form.mime_type(), "application/json");
    }

    #[test]
    fn record_set_is_single_pass() {
        let schema = schema();
        let mut set = RecordSet::of(
            schema.clone(),
            vec![
                Record::new(schema.clone()).with_value("age", 1_i32),
                Record::new(schema.clone()).with_value("age", 2_i32),
            ],
        );
        assert!(set.next_record().is_some());
        assert!(set.next_record().is_some());
        assert!(set.next_record().is_none());
        assert!(set.next().is_none());
    }

    #[test]
    fn record_set_wraps_lazy_iterators() {
        let schema = schema();
        let template = schema.clone();
        let set = RecordSet::from_records(
            schema,
            (0..3).map(move |age| Record::new(template.clone()).with_value("age", age)),
        );
        let ages: Vec<Option<Value>> = set.map(|record| record.get("age").cloned()).collect();
        assert_eq!(
            ages,
            vec![Some(Value::Int(0)), Some(Value::Int(1)), Some(Value::Int(2))]
        );
    }
}
