//! # Value Coercion Engine
//!
//! Maps a declared [`FieldType`] and a runtime [`Value`] to a JSON tree.
//!
//! ## Dispatch
//!
//! | Declared type | Produced JSON |
//! |---------------|---------------|
//! | STRING | string (scalars converted through their natural text) |
//! | BOOLEAN | `true` / `false` |
//! | BYTE, SHORT, INT, LONG | integer, range-checked against the declared width |
//! | BIGINT | integer with every digit preserved |
//! | CHAR | one-character string |
//! | FLOAT, DOUBLE | number |
//! | DATE, TIME, TIMESTAMP | formatted string, or epoch millis when no pattern is configured |
//! | RECORD | object in schema order; non-record values become `null` |
//! | ARRAY | array, each element coerced with the element type |
//! | MAP | object keyed by the map's own keys |
//! | CHOICE | first compatible alternative (see [`is_compatible`]) |
//!
//! Null becomes JSON `null` for every declared type, at any depth.

use std::str::FromStr;

use jsonrecord_core::{BigInteger, FieldType, Record, Schema, Value};
use serde_json::{Map, Number, Value as Json};

use crate::config::{NullSuppression, TemporalFormats, TemporalKind, WriterConfig};
use crate::error::{CoercionError, ConfigurationError};

/// Whether `value`'s own shape can be coerced to `alternative` without
/// conversion. Used to resolve CHOICE fields; null is compatible with nothing.
pub fn is_compatible(alternative: &FieldType, value: &Value) -> bool {
    match (alternative, value) {
        (_, Value::Null) => false,
        (FieldType::String, Value::String(_)) => true,
        (FieldType::Boolean, Value::Boolean(_)) => true,
        (FieldType::Byte, Value::Byte(_)) => true,
        (FieldType::Short, Value::Byte(_) | Value::Short(_)) => true,
        (FieldType::Int, Value::Byte(_) | Value::Short(_) | Value::Int(_)) => true,
        (FieldType::Long, Value::Byte(_) | Value::Short(_) | Value::Int(_) | Value::Long(_)) => {
            true
        }
        (
            FieldType::BigInt,
            Value::Byte(_) | Value::Short(_) | Value::Int(_) | Value::Long(_) | Value::BigInt(_),
        ) => true,
        (FieldType::Float, Value::Float(_)) => true,
        (FieldType::Double, Value::Float(_) | Value::Double(_)) => true,
        (FieldType::Char, Value::Char(_)) => true,
        (FieldType::Date, Value::Date(_)) => true,
        (FieldType::Time, Value::Time(_)) => true,
        (FieldType::Timestamp, Value::Timestamp(_)) => true,
        (FieldType::Record { .. }, Value::Record(_)) => true,
        (FieldType::Array { .. }, Value::Array(_)) => true,
        (FieldType::Map { .. }, Value::Map(_)) => true,
        (FieldType::Choice { alternatives }, value) => {
            alternatives.iter().any(|inner| is_compatible(inner, value))
        }
        _ => false,
    }
}

/// First alternative compatible with `value`, in declaration order.
pub fn resolve_choice<'a>(alternatives: &'a [FieldType], value: &Value) -> Option<&'a FieldType> {
    alternatives
        .iter()
        .find(|alternative| is_compatible(alternative, value))
}

/// Coerces record values into JSON for one writer configuration.
#[derive(Debug, Clone)]
pub struct Coercer {
    formats: TemporalFormats,
    null_suppression: NullSuppression,
    include_unknown_fields: bool,
}

impl Coercer {
    pub fn new(config: &WriterConfig) -> Result<Self, ConfigurationError> {
        Ok(Self {
            formats: TemporalFormats::compile(config)?,
            null_suppression: config.null_suppression,
            include_unknown_fields: config.include_unknown_fields,
        })
    }

    /// Top-level JSON object for `record`, in its schema's field order.
    pub fn coerce_record(&self, record: &Record) -> Result<Json, CoercionError> {
        self.record_object(record, record.schema(), "")
    }

    pub fn coerce(&self, field_type: &FieldType, value: &Value) -> Result<Json, CoercionError> {
        self.coerce_at(field_type, value, "$")
    }

    fn coerce_at(
        &self,
        field_type: &FieldType,
        value: &Value,
        path: &str,
    ) -> Result<Json, CoercionError> {
        if value.is_null() {
            return Ok(Json::Null);
        }

        match field_type {
            FieldType::String => self.to_text(value, path).map(Json::String),
            FieldType::Boolean => to_boolean(value, path).map(Json::Bool),
            FieldType::Byte => {
                to_integer(value, path, "BYTE", i64::from(i8::MIN), i64::from(i8::MAX))
            }
            FieldType::Short => {
                to_integer(value, path, "SHORT", i64::from(i16::MIN), i64::from(i16::MAX))
            }
            FieldType::Int => {
                to_integer(value, path, "INT", i64::from(i32::MIN), i64::from(i32::MAX))
            }
            FieldType::Long => to_integer(value, path, "LONG", i64::MIN, i64::MAX),
            FieldType::BigInt => to_big_integer(value, path),
            FieldType::Char => to_char(value, path).map(|ch| Json::String(ch.to_string())),
            FieldType::Float | FieldType::Double => to_float(value, field_type, path),
            FieldType::Date => self.to_temporal(TemporalKind::Date, value, path),
            FieldType::Time => self.to_temporal(TemporalKind::Time, value, path),
            FieldType::Timestamp => self.to_temporal(TemporalKind::Timestamp, value, path),
            FieldType::Record { schema } => match value {
                Value::Record(record) => {
                    let schema = schema.as_ref().unwrap_or_else(|| record.schema());
                    self.record_object(record, schema, path)
                }
                _ => Ok(Json::Null),
            },
            FieldType::Array { element } => match value {
                Value::Array(items) => items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| self.coerce_at(element, item, &format!("{path}[{index}]")))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Json::Array),
                other => Err(incompatible(path, other, field_type)),
            },
            FieldType::Map { values } => match value {
                Value::Map(entries) => {
                    let mut object = Map::with_capacity(entries.len());
                    for (key, entry) in entries {
                        let coerced = self.coerce_at(values, entry, &join_path(path, key))?;
                        object.insert(key.clone(), coerced);
                    }
                    Ok(Json::Object(object))
                }
                other => Err(incompatible(path, other, field_type)),
            },
            FieldType::Choice { alternatives } => match resolve_choice(alternatives, value) {
                Some(selected) => self.coerce_at(selected, value, path),
                None => Err(CoercionError::NoMatchingChoice {
                    path: path.to_owned(),
                    kind: value.kind_name(),
                    alternatives: alternatives
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", "),
                }),
            },
        }
    }

    fn record_object(
        &self,
        record: &Record,
        schema: &Schema,
        path: &str,
    ) -> Result<Json, CoercionError> {
        let mut object = Map::with_capacity(schema.len());
        let absent = Value::Null;

        for field in schema.fields() {
            let field_path = join_path(path, field.name());
            let value = match record.get(field.name()) {
                Some(value) => value,
                None if self.null_suppression == NullSuppression::Never => &absent,
                None => continue,
            };
            if value.is_null() && self.null_suppression == NullSuppression::Always {
                continue;
            }
            let coerced = self.coerce_at(field.field_type(), value, &field_path)?;
            object.insert(field.name().to_owned(), coerced);
        }

        if self.include_unknown_fields {
            for name in unknown_names(record, schema) {
                let Some(value) = record.get(name) else {
                    continue;
                };
                if value.is_null() && self.null_suppression == NullSuppression::Always {
                    continue;
                }
                let inferred = FieldType::infer(value);
                let coerced = self.coerce_at(&inferred, value, &join_path(path, name))?;
                object.insert(name.to_owned(), coerced);
            }
        }

        Ok(Json::Object(object))
    }

    fn to_text(&self, value: &Value, path: &str) -> Result<String, CoercionError> {
        let text = match value {
            Value::String(text) => text.clone(),
            Value::Boolean(flag) => flag.to_string(),
            Value::Byte(v) => v.to_string(),
            Value::Short(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::BigInt(v) => v.to_string(),
            Value::Float(v) => float_text(widen(*v)),
            Value::Double(v) => float_text(*v),
            Value::Char(ch) => ch.to_string(),
            Value::Date(millis) => self.temporal_text(TemporalKind::Date, *millis, path)?,
            Value::Time(millis) => self.temporal_text(TemporalKind::Time, *millis, path)?,
            Value::Timestamp(millis) => {
                self.temporal_text(TemporalKind::Timestamp, *millis, path)?
            }
            other => return Err(incompatible(path, other, &FieldType::String)),
        };
        Ok(text)
    }

    fn temporal_text(
        &self,
        kind: TemporalKind,
        millis: i64,
        path: &str,
    ) -> Result<String, CoercionError> {
        Ok(self
            .format_millis(kind, millis, path)?
            .unwrap_or_else(|| millis.to_string()))
    }

    fn to_temporal(
        &self,
        kind: TemporalKind,
        value: &Value,
        path: &str,
    ) -> Result<Json, CoercionError> {
        let millis = match value {
            Value::Date(millis) | Value::Time(millis) | Value::Timestamp(millis) => *millis,
            Value::String(text) => text.trim().parse::<i64>().map_err(|_| {
                incompatible(path, value, &temporal_type(kind))
            })?,
            other => other
                .as_i64()
                .ok_or_else(|| incompatible(path, other, &temporal_type(kind)))?,
        };

        Ok(match self.format_millis(kind, millis, path)? {
            Some(text) => Json::String(text),
            None => Json::Number(Number::from(millis)),
        })
    }

    fn format_millis(
        &self,
        kind: TemporalKind,
        millis: i64,
        path: &str,
    ) -> Result<Option<String>, CoercionError> {
        self.formats
            .format(kind, millis)
            .map_err(|message| CoercionError::Temporal {
                path: path.to_owned(),
                millis,
                message,
            })
    }
}

fn temporal_type(kind: TemporalKind) -> FieldType {
    match kind {
        TemporalKind::Date => FieldType::Date,
        TemporalKind::Time => FieldType::Time,
        TemporalKind::Timestamp => FieldType::Timestamp,
    }
}

fn unknown_names<'a>(record: &'a Record, schema: &Schema) -> Vec<&'a str> {
    let mut names: Vec<&str> = record
        .values()
        .keys()
        .map(String::as_str)
        .filter(|name| !schema.contains(name))
        .collect();
    names.sort_unstable();
    names
}

fn to_boolean(value: &Value, path: &str) -> Result<bool, CoercionError> {
    match value {
        Value::Boolean(flag) => Ok(*flag),
        Value::String(text) if text.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(text) if text.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(incompatible(path, other, &FieldType::Boolean)),
    }
}

fn to_integer(
    value: &Value,
    path: &str,
    expected: &'static str,
    min: i64,
    max: i64,
) -> Result<Json, CoercionError> {
    let out_of_range = |text: String| CoercionError::OutOfRange {
        path: path.to_owned(),
        value: text,
        expected,
    };
    let not_integral = || CoercionError::Incompatible {
        path: path.to_owned(),
        kind: value.kind_name(),
        expected: expected.to_owned(),
    };

    let integer = match value {
        Value::Byte(_) | Value::Short(_) | Value::Int(_) | Value::Long(_) => {
            value.as_i64().ok_or_else(not_integral)?
        }
        Value::BigInt(big) => big.to_i64().ok_or_else(|| out_of_range(big.to_string()))?,
        Value::Float(v) => integral_float(f64::from(*v)).ok_or_else(not_integral)?,
        Value::Double(v) => integral_float(*v).ok_or_else(not_integral)?,
        Value::String(text) => {
            let big = BigInteger::from_str(text).map_err(|_| not_integral())?;
            big.to_i64().ok_or_else(|| out_of_range(big.to_string()))?
        }
        _ => return Err(not_integral()),
    };

    if integer < min || integer > max {
        return Err(out_of_range(integer.to_string()));
    }
    Ok(Json::Number(Number::from(integer)))
}

fn integral_float(value: f64) -> Option<i64> {
    // 2^63 is exactly representable; anything at or past it overflows i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (value.is_finite() && value.fract() == 0.0 && value >= -LIMIT && value < LIMIT)
        .then_some(value as i64)
}

fn to_big_integer(value: &Value, path: &str) -> Result<Json, CoercionError> {
    let big = match value {
        Value::BigInt(big) => big.clone(),
        Value::String(text) => BigInteger::from_str(text)
            .map_err(|_| incompatible(path, value, &FieldType::BigInt))?,
        Value::Float(v) => integral_float(f64::from(*v))
            .map(BigInteger::from)
            .ok_or_else(|| incompatible(path, value, &FieldType::BigInt))?,
        Value::Double(v) => integral_float(*v)
            .map(BigInteger::from)
            .ok_or_else(|| incompatible(path, value, &FieldType::BigInt))?,
        other => other
            .as_i64()
            .map(BigInteger::from)
            .ok_or_else(|| incompatible(path, other, &FieldType::BigInt))?,
    };

    Number::from_str(big.as_str())
        .map(Json::Number)
        .map_err(|_| incompatible(path, value, &FieldType::BigInt))
}

fn to_char(value: &Value, path: &str) -> Result<char, CoercionError> {
    match value {
        Value::Char(ch) => Ok(*ch),
        Value::String(text) => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Ok(ch),
                _ => Err(incompatible(path, value, &FieldType::Char)),
            }
        }
        other => Err(incompatible(path, other, &FieldType::Char)),
    }
}

fn to_float(value: &Value, field_type: &FieldType, path: &str) -> Result<Json, CoercionError> {
    let float = match value {
        Value::Float(v) => widen(*v),
        Value::Double(v) => *v,
        Value::BigInt(big) => big
            .as_str()
            .parse::<f64>()
            .map_err(|_| incompatible(path, value, field_type))?,
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| incompatible(path, value, field_type))?,
        other => match other.as_i64() {
            Some(integer) => integer as f64,
            None => return Err(incompatible(path, other, field_type)),
        },
    };

    Number::from_f64(float)
        .map(Json::Number)
        .ok_or_else(|| CoercionError::NonFinite {
            path: path.to_owned(),
            value: float.to_string(),
        })
}

/// Widens through the shortest decimal form, so 0.1f32 stays 0.1.
fn widen(value: f32) -> f64 {
    value
        .to_string()
        .parse::<f64>()
        .unwrap_or_else(|_| f64::from(value))
}

/// Text of a float as it would appear as a JSON number; 8.0 stays `8.0`.
fn float_text(value: f64) -> String {
    Number::from_f64(value)
        .map(|number| number.to_string())
        .unwrap_or_else(|| value.to_string())
}

fn incompatible(path: &str, value: &Value, expected: &FieldType) -> CoercionError {
    CoercionError::Incompatible {
        path: path.to_owned(),
        kind: value.kind_name(),
        expected: expected.to_string(),
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}.{name}")
    }
}
