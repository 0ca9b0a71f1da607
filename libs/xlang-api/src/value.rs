use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};

use crate::error::{Result, XlangError};
use crate::schema::{FieldType, Schema};

/// A single materialized value.
///
/// `Null` is the missing-value marker and is accepted for every field type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Byte(i8),
    Bytes(Vec<u8>),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    /// Canonical decimal text (`"-12.50"`), kept as text so no precision is lost.
    Decimal(String),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Row(Row),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Structural compatibility with `ty`, recursing into rows and arrays.
    pub fn conforms_to(&self, ty: &FieldType) -> bool {
        match (self, ty) {
            (Value::Null, _) => true,
            (Value::String(_), FieldType::String)
            | (Value::Byte(_), FieldType::Byte)
            | (Value::Bytes(_), FieldType::Bytes)
            | (Value::Int16(_), FieldType::Int16)
            | (Value::Int32(_), FieldType::Int32)
            | (Value::Int64(_), FieldType::Int64)
            | (Value::Float(_), FieldType::Float)
            | (Value::Double(_), FieldType::Double)
            | (Value::Boolean(_), FieldType::Boolean) => true,
            (Value::DateTime(ts), FieldType::DateTime) => is_rfc3339_datetime(ts),
            (Value::Decimal(text), FieldType::Decimal) => is_decimal_text(text),
            (Value::Row(row), FieldType::Row(schema)) => row.schema().as_ref() == schema.as_ref(),
            (Value::Array(items), FieldType::Array(element)) => {
                items.iter().all(|item| item.conforms_to(element))
            }
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_row(&self) -> Option<&Row> {
        match self {
            Value::Row(row) => Some(row),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<Row> for Value {
    fn from(row: Row) -> Self {
        Value::Row(row)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One record: values positionally aligned with a shared [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row, checking value count and per-field type compatibility.
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Result<Self> {
        if values.len() != schema.len() {
            return Err(XlangError::RowSchemaMismatch {
                expected: schema.len(),
                actual: values.len(),
            });
        }
        for (field, value) in schema.fields().iter().zip(&values) {
            if !value.conforms_to(&field.field_type) {
                return Err(XlangError::ValueTypeMismatch {
                    field: field.name.clone(),
                    expected: field.field_type.to_string(),
                });
            }
        }
        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Value of the field called `name`.
    pub fn get(&self, name: &str) -> Result<&Value> {
        let index = self.schema.index_of(name)?;
        Ok(&self.values[index])
    }
}

/// RFC 3339 only spells four-digit years.
pub(crate) fn is_rfc3339_datetime(ts: &DateTime<Utc>) -> bool {
    (0..=9999).contains(&ts.year())
}

/// `[+-]digits[.digits][(e|E)[+-]digits]`, at least one mantissa digit.
pub(crate) fn is_decimal_text(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(pos) => (&unsigned[..pos], Some(&unsigned[pos + 1..])),
        None => (unsigned, None),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty() && frac_part.is_empty() {
        return false;
    }
    if !digits(int_part) || !digits(frac_part) {
        return false;
    }
    match exponent {
        None => true,
        Some(exp) => {
            let exp = exp.strip_prefix(['+', '-']).unwrap_or(exp);
            !exp.is_empty() && digits(exp)
        }
    }
}
