//! Wire codec: [`Schema`] ↔ type descriptor, [`Row`] ↔ row envelope.
//!
//! Schema descriptor grammar (decoded by JSON shape, no discriminator):
//! - `"INT32"`: a leaf type name
//! - `["STRING"]`: ARRAY of the single element's type
//! - `{"count": "INT32"}`: ROW with that nested schema
//!
//! Row envelope: `{"schema": <descriptor>, "contents": {<field>: <value>}}`.
//! A missing or `null` content entry decodes to [`Value::Null`].

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value as Json};

use crate::error::{Result, XlangError};
use crate::schema::{FieldType, Schema, SchemaField, TypeName};
use crate::value::{Row, Value, is_decimal_text, is_rfc3339_datetime};

const SCHEMA_KEY: &str = "schema";
const CONTENTS_KEY: &str = "contents";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

pub fn encode_schema(schema: &Schema) -> Json {
    let mut map = Map::with_capacity(schema.len());
    for field in schema.fields() {
        map.insert(field.name.clone(), encode_field_type(&field.field_type));
    }
    Json::Object(map)
}

fn encode_field_type(ty: &FieldType) -> Json {
    match ty {
        FieldType::Row(schema) => encode_schema(schema),
        FieldType::Array(element) => Json::Array(vec![encode_field_type(element)]),
        leaf => Json::String(leaf.type_name().as_str().to_string()),
    }
}

pub fn decode_schema(json: &Json) -> Result<Schema> {
    let map = json
        .as_object()
        .ok_or_else(|| XlangError::codec("", format!("schema must be an object, found {}", kind(json))))?;

    let mut fields = Vec::with_capacity(map.len());
    for (name, descriptor) in map {
        let field_type = decode_field_type(descriptor).map_err(|e| e.with_context(name))?;
        fields.push(SchemaField::new(name.clone(), field_type));
    }
    Schema::new(fields)
}

fn decode_field_type(json: &Json) -> Result<FieldType> {
    match json {
        Json::String(name) => {
            let type_name: TypeName = name.parse()?;
            FieldType::primitive(type_name).ok_or_else(|| {
                XlangError::codec(
                    "",
                    format!("{type_name} must be written as a nested descriptor, not a name"),
                )
            })
        }
        Json::Array(items) => match items.as_slice() {
            [element] => {
                let element = decode_field_type(element).map_err(|e| e.with_context("[0]"))?;
                Ok(FieldType::array_of(element))
            }
            _ => Err(XlangError::codec(
                "",
                format!("array descriptor must have exactly one element, found {}", items.len()),
            )),
        },
        Json::Object(_) => Ok(FieldType::row_of(decode_schema(json)?)),
        other => Err(XlangError::codec(
            "",
            format!("expected type descriptor, found {}", kind(other)),
        )),
    }
}

pub fn schema_to_string(schema: &Schema) -> String {
    encode_schema(schema).to_string()
}

pub fn schema_from_str(s: &str) -> Result<Schema> {
    let json: Json = serde_json::from_str(s)?;
    decode_schema(&json)
}

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// Encode a row as a full envelope (schema + contents).
pub fn encode_row(row: &Row) -> Result<Json> {
    let mut envelope = Map::with_capacity(2);
    envelope.insert(SCHEMA_KEY.to_string(), encode_schema(row.schema()));
    envelope.insert(CONTENTS_KEY.to_string(), encode_contents(row)?);
    Ok(Json::Object(envelope))
}

/// Encode only the `contents` mapping of a row.
pub fn encode_contents(row: &Row) -> Result<Json> {
    let mut map = Map::with_capacity(row.values().len());
    for (field, value) in row.schema().fields().iter().zip(row.values()) {
        let json = encode_value(&field.field_type, value).map_err(|e| e.with_context(&field.name))?;
        map.insert(field.name.clone(), json);
    }
    Ok(Json::Object(map))
}

fn encode_value(ty: &FieldType, value: &Value) -> Result<Json> {
    let json = match (ty, value) {
        (_, Value::Null) => Json::Null,
        (FieldType::String, Value::String(s)) => Json::String(s.clone()),
        (FieldType::Byte, Value::Byte(v)) => Json::from(*v),
        (FieldType::Bytes, Value::Bytes(bytes)) => Json::String(BASE64.encode(bytes)),
        (FieldType::Int16, Value::Int16(v)) => Json::from(*v),
        (FieldType::Int32, Value::Int32(v)) => Json::from(*v),
        (FieldType::Int64, Value::Int64(v)) => Json::from(*v),
        (FieldType::Float, Value::Float(v)) => finite(f64::from(*v), TypeName::Float)?,
        (FieldType::Double, Value::Double(v)) => finite(*v, TypeName::Double)?,
        (FieldType::Decimal, Value::Decimal(text)) => Json::String(text.clone()),
        (FieldType::Boolean, Value::Boolean(b)) => Json::Bool(*b),
        (FieldType::DateTime, Value::DateTime(ts)) => {
            Json::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
        (FieldType::Row(_), Value::Row(row)) => encode_contents(row)?,
        (FieldType::Array(element), Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(encode_value(element, item).map_err(|e| e.with_context(format!("[{i}]")))?);
            }
            Json::Array(out)
        }
        (ty, _) => {
            return Err(XlangError::codec("", format!("value does not match declared type {ty}")));
        }
    };
    Ok(json)
}

fn finite(v: f64, type_name: TypeName) -> Result<Json> {
    Number::from_f64(v)
        .map(Json::Number)
        .ok_or_else(|| XlangError::codec("", format!("non-finite {type_name} cannot be encoded")))
}

/// Decode a full row envelope.
pub fn decode_row(json: &Json) -> Result<Row> {
    let envelope = json.as_object().ok_or_else(|| {
        XlangError::codec("", format!("row envelope must be an object, found {}", kind(json)))
    })?;
    let schema = envelope
        .get(SCHEMA_KEY)
        .ok_or_else(|| XlangError::codec(SCHEMA_KEY, "missing from row envelope"))?;
    let contents = envelope
        .get(CONTENTS_KEY)
        .ok_or_else(|| XlangError::codec(CONTENTS_KEY, "missing from row envelope"))?;

    let schema = Arc::new(decode_schema(schema)?);
    decode_contents(schema, contents)
}

/// Decode a `contents` mapping against an already-known schema.
///
/// Walks schema fields in order; entries not named by the schema are ignored.
pub fn decode_contents(schema: Arc<Schema>, json: &Json) -> Result<Row> {
    let map = json.as_object().ok_or_else(|| {
        XlangError::codec("", format!("row contents must be an object, found {}", kind(json)))
    })?;

    let mut values = Vec::with_capacity(schema.len());
    for field in schema.fields() {
        let value = match map.get(&field.name) {
            None => Value::Null,
            Some(json) => {
                decode_value(&field.field_type, json).map_err(|e| e.with_context(&field.name))?
            }
        };
        values.push(value);
    }
    Row::new(schema, values)
}

fn decode_value(ty: &FieldType, json: &Json) -> Result<Value> {
    if json.is_null() {
        return Ok(Value::Null);
    }
    let mismatch = || XlangError::codec("", format!("expected {}, found {}", ty.type_name(), kind(json)));

    let value = match ty {
        FieldType::String => Value::String(json.as_str().ok_or_else(mismatch)?.to_string()),
        FieldType::Byte => Value::Byte(integer(json, mismatch)?),
        FieldType::Int16 => Value::Int16(integer(json, mismatch)?),
        FieldType::Int32 => Value::Int32(integer(json, mismatch)?),
        FieldType::Int64 => Value::Int64(json.as_i64().ok_or_else(mismatch)?),
        FieldType::Bytes => {
            let text = json.as_str().ok_or_else(mismatch)?;
            let bytes = BASE64
                .decode(text)
                .map_err(|e| XlangError::codec("", format!("invalid base64: {e}")))?;
            Value::Bytes(bytes)
        }
        FieldType::Float => {
            let v = json.as_f64().ok_or_else(mismatch)?;
            let narrowed = v as f32;
            if !narrowed.is_finite() {
                return Err(XlangError::codec("", format!("{v} is out of FLOAT range")));
            }
            Value::Float(narrowed)
        }
        FieldType::Double => Value::Double(json.as_f64().ok_or_else(mismatch)?),
        FieldType::Decimal => {
            let text = match json {
                Json::String(s) => s.clone(),
                Json::Number(n) => n.to_string(),
                _ => return Err(mismatch()),
            };
            if !is_decimal_text(&text) {
                return Err(XlangError::codec("", format!("'{text}' is not a decimal")));
            }
            Value::Decimal(text)
        }
        FieldType::Boolean => Value::Boolean(json.as_bool().ok_or_else(mismatch)?),
        FieldType::DateTime => {
            let ts = decode_datetime(json).ok_or_else(mismatch)?;
            if !is_rfc3339_datetime(&ts) {
                return Err(XlangError::codec("", format!("{ts} is outside years 0000-9999")));
            }
            Value::DateTime(ts)
        }
        FieldType::Row(schema) => Value::Row(decode_contents(schema.clone(), json)?),
        FieldType::Array(element) => {
            let items = json.as_array().ok_or_else(mismatch)?;
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(decode_value(element, item).map_err(|e| e.with_context(format!("[{i}]")))?);
            }
            Value::Array(out)
        }
    };
    Ok(value)
}

/// Narrow a JSON integer into a smaller integer type.
fn integer<T: TryFrom<i64>>(json: &Json, mismatch: impl Fn() -> XlangError) -> Result<T> {
    let wide = json.as_i64().ok_or_else(&mismatch)?;
    T::try_from(wide).map_err(|_| XlangError::codec("", format!("{wide} is out of range")))
}

/// RFC 3339 text, or integer epoch milliseconds.
fn decode_datetime(json: &Json) -> Option<DateTime<Utc>> {
    match json {
        Json::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        Json::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

fn kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

pub fn row_to_string(row: &Row) -> Result<String> {
    Ok(encode_row(row)?.to_string())
}

pub fn row_from_str(s: &str) -> Result<Row> {
    let json: Json = serde_json::from_str(s)?;
    decode_row(&json)
}
