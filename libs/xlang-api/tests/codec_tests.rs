use std::sync::Arc;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use xlang_api::codec::{
    decode_contents, decode_row, decode_schema, encode_contents, encode_row, encode_schema,
    row_from_str, row_to_string, schema_from_str,
};
use xlang_api::{FieldType, Row, Schema, Value, XlangError};

fn profile_schema() -> Schema {
    decode_schema(&json!({
        "name": "STRING",
        "tags": ["STRING"],
        "meta": {"count": "INT32"}
    }))
    .unwrap()
}

fn codec_path(err: XlangError) -> String {
    match err {
        XlangError::Codec { path, .. } => path,
        other => panic!("expected codec error, got {other}"),
    }
}

// ── Schema descriptors ────────────────────────────────────────────

#[test]
fn descriptor_shapes_decode_to_field_types() {
    let schema = profile_schema();
    let fields = schema.fields();
    assert_eq!(fields[0].field_type, FieldType::String);
    assert_eq!(fields[1].field_type, FieldType::array_of(FieldType::String));
    let meta = fields[2].field_type.row_schema().unwrap();
    assert_eq!(meta.field("count").unwrap().field_type, FieldType::Int32);
}

#[test]
fn descriptor_preserves_field_order() {
    let schema = decode_schema(&json!({"z": "INT64", "a": "STRING", "m": "BOOLEAN"})).unwrap();
    let names: Vec<_> = schema.fields().iter().map(|f| f.name.clone()).collect();
    assert_eq!(names, vec!["z", "a", "m"]);
}

#[test]
fn schema_encode_is_inverse_of_decode() {
    let descriptor = json!({
        "id": "INT64",
        "payload": "BYTES",
        "scores": [["DOUBLE"]],
        "owner": {"name": "STRING", "since": "DATETIME"}
    });
    let schema = decode_schema(&descriptor).unwrap();
    assert_eq!(encode_schema(&schema), descriptor);
}

#[test]
fn empty_row_descriptor_is_valid() {
    let schema = decode_schema(&json!({"nested": {}})).unwrap();
    assert!(schema.fields()[0].field_type.row_schema().unwrap().is_empty());
}

#[test]
fn unknown_type_name_reports_field_path() {
    let err = decode_schema(&json!({"meta": {"count": "INTEGER"}})).unwrap_err();
    assert_eq!(codec_path(err), "meta.count");
}

#[test]
fn composite_names_are_not_leaf_descriptors() {
    assert!(decode_schema(&json!({"tags": "ARRAY"})).is_err());
    assert!(decode_schema(&json!({"meta": "ROW"})).is_err());
}

#[test]
fn array_descriptor_needs_exactly_one_element() {
    assert!(decode_schema(&json!({"tags": []})).is_err());
    assert!(decode_schema(&json!({"tags": ["STRING", "INT32"]})).is_err());
}

#[test]
fn array_element_error_is_indexed() {
    let err = decode_schema(&json!({"tags": [7]})).unwrap_err();
    assert_eq!(codec_path(err), "tags[0]");
}

#[test]
fn top_level_descriptor_must_be_object() {
    assert!(decode_schema(&json!("STRING")).is_err());
    assert!(schema_from_str("not json").is_err());
}

// ── Row envelopes ─────────────────────────────────────────────────

#[test]
fn nested_row_round_trips() {
    let schema = Arc::new(profile_schema());
    let meta_schema = schema.field("meta").unwrap().field_type.row_schema().unwrap().clone();
    let meta = Row::new(meta_schema, vec![3.into()]).unwrap();
    let row = Row::new(
        schema,
        vec![
            "alice".into(),
            Value::Array(vec!["x".into(), "y".into()]),
            meta.into(),
        ],
    )
    .unwrap();

    let envelope = encode_row(&row).unwrap();
    assert_eq!(
        envelope["contents"],
        json!({"name": "alice", "tags": ["x", "y"], "meta": {"count": 3}})
    );
    assert_eq!(decode_row(&envelope).unwrap(), row);
}

#[test]
fn absent_nested_entry_decodes_to_null() {
    let envelope = json!({
        "schema": {"name": "STRING", "tags": ["STRING"], "meta": {"count": "INT32"}},
        "contents": {"name": "alice", "tags": ["x", "y"], "meta": {}}
    });
    let row = decode_row(&envelope).unwrap();
    let meta = row.get("meta").unwrap().as_row().unwrap();
    assert_eq!(meta.get("count").unwrap(), &Value::Null);
}

#[test]
fn null_and_absent_entries_are_not_type_checked() {
    let envelope = json!({
        "schema": {"name": "STRING", "age": "INT32"},
        "contents": {"name": null}
    });
    let row = decode_row(&envelope).unwrap();
    assert_eq!(row.values(), &[Value::Null, Value::Null]);
}

#[test]
fn array_of_rows_keeps_missing_members_apart() {
    let envelope = json!({
        "schema": {"people": [{"n": "STRING"}]},
        "contents": {"people": [{"n": "a"}, {"n": null}, {}, null]}
    });
    let row = decode_row(&envelope).unwrap();

    let people_type = &row.schema().field("people").unwrap().field_type;
    let person = decode_schema(&json!({"n": "STRING"})).unwrap();
    assert_eq!(people_type, &FieldType::array_of(FieldType::row_of(person)));

    let people = row.get("people").unwrap().as_array().unwrap();
    assert_eq!(people.len(), 4);
    assert_eq!(people[0].as_row().unwrap().get("n").unwrap(), &Value::from("a"));
    assert_eq!(people[1].as_row().unwrap().get("n").unwrap(), &Value::Null);
    assert_eq!(people[2].as_row().unwrap().get("n").unwrap(), &Value::Null);
    assert_eq!(people[3], Value::Null);

    let encoded = encode_row(&row).unwrap();
    assert_eq!(
        encoded["contents"],
        json!({"people": [{"n": "a"}, {"n": null}, {"n": null}, null]})
    );
    assert_eq!(decode_row(&encoded).unwrap(), row);
    assert_eq!(row_from_str(&row_to_string(&row).unwrap()).unwrap(), row);
}

#[test]
fn array_of_rows_reports_member_path() {
    let envelope = json!({
        "schema": {"people": [{"n": "STRING"}]},
        "contents": {"people": [{"n": "a"}, {"n": 4}]}
    });
    let err = decode_row(&envelope).unwrap_err();
    assert_eq!(codec_path(err), "people[1].n");
}

#[test]
fn extra_content_entries_are_ignored() {
    let schema = Arc::new(decode_schema(&json!({"name": "STRING"})).unwrap());
    let row = decode_contents(schema, &json!({"name": "bob", "unused": 1})).unwrap();
    assert_eq!(row.values().len(), 1);
}

#[test]
fn leaf_mismatch_reports_nested_path() {
    let envelope = json!({
        "schema": {"meta": {"count": "INT32"}},
        "contents": {"meta": {"count": "three"}}
    });
    let err = decode_row(&envelope).unwrap_err();
    assert_eq!(codec_path(err), "meta.count");
}

#[test]
fn array_item_mismatch_reports_index() {
    let envelope = json!({
        "schema": {"tags": ["STRING"]},
        "contents": {"tags": ["x", 2]}
    });
    let err = decode_row(&envelope).unwrap_err();
    assert_eq!(codec_path(err), "tags[1]");
}

#[test]
fn envelope_requires_schema_and_contents() {
    let err = decode_row(&json!({"contents": {}})).unwrap_err();
    assert_eq!(codec_path(err), "schema");
    let err = decode_row(&json!({"schema": {}})).unwrap_err();
    assert_eq!(codec_path(err), "contents");
}

#[test]
fn narrow_integers_are_range_checked() {
    let envelope = json!({"schema": {"b": "BYTE"}, "contents": {"b": 300}});
    assert!(decode_row(&envelope).is_err());
    let envelope = json!({"schema": {"b": "BYTE"}, "contents": {"b": -12}});
    assert_eq!(decode_row(&envelope).unwrap().values(), &[Value::Byte(-12)]);
}

// ── Leaf wire forms ───────────────────────────────────────────────

#[test]
fn bytes_travel_as_base64() {
    let schema = Arc::new(decode_schema(&json!({"payload": "BYTES"})).unwrap());
    let row = Row::new(schema.clone(), vec![Value::Bytes(vec![0, 1, 254, 255])]).unwrap();
    let contents = encode_contents(&row).unwrap();
    assert_eq!(contents, json!({"payload": "AAH+/w=="}));
    assert_eq!(decode_contents(schema, &contents).unwrap(), row);
}

#[test]
fn datetime_travels_as_rfc3339_utc() {
    let ts = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
    let schema = Arc::new(decode_schema(&json!({"at": "DATETIME"})).unwrap());
    let row = Row::new(schema.clone(), vec![Value::DateTime(ts)]).unwrap();
    let contents = encode_contents(&row).unwrap();
    assert_eq!(contents, json!({"at": "2024-03-01T10:00:00Z"}));

    let from_millis = decode_contents(schema, &json!({"at": ts.timestamp_millis()})).unwrap();
    assert_eq!(from_millis, row);
}

#[test]
fn datetime_keeps_nanoseconds_at_the_last_rfc3339_year() {
    let ts = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap()
        + chrono::TimeDelta::nanoseconds(999_999_999);
    let schema = Arc::new(decode_schema(&json!({"at": "DATETIME"})).unwrap());
    let row = Row::new(schema, vec![Value::DateTime(ts)]).unwrap();
    let text = row_to_string(&row).unwrap();
    assert!(text.contains("9999-12-31T23:59:59.999999999Z"));
    assert_eq!(row_from_str(&text).unwrap(), row);
}

#[test]
fn datetime_beyond_year_9999_is_not_a_row_value() {
    let ts = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
    let schema = Arc::new(decode_schema(&json!({"at": "DATETIME"})).unwrap());
    let err = Row::new(schema.clone(), vec![Value::DateTime(ts)]).unwrap_err();
    assert!(matches!(err, XlangError::ValueTypeMismatch { ref field, .. } if field == "at"));

    let err = decode_contents(schema, &json!({"at": ts.timestamp_millis()})).unwrap_err();
    assert_eq!(codec_path(err), "at");
}

#[test]
fn decimal_decodes_from_text_or_number() {
    let schema = Arc::new(decode_schema(&json!({"price": "DECIMAL"})).unwrap());
    let from_text = decode_contents(schema.clone(), &json!({"price": "19.99"})).unwrap();
    assert_eq!(from_text.values(), &[Value::Decimal("19.99".into())]);

    let from_number = decode_contents(schema.clone(), &json!({"price": 5})).unwrap();
    assert_eq!(from_number.values(), &[Value::Decimal("5".into())]);

    assert!(decode_contents(schema, &json!({"price": "cheap"})).is_err());
}

#[test]
fn non_finite_floats_cannot_be_encoded() {
    let schema = Arc::new(decode_schema(&json!({"ratio": "DOUBLE"})).unwrap());
    let row = Row::new(schema, vec![Value::Double(f64::NAN)]).unwrap();
    let err = encode_contents(&row).unwrap_err();
    assert_eq!(codec_path(err), "ratio");
}

#[test]
fn float_out_of_range_is_rejected() {
    let schema = Arc::new(decode_schema(&json!({"f": "FLOAT"})).unwrap());
    assert!(decode_contents(schema, &json!({"f": 1e300})).is_err());
}

#[test]
fn string_round_trip() {
    let schema = Arc::new(decode_schema(&json!({"ok": "BOOLEAN", "n": "INT64"})).unwrap());
    let row = Row::new(schema, vec![true.into(), 9_007_199_254_740_993_i64.into()]).unwrap();
    let text = row_to_string(&row).unwrap();
    assert_eq!(row_from_str(&text).unwrap(), row);
}

#[test]
fn doubles_survive_the_text_form_exactly() {
    let schema = Arc::new(decode_schema(&json!({"d": "DOUBLE", "f": "FLOAT"})).unwrap());
    let pairs = [
        (1.0715660391465826e-75, 0.1_f32),
        (0.1 + 0.2, f32::MIN_POSITIVE),
        (f64::MIN_POSITIVE, f32::MAX),
        (5e-324, -1.0e-44_f32),
        (f64::MAX, 16_777_216.0_f32),
        (-2.2250738585072014e-308, 1.0e-7_f32),
    ];
    for (d, f) in pairs {
        let row = Row::new(schema.clone(), vec![Value::Double(d), Value::Float(f)]).unwrap();
        let decoded = row_from_str(&row_to_string(&row).unwrap()).unwrap();
        assert_eq!(decoded.values(), row.values(), "{d:e} / {f:e}");
    }
}
