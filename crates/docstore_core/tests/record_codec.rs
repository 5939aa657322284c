use docstore_core::codec::record::{
    decode, encode, flatten, unflatten, EncodeError, ModelKind, ParseError, RecordMode, Records,
    StoreRecord,
};
use serde_json::{json, Map, Value};

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
}

fn no_default() -> Value {
    panic!("default id must not be requested")
}

#[test]
fn flatten_lifts_fields_next_to_id_and_model() {
    let record = StoreRecord::new(
        ModelKind::Folder,
        "f1",
        fields(json!({"name": "a", "parent": null})),
    );
    let flat = flatten(&record).unwrap();
    assert_eq!(
        Value::Object(flat),
        json!({"id": "f1", "model": "docstore.folder", "name": "a", "parent": null})
    );
}

#[test]
fn round_trip_preserves_a_native_field_named_fields() {
    let record = StoreRecord::new(
        ModelKind::Document,
        "d1",
        fields(json!({"name": "x", "fields": {"nested": [1, 2]}})),
    );

    let flat = flatten(&record).unwrap();
    assert_eq!(flat["fields"], json!({"nested": [1, 2]}));

    let back = unflatten(flat, no_default).unwrap();
    assert_eq!(back, record);
}

#[test]
fn reserved_native_field_names_are_rejected() {
    for reserved in ["id", "model"] {
        let mut native = Map::new();
        native.insert(reserved.to_string(), json!("clash"));
        let record = StoreRecord::new(ModelKind::Topic, "t1", native);

        assert_eq!(
            flatten(&record).unwrap_err(),
            EncodeError::ReservedField {
                model: "docstore.topic".to_string(),
                field: reserved.to_string(),
            }
        );
    }
}

#[test]
fn encode_many_emits_an_array_and_single_an_object() {
    let record = StoreRecord::new(ModelKind::Topic, "t1", fields(json!({"short_desc": "s"})));

    let many = encode(&Records::Many(vec![record.clone()])).unwrap();
    assert_eq!(many.as_array().map(Vec::len), Some(1));

    let single = encode(&Records::Single(record)).unwrap();
    assert_eq!(single["id"], "t1");
}

#[test]
fn decode_many_round_trips_encoded_records() {
    let records = vec![
        StoreRecord::new(ModelKind::Topic, "t1", fields(json!({"short_desc": "s"}))),
        StoreRecord::new(ModelKind::Folder, "f1", fields(json!({"name": "a"}))),
    ];
    let text = encode(&Records::Many(records.clone())).unwrap().to_string();

    let decoded = decode(&text, RecordMode::Many, no_default).unwrap();
    assert_eq!(decoded, Records::Many(records));
}

#[test]
fn missing_id_takes_the_supplied_default() {
    let mut issued = 0;
    let decoded = decode(
        r#"[{"model": "docstore.topic"}, {"model": "docstore.topic", "id": null}]"#,
        RecordMode::Many,
        || {
            issued += 1;
            json!(format!("generated-{issued}"))
        },
    )
    .unwrap()
    .into_vec();

    assert_eq!(decoded[0].pk, json!("generated-1"));
    assert_eq!(decoded[1].pk, json!("generated-2"));
    assert!(decoded.iter().all(|record| !record.pk.is_null()));
}

#[test]
fn single_object_in_many_mode_is_expected_array() {
    let err = decode(r#"{"model": "docstore.topic"}"#, RecordMode::Many, no_default).unwrap_err();
    assert_eq!(err, ParseError::ExpectedArray);
}

#[test]
fn array_in_single_mode_is_expected_object() {
    let err = decode("[]", RecordMode::Single, no_default).unwrap_err();
    assert_eq!(err, ParseError::ExpectedObject);
}

#[test]
fn per_record_failures_carry_their_index() {
    let err = decode(
        r#"[{"model": "docstore.topic", "id": 1}, 7]"#,
        RecordMode::Many,
        no_default,
    )
    .unwrap_err();
    assert_eq!(err, ParseError::NotAnObject { index: 1 });

    let err = decode(r#"[{"id": 1}]"#, RecordMode::Many, no_default).unwrap_err();
    assert_eq!(err, ParseError::MissingModel { index: 0 });

    let err = decode(
        r#"[{"model": "docstore.topic", "id": 1}, {"model": 3, "id": 2}]"#,
        RecordMode::Many,
        no_default,
    )
    .unwrap_err();
    assert_eq!(err, ParseError::InvalidModel { index: 1 });
}

#[test]
fn malformed_text_is_invalid_json() {
    let err = decode("[{", RecordMode::Many, no_default).unwrap_err();
    assert!(matches!(err, ParseError::InvalidJson(_)));
}
