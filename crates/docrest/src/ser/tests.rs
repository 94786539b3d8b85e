use crate::{
    document::Document,
    ser::{Field, Serializer},
    test_fixtures::Blog,
    value::DocValue,
};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use serde_json::json;
use ulid::Ulid;

fn flat_serializer() -> Serializer {
    Serializer::builder("flat")
        .field("title", Field::text())
        .field("count", Field::int())
        .field("ratio", Field::float())
        .field("flag", Field::boolean())
        .build()
}

#[test]
fn serialize_omits_writeonly_and_nulls_absent_fields() {
    let ser = Blog::comment_serializer();
    let doc = Document::from_fields(vec![
        ("id", DocValue::Id(Ulid::new())),
        ("text", DocValue::Text("hello".to_string())),
        ("email", DocValue::Text("a@b.c".to_string())),
    ]);

    let wire = ser.serialize(&doc).expect("serialize");
    let object = wire.as_object().expect("object");
    assert!(!object.contains_key("email"));
    assert_eq!(object["text"], json!("hello"));
    assert_eq!(object["date"], serde_json::Value::Null);
}

#[test]
fn serialized_keys_follow_declaration_order() {
    let ser = Blog::comment_serializer();
    let wire = ser.serialize(&Document::new()).expect("serialize");
    let keys: Vec<&String> = wire.as_object().expect("object").keys().collect();
    assert_eq!(keys, ["id", "text", "date", "upvotes"]);
}

#[test]
fn deserialize_drops_readonly_unless_allowed() {
    let ser = Blog::comment_serializer();
    let id = Ulid::new();
    let wire = json!({"id": id.to_string(), "text": "hi"});

    let doc = ser.deserialize(&wire, false).expect("deserialize");
    assert_eq!(doc.get("id"), None);

    let doc = ser.deserialize(&wire, true).expect("deserialize");
    assert_eq!(doc.get("id"), Some(&DocValue::Id(id)));
}

#[test]
fn deserialize_accepts_writeonly_input() {
    let ser = Blog::comment_serializer();
    let wire = json!({"text": "hi", "email": "a@b.c"});
    let doc = ser.deserialize(&wire, false).expect("deserialize");
    assert_eq!(doc.get("email"), Some(&DocValue::Text("a@b.c".to_string())));
}

#[test]
fn unknown_key_is_an_error() {
    let ser = flat_serializer();
    let err = ser
        .deserialize(&json!({"bogus": 1}), false)
        .expect_err("unknown field");
    assert_eq!(err.to_string(), "unknown field 'bogus'");
}

#[test]
fn non_object_payload_is_rejected() {
    let ser = flat_serializer();
    let err = ser.deserialize(&json!([1, 2]), false).expect_err("array");
    assert_eq!(
        err.to_string(),
        "value supplied to 'flat' is of type 'Array' but should be of type 'Object'"
    );
}

#[test]
fn wrong_wire_type_names_both_types() {
    let ser = flat_serializer();
    let err = ser
        .deserialize(&json!({"title": 7}), false)
        .expect_err("type mismatch");
    assert_eq!(
        err.to_string(),
        "value for field 'title' is of type 'Number' but should be of type 'String'"
    );
}

#[test]
fn int_accepts_whole_numbers_only() {
    let ser = flat_serializer();
    let err = ser
        .deserialize(&json!({"count": 1.5}), false)
        .expect_err("fractional int");
    assert!(err.to_string().contains("integer"));

    // The reverse cast is allowed: a whole number fills a float field.
    let doc = ser
        .deserialize(&json!({"ratio": 3}), false)
        .expect("int into float");
    assert_eq!(doc.get("ratio"), Some(&DocValue::Float(3.0)));
}

#[test]
fn datetime_parses_rfc3339_and_bare_iso() {
    let field = Blog::article_serializer();
    let wire = json!({"publish_date": "2020-05-01T12:30:00Z"});
    let doc = field.deserialize(&wire, false).expect("rfc3339");
    let expected = Utc.with_ymd_and_hms(2020, 5, 1, 12, 30, 0).unwrap();
    assert_eq!(doc.get("publish_date"), Some(&DocValue::DateTime(expected)));

    let wire = json!({"publish_date": "2020-05-01T12:30:00.5"});
    let doc = field.deserialize(&wire, false).expect("bare iso");
    assert!(matches!(doc.get("publish_date"), Some(DocValue::DateTime(_))));

    let err = field
        .deserialize(&json!({"publish_date": "yesterday"}), false)
        .expect_err("unparseable");
    assert!(err.to_string().contains("ISO 8601"));
}

#[test]
fn nested_errors_carry_the_parent_chain() {
    let ser = Blog::article_serializer();
    let wire = json!({"comments": [{"bogus": 1}]});
    let err = ser.deserialize(&wire, false).expect_err("nested unknown");
    assert_eq!(err.to_string(), "unknown field 'bogus' in 'comments'");

    let wire = json!({"comments": [{"upvotes": [{"name": 5}]}]});
    let err = ser.deserialize(&wire, false).expect_err("deep mismatch");
    assert_eq!(
        err.to_string(),
        "value for field 'name' is of type 'Number' but should be of type 'String' \
         in 'upvotes' in 'comments'"
    );
}

#[test]
fn null_list_elements_are_dropped() {
    let ser = Blog::article_serializer();
    let wire = json!({"tags": ["a", null, "b"]});
    let doc = ser.deserialize(&wire, false).expect("deserialize");
    assert_eq!(
        doc.get("tags"),
        Some(&DocValue::List(vec![
            DocValue::Text("a".to_string()),
            DocValue::Text("b".to_string()),
        ]))
    );
}

#[test]
fn deserialize_text_parses_url_values() {
    let ser = Blog::article_serializer();
    let field = ser.get("publish").expect("field");
    assert_eq!(field.deserialize_text("true"), Ok(DocValue::Bool(true)));
    assert_eq!(field.deserialize_text("0"), Ok(DocValue::Bool(false)));
    assert!(field.deserialize_text("maybe").is_err());

    let id_field = Blog::comment_serializer();
    let id_field = id_field.identifier().expect("identifier");
    assert!(id_field.deserialize_text("not-a-ulid").is_err());
}

proptest! {
    // Round trip: every non-readonly, non-writeonly value survives
    // serialize → deserialize unchanged.
    #[test]
    fn round_trip_preserves_plain_fields(
        title in "[a-zA-Z0-9 ]{0,32}",
        count in any::<i64>(),
        ratio in -1.0e9_f64..1.0e9,
        flag in any::<bool>(),
    ) {
        let ser = flat_serializer();
        let doc = Document::from_fields(vec![
            ("title", DocValue::Text(title)),
            ("count", DocValue::Int(count)),
            ("ratio", DocValue::Float(ratio)),
            ("flag", DocValue::Bool(flag)),
        ]);

        let wire = ser.serialize(&doc).expect("serialize");
        let back = ser.deserialize(&wire, false).expect("deserialize");
        prop_assert_eq!(back, doc);
    }
}
