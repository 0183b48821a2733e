mod common;

use common::blog_client;
use pretty_assertions::assert_eq;
use restless::{
    AttrOptions, AttrType, MapOptions, Schema, SerializeOptions, Transform, Value,
};
use serde_json::json;
use std::rc::Rc;

#[test]
fn test_serialize_wraps_resource_key_and_snake_cases() {
    let fixture = blog_client();
    let post = fixture.client.resolve("post").expect("post registered");

    let record = post
        .load(&json!({"post": {
            "id": 1,
            "title": "hello",
            "created_at": "2024-03-01T12:00:00+00:00"
        }}))
        .expect("load");

    let serialized = record.serialize(&SerializeOptions::new()).expect("serialize");
    assert_eq!(
        serialized,
        json!({"post": {
            "id": 1.0,
            "slug": null,
            "title": "hello",
            "body": null,
            "created_at": "2024-03-01T12:00:00+00:00"
        }})
    );
}

#[test]
fn test_multi_word_resource_key() {
    let fixture = blog_client();
    let group = fixture
        .client
        .register("PostGroup", Schema::new().attr("featured", AttrType::Boolean));

    assert_eq!(group.resource_name(), "post_group");
    assert_eq!(group.resource_name_plural(), "post_groups");

    let record = group
        .load(&json!({"post_group": {"id": 1, "featured": true}}))
        .expect("load");
    assert_eq!(record.get("featured").as_bool(), Some(true));

    let serialized = record.serialize(&SerializeOptions::new()).expect("serialize");
    assert_eq!(serialized, json!({"post_group": {"id": 1.0, "featured": true}}));
}

#[test]
fn test_bare_payload_accepted() {
    let fixture = blog_client();
    let post = fixture.client.resolve("post").expect("post registered");

    let record = post
        .load(&json!({"id": 2, "title": "bare"}))
        .expect("load");
    assert_eq!(record.get("title").as_str(), Some("bare"));
}

#[test]
fn test_bare_payload_with_field_named_like_resource_key() {
    let fixture = blog_client();
    let item = fixture.client.register(
        "entry",
        Schema::new()
            .attr("entry", AttrType::String)
            .attr("note", AttrType::String),
    );

    // Two keys, so this is a bare inner object even though one field is
    // named like the resource.
    let record = item
        .load(&json!({"entry": "the text", "note": "aside"}))
        .expect("load");
    assert_eq!(record.get("entry").as_str(), Some("the text"));
    assert_eq!(record.get("note").as_str(), Some("aside"));
}

#[test]
fn test_read_only_attribute_excluded_from_output() {
    let fixture = blog_client();
    let account = fixture.client.register(
        "account",
        Schema::new()
            .attr("name", AttrType::String)
            .attr_with(
                "balance",
                Some(AttrType::Number),
                AttrOptions::new().read_only(),
            ),
    );

    let record = account
        .load(&json!({"account": {"id": 1, "name": "main", "balance": 42.0}}))
        .expect("load");

    // Read-only fields deserialize normally...
    assert_eq!(record.get("balance").as_f64(), Some(42.0));

    // ...but never serialize.
    let serialized = record.serialize(&SerializeOptions::new()).expect("serialize");
    assert_eq!(serialized, json!({"account": {"id": 1.0, "name": "main"}}));
}

#[test]
fn test_null_belongs_to_serializes_as_null() {
    let fixture = blog_client();
    let comment = fixture.client.resolve("comment").expect("comment registered");

    let record = comment
        .load(&json!({"comment": {"id": 1, "body": "first", "author": null}}))
        .expect("load");
    assert!(record.belongs_to("author").expect("author").is_none());

    let serialized = record
        .serialize(&SerializeOptions::with_relationships())
        .expect("serialize");
    assert_eq!(
        serialized,
        json!({"comment": {"id": 1.0, "body": "first", "author": null}})
    );
}

#[test]
fn test_serialize_with_relationships_nests_inner_objects() {
    let fixture = blog_client();
    let comment = fixture.client.resolve("comment").expect("comment registered");

    let record = comment
        .load(&json!({"comment": {
            "id": 1,
            "body": "first",
            "author": {"id": 7, "name": "alice", "role": "admin"}
        }}))
        .expect("load");

    let serialized = record
        .serialize(&SerializeOptions::with_relationships())
        .expect("serialize");
    assert_eq!(
        serialized,
        json!({"comment": {
            "id": 1.0,
            "body": "first",
            "author": {"id": 7.0, "name": "alice", "role": "admin"}
        }})
    );
}

#[test]
fn test_configured_key_rename_is_symmetric() {
    let fixture = blog_client();
    fixture
        .client
        .map("post", MapOptions::new().key("title", "headline"));
    let post = fixture.client.resolve("post").expect("post registered");

    let record = post
        .load(&json!({"post": {"id": 1, "headline": "renamed"}}))
        .expect("load");
    assert_eq!(record.get("title").as_str(), Some("renamed"));

    let serialized = record.serialize(&SerializeOptions::new()).expect("serialize");
    let inner = serialized.get("post").expect("wrapped");
    assert_eq!(inner.get("headline"), Some(&json!("renamed")));
    assert_eq!(inner.get("title"), None);
}

#[test]
fn test_custom_primary_key() {
    let fixture = blog_client();
    fixture
        .client
        .map("book", MapOptions::new().primary_key("isbn"));
    let book = fixture.client.register(
        "book",
        Schema::new()
            .attr("isbn", AttrType::String)
            .attr("title", AttrType::String),
    );

    let record = book.create();
    assert!(record.is_new());
    record.set("isbn", "978-0000000000").expect("set isbn");
    assert!(!record.is_new());
    assert_eq!(
        record.primary_key_value(),
        Value::String("978-0000000000".to_string())
    );
}

#[test]
fn test_plural_override_used_for_collections() {
    let fixture = blog_client();
    fixture.client.configure_plurals(&[("person", "people")]);
    let person = fixture.client.resolve("person").expect("person registered");

    assert_eq!(person.resource_name_plural(), "people");

    let collection = person
        .load_many(&json!({"people": [
            {"id": 1, "name": "alice"},
            {"id": 2, "name": "bob"}
        ]}))
        .expect("load_many");
    assert_eq!(collection.len(), 2);
    assert!(collection.is_loaded());
}

#[test]
fn test_transform_failure_degrades_single_field() {
    let fixture = blog_client();
    let post = fixture.client.resolve("post").expect("post registered");

    let record = post
        .load(&json!({"post": {
            "id": 1,
            "title": "hello",
            "created_at": "not a timestamp"
        }}))
        .expect("load still succeeds");

    assert_eq!(record.get("title").as_str(), Some("hello"));
    assert!(record.get("createdAt").is_null());
}

#[test]
fn test_date_attribute_round_trips_rfc3339() {
    let fixture = blog_client();
    let post = fixture.client.resolve("post").expect("post registered");

    let record = post
        .load(&json!({"post": {"id": 1, "created_at": "2024-03-01T12:30:00+02:00"}}))
        .expect("load");

    let value = record.get("createdAt");
    let date = value.as_date().expect("parsed date");
    assert_eq!(date.to_rfc3339(), "2024-03-01T12:30:00+02:00");

    let serialized = record.serialize_property("createdAt").expect("serialize");
    assert_eq!(serialized, json!("2024-03-01T12:30:00+02:00"));
}

#[test]
fn test_unknown_keys_are_ignored() {
    let fixture = blog_client();
    let post = fixture.client.resolve("post").expect("post registered");

    let record = post
        .load(&json!({"post": {
            "id": 1,
            "title": "hello",
            "not_a_field": "ignored"
        }}))
        .expect("load");
    assert_eq!(record.get("title").as_str(), Some("hello"));
    assert!(record.get("notAField").is_null());
}

#[test]
fn test_deserialize_property_follows_live_dirty_rules() {
    let fixture = blog_client();
    let post = fixture.client.resolve("post").expect("post registered");

    let record = post
        .load(&json!({"post": {"id": 1, "title": "hello"}}))
        .expect("load");
    assert!(!record.is_dirty());

    record
        .deserialize_property("title", &json!("patched"))
        .expect("deserialize_property");
    assert_eq!(record.get("title").as_str(), Some("patched"));
    assert!(record.is_dirty(), "a live partial update is a normal write");
}

#[test]
fn test_malformed_envelope_is_ignored() {
    let fixture = blog_client();
    let post = fixture.client.resolve("post").expect("post registered");

    let record = post
        .load(&json!({"post": {"id": 1, "title": "hello"}}))
        .expect("load");

    // A non-object payload is a no-op: state and values stay untouched.
    record
        .deserialize(&json!("garbage"))
        .expect("lenient on malformed payloads");
    assert_eq!(record.get("title").as_str(), Some("hello"));
    assert!(record.is_loaded());
    assert!(!record.is_dirty());

    let collection = post
        .load_many(&json!([{"id": 1, "title": "hello"}]))
        .expect("load_many");
    collection
        .deserialize_many(&fixture.client, "post", &json!({"a": 1, "b": 2}))
        .expect("lenient on malformed payloads");
    assert_eq!(collection.len(), 1);
}

#[test]
fn test_custom_transform_replaces_default() {
    struct ShoutingTransform;

    impl Transform for ShoutingTransform {
        fn serialize(&self, value: &Value) -> serde_json::Value {
            match value {
                Value::String(s) => serde_json::Value::String(s.to_uppercase()),
                _ => serde_json::Value::Null,
            }
        }

        fn deserialize(&self, raw: &serde_json::Value) -> Option<Value> {
            raw.as_str().map(|s| Value::String(s.to_lowercase()))
        }
    }

    let fixture = blog_client();
    fixture
        .client
        .register_transform(AttrType::String, Rc::new(ShoutingTransform));
    let post = fixture.client.resolve("post").expect("post registered");

    let record = post
        .load(&json!({"post": {"id": 1, "title": "HELLO"}}))
        .expect("load");
    assert_eq!(record.get("title").as_str(), Some("hello"));

    let serialized = record.serialize_property("title").expect("serialize");
    assert_eq!(serialized, json!("HELLO"));
}

#[test]
fn test_untyped_attribute_passes_structure_through() {
    let fixture = blog_client();
    let widget = fixture.client.register(
        "widget",
        Schema::new()
            .attr("name", AttrType::String)
            .attr_untyped("settings"),
    );

    let payload = json!({"widget": {
        "id": 1,
        "name": "dial",
        "settings": {"min": 0, "max": 10}
    }});
    let record = widget.load(&payload).expect("load");
    assert_eq!(
        record.get("settings"),
        Value::Raw(json!({"min": 0, "max": 10}))
    );

    let serialized = record.serialize_property("settings").expect("serialize");
    assert_eq!(serialized, json!({"min": 0, "max": 10}));
}
