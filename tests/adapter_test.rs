mod common;

use common::blog_client;
use restless::{Error, FindResult, RecordEvent};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

#[tokio::test]
async fn test_find_by_key_returns_loaded_record() {
    let fixture = blog_client();
    let post = fixture.client.resolve("post").expect("post registered");

    fixture
        .mock
        .expect_find_by_key()
        .return_payload(json!({"post": {"id": 1, "title": "hello"}}));

    let record = post.find_by_key(json!(1), None).await.expect("find_by_key");
    assert!(record.is_loaded());
    assert!(!record.is_dirty());
    assert_eq!(record.get("title").as_str(), Some("hello"));
    fixture.mock.verify();
}

#[tokio::test]
async fn test_find_dispatch() {
    let fixture = blog_client();
    let post = fixture.client.resolve("post").expect("post registered");

    // No params -> find_all
    fixture
        .mock
        .expect_find_all()
        .return_payload(json!([{"id": 1, "title": "a"}]));
    let result = post.find(None).await.expect("find");
    assert!(matches!(result, FindResult::Many(_)));

    // Bare scalar -> find_by_key
    fixture
        .mock
        .expect_find_by_key()
        .return_payload(json!({"post": {"id": 1, "title": "a"}}));
    let result = post.find(Some(json!(1))).await.expect("find");
    assert!(matches!(result, FindResult::One(_)));

    // Object containing the primary key -> find_by_key, rest become params
    fixture
        .mock
        .expect_find_by_key()
        .return_payload(json!({"post": {"id": 1, "title": "a"}}));
    let result = post
        .find(Some(json!({"id": 1, "expand": "comments"})))
        .await
        .expect("find");
    assert!(matches!(result, FindResult::One(_)));

    // Any other object -> find_query
    fixture
        .mock
        .expect_find_query()
        .return_payload(json!([{"id": 2, "title": "b"}]));
    let result = post.find(Some(json!({"title": "b"}))).await.expect("find");
    let collection = result.collection().expect("collection");
    assert_eq!(collection.len(), 1);

    fixture.mock.verify();
}

#[tokio::test]
async fn test_find_all_failure_surfaces_error() {
    let fixture = blog_client();
    let post = fixture.client.resolve("post").expect("post registered");

    fixture
        .mock
        .expect_find_all()
        .return_err(Error::NotFound("posts".to_string()));

    let result = post.find_all().await;
    assert!(matches!(result, Err(Error::NotFound(_))));
    fixture.mock.verify();
}

#[tokio::test]
async fn test_save_new_record_fires_created_then_loaded() {
    let fixture = blog_client();
    let post = fixture.client.resolve("post").expect("post registered");

    let record = post.create();
    record.set("title", "draft").expect("set title");

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    record.on_event(move |event| sink.borrow_mut().push(event));

    fixture
        .mock
        .expect_save()
        .return_payload(json!({"post": {"id": 7, "title": "draft"}}));

    record.save_record().await.expect("save");

    assert!(!record.is_new());
    assert!(!record.is_dirty());
    assert!(record.is_loaded());
    assert!(!record.is_saving());
    assert_eq!(record.get("id").as_f64(), Some(7.0));
    assert_eq!(
        *events.borrow(),
        vec![RecordEvent::Created, RecordEvent::Loaded]
    );
    fixture.mock.verify();
}

#[tokio::test]
async fn test_save_existing_record_fires_updated() {
    let fixture = blog_client();
    let post = fixture.client.resolve("post").expect("post registered");

    let record = post
        .load(&json!({"post": {"id": 1, "title": "hello"}}))
        .expect("load");
    record.set("title", "edited").expect("set title");

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    record.on_event(move |event| sink.borrow_mut().push(event));

    fixture.mock.expect_save().return_ok();
    record.save_record().await.expect("save");

    assert!(!record.is_dirty());
    assert_eq!(
        *events.borrow(),
        vec![RecordEvent::Updated, RecordEvent::Loaded]
    );
    fixture.mock.verify();
}

#[tokio::test]
async fn test_save_failure_leaves_record_dirty_and_flags_error() {
    let fixture = blog_client();
    let post = fixture.client.resolve("post").expect("post registered");

    let record = post
        .load(&json!({"post": {"id": 1, "title": "hello"}}))
        .expect("load");
    record.set("title", "edited").expect("set title");

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    record.on_event(move |event| sink.borrow_mut().push(event));

    fixture
        .mock
        .expect_save()
        .return_err(Error::NotFound("post 1".to_string()));

    let result = record.save_record().await;
    assert!(result.is_err());
    assert!(record.is_dirty(), "failed save keeps local edits dirty");
    assert!(record.is_error());
    assert!(!record.is_saving());
    assert!(record.errors().is_some());
    assert_eq!(*events.borrow(), vec![RecordEvent::Error]);
    fixture.mock.verify();
}

#[tokio::test]
async fn test_successful_save_clears_error_state() {
    let fixture = blog_client();
    let post = fixture.client.resolve("post").expect("post registered");

    let record = post
        .load(&json!({"post": {"id": 1, "title": "hello"}}))
        .expect("load");
    record.set("title", "edited").expect("set title");

    fixture
        .mock
        .expect_save()
        .return_err(Error::NotFound("post 1".to_string()));
    let _ = record.save_record().await;
    assert!(record.is_error());

    fixture.mock.expect_save().return_ok();
    record.save_record().await.expect("retry");
    assert!(!record.is_error());
    assert!(record.errors().is_none());
    fixture.mock.verify();
}

#[tokio::test]
async fn test_delete_fires_deleted() {
    let fixture = blog_client();
    let post = fixture.client.resolve("post").expect("post registered");

    let record = post
        .load(&json!({"post": {"id": 1, "title": "hello"}}))
        .expect("load");

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    record.on_event(move |event| sink.borrow_mut().push(event));

    fixture.mock.expect_delete().return_ok();
    record.delete_record().await.expect("delete");
    assert_eq!(*events.borrow(), vec![RecordEvent::Deleted]);
    fixture.mock.verify();
}

#[tokio::test]
async fn test_reload_applies_fresh_payload() {
    let fixture = blog_client();
    let post = fixture.client.resolve("post").expect("post registered");

    let record = post
        .load(&json!({"post": {"id": 1, "title": "stale"}}))
        .expect("load");
    record.set("title", "local edit").expect("set title");

    fixture
        .mock
        .expect_reload()
        .return_payload(json!({"post": {"id": 1, "title": "fresh"}}));

    record.reload_record().await.expect("reload");
    assert_eq!(record.get("title").as_str(), Some("fresh"));
    assert!(!record.is_dirty());
    fixture.mock.verify();
}

#[tokio::test]
async fn test_read_only_model_rejects_save_and_delete() {
    use restless::{AttrType, Schema};

    let fixture = blog_client();
    let snapshot = fixture
        .client
        .register_read_only("snapshot", Schema::new().attr("label", AttrType::String));

    let record = snapshot
        .load(&json!({"snapshot": {"id": 1, "label": "frozen"}}))
        .expect("load");

    assert!(matches!(
        record.save_record().await,
        Err(Error::ReadOnly(_))
    ));
    assert!(matches!(
        record.delete_record().await,
        Err(Error::ReadOnly(_))
    ));
    // The transport was never consulted.
    fixture.mock.verify();
}
