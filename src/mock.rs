//! # Mock Adapter & Testing Guide
//!
//! [`MockAdapter`] implements the same [`Adapter`] API as a production
//! transport but operates entirely in-memory. It lets you script payloads
//! and errors for unit tests, enabling fast, deterministic testing of
//! record lifecycle logic without any I/O.
//!
//! Expectations are consumed in FIFO order; an operation with no matching
//! expectation at the front of the queue panics, which in a test reads as
//! an immediate, precise failure.
//!
//! # Example
//! ```
//! use restless::{AttrType, Client, MockAdapter, Schema};
//! use serde_json::json;
//! use std::rc::Rc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> restless::Result<()> {
//! let mock = MockAdapter::new();
//! let client = Client::new(Rc::new(mock.clone()));
//! let tag = client.register("tag", Schema::new().attr("name", AttrType::String));
//!
//! mock.expect_find_by_key()
//!     .return_payload(json!({"id": 1, "name": "rust"}));
//!
//! let record = tag.find_by_key(json!(1), None).await?;
//! assert_eq!(record.get("name").as_str(), Some("rust"));
//! mock.verify();
//! # Ok(())
//! # }
//! ```

use crate::adapter::Adapter;
use crate::client::ModelType;
use crate::collection::RecordCollection;
use crate::error::{Error, Result};
use crate::record::Record;
use async_trait::async_trait;
use serde_json::Value as Json;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Represents an expected operation and its scripted response.
enum Expectation {
    FindAll(Result<Json>),
    FindQuery(Result<Json>),
    FindByKey(Result<Json>),
    /// `Ok(Some(payload))` simulates a backend that echoes the saved
    /// resource; `Ok(None)` a backend that returns an empty body.
    Save(Result<Option<Json>>),
    Delete(Result<()>),
    Reload(Result<Json>),
}

impl Expectation {
    fn kind(&self) -> &'static str {
        match self {
            Self::FindAll(_) => "find_all",
            Self::FindQuery(_) => "find_query",
            Self::FindByKey(_) => "find_by_key",
            Self::Save(_) => "save_record",
            Self::Delete(_) => "delete_record",
            Self::Reload(_) => "reload_record",
        }
    }
}

/// An in-memory adapter with expectation tracking for fluent testing.
///
/// Clones share the expectation queue, so the same instance can be handed
/// to the client and kept in the test for scripting and verification.
///
/// # Example
/// ```ignore
/// let mock = MockAdapter::new();
/// mock.expect_find_all().return_payload(json!([{"id": 1}]));
/// mock.expect_save().return_ok();
///
/// let client = Client::new(Rc::new(mock.clone()));
/// // Use client in tests...
/// mock.verify(); // Ensures all expectations were consumed
/// ```
#[derive(Clone, Default)]
pub struct MockAdapter {
    expectations: Rc<RefCell<VecDeque<Expectation>>>,
}

impl MockAdapter {
    /// Creates a new mock adapter with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, expectation: Expectation) {
        self.expectations.borrow_mut().push_back(expectation);
    }

    fn pop(&self, operation: &'static str) -> Expectation {
        let expectation = self.expectations.borrow_mut().pop_front();
        match expectation {
            Some(e) if e.kind() == operation => e,
            Some(e) => panic!(
                "unexpected operation: got `{operation}`, expected `{}`",
                e.kind()
            ),
            None => panic!("unexpected operation `{operation}`: no expectations remain"),
        }
    }

    /// Expects a `find_all` operation.
    pub fn expect_find_all(&self) -> PayloadExpectation<'_> {
        PayloadExpectation {
            mock: self,
            build: Expectation::FindAll,
        }
    }

    /// Expects a `find_query` operation.
    pub fn expect_find_query(&self) -> PayloadExpectation<'_> {
        PayloadExpectation {
            mock: self,
            build: Expectation::FindQuery,
        }
    }

    /// Expects a `find_by_key` operation.
    pub fn expect_find_by_key(&self) -> PayloadExpectation<'_> {
        PayloadExpectation {
            mock: self,
            build: Expectation::FindByKey,
        }
    }

    /// Expects a `reload_record` operation.
    pub fn expect_reload(&self) -> PayloadExpectation<'_> {
        PayloadExpectation {
            mock: self,
            build: Expectation::Reload,
        }
    }

    /// Expects a `save_record` operation.
    pub fn expect_save(&self) -> SaveExpectation<'_> {
        SaveExpectation { mock: self }
    }

    /// Expects a `delete_record` operation.
    pub fn expect_delete(&self) -> DeleteExpectation<'_> {
        DeleteExpectation { mock: self }
    }

    /// Verifies that all expectations were consumed.
    pub fn verify(&self) {
        let remaining = self.expectations.borrow().len();
        if remaining > 0 {
            panic!("not all expectations were met, {remaining} remaining");
        }
    }
}

/// Builder for expectations that resolve with a raw payload.
pub struct PayloadExpectation<'a> {
    mock: &'a MockAdapter,
    build: fn(Result<Json>) -> Expectation,
}

impl PayloadExpectation<'_> {
    /// Sets the expectation to resolve with the given wire payload.
    pub fn return_payload(self, payload: Json) {
        self.mock.push((self.build)(Ok(payload)));
    }

    /// Sets the expectation to fail with the given error.
    pub fn return_err(self, error: Error) {
        self.mock.push((self.build)(Err(error)));
    }
}

/// Builder for `save_record` expectations.
pub struct SaveExpectation<'a> {
    mock: &'a MockAdapter,
}

impl SaveExpectation<'_> {
    /// Sets the expectation to succeed with no response body.
    pub fn return_ok(self) {
        self.mock.push(Expectation::Save(Ok(None)));
    }

    /// Sets the expectation to succeed and echo a payload back onto the
    /// saved record, as a real backend would on create.
    pub fn return_payload(self, payload: Json) {
        self.mock.push(Expectation::Save(Ok(Some(payload))));
    }

    /// Sets the expectation to fail with the given error.
    pub fn return_err(self, error: Error) {
        self.mock.push(Expectation::Save(Err(error)));
    }
}

/// Builder for `delete_record` expectations.
pub struct DeleteExpectation<'a> {
    mock: &'a MockAdapter,
}

impl DeleteExpectation<'_> {
    /// Sets the expectation to succeed.
    pub fn return_ok(self) {
        self.mock.push(Expectation::Delete(Ok(())));
    }

    /// Sets the expectation to fail with the given error.
    pub fn return_err(self, error: Error) {
        self.mock.push(Expectation::Delete(Err(error)));
    }
}

#[async_trait(?Send)]
impl Adapter for MockAdapter {
    async fn find_all(&self, model: &ModelType) -> Result<RecordCollection> {
        match self.pop("find_all") {
            Expectation::FindAll(Ok(payload)) => model.load_many(&payload),
            Expectation::FindAll(Err(e)) => Err(e),
            _ => unreachable!(),
        }
    }

    async fn find_query(&self, model: &ModelType, _params: Json) -> Result<RecordCollection> {
        match self.pop("find_query") {
            Expectation::FindQuery(Ok(payload)) => model.load_many(&payload),
            Expectation::FindQuery(Err(e)) => Err(e),
            _ => unreachable!(),
        }
    }

    async fn find_by_key(
        &self,
        model: &ModelType,
        _key: Json,
        _params: Option<Json>,
    ) -> Result<Record> {
        match self.pop("find_by_key") {
            Expectation::FindByKey(Ok(payload)) => model.load(&payload),
            Expectation::FindByKey(Err(e)) => Err(e),
            _ => unreachable!(),
        }
    }

    async fn save_record(&self, record: &Record) -> Result<()> {
        match self.pop("save_record") {
            Expectation::Save(Ok(Some(payload))) => record.deserialize(&payload),
            Expectation::Save(Ok(None)) => Ok(()),
            Expectation::Save(Err(e)) => Err(e),
            _ => unreachable!(),
        }
    }

    async fn delete_record(&self, _record: &Record) -> Result<()> {
        match self.pop("delete_record") {
            Expectation::Delete(result) => result,
            _ => unreachable!(),
        }
    }

    async fn reload_record(&self, record: &Record) -> Result<()> {
        match self.pop("reload_record") {
            Expectation::Reload(Ok(payload)) => record.deserialize(&payload),
            Expectation::Reload(Err(e)) => Err(e),
            _ => unreachable!(),
        }
    }
}
