//! # Transport Adapter
//!
//! The [`Adapter`] trait is the seam between the modeling layer and the
//! wire: finders, saves, deletes, and reloads all funnel through it. The
//! modeling layer never constructs URLs or speaks HTTP itself; an adapter
//! implementation owns the whole request/response cycle and hands back
//! populated records.
//!
//! Adapters run on the same thread as the records they populate, so the
//! trait is object-safe but not `Send`. Tests use
//! [`MockAdapter`](crate::MockAdapter) to script responses without any I/O.

use crate::client::ModelType;
use crate::collection::RecordCollection;
use crate::error::Result;
use crate::record::Record;
use async_trait::async_trait;
use serde_json::Value as Json;

/// The pluggable transport collaborator.
///
/// Finder methods return fully deserialized, loaded, clean results. The
/// record-level methods mutate the record they are given; the caller runs
/// the lifecycle transitions afterwards.
#[async_trait(?Send)]
pub trait Adapter {
    /// Fetch every resource of the given type.
    async fn find_all(&self, model: &ModelType) -> Result<RecordCollection>;

    /// Fetch the resources matching the query parameters.
    async fn find_query(&self, model: &ModelType, params: Json) -> Result<RecordCollection>;

    /// Fetch one resource by primary key, with optional extra parameters.
    async fn find_by_key(
        &self,
        model: &ModelType,
        key: Json,
        params: Option<Json>,
    ) -> Result<Record>;

    /// Persist the record: create when new, update otherwise. A returned
    /// payload (if the backend echoes one) is applied to the record before
    /// this resolves.
    async fn save_record(&self, record: &Record) -> Result<()>;

    /// Delete the record's remote resource.
    async fn delete_record(&self, record: &Record) -> Result<()>;

    /// Refresh the record from its remote resource.
    async fn reload_record(&self, record: &Record) -> Result<()>;
}
