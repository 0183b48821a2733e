#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Restless
//!
//! > **A client-side data-modeling layer for REST-style JSON APIs.**
//!
//! This crate keeps an in-memory graph of typed records in sync with remote
//! resources: declare a schema per resource, register it on a [`Client`],
//! and the layer handles lifecycle state, dirty tracking across
//! relationships, and the JSON wire format. The transport itself is a
//! pluggable [`Adapter`], so the modeling layer never speaks HTTP directly.
//!
//! ## Design Philosophy
//!
//! ### Records are shared, mutable handles
//! A [`Record`] is a cheap clone over shared state, so the same instance can
//! sit in several relationship graphs at once. Mutations funnel through one
//! property-change rule, which is what makes dirty tracking exact:
//! construction and deserialization never dirty a record, while edits after
//! load always do.
//!
//! ### Dirtiness flows upward
//! Owners observe their non-read-only relationship targets. Editing a
//! nested comment dirties the post that holds it, recursively, with
//! propagation bounded even on cyclic graphs.
//!
//! ### The wire format is a contract
//! The [`JsonSerializer`] owns every naming rule: `camelCase` fields map to
//! `snake_case` wire keys, payloads may arrive wrapped (`{"post": {...}}`)
//! or bare, and per-resource renames are configured once on the client.
//!
//! ## Module Tour
//!
//! ### 1. The Vocabulary ([`schema`], [`value`])
//! Declarative per-type metadata and the typed in-memory value it governs.
//! - **Key items**: [`Schema`], [`AttrType`], [`Value`].
//!
//! ### 2. The Graph ([`record`], [`collection`])
//! Live records, their lifecycle flags, and the has-many collections that
//! tie them together.
//! - **Key items**: [`Record`], [`RecordCollection`], [`StateFlags`].
//!
//! ### 3. The Codec ([`serializer`], [`transform`])
//! Conversion between wire JSON and the record graph, with pluggable
//! per-type transforms.
//! - **Key items**: [`JsonSerializer`], [`Transform`].
//!
//! ### 4. The Store ([`client`], [`adapter`], [`mock`])
//! The type registry, per-resource configuration, and the transport seam.
//! - **Key items**: [`Client`], [`ModelType`], [`Adapter`], [`MockAdapter`].
//!
//! ## Quick Start
//!
//! ```
//! use restless::{AttrType, Client, MockAdapter, Schema};
//! use serde_json::json;
//! use std::rc::Rc;
//!
//! # fn main() -> restless::Result<()> {
//! let client = Client::new(Rc::new(MockAdapter::new()));
//! let post = client.register(
//!     "post",
//!     Schema::new()
//!         .attr("title", AttrType::String)
//!         .attr("createdAt", AttrType::Date)
//!         .has_many("tags", "tag"),
//! );
//! client.register("tag", Schema::new().attr("name", AttrType::String));
//!
//! let record = post.load(&json!({
//!     "post": {
//!         "id": 1,
//!         "title": "hello",
//!         "tags": [{"name": "rust"}]
//!     }
//! }))?;
//!
//! assert!(record.is_loaded());
//! assert!(!record.is_dirty());
//! assert_eq!(record.get("title").as_str(), Some("hello"));
//!
//! record.set("title", "edited")?;
//! assert!(record.is_dirty());
//! # Ok(())
//! # }
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod adapter;
pub mod client;
pub mod collection;
pub mod error;
pub mod mock;
pub mod record;
pub mod runtime;
pub mod schema;
pub mod serializer;
pub mod transform;
pub mod value;

pub use adapter::Adapter;
pub use client::{Client, FindResult, MapOptions, ModelType};
pub use collection::RecordCollection;
pub use error::{Error, Result};
pub use mock::MockAdapter;
pub use record::{FieldValue, Record, RecordEvent, StateFlags};
pub use runtime::tracing::setup_tracing;
pub use schema::{
    AttrOptions, AttrType, AttributeDescriptor, Cardinality, DefaultValue, FieldDescriptor,
    RelOptions, RelationshipDescriptor, Schema, TypeRef,
};
pub use serializer::{JsonSerializer, SerializeOptions};
pub use transform::{
    BooleanTransform, DateTransform, NumberTransform, StringTransform, Transform,
    TransformRegistry,
};
pub use value::Value;
