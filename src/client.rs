//! # Client & Model Types
//!
//! The [`Client`] is the top-level store: it owns the transport adapter,
//! the serializer, the transform registry, the name→type registry, and the
//! per-resource configuration. Records reach all of these through the
//! [`ModelType`] they were created from, so there is no process-wide state
//! and every test can run against a fresh client.
//!
//! Type names resolve through a canonical normalized form (lowercase,
//! separators stripped), so `"PostGroup"`, `"post_group"`, `"post-group"`,
//! and `"postGroup"` all name the same registered type.

use crate::adapter::Adapter;
use crate::collection::RecordCollection;
use crate::error::{Error, Result};
use crate::record::{FieldValue, Record};
use crate::schema::{AttrType, FieldDescriptor, Schema};
use crate::serializer::JsonSerializer;
use crate::transform::{Transform, TransformRegistry};
use convert_case::{Case, Casing};
use serde_json::Value as Json;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, info};

/// Canonical form used for registry and configuration lookups: lowercase
/// with separators stripped.
pub(crate) fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Per-resource configuration, mutated additively through
/// [`Client::map`].
#[derive(Debug, Clone, Default)]
pub(crate) struct ResourceConfig {
    primary_key: Option<String>,
    /// wire key → field name
    property_keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ClientConfig {
    models: HashMap<String, ResourceConfig>,
    plurals: HashMap<String, String>,
}

/// Options for [`Client::map`]: primary-key and wire-key overrides for one
/// resource. Applied additively; later calls overwrite matching entries
/// but never reset the configuration.
#[derive(Debug, Clone, Default)]
pub struct MapOptions {
    primary_key: Option<String>,
    keys: Vec<(String, String)>,
}

impl MapOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `name` instead of `"id"` as the resource's primary key.
    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = Some(name.into());
        self
    }

    /// Map `field` onto the wire key `key` in both directions.
    pub fn key(mut self, field: impl Into<String>, key: impl Into<String>) -> Self {
        self.keys.push((field.into(), key.into()));
        self
    }
}

pub(crate) struct ClientInner {
    adapter: Rc<dyn Adapter>,
    serializer: JsonSerializer,
    registry: RefCell<HashMap<String, ModelType>>,
    config: RefCell<ClientConfig>,
    transforms: RefCell<TransformRegistry>,
}

/// Handle to the top-level store; clones share state.
#[derive(Clone)]
pub struct Client(pub(crate) Rc<ClientInner>);

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("models", &self.0.registry.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(adapter: Rc<dyn Adapter>) -> Self {
        Self(Rc::new(ClientInner {
            adapter,
            serializer: JsonSerializer,
            registry: RefCell::new(HashMap::new()),
            config: RefCell::new(ClientConfig::default()),
            transforms: RefCell::new(TransformRegistry::default()),
        }))
    }

    /// Register a model type under `name` with its declared schema.
    pub fn register(&self, name: &str, schema: Schema) -> ModelType {
        self.register_inner(name, schema, false)
    }

    /// Register a read-only model type: its records refuse save and delete
    /// without touching the transport.
    pub fn register_read_only(&self, name: &str, schema: Schema) -> ModelType {
        self.register_inner(name, schema, true)
    }

    fn register_inner(&self, name: &str, schema: Schema, read_only: bool) -> ModelType {
        let model = ModelType(Rc::new(ModelTypeInner {
            name: name.to_string(),
            schema,
            read_only,
            client: Rc::downgrade(&self.0),
        }));
        info!(model = name, read_only, "registered model type");
        self.0
            .registry
            .borrow_mut()
            .insert(normalize(name), model.clone());
        model
    }

    /// Resolve a registered type from any casing of its name.
    pub fn resolve(&self, name: &str) -> Option<ModelType> {
        self.0.registry.borrow().get(&normalize(name)).cloned()
    }

    pub fn adapter(&self) -> Rc<dyn Adapter> {
        self.0.adapter.clone()
    }

    pub fn serializer(&self) -> &JsonSerializer {
        &self.0.serializer
    }

    /// Configure one resource: primary key and wire-key renames.
    pub fn map(&self, resource: &str, options: MapOptions) {
        let mut config = self.0.config.borrow_mut();
        let entry = config.models.entry(normalize(resource)).or_default();
        if let Some(pk) = options.primary_key {
            entry.primary_key = Some(pk);
        }
        for (field, key) in options.keys {
            entry.property_keys.insert(key, field);
        }
        debug!(resource, "mapped resource configuration");
    }

    /// Add plural overrides, e.g. `("person", "people")`. Additive: later
    /// calls never clear earlier entries.
    pub fn configure_plurals(&self, pairs: &[(&str, &str)]) {
        let mut config = self.0.config.borrow_mut();
        for (singular, plural) in pairs {
            config
                .plurals
                .insert(normalize(singular), (*plural).to_string());
        }
    }

    /// Replace the transform for one primitive type.
    pub fn register_transform(&self, attr_type: AttrType, transform: Rc<dyn Transform>) {
        self.0.transforms.borrow_mut().register(attr_type, transform);
    }

    pub(crate) fn transform_for(&self, attr_type: AttrType) -> Option<Rc<dyn Transform>> {
        self.0.transforms.borrow().get(attr_type)
    }

    pub(crate) fn primary_key_for(&self, model_name: &str) -> Option<String> {
        self.0
            .config
            .borrow()
            .models
            .get(&normalize(model_name))
            .and_then(|m| m.primary_key.clone())
    }

    pub(crate) fn property_key_field(&self, model_name: &str, wire_key: &str) -> Option<String> {
        self.0
            .config
            .borrow()
            .models
            .get(&normalize(model_name))
            .and_then(|m| m.property_keys.get(wire_key).cloned())
    }

    pub(crate) fn wire_key_for_field(&self, model_name: &str, field: &str) -> Option<String> {
        self.0
            .config
            .borrow()
            .models
            .get(&normalize(model_name))
            .and_then(|m| {
                m.property_keys
                    .iter()
                    .find(|(_, f)| f.as_str() == field)
                    .map(|(k, _)| k.clone())
            })
    }

    pub(crate) fn plural_for(&self, model_name: &str) -> Option<String> {
        self.0
            .config
            .borrow()
            .plurals
            .get(&normalize(model_name))
            .cloned()
    }
}

pub(crate) struct ModelTypeInner {
    name: String,
    schema: Schema,
    read_only: bool,
    client: Weak<ClientInner>,
}

/// Handle to one registered resource type. Records are created, loaded,
/// and found through their model type.
#[derive(Clone)]
pub struct ModelType(pub(crate) Rc<ModelTypeInner>);

impl PartialEq for ModelType {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("name", &self.0.name)
            .field("read_only", &self.0.read_only)
            .finish_non_exhaustive()
    }
}

/// The outcome of a dispatched [`ModelType::find`].
#[derive(Debug)]
pub enum FindResult {
    One(Record),
    Many(RecordCollection),
}

impl FindResult {
    pub fn record(self) -> Option<Record> {
        match self {
            Self::One(record) => Some(record),
            Self::Many(_) => None,
        }
    }

    pub fn collection(self) -> Option<RecordCollection> {
        match self {
            Self::One(_) => None,
            Self::Many(collection) => Some(collection),
        }
    }
}

impl ModelType {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn schema(&self) -> &Schema {
        &self.0.schema
    }

    pub fn is_read_only(&self) -> bool {
        self.0.read_only
    }

    pub(crate) fn client(&self) -> Result<Client> {
        self.0.client.upgrade().map(Client).ok_or(Error::ClientDropped)
    }

    /// Every declared field name with its descriptor metadata, in
    /// declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldDescriptor<'_>)> {
        self.0.schema.fields()
    }

    /// The configured primary key, defaulting to `"id"`.
    pub fn primary_key(&self) -> String {
        self.client()
            .ok()
            .and_then(|c| c.primary_key_for(&self.0.name))
            .unwrap_or_else(|| "id".to_string())
    }

    /// The singular wire name: `PostGroup` → `post_group`.
    pub fn resource_name(&self) -> String {
        self.0.name.to_case(Case::Snake)
    }

    /// The derived plural wire name, honoring configured overrides:
    /// `PostGroup` → `post_groups`, `person` → `people` when configured.
    pub fn resource_name_plural(&self) -> String {
        if let Ok(client) = self.client() {
            if let Some(plural) = client.plural_for(&self.0.name) {
                return plural;
            }
        }
        format!("{}s", self.resource_name())
    }

    // --- Construction ---

    /// A fresh, ready record with no fields assigned.
    pub fn create(&self) -> Record {
        let record = Record::new_unready(self.clone());
        record.set_ready(true);
        record
    }

    /// A fresh record with initial values applied without dirtying. A
    /// non-null primary key in the initial data makes the record not-new.
    pub fn create_with(&self, initial: Vec<(&str, FieldValue)>) -> Result<Record> {
        let record = Record::new_unready(self.clone());
        for (name, value) in initial {
            match value {
                FieldValue::Value(v) => record.set(name, v)?,
                FieldValue::One(target) => record.set_belongs_to(name, target)?,
                FieldValue::Many(records) => record.set_has_many(name, records)?,
            }
        }
        record.set_ready(true);
        Ok(record)
    }

    /// Build a record directly from its raw representation: deserialize,
    /// mark loaded, fire the loaded hook. The result is clean.
    pub fn load(&self, data: &Json) -> Result<Record> {
        let client = self.client()?;
        let record = Record::new_unready(self.clone());
        client.serializer().deserialize(&client, &record, data)?;
        record.set_ready(true);
        record.on_loaded();
        Ok(record)
    }

    /// Build a collection directly from a raw array, firing the loaded
    /// hook on the collection.
    pub fn load_many(&self, data: &Json) -> Result<RecordCollection> {
        let client = self.client()?;
        let collection = RecordCollection::new();
        client.serializer().deserialize_many(
            &client,
            &collection,
            &crate::schema::TypeRef::Type(self.clone()),
            data,
        )?;
        collection.on_loaded();
        Ok(collection)
    }

    // --- Finders (delegate to the transport adapter) ---

    /// Dispatching finder: no params → `find_all`; a bare scalar or an
    /// object whose only meaningful content is the primary key →
    /// `find_by_key` (remaining entries become query params); any other
    /// object → `find_query`.
    pub async fn find(&self, params: Option<Json>) -> Result<FindResult> {
        match params {
            None => Ok(FindResult::Many(self.find_all().await?)),
            Some(value) if value.is_string() || value.is_number() => {
                Ok(FindResult::One(self.find_by_key(value, None).await?))
            }
            Some(Json::Object(mut map)) => {
                let pk = self.primary_key();
                if map.contains_key(&pk) {
                    let key = map.remove(&pk).unwrap_or(Json::Null);
                    let params = if map.is_empty() {
                        None
                    } else {
                        Some(Json::Object(map))
                    };
                    Ok(FindResult::One(self.find_by_key(key, params).await?))
                } else {
                    Ok(FindResult::Many(self.find_query(Json::Object(map)).await?))
                }
            }
            Some(other) => Ok(FindResult::Many(self.find_query(other).await?)),
        }
    }

    /// Same dispatch as [`find`](Self::find); kept as the explicit
    /// promise-flavored entry point of the source API.
    pub async fn fetch(&self, params: Option<Json>) -> Result<FindResult> {
        self.find(params).await
    }

    pub async fn find_all(&self) -> Result<RecordCollection> {
        let client = self.client()?;
        client.adapter().find_all(self).await
    }

    pub async fn find_query(&self, params: Json) -> Result<RecordCollection> {
        let client = self.client()?;
        client.adapter().find_query(self, params).await
    }

    pub async fn find_by_key(&self, key: Json, params: Option<Json>) -> Result<Record> {
        let client = self.client()?;
        client.adapter().find_by_key(self, key, params).await
    }
}
