//! # JSON Serializer
//!
//! Converts between raw wire JSON and record graphs. Single-record
//! payloads are wrapped as `{resource_key: {...fields}}`; collections are a
//! bare array or `{plural_key: [...]}`. Deserialization accepts both the
//! wrapped and bare forms.
//!
//! # Envelope precedence
//! A payload is treated as wrapped iff it is an object with exactly one
//! key, that key equals the resource key (the plural key for collections),
//! and its value is an object (array for collections). Anything else is
//! treated as a bare inner payload, so a bare object that merely contains
//! a field named like the resource key still deserializes as bare.

use crate::client::{Client, ModelType};
use crate::collection::RecordCollection;
use crate::error::{Error, Result};
use crate::record::{Record, RecordInner, Related};
use crate::schema::{AttributeDescriptor, Cardinality, RelationshipDescriptor, TypeRef};
use crate::value::Value;
use convert_case::{Case, Casing};
use serde_json::{Map, Value as Json};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

/// Options controlling [`JsonSerializer::serialize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializeOptions {
    /// Embed belongs-to targets as nested objects and has-many targets as
    /// arrays of nested objects. Off by default.
    pub include_relationships: bool,
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relationships() -> Self {
        Self {
            include_relationships: true,
        }
    }
}

/// The wire codec for records and collections.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    /// Serialize a record as `{resource_key: {...}}`.
    ///
    /// Cyclic graphs serialize finitely: a record already emitted higher in
    /// the graph appears as its primary-key value instead of recursing.
    pub fn serialize(
        &self,
        client: &Client,
        record: &Record,
        options: &SerializeOptions,
    ) -> Result<Json> {
        let key = self.key_for_resource_name(record.model().name());
        let mut visited = Vec::new();
        let inner = self.serialize_inner(client, record, options, &mut visited)?;
        let mut out = Map::new();
        out.insert(key, Json::Object(inner));
        Ok(Json::Object(out))
    }

    /// The inner object: every non-read-only attribute under its wire key,
    /// plus relationships when requested. A null belongs-to serializes as
    /// `null`, never as an empty object.
    fn serialize_inner(
        &self,
        client: &Client,
        record: &Record,
        options: &SerializeOptions,
        visited: &mut Vec<*const RefCell<RecordInner>>,
    ) -> Result<Map<String, Json>> {
        visited.push(Rc::as_ptr(&record.0));
        let model = record.model();
        let schema = model.schema();
        let mut out = Map::new();
        // The primary key is an implicit field unless the schema declares it.
        let pk = model.primary_key();
        if schema.attribute(&pk).is_none() {
            let wire = self.wire_key(client, &model, &pk, None);
            out.insert(wire, record.get(&pk).to_json());
        }
        for attr in schema.attributes() {
            if attr.read_only {
                continue;
            }
            let wire = self.wire_key(client, &model, &attr.name, attr.key.as_deref());
            out.insert(wire, self.serialize_attribute(client, record, attr));
        }
        if options.include_relationships {
            for rel in schema.relationships() {
                if rel.read_only {
                    continue;
                }
                let wire = self.wire_key(client, &model, &rel.name, rel.key.as_deref());
                out.insert(
                    wire,
                    self.serialize_relationship(client, record, rel, options, visited)?,
                );
            }
        }
        Ok(out)
    }

    fn serialize_attribute(
        &self,
        client: &Client,
        record: &Record,
        attr: &AttributeDescriptor,
    ) -> Json {
        let value = record.get(&attr.name);
        match attr.attr_type {
            None => value.to_json(),
            Some(attr_type) => match client.transform_for(attr_type) {
                Some(transform) => transform.serialize(&value),
                None => value.to_json(),
            },
        }
    }

    /// A target already serialized higher in the graph is emitted as its
    /// primary-key value, which bounds the output on cyclic graphs.
    fn serialize_relationship(
        &self,
        client: &Client,
        record: &Record,
        rel: &RelationshipDescriptor,
        options: &SerializeOptions,
        visited: &mut Vec<*const RefCell<RecordInner>>,
    ) -> Result<Json> {
        match rel.cardinality {
            Cardinality::BelongsTo => match record.related(&rel.name) {
                Some(Related::One(Some(child))) => {
                    if visited.contains(&Rc::as_ptr(&child.0)) {
                        return Ok(child.primary_key_value().to_json());
                    }
                    Ok(Json::Object(self.serialize_inner(
                        client, &child, options, visited,
                    )?))
                }
                _ => Ok(Json::Null),
            },
            Cardinality::HasMany => {
                let members = match record.related(&rel.name) {
                    Some(Related::Many(col)) => col.members(),
                    _ => Vec::new(),
                };
                let mut arr = Vec::with_capacity(members.len());
                for member in members {
                    if visited.contains(&Rc::as_ptr(&member.0)) {
                        arr.push(member.primary_key_value().to_json());
                        continue;
                    }
                    arr.push(Json::Object(self.serialize_inner(
                        client, &member, options, visited,
                    )?));
                }
                Ok(Json::Array(arr))
            }
        }
    }

    /// Serialize a single declared field to its wire representation.
    pub fn serialize_property(&self, client: &Client, record: &Record, name: &str) -> Result<Json> {
        let model = record.model();
        let schema = model.schema();
        if let Some(attr) = schema.attribute(name) {
            return Ok(self.serialize_attribute(client, record, attr));
        }
        if let Some(rel) = schema.relationship(name) {
            let mut visited = vec![Rc::as_ptr(&record.0)];
            return self.serialize_relationship(
                client,
                record,
                rel,
                &SerializeOptions::with_relationships(),
                &mut visited,
            );
        }
        Err(Error::UnknownField {
            model: model.name().to_string(),
            field: name.to_string(),
        })
    }

    /// Populate a record from raw data, accepting the wrapped or bare
    /// envelope. Always ends with a clean (`is_dirty = false`), loaded
    /// subtree, overwriting dirty local edits last-write-wins.
    ///
    /// Lenient on malformed envelopes: a payload that is not a JSON object
    /// is logged and ignored, leaving the record's state untouched.
    pub fn deserialize(&self, client: &Client, record: &Record, data: &Json) -> Result<()> {
        let model = record.model();
        let resource_key = self.key_for_resource_name(model.name());
        let inner = unwrap_object(data, &resource_key);
        let Some(fields) = inner.as_object() else {
            warn!(model = model.name(), "ignoring non-object payload");
            return Ok(());
        };
        let was_ready = record.is_ready();
        record.set_ready(false);
        let applied = self.apply_fields(client, record, fields);
        record.set_ready(was_ready);
        applied?;
        record.set_loaded(true);
        record.mark_clean_recursive();
        debug!(model = model.name(), "deserialized record");
        Ok(())
    }

    fn apply_fields(
        &self,
        client: &Client,
        record: &Record,
        fields: &Map<String, Json>,
    ) -> Result<()> {
        for (key, raw) in fields {
            self.apply_key(client, record, key, raw)?;
        }
        Ok(())
    }

    /// Apply one wire key: rename-map reverse lookup, else camelCase; a
    /// relationship key recurses, an attribute key runs its transform.
    fn apply_key(&self, client: &Client, record: &Record, key: &str, raw: &Json) -> Result<()> {
        let model = record.model();
        let name = self.attribute_name_for_key(client, &model, key);
        if let Some(rel) = model.schema().relationship(&name).cloned() {
            return self.deserialize_relationship(client, record, &rel, raw);
        }
        if let Some(attr) = model.schema().attribute(&name).cloned() {
            let value = self.deserialize_attribute(client, &attr, raw);
            return record.set(&name, value);
        }
        // The primary key is accepted even when the schema does not declare
        // it as an attribute.
        if name == model.primary_key() {
            return record.set(&name, Value::from_json(raw));
        }
        debug!(model = model.name(), key, "ignoring unknown key");
        Ok(())
    }

    /// A transform failure degrades the single field to null instead of
    /// aborting the load.
    fn deserialize_attribute(
        &self,
        client: &Client,
        attr: &AttributeDescriptor,
        raw: &Json,
    ) -> Value {
        match attr.attr_type {
            None => Value::from_json(raw),
            Some(attr_type) => match client.transform_for(attr_type) {
                Some(transform) => transform.deserialize(raw).unwrap_or_else(|| {
                    warn!(field = attr.name, ?attr_type, "transform failed, defaulting to null");
                    Value::Null
                }),
                None => Value::from_json(raw),
            },
        }
    }

    fn deserialize_relationship(
        &self,
        client: &Client,
        record: &Record,
        rel: &RelationshipDescriptor,
        raw: &Json,
    ) -> Result<()> {
        match rel.cardinality {
            Cardinality::BelongsTo => {
                // A null belongs-to deserializes to none, not an empty record.
                if raw.is_null() {
                    return record.set_belongs_to(&rel.name, None);
                }
                if let Some(existing) = record.belongs_to(&rel.name)? {
                    return self.deserialize(client, &existing, raw);
                }
                let target = self.model_for(client, &rel.target)?;
                let child = Record::new_unready(target);
                self.deserialize(client, &child, raw)?;
                child.set_ready(true);
                record.set_belongs_to(&rel.name, Some(child))
            }
            Cardinality::HasMany => {
                let target = self.model_for(client, &rel.target)?;
                let col = record.has_many(&rel.name)?;
                self.deserialize_many(client, &col, &TypeRef::Type(target), raw)
            }
        }
    }

    /// Single-field variant used internally and exposed for partial
    /// updates. `key` is a wire key; the usual dirty rules apply.
    pub fn deserialize_property(
        &self,
        client: &Client,
        record: &Record,
        key: &str,
        raw: &Json,
    ) -> Result<()> {
        self.apply_key(client, record, key, raw)
    }

    /// Bulk-deserialize into a collection, replacing its members. Accepts
    /// a bare array or a `{plural_key: [...]}` envelope.
    ///
    /// Lenient on malformed envelopes: a payload with no recognizable
    /// array is logged and ignored, leaving the collection untouched.
    pub fn deserialize_many(
        &self,
        client: &Client,
        collection: &RecordCollection,
        target: &TypeRef,
        data: &Json,
    ) -> Result<()> {
        let model = self.model_for(client, target)?;
        let plural = model.resource_name_plural();
        let items: Option<&[Json]> = match data {
            Json::Array(items) => Some(items.as_slice()),
            Json::Object(obj) if obj.len() == 1 => {
                obj.get(&plural).and_then(Json::as_array).map(Vec::as_slice)
            }
            _ => None,
        };
        let Some(items) = items else {
            warn!(model = model.name(), "ignoring non-array collection payload");
            return Ok(());
        };
        let mut members = Vec::with_capacity(items.len());
        for raw in items {
            let record = Record::new_unready(model.clone());
            self.deserialize(client, &record, raw)?;
            record.set_ready(true);
            members.push(record);
        }
        let count = members.len();
        collection.replace_members(members);
        collection.set_loaded(true);
        debug!(model = model.name(), count, "deserialized collection");
        Ok(())
    }

    /// Bulk-serialize a collection as an array of bare inner objects.
    pub fn serialize_many(&self, client: &Client, collection: &RecordCollection) -> Result<Json> {
        let members = collection.members();
        let mut arr = Vec::with_capacity(members.len());
        for member in members {
            let mut visited = Vec::new();
            arr.push(Json::Object(self.serialize_inner(
                client,
                &member,
                &SerializeOptions::default(),
                &mut visited,
            )?));
        }
        Ok(Json::Array(arr))
    }

    // --- Key-name resolution ---

    /// `PostGroup` → `post_group`.
    pub fn key_for_resource_name(&self, name: &str) -> String {
        name.to_case(Case::Snake)
    }

    /// `createdAt` → `created_at`.
    pub fn key_for_attribute_name(&self, name: &str) -> String {
        name.to_case(Case::Snake)
    }

    /// Reverse lookup: the configured rename map wins, then an explicit
    /// descriptor key, then an exact field-name match, then camelCase.
    pub fn attribute_name_for_key(&self, client: &Client, model: &ModelType, key: &str) -> String {
        if let Some(field) = client.property_key_field(model.name(), key) {
            return field;
        }
        let schema = model.schema();
        if let Some(attr) = schema
            .attributes()
            .iter()
            .find(|a| a.key.as_deref() == Some(key))
        {
            return attr.name.clone();
        }
        if let Some(rel) = schema
            .relationships()
            .iter()
            .find(|r| r.key.as_deref() == Some(key))
        {
            return rel.name.clone();
        }
        if schema.attribute(key).is_some() || schema.relationship(key).is_some() {
            return key.to_string();
        }
        key.to_case(Case::Camel)
    }

    fn wire_key(
        &self,
        client: &Client,
        model: &ModelType,
        name: &str,
        key_override: Option<&str>,
    ) -> String {
        if let Some(key) = key_override {
            return key.to_string();
        }
        if let Some(key) = client.wire_key_for_field(model.name(), name) {
            return key;
        }
        self.key_for_attribute_name(name)
    }

    /// Resolve a type reference: a direct handle passes through, a name in
    /// any casing resolves through the client's registry.
    pub fn model_for(&self, client: &Client, target: &TypeRef) -> Result<ModelType> {
        match target {
            TypeRef::Type(model) => Ok(model.clone()),
            TypeRef::Name(name) => client
                .resolve(name)
                .ok_or_else(|| Error::TypeResolution(name.clone())),
        }
    }
}

/// The wrapped-vs-bare rule for single records.
fn unwrap_object<'a>(data: &'a Json, resource_key: &str) -> &'a Json {
    if let Some(obj) = data.as_object() {
        if obj.len() == 1 {
            if let Some(inner) = obj.get(resource_key) {
                if inner.is_object() {
                    return inner;
                }
            }
        }
    }
    data
}
