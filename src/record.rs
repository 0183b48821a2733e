//! # Record
//!
//! A [`Record`] is a typed, mutable entity instance representing one remote
//! resource. The handle is a cheap clone over shared state, so the same
//! record can sit in several relationship graphs at once.
//!
//! # Dirty tracking
//! Every mutation funnels through one property-change rule: a write marks
//! the record dirty only when the record is *ready* (fully constructed) and
//! either new or already loaded. Construction-time assignment therefore
//! never dirties, and deserializing always ends in a clean tree.
//!
//! Owners register themselves as observers on their non-read-only
//! relationship targets. When a target's `is_dirty` flips to true the
//! owner's dirty handler fires, recursively up the graph. Marking an
//! already-dirty record is a no-op, which both bounds propagation to the
//! size of the graph and guarantees termination on cyclic graphs.

use crate::client::{Client, ModelType};
use crate::collection::RecordCollection;
use crate::error::{Error, Result};
use crate::schema::{Cardinality, DefaultValue, RelationshipDescriptor, TypeRef};
use crate::serializer::SerializeOptions;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::debug;

/// Notifications fired by the lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordEvent {
    Created,
    Updated,
    Loaded,
    Deleted,
    Error,
}

/// The lifecycle flags carried by every record.
#[derive(Debug, Clone, Default)]
pub struct StateFlags {
    pub is_new: bool,
    pub is_loaded: bool,
    pub is_dirty: bool,
    pub is_saving: bool,
    pub is_error: bool,
    pub did_validate: bool,
}

/// The stored shape of one relationship slot.
#[derive(Clone)]
pub(crate) enum Related {
    One(Option<Record>),
    Many(RecordCollection),
}

pub(crate) struct RecordInner {
    model: ModelType,
    fields: HashMap<String, Value>,
    relationships: HashMap<String, Related>,
    state: StateFlags,
    is_ready: bool,
    /// Owners observing this record's dirtiness. Back-references for dirty
    /// propagation only, never for memory ownership.
    observers: Vec<Weak<RefCell<RecordInner>>>,
    listeners: Vec<Rc<dyn Fn(RecordEvent)>>,
    errors: Option<serde_json::Value>,
}

/// Handle to one record; clones share identity and state.
#[derive(Clone)]
pub struct Record(pub(crate) Rc<RefCell<RecordInner>>);

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("Record")
            .field("model", &inner.model.name())
            .field("state", &inner.state)
            .finish_non_exhaustive()
    }
}

/// An initial field value handed to [`ModelType::create_with`].
pub enum FieldValue {
    Value(Value),
    One(Option<Record>),
    Many(Vec<Record>),
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Value(v.into())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Value(v.into())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Value(v.into())
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Value(v.into())
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Value(v.into())
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Value(v.into())
    }
}

impl From<Record> for FieldValue {
    fn from(r: Record) -> Self {
        Self::One(Some(r))
    }
}

impl From<Option<Record>> for FieldValue {
    fn from(r: Option<Record>) -> Self {
        Self::One(r)
    }
}

impl From<Vec<Record>> for FieldValue {
    fn from(rs: Vec<Record>) -> Self {
        Self::Many(rs)
    }
}

impl Record {
    /// A fresh, not-yet-ready instance. Callers apply initial values and
    /// then flip readiness.
    pub(crate) fn new_unready(model: ModelType) -> Self {
        Self(Rc::new(RefCell::new(RecordInner {
            model,
            fields: HashMap::new(),
            relationships: HashMap::new(),
            state: StateFlags {
                is_new: true,
                ..StateFlags::default()
            },
            is_ready: false,
            observers: Vec::new(),
            listeners: Vec::new(),
            errors: None,
        })))
    }

    pub fn model(&self) -> ModelType {
        self.0.borrow().model.clone()
    }

    pub(crate) fn client(&self) -> Result<Client> {
        self.model().client()
    }

    // --- State flags ---

    pub fn is_new(&self) -> bool {
        self.0.borrow().state.is_new
    }

    pub fn is_loaded(&self) -> bool {
        self.0.borrow().state.is_loaded
    }

    pub fn is_dirty(&self) -> bool {
        self.0.borrow().state.is_dirty
    }

    pub fn is_saving(&self) -> bool {
        self.0.borrow().state.is_saving
    }

    pub fn is_error(&self) -> bool {
        self.0.borrow().state.is_error
    }

    pub fn did_validate(&self) -> bool {
        self.0.borrow().state.did_validate
    }

    /// Errors reported by the last failed transport operation, if any.
    pub fn errors(&self) -> Option<serde_json::Value> {
        self.0.borrow().errors.clone()
    }

    pub(crate) fn state(&self) -> StateFlags {
        self.0.borrow().state.clone()
    }

    pub(crate) fn set_state(&self, state: StateFlags) {
        self.0.borrow_mut().state = state;
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.0.borrow().is_ready
    }

    pub(crate) fn set_ready(&self, ready: bool) {
        self.0.borrow_mut().is_ready = ready;
    }

    pub(crate) fn set_loaded(&self, loaded: bool) {
        self.0.borrow_mut().state.is_loaded = loaded;
    }

    /// The value of the configured primary key, or null when unassigned.
    pub fn primary_key_value(&self) -> Value {
        let key = self.model().primary_key();
        self.get(&key)
    }

    // --- Attributes ---

    /// Read an attribute. A declared default is evaluated lazily in this
    /// record's context on first read and memoized for the record's
    /// lifetime.
    pub fn get(&self, name: &str) -> Value {
        if let Some(v) = self.0.borrow().fields.get(name) {
            return v.clone();
        }
        let default = self
            .model()
            .schema()
            .attribute(name)
            .and_then(|a| a.default.clone());
        match default {
            Some(DefaultValue::Value(v)) => {
                self.0.borrow_mut().fields.insert(name.to_string(), v.clone());
                v
            }
            Some(DefaultValue::Computed(f)) => {
                let v = f(self);
                self.0.borrow_mut().fields.insert(name.to_string(), v.clone());
                v
            }
            None => Value::Null,
        }
    }

    /// Write an attribute. Dirties the record when it is ready and either
    /// new or loaded; assigning the primary key to a new record flips
    /// `is_new` exactly once.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let model = self.model();
        if let Some(rel) = model.schema().relationship(name) {
            return Err(Error::RelationshipTypeMismatch {
                relationship: name.to_string(),
                expected: rel_target_name(rel),
                actual: "attribute value".to_string(),
            });
        }
        let value = value.into();
        let non_null = !value.is_null();
        self.0.borrow_mut().fields.insert(name.to_string(), value);
        self.on_property_change(name, non_null);
        Ok(())
    }

    // --- Relationships ---

    /// Read a belongs-to slot.
    pub fn belongs_to(&self, name: &str) -> Result<Option<Record>> {
        let model = self.model();
        if model
            .schema()
            .relationship(name)
            .filter(|r| r.cardinality == Cardinality::BelongsTo)
            .is_none()
        {
            return Err(Error::UnknownField {
                model: model.name().to_string(),
                field: name.to_string(),
            });
        }
        match self.0.borrow().relationships.get(name) {
            Some(Related::One(target)) => Ok(target.clone()),
            _ => Ok(None),
        }
    }

    /// Read a has-many slot, creating an empty collection on first access.
    pub fn has_many(&self, name: &str) -> Result<RecordCollection> {
        let model = self.model();
        let rel = model
            .schema()
            .relationship(name)
            .filter(|r| r.cardinality == Cardinality::HasMany)
            .cloned()
            .ok_or_else(|| Error::UnknownField {
                model: model.name().to_string(),
                field: name.to_string(),
            })?;
        if let Some(Related::Many(col)) = self.0.borrow().relationships.get(name) {
            return Ok(col.clone());
        }
        let col = RecordCollection::new();
        if !rel.read_only {
            col.attach_owner(Rc::downgrade(&self.0));
        }
        self.0
            .borrow_mut()
            .relationships
            .insert(name.to_string(), Related::Many(col.clone()));
        Ok(col)
    }

    /// Assign a belongs-to target. The target's model must match the
    /// declared type; anything else is a contract violation.
    pub fn set_belongs_to(&self, name: &str, target: Option<Record>) -> Result<()> {
        let model = self.model();
        let rel = model
            .schema()
            .relationship(name)
            .filter(|r| r.cardinality == Cardinality::BelongsTo)
            .cloned()
            .ok_or_else(|| Error::UnknownField {
                model: model.name().to_string(),
                field: name.to_string(),
            })?;
        if let Some(record) = &target {
            check_target_type(&rel, record)?;
        }
        let weak = Rc::downgrade(&self.0);
        let old = self.0.borrow().relationships.get(name).cloned();
        if let Some(Related::One(Some(old_target))) = old {
            old_target.remove_observer(&weak);
        }
        if !rel.read_only {
            if let Some(record) = &target {
                record.add_observer(weak);
            }
        }
        let non_null = target.is_some();
        self.0
            .borrow_mut()
            .relationships
            .insert(name.to_string(), Related::One(target));
        self.on_property_change(name, non_null);
        Ok(())
    }

    /// Assign a has-many slot from a list of records.
    pub fn set_has_many(&self, name: &str, records: Vec<Record>) -> Result<()> {
        let model = self.model();
        let rel = model
            .schema()
            .relationship(name)
            .filter(|r| r.cardinality == Cardinality::HasMany)
            .cloned()
            .ok_or_else(|| Error::UnknownField {
                model: model.name().to_string(),
                field: name.to_string(),
            })?;
        for record in &records {
            check_target_type(&rel, record)?;
        }
        let weak = Rc::downgrade(&self.0);
        let old = self.0.borrow().relationships.get(name).cloned();
        if let Some(Related::Many(old_col)) = old {
            old_col.detach_owner(&weak);
        }
        let col = RecordCollection::with_content(records);
        if !rel.read_only {
            col.attach_owner(weak);
        }
        self.0
            .borrow_mut()
            .relationships
            .insert(name.to_string(), Related::Many(col));
        self.on_property_change(name, true);
        Ok(())
    }

    pub(crate) fn related(&self, name: &str) -> Option<Related> {
        self.0.borrow().relationships.get(name).cloned()
    }

    // --- Dirty propagation ---

    /// The single property-change rule. Primary-key assignment retires
    /// `is_new` regardless of readiness; the dirty flag is gated on the
    /// record being ready and new-or-loaded.
    fn on_property_change(&self, key: &str, non_null: bool) {
        let primary_key = self.model().primary_key();
        let should_dirty = {
            let mut inner = self.0.borrow_mut();
            if inner.state.is_new && non_null && key == primary_key {
                inner.state.is_new = false;
            }
            inner.is_ready && (inner.state.is_new || inner.state.is_loaded)
        };
        if should_dirty {
            self.mark_dirty();
        }
    }

    /// Idempotent: marking an already-dirty record is a no-op, so
    /// propagation terminates on shared and cyclic graphs.
    pub(crate) fn mark_dirty(&self) {
        let observers = {
            let mut inner = self.0.borrow_mut();
            if inner.state.is_dirty {
                return;
            }
            inner.state.is_dirty = true;
            inner.observers.retain(|o| o.upgrade().is_some());
            inner.observers.clone()
        };
        for observer in observers {
            if let Some(owner) = observer.upgrade() {
                Record(owner).relationship_became_dirty();
            }
        }
    }

    /// Fired on an owner when a non-read-only relationship target became
    /// dirty.
    pub(crate) fn relationship_became_dirty(&self) {
        let should_dirty = {
            let inner = self.0.borrow();
            inner.is_ready && (inner.state.is_new || inner.state.is_loaded)
        };
        if should_dirty {
            self.mark_dirty();
        }
    }

    pub(crate) fn add_observer(&self, observer: Weak<RefCell<RecordInner>>) {
        let mut inner = self.0.borrow_mut();
        let already = inner
            .observers
            .iter()
            .any(|o| o.ptr_eq(&observer));
        if !already {
            inner.observers.push(observer);
        }
    }

    pub(crate) fn remove_observer(&self, observer: &Weak<RefCell<RecordInner>>) {
        self.0.borrow_mut().observers.retain(|o| !o.ptr_eq(observer));
    }

    /// Reset dirtiness across the whole subtree, visiting each record once.
    pub(crate) fn mark_clean_recursive(&self) {
        let mut visited = Vec::new();
        self.clean_rec_entry(&mut visited);
    }

    pub(crate) fn clean_rec_entry(&self, visited: &mut Vec<*const RefCell<RecordInner>>) {
        let ptr = Rc::as_ptr(&self.0);
        if visited.contains(&ptr) {
            return;
        }
        visited.push(ptr);
        let related: Vec<Related> = {
            let mut inner = self.0.borrow_mut();
            inner.state.is_dirty = false;
            inner.relationships.values().cloned().collect()
        };
        for rel in related {
            match rel {
                Related::One(Some(child)) => child.clean_rec_entry(visited),
                Related::One(None) => {}
                Related::Many(col) => col.clean_rec(visited),
            }
        }
    }

    /// Recursively mark this record and all has-many children validated.
    pub fn set_validated(&self) {
        let mut visited = Vec::new();
        self.validate_rec(&mut visited);
    }

    fn validate_rec(&self, visited: &mut Vec<*const RefCell<RecordInner>>) {
        let ptr = Rc::as_ptr(&self.0);
        if visited.contains(&ptr) {
            return;
        }
        visited.push(ptr);
        self.0.borrow_mut().state.did_validate = true;
        let model = self.model();
        for rel in model.schema().relationships() {
            if rel.cardinality != Cardinality::HasMany {
                continue;
            }
            if let Some(Related::Many(col)) = self.related(&rel.name) {
                for member in col.members() {
                    member.validate_rec(visited);
                }
            }
        }
    }

    // --- Copy semantics ---

    /// A new instance of the same type with all declared attribute and
    /// relationship values copied shallowly: relationship targets are
    /// referenced, not cloned. State flags are not copied; the clone is
    /// clean and derives `is_new` only from the presence of a primary key.
    pub fn copy(&self) -> Result<Record> {
        let model = self.model();
        let clone = Record::new_unready(model.clone());
        for attr in model.schema().attributes() {
            let value = self.get(&attr.name);
            if !value.is_null() {
                clone.set(&attr.name, value)?;
            }
        }
        for rel in model.schema().relationships() {
            match self.related(&rel.name) {
                Some(Related::One(Some(target))) => {
                    clone.set_belongs_to(&rel.name, Some(target))?;
                }
                Some(Related::Many(col)) => {
                    clone.set_has_many(&rel.name, col.members())?;
                }
                _ => {}
            }
        }
        clone.set_ready(true);
        Ok(clone)
    }

    /// [`copy`](Self::copy) plus a duplicate of the current state flags.
    pub fn copy_with_state(&self) -> Result<Record> {
        let clone = self.copy()?;
        clone.set_state(self.state());
        Ok(clone)
    }

    // --- Serialization (delegates to the resolved serializer) ---

    pub fn serialize(&self, options: &SerializeOptions) -> Result<serde_json::Value> {
        let client = self.client()?;
        client.serializer().serialize(&client, self, options)
    }

    pub fn deserialize(&self, data: &serde_json::Value) -> Result<()> {
        let client = self.client()?;
        client.serializer().deserialize(&client, self, data)
    }

    pub fn serialize_property(&self, name: &str) -> Result<serde_json::Value> {
        let client = self.client()?;
        client.serializer().serialize_property(&client, self, name)
    }

    pub fn deserialize_property(&self, key: &str, raw: &serde_json::Value) -> Result<()> {
        let client = self.client()?;
        client.serializer().deserialize_property(&client, self, key, raw)
    }

    // --- Lifecycle hooks & events ---

    /// Register a listener for lifecycle notifications on this record.
    pub fn on_event(&self, listener: impl Fn(RecordEvent) + 'static) {
        self.0.borrow_mut().listeners.push(Rc::new(listener));
    }

    fn fire(&self, event: RecordEvent) {
        let listeners = self.0.borrow().listeners.clone();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn on_loaded(&self) {
        self.0.borrow_mut().state.is_loaded = true;
        self.fire(RecordEvent::Loaded);
    }

    /// Transition after a successful save. A create fires `Created`, an
    /// update fires `Updated`; both leave the record loaded and clean.
    pub fn on_saved(&self, was_new: bool) {
        {
            let mut inner = self.0.borrow_mut();
            inner.state.is_saving = false;
            inner.state.is_dirty = false;
            inner.state.is_new = false;
            inner.state.is_error = false;
            inner.errors = None;
        }
        self.fire(if was_new {
            RecordEvent::Created
        } else {
            RecordEvent::Updated
        });
        self.on_loaded();
    }

    pub fn on_deleted(&self) {
        self.fire(RecordEvent::Deleted);
    }

    /// Transition after a failed transport operation. Prior values and the
    /// dirty flag are left untouched so the application can retry.
    pub fn on_error(&self, errors: Option<serde_json::Value>) {
        {
            let mut inner = self.0.borrow_mut();
            inner.state.is_saving = false;
            inner.state.is_error = true;
            inner.errors = errors;
        }
        self.fire(RecordEvent::Error);
    }

    // --- Transport delegation ---

    /// Persist through the resolved adapter. A failure leaves the record
    /// dirty, flags the error, and surfaces the transport error.
    pub async fn save_record(&self) -> Result<()> {
        let model = self.model();
        if model.is_read_only() {
            return Err(Error::ReadOnly(model.name().to_string()));
        }
        let client = self.client()?;
        let was_new = self.is_new();
        self.0.borrow_mut().state.is_saving = true;
        debug!(model = model.name(), was_new, "saving record");
        match client.adapter().save_record(self).await {
            Ok(()) => {
                self.on_saved(was_new);
                Ok(())
            }
            Err(e) => {
                self.on_error(Some(serde_json::Value::String(e.to_string())));
                Err(e)
            }
        }
    }

    /// Delete through the resolved adapter.
    pub async fn delete_record(&self) -> Result<()> {
        let model = self.model();
        if model.is_read_only() {
            return Err(Error::ReadOnly(model.name().to_string()));
        }
        let client = self.client()?;
        debug!(model = model.name(), "deleting record");
        match client.adapter().delete_record(self).await {
            Ok(()) => {
                self.on_deleted();
                Ok(())
            }
            Err(e) => {
                self.on_error(Some(serde_json::Value::String(e.to_string())));
                Err(e)
            }
        }
    }

    /// Refresh from the transport. A failure leaves the record in its
    /// pre-load state.
    pub async fn reload_record(&self) -> Result<()> {
        let client = self.client()?;
        match client.adapter().reload_record(self).await {
            Ok(()) => {
                self.on_loaded();
                Ok(())
            }
            Err(e) => {
                self.on_error(Some(serde_json::Value::String(e.to_string())));
                Err(e)
            }
        }
    }
}

fn rel_target_name(rel: &RelationshipDescriptor) -> String {
    match &rel.target {
        TypeRef::Name(name) => name.clone(),
        TypeRef::Type(model) => model.name().to_string(),
    }
}

fn check_target_type(rel: &RelationshipDescriptor, record: &Record) -> Result<()> {
    let expected = rel_target_name(rel);
    let actual = record.model().name().to_string();
    let matches = match &rel.target {
        TypeRef::Name(name) => crate::client::normalize(name) == crate::client::normalize(&actual),
        TypeRef::Type(model) => *model == record.model(),
    };
    if matches {
        Ok(())
    } else {
        Err(Error::RelationshipTypeMismatch {
            relationship: rel.name.clone(),
            expected,
            actual,
        })
    }
}
