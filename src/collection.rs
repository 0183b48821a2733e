//! # Record Collections
//!
//! An ordered, mutable collection of [`Record`]s backing has-many
//! relationships and bulk loads. A collection is dirty when any member is
//! dirty or when membership itself has changed since the last load; the
//! flag is derived on read rather than stored.

use crate::client::{Client, ModelType};
use crate::error::Result;
use crate::record::{Record, RecordEvent, RecordInner};
use crate::schema::TypeRef;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

pub(crate) struct CollectionInner {
    members: Vec<Record>,
    is_loaded: bool,
    membership_dirty: bool,
    /// The owning record for membership-change notifications. Set only for
    /// non-read-only has-many slots.
    owner: Option<Weak<RefCell<RecordInner>>>,
    listeners: Vec<Rc<dyn Fn(RecordEvent)>>,
}

/// Handle to an ordered collection of records; clones share identity.
#[derive(Clone)]
pub struct RecordCollection(Rc<RefCell<CollectionInner>>);

impl Default for RecordCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("RecordCollection")
            .field("len", &inner.members.len())
            .field("is_loaded", &inner.is_loaded)
            .finish_non_exhaustive()
    }
}

impl RecordCollection {
    pub fn new() -> Self {
        Self::with_content(Vec::new())
    }

    /// Build with an initial ordered sequence of records. Initial content
    /// does not count as a membership change.
    pub fn with_content(members: Vec<Record>) -> Self {
        Self(Rc::new(RefCell::new(CollectionInner {
            members,
            is_loaded: false,
            membership_dirty: false,
            owner: None,
            listeners: Vec::new(),
        })))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().members.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Record> {
        self.0.borrow().members.get(index).cloned()
    }

    pub fn first(&self) -> Option<Record> {
        self.get(0)
    }

    /// A snapshot of the current members, in order.
    pub fn members(&self) -> Vec<Record> {
        self.0.borrow().members.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.0.borrow().is_loaded
    }

    /// True if any member is dirty or membership changed since the last
    /// load.
    pub fn is_dirty(&self) -> bool {
        let inner = self.0.borrow();
        inner.membership_dirty || inner.members.iter().any(Record::is_dirty)
    }

    /// Append a record; counts as a membership change.
    pub fn push(&self, record: Record) {
        let owner = {
            let mut inner = self.0.borrow_mut();
            if let Some(owner) = &inner.owner {
                record.add_observer(owner.clone());
            }
            inner.members.push(record);
            inner.membership_dirty = true;
            inner.owner.clone()
        };
        self.notify_owner(owner);
    }

    /// Remove the record at `index`; counts as a membership change.
    pub fn remove(&self, index: usize) -> Option<Record> {
        let (removed, owner) = {
            let mut inner = self.0.borrow_mut();
            if index >= inner.members.len() {
                return None;
            }
            let removed = inner.members.remove(index);
            inner.membership_dirty = true;
            if let Some(owner) = &inner.owner {
                removed.remove_observer(owner);
            }
            (removed, inner.owner.clone())
        };
        self.notify_owner(owner);
        Some(removed)
    }

    fn notify_owner(&self, owner: Option<Weak<RefCell<RecordInner>>>) {
        if let Some(owner) = owner.and_then(|o| o.upgrade()) {
            Record(owner).relationship_became_dirty();
        }
    }

    /// Wire this collection to its owning record for dirty propagation.
    pub(crate) fn attach_owner(&self, owner: Weak<RefCell<RecordInner>>) {
        let members = {
            let mut inner = self.0.borrow_mut();
            inner.owner = Some(owner.clone());
            inner.members.clone()
        };
        for member in members {
            member.add_observer(owner.clone());
        }
    }

    /// Detach from a replaced owner, unhooking its observers.
    pub(crate) fn detach_owner(&self, owner: &Weak<RefCell<RecordInner>>) {
        let members = {
            let mut inner = self.0.borrow_mut();
            inner.owner = None;
            inner.members.clone()
        };
        for member in members {
            member.remove_observer(owner);
        }
    }

    /// Swap in freshly deserialized members; resets membership dirtiness.
    pub(crate) fn replace_members(&self, members: Vec<Record>) {
        let owner = self.0.borrow().owner.clone();
        let old = {
            let mut inner = self.0.borrow_mut();
            std::mem::replace(&mut inner.members, members.clone())
        };
        if let Some(owner) = &owner {
            for member in old {
                member.remove_observer(owner);
            }
            for member in &members {
                member.add_observer(owner.clone());
            }
        }
        self.0.borrow_mut().membership_dirty = false;
    }

    pub(crate) fn set_loaded(&self, loaded: bool) {
        self.0.borrow_mut().is_loaded = loaded;
    }

    pub(crate) fn clean_rec(&self, visited: &mut Vec<*const RefCell<RecordInner>>) {
        let members = {
            let mut inner = self.0.borrow_mut();
            inner.membership_dirty = false;
            inner.members.clone()
        };
        for member in members {
            member.clean_rec_entry(visited);
        }
    }

    /// Mark every member validated.
    pub fn set_validated(&self) {
        for member in self.members() {
            member.set_validated();
        }
    }

    // --- Bulk (de)serialization ---

    /// Deserialize a raw array (or `{plural_key: [...]}` envelope) into
    /// this collection, replacing its members and marking it loaded. Type
    /// names resolve through the client's registry.
    pub fn deserialize_many(
        &self,
        client: &Client,
        target: impl Into<TypeRef>,
        data: &serde_json::Value,
    ) -> Result<()> {
        client
            .serializer()
            .deserialize_many(client, self, &target.into(), data)
    }

    /// Produce an ordered sequence of raw inner objects. The type is
    /// auto-detected from the first member when omitted.
    pub fn serialize_many(&self, model: Option<&ModelType>) -> Result<serde_json::Value> {
        let model = match model {
            Some(model) => model.clone(),
            None => match self.first() {
                Some(member) => member.model(),
                None => return Ok(serde_json::Value::Array(Vec::new())),
            },
        };
        let client = model.client()?;
        client.serializer().serialize_many(&client, self)
    }

    // --- Lifecycle ---

    pub fn on_event(&self, listener: impl Fn(RecordEvent) + 'static) {
        self.0.borrow_mut().listeners.push(Rc::new(listener));
    }

    /// Invoked after a bulk load completes.
    pub fn on_loaded(&self) {
        self.0.borrow_mut().is_loaded = true;
        let listeners = self.0.borrow().listeners.clone();
        for listener in listeners {
            listener(RecordEvent::Loaded);
        }
    }
}
