//! # Schema Declarations
//!
//! A [`Schema`] is the explicit per-type metadata that replaces a host
//! framework's class-property scanning: attribute and relationship
//! descriptors are declared once with builder calls at type-definition time
//! and cached on the registered model type.
//!
//! ```
//! use restless::{AttrType, Schema};
//!
//! let post = Schema::new()
//!     .attr("slug", AttrType::String)
//!     .attr("title", AttrType::String)
//!     .attr("createdAt", AttrType::Date)
//!     .has_many("tags", "tag");
//! ```

use crate::client::ModelType;
use crate::record::Record;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// The primitive wire types with a registered [`Transform`](crate::Transform).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrType {
    String,
    Number,
    Boolean,
    Date,
}

/// A reference to a related model type: either a direct handle or a name
/// resolved lazily through the client's type registry.
#[derive(Clone)]
pub enum TypeRef {
    Name(String),
    Type(ModelType),
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "TypeRef::Name({name:?})"),
            Self::Type(model) => write!(f, "TypeRef::Type({:?})", model.name()),
        }
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<ModelType> for TypeRef {
    fn from(model: ModelType) -> Self {
        Self::Type(model)
    }
}

impl From<&ModelType> for TypeRef {
    fn from(model: &ModelType) -> Self {
        Self::Type(model.clone())
    }
}

/// A default for an attribute: a plain value, or a producer evaluated
/// lazily with the record in scope and memoized per instance.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    Computed(Rc<dyn Fn(&Record) -> Value>),
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "DefaultValue::Value({v:?})"),
            Self::Computed(_) => write!(f, "DefaultValue::Computed(..)"),
        }
    }
}

/// Options applied to an attribute declaration.
#[derive(Debug, Clone, Default)]
pub struct AttrOptions {
    pub(crate) default: Option<DefaultValue>,
    pub(crate) read_only: bool,
    pub(crate) key: Option<String>,
}

impl AttrOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fixed default applied on first read when no value is present.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    /// A lazy default computed in the record's own context on first read,
    /// then memoized for the record's lifetime.
    pub fn default_fn(mut self, f: impl Fn(&Record) -> Value + 'static) -> Self {
        self.default = Some(DefaultValue::Computed(Rc::new(f)));
        self
    }

    /// Read-only attributes deserialize normally but are excluded from
    /// serialized output.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Explicit wire key, overriding the snake_case derivation.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Options applied to a relationship declaration.
#[derive(Debug, Clone, Default)]
pub struct RelOptions {
    pub(crate) read_only: bool,
    pub(crate) key: Option<String>,
}

impl RelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// A read-only relationship never propagates dirtiness to its owner and
    /// is excluded from serialized output.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Declares a typed field on a record type. Immutable once declared.
#[derive(Debug, Clone)]
pub struct AttributeDescriptor {
    pub name: String,
    /// `None` means untyped: values pass through the natural JSON mapping.
    pub attr_type: Option<AttrType>,
    pub(crate) default: Option<DefaultValue>,
    pub read_only: bool,
    pub key: Option<String>,
}

/// BelongsTo holds zero or one related record; HasMany holds a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    BelongsTo,
    HasMany,
}

/// Declares a belongs-to or has-many association on a record type.
#[derive(Debug, Clone)]
pub struct RelationshipDescriptor {
    pub name: String,
    pub target: TypeRef,
    pub cardinality: Cardinality,
    pub read_only: bool,
    pub key: Option<String>,
}

/// Combined descriptor metadata, as exposed by [`Schema::fields`].
#[derive(Debug, Clone)]
pub enum FieldDescriptor<'a> {
    Attribute(&'a AttributeDescriptor),
    Relationship(&'a RelationshipDescriptor),
}

/// The declared attribute and relationship metadata for one model type.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    attributes: Vec<AttributeDescriptor>,
    relationships: Vec<RelationshipDescriptor>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a typed attribute.
    pub fn attr(self, name: &str, attr_type: AttrType) -> Self {
        self.attr_with(name, Some(attr_type), AttrOptions::new())
    }

    /// Declare an untyped attribute; values pass through unchanged.
    pub fn attr_untyped(self, name: &str) -> Self {
        self.attr_with(name, None, AttrOptions::new())
    }

    /// Declare an attribute with explicit options.
    pub fn attr_with(mut self, name: &str, attr_type: Option<AttrType>, opts: AttrOptions) -> Self {
        self.attributes.push(AttributeDescriptor {
            name: name.to_string(),
            attr_type,
            default: opts.default,
            read_only: opts.read_only,
            key: opts.key,
        });
        self
    }

    /// Declare a single-valued association.
    pub fn belongs_to(self, name: &str, target: impl Into<TypeRef>) -> Self {
        self.belongs_to_with(name, target, RelOptions::new())
    }

    pub fn belongs_to_with(
        mut self,
        name: &str,
        target: impl Into<TypeRef>,
        opts: RelOptions,
    ) -> Self {
        self.relationships.push(RelationshipDescriptor {
            name: name.to_string(),
            target: target.into(),
            cardinality: Cardinality::BelongsTo,
            read_only: opts.read_only,
            key: opts.key,
        });
        self
    }

    /// Declare a collection-valued association.
    pub fn has_many(self, name: &str, target: impl Into<TypeRef>) -> Self {
        self.has_many_with(name, target, RelOptions::new())
    }

    pub fn has_many_with(
        mut self,
        name: &str,
        target: impl Into<TypeRef>,
        opts: RelOptions,
    ) -> Self {
        self.relationships.push(RelationshipDescriptor {
            name: name.to_string(),
            target: target.into(),
            cardinality: Cardinality::HasMany,
            read_only: opts.read_only,
            key: opts.key,
        });
        self
    }

    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    pub fn relationships(&self) -> &[RelationshipDescriptor] {
        &self.relationships
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Every declared field name with its descriptor metadata, in
    /// declaration order. Yields straight from the stored descriptors
    /// without rebuilding anything per call.
    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldDescriptor<'_>)> {
        let attrs = self
            .attributes
            .iter()
            .map(|a| (a.name.as_str(), FieldDescriptor::Attribute(a)));
        let rels = self
            .relationships
            .iter()
            .map(|r| (r.name.as_str(), FieldDescriptor::Relationship(r)));
        attrs.chain(rels)
    }
}
