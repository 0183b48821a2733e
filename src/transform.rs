//! # Transforms
//!
//! A [`Transform`] is the bidirectional conversion between the wire
//! representation and the in-memory [`Value`] for one primitive type.
//!
//! Deserialization is deliberately lenient: a transform that cannot coerce
//! a malformed wire value returns `None`, and the serializer degrades that
//! single field to `Value::Null` instead of aborting the whole load.
//! Serialization is strict: a value of the wrong variant serializes as
//! JSON `null`.

use crate::schema::AttrType;
use crate::value::Value;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::rc::Rc;

/// Bidirectional wire conversion for one primitive type.
pub trait Transform {
    /// Convert an in-memory value to its wire representation.
    fn serialize(&self, value: &Value) -> serde_json::Value;

    /// Coerce a wire value into an in-memory value. `None` signals a
    /// malformed value; the caller degrades the field to null.
    fn deserialize(&self, raw: &serde_json::Value) -> Option<Value>;
}

pub struct StringTransform;

impl Transform for StringTransform {
    fn serialize(&self, value: &Value) -> serde_json::Value {
        match value {
            Value::String(s) => serde_json::Value::String(s.clone()),
            _ => serde_json::Value::Null,
        }
    }

    fn deserialize(&self, raw: &serde_json::Value) -> Option<Value> {
        match raw {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Number(n) => Some(Value::String(n.to_string())),
            serde_json::Value::Bool(b) => Some(Value::String(b.to_string())),
            _ => None,
        }
    }
}

pub struct NumberTransform;

impl Transform for NumberTransform {
    fn serialize(&self, value: &Value) -> serde_json::Value {
        match value {
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            _ => serde_json::Value::Null,
        }
    }

    fn deserialize(&self, raw: &serde_json::Value) -> Option<Value> {
        match raw {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number),
            serde_json::Value::String(s) => s.parse::<f64>().ok().map(Value::Number),
            serde_json::Value::Bool(b) => Some(Value::Number(if *b { 1.0 } else { 0.0 })),
            _ => None,
        }
    }
}

pub struct BooleanTransform;

impl Transform for BooleanTransform {
    fn serialize(&self, value: &Value) -> serde_json::Value {
        match value {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            _ => serde_json::Value::Null,
        }
    }

    fn deserialize(&self, raw: &serde_json::Value) -> Option<Value> {
        match raw {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => Some(Value::Bool(n.as_f64() != Some(0.0))),
            serde_json::Value::String(s) => match s.as_str() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Dates travel as RFC 3339 strings or numeric epoch seconds and live in
/// memory as `chrono` timestamps with their original offset.
pub struct DateTransform;

impl Transform for DateTransform {
    fn serialize(&self, value: &Value) -> serde_json::Value {
        match value {
            Value::Date(d) => serde_json::Value::String(d.to_rfc3339()),
            _ => serde_json::Value::Null,
        }
    }

    fn deserialize(&self, raw: &serde_json::Value) -> Option<Value> {
        match raw {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::String(s) => {
                DateTime::parse_from_rfc3339(s).ok().map(Value::Date)
            }
            serde_json::Value::Number(n) => {
                let secs = n.as_i64()?;
                match Utc.timestamp_opt(secs, 0) {
                    chrono::LocalResult::Single(d) => Some(Value::Date(d.fixed_offset())),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Pluggable serialize/deserialize functions per primitive type. The
/// defaults cover string, number, boolean, and date; applications may
/// replace any of them on the client.
pub struct TransformRegistry {
    transforms: HashMap<AttrType, Rc<dyn Transform>>,
}

impl TransformRegistry {
    pub fn register(&mut self, attr_type: AttrType, transform: Rc<dyn Transform>) {
        self.transforms.insert(attr_type, transform);
    }

    pub fn get(&self, attr_type: AttrType) -> Option<Rc<dyn Transform>> {
        self.transforms.get(&attr_type).cloned()
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        let mut transforms: HashMap<AttrType, Rc<dyn Transform>> = HashMap::new();
        transforms.insert(AttrType::String, Rc::new(StringTransform));
        transforms.insert(AttrType::Number, Rc::new(NumberTransform));
        transforms.insert(AttrType::Boolean, Rc::new(BooleanTransform));
        transforms.insert(AttrType::Date, Rc::new(DateTransform));
        Self { transforms }
    }
}
