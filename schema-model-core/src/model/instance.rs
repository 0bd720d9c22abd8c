use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::ModelType;
use crate::error::{ModelError, ModelResult};

/// A stored field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    /// A deep copy of the input value: string, number, boolean, or raw JSON
    /// for `any` fields and schema-less types.
    Scalar(Value),
    Date(DateTime<FixedOffset>),
    Model(Instance),
    Collection(Vec<Instance>),
}

impl FieldValue {
    /// Plain JSON form. Dates are written as RFC 3339 strings.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Scalar(value) => value.clone(),
            Self::Date(date) => Value::String(date.to_rfc3339()),
            Self::Model(instance) => instance.to_value(),
            Self::Collection(items) => Value::Array(items.iter().map(Instance::to_value).collect()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Value::as_str)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_scalar().and_then(Value::as_f64)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_scalar().and_then(Value::as_i64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(Value::as_bool)
    }

    pub fn as_date(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::Date(date) => Some(date),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&Instance> {
        match self {
            Self::Model(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&[Instance]> {
        match self {
            Self::Collection(items) => Some(items),
            _ => None,
        }
    }
}

/// Parses the wire form of a `date` field.
///
/// Accepts RFC 3339 (`2023-02-13T10:00:00-03:00`), a local date-time without
/// offset, or a plain date (`2023-02-13`); the last two are taken as UTC.
pub fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().fixed_offset());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

/// A validated instance of a [`ModelType`].
///
/// Stored fields keep the order in which they were first assigned.
#[derive(Clone)]
pub struct Instance {
    model: Arc<ModelType>,
    fields: Vec<(String, FieldValue)>,
}

impl Instance {
    pub(crate) fn empty(model: Arc<ModelType>) -> Self {
        Self {
            model,
            fields: Vec::new(),
        }
    }

    pub fn model(&self) -> &Arc<ModelType> {
        &self.model
    }

    /// A stored field.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// JSON value of a stored or computed field. Stored fields win.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.field(name) {
            return Some(value.to_value());
        }
        self.model
            .computed_field(name)
            .map(|computed| computed.evaluate(self))
    }

    /// Stored field names followed by computed field names.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.fields.iter().map(|(n, _)| n.as_str()).collect();
        for computed in self.model.computed() {
            if !keys.contains(&computed.name()) {
                keys.push(computed.name());
            }
        }
        keys
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, value)| (n.as_str(), value))
    }

    /// The `id` field, when stored as a scalar.
    pub fn id(&self) -> Option<&Value> {
        self.field("id").and_then(FieldValue::as_scalar)
    }

    /// JSON object with stored fields then computed fields.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.to_value());
        }
        for computed in self.model.computed() {
            if !map.contains_key(computed.name()) {
                map.insert(computed.name().to_string(), computed.evaluate(self));
            }
        }
        Value::Object(map)
    }

    /// JSON object with stored fields only, the shape a backend expects.
    pub fn to_stored_value(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(name, value)| (name.clone(), value.to_value()))
                .collect(),
        )
    }

    /// Deserializes the instance (computed fields included) into a typed value.
    pub fn to_typed<T: DeserializeOwned>(&self) -> ModelResult<T> {
        serde_json::from_value(self.to_value()).map_err(|e| {
            ModelError::invalid_argument(format!(
                "instance of '{}' does not fit the target type: {}",
                self.model.name(),
                e
            ))
        })
    }

    /// Stores a field, keeping the position of an existing one.
    pub(crate) fn assign(&mut self, name: &str, value: FieldValue) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.model, &other.model) && self.fields == other.fields
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.model.name());
        for (name, value) in &self.fields {
            s.field(name, value);
        }
        s.finish()
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
