//! Materialization of plain JSON into validated instances.
//!
//! For each `(attr, value)` of the input object, in input order:
//! validate, then build the stored value. Objects and arrays under a
//! sub-model directive recurse into the sub-model type; everything else is
//! deep-copied. The first error aborts the whole construction.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use super::instance::parse_date;
use super::{FieldValue, Instance, ModelType};
use crate::error::{json_type_name, ModelError, ModelResult};
use crate::reactive::Reactive;
use crate::schema::{validate, Directive};

fn expect_object<'a>(model: &ModelType, data: &'a Value) -> ModelResult<&'a Map<String, Value>> {
    match data {
        Value::Object(map) => Ok(map),
        Value::Null => Err(ModelError::invalid_argument(format!(
            "data for '{}' was not provided or is null",
            model.name()
        ))),
        Value::Array(_) => Err(ModelError::invalid_argument(format!(
            "array is not allowed for '{}'; use a collection to build many instances",
            model.name()
        ))),
        other => Err(ModelError::invalid_argument(format!(
            "data for '{}' must be a plain object, got {}",
            model.name(),
            json_type_name(other)
        ))),
    }
}

/// Builds the stored value for an attribute that already passed validation.
fn materialize_field(model: &ModelType, attr: &str, value: &Value) -> ModelResult<FieldValue> {
    let directive = model
        .schema()
        .and_then(|schema| schema.get(attr))
        .map(|spec| &spec.directive);

    match (value, directive) {
        (Value::Null, _) => Ok(FieldValue::Null),

        (Value::Object(_), Some(Directive::SubModel(sub))) => {
            sub.construct(value).map(FieldValue::Model)
        }
        (Value::Array(_), Some(Directive::SubModel(sub))) => {
            sub.construct_collection(value).map(FieldValue::Collection)
        }

        // Raw JSON is kept only where no shape is declared.
        (Value::Object(_) | Value::Array(_), None | Some(Directive::Any)) => {
            Ok(FieldValue::Scalar(value.clone()))
        }
        (Value::Object(_) | Value::Array(_), Some(_)) => Err(ModelError::UnknownSubModel {
            model: model.name().to_string(),
            attr: attr.to_string(),
        }),

        (Value::String(s), Some(Directive::Date)) => parse_date(s)
            .map(FieldValue::Date)
            .ok_or_else(|| ModelError::TypeMismatch {
                model: model.name().to_string(),
                attr: attr.to_string(),
                expected: "date".to_string(),
                actual: "string".to_string(),
            }),

        _ => Ok(FieldValue::Scalar(value.clone())),
    }
}

impl ModelType {
    /// Builds an instance from a JSON object.
    pub fn construct(self: &Arc<Self>, data: &Value) -> ModelResult<Instance> {
        let map = expect_object(self, data)?;
        let mut instance = Instance::empty(Arc::clone(self));
        for (attr, value) in map {
            instance.apply(attr, value)?;
        }
        tracing::trace!(model = %self.name, fields = map.len(), "materialized instance");
        Ok(instance)
    }

    /// Builds one instance per element of a JSON array, preserving order.
    pub fn construct_collection(self: &Arc<Self>, data: &Value) -> ModelResult<Vec<Instance>> {
        let Value::Array(items) = data else {
            return Err(ModelError::invalid_argument(format!(
                "collection data for '{}' must be an array, got {}",
                self.name,
                json_type_name(data)
            )));
        };
        items
            .iter()
            .enumerate()
            .map(|(index, item)| self.construct(item).map_err(|e| e.at_index(index)))
            .collect()
    }

    /// Builds an instance from any serializable value.
    ///
    /// Fields that serde skips (e.g. `None` under
    /// `skip_serializing_if = "Option::is_none"`) are left unassigned.
    pub fn create_from<T: Serialize>(self: &Arc<Self>, data: &T) -> ModelResult<Instance> {
        let value = serde_json::to_value(data).map_err(|e| {
            ModelError::invalid_argument(format!("data for '{}' is not serializable: {}", self.name, e))
        })?;
        self.construct(&value)
    }

    /// Builds an instance and wraps it in a reactive handle.
    pub fn create(self: &Arc<Self>, data: &Value) -> ModelResult<Reactive<Instance>> {
        self.construct(data).map(Reactive::new)
    }

    /// Builds a collection and wraps it in a reactive handle.
    pub fn create_collection(self: &Arc<Self>, data: &Value) -> ModelResult<Reactive<Vec<Instance>>> {
        self.construct_collection(data).map(Reactive::new)
    }
}

impl Instance {
    fn apply(&mut self, attr: &str, value: &Value) -> ModelResult<()> {
        validate(self.model(), attr, value)?;
        let field = materialize_field(self.model(), attr, value)?;
        self.assign(attr, field);
        Ok(())
    }

    /// Validates and assigns one attribute. Objects and arrays under a
    /// sub-model directive become new child instances.
    pub fn set_value(&mut self, attr: &str, value: &Value) -> ModelResult<()> {
        self.patch([(attr, Some(value.clone()))])
    }

    /// Validates and assigns every attribute of a JSON object.
    ///
    /// Attributes not present in `data` are left untouched; nothing is
    /// removed.
    pub fn set_values(&mut self, data: &Value) -> ModelResult<()> {
        let map = expect_object(self.model(), data)?;
        self.patch(map.iter().map(|(attr, value)| (attr.as_str(), Some(value.clone()))))
    }

    /// Applies a partial update. `None` entries mean "undefined" and leave
    /// the current value as it is.
    ///
    /// The update is all-or-nothing: if any entry fails, the instance keeps
    /// its previous state.
    pub fn patch<I, K>(&mut self, entries: I) -> ModelResult<()>
    where
        I: IntoIterator<Item = (K, Option<Value>)>,
        K: AsRef<str>,
    {
        let mut staged = self.clone();
        for (attr, value) in entries {
            if let Some(value) = value {
                staged.apply(attr.as_ref(), &value)?;
            }
        }
        *self = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::Schema;
    use serde_json::json;

    fn person() -> Arc<ModelType> {
        ModelType::builder("Person")
            .schema(Schema::new().field("name", "string").field("age", "number"))
            .build()
    }

    #[test]
    fn test_construct_rejects_non_objects() {
        let model = person();
        for data in [json!(null), json!([]), json!("Ann"), json!(3)] {
            let err = model.construct(&data).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "for {}", data);
        }
    }

    #[test]
    fn test_construct_collection_requires_array() {
        let err = person().construct_collection(&json!({"name": "Ann"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_collection_error_reports_index() {
        let err = person()
            .construct_collection(&json!([{"name": "Ann"}, {"name": 7}]))
            .unwrap_err();
        match err {
            ModelError::Collection { index, source } => {
                assert_eq!(index, 1);
                assert_eq!(source.kind(), ErrorKind::TypeMismatch);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_keeps_input_order() {
        let instance = person()
            .construct(&json!({"age": 30, "name": "Ann"}))
            .unwrap();
        assert_eq!(instance.keys(), vec!["age", "name"]);
    }

    #[test]
    fn test_patch_is_all_or_nothing() {
        let mut instance = person().construct(&json!({"name": "Ann", "age": 30})).unwrap();
        let result = instance.patch([
            ("name", Some(json!("Bob"))),
            ("age", Some(json!("old"))),
        ]);
        assert!(result.is_err());
        assert_eq!(instance.get("name"), Some(json!("Ann")));
        assert_eq!(instance.get("age"), Some(json!(30)));
    }
}
