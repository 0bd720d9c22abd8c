//! Model declarations loaded from JSON.
//!
//! ```json
//! {
//!   "Address": { "city": "string", "zip": ["isPostalCode", "BR"] },
//!   "User": {
//!     "name": "string",
//!     "nickname": "string?",
//!     "address": { "model": "Address" }
//!   },
//!   "Anything": null
//! }
//! ```
//!
//! A `null` declaration is a schema-less type. A `{"model": ..}` field refers
//! to another declared model and may carry `"nullable": true`.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use schema_model_core::{
    Directive, FieldSpec, ModelError, ModelResult, ModelType, RuleRegistry, Schema,
};
use serde_json::{Map, Value};

/// Named model types in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<(String, Arc<ModelType>)>,
}

/// Build state of one declaration while resolving references.
enum Slot {
    Pending,
    Building,
    Built(Arc<ModelType>),
}

struct Resolver<'a> {
    declarations: &'a Map<String, Value>,
    slots: Vec<(String, Slot)>,
    rules: Arc<RuleRegistry>,
}

impl Resolver<'_> {
    fn slot_mut(&mut self, name: &str) -> Option<&mut Slot> {
        self.slots
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, slot)| slot)
    }

    fn resolve(&mut self, name: &str) -> ModelResult<Arc<ModelType>> {
        match self.slot_mut(name) {
            Some(Slot::Built(model)) => return Ok(Arc::clone(model)),
            Some(Slot::Building) => {
                return Err(ModelError::invalid_argument(format!(
                    "model '{}' refers back to itself through its sub-models",
                    name
                )))
            }
            Some(slot) => *slot = Slot::Building,
            None => {
                return Err(ModelError::invalid_argument(format!(
                    "model '{}' is not declared",
                    name
                )))
            }
        }

        let declarations = self.declarations;
        let declaration = &declarations[name];
        let builder = ModelType::builder(name).rules(Arc::clone(&self.rules));
        let model = match declaration {
            Value::Null => builder.build(),
            Value::Object(fields) => {
                let mut schema = Schema::new();
                for (attr, directive) in fields {
                    let spec = self.field_spec(name, attr, directive)?;
                    schema.insert(attr.clone(), spec);
                }
                builder.schema(schema).build()
            }
            other => {
                return Err(ModelError::invalid_argument(format!(
                    "model '{}' must be declared as an object or null, got {}",
                    name, other
                )))
            }
        };

        if let Some(slot) = self.slot_mut(name) {
            *slot = Slot::Built(Arc::clone(&model));
        }
        Ok(model)
    }

    fn field_spec(&mut self, model: &str, attr: &str, directive: &Value) -> ModelResult<FieldSpec> {
        let Value::Object(reference) = directive else {
            let spec = FieldSpec::from_json(directive)?;
            if let Directive::Rule { name, .. } = &spec.directive {
                if !self.rules.contains(name) {
                    tracing::warn!(model, attr, rule = %name, "field uses an unregistered rule");
                }
            }
            return Ok(spec);
        };

        let target = reference
            .get("model")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ModelError::invalid_argument(format!(
                    "field '{}.{}' must name a model in its \"model\" key",
                    model, attr
                ))
            })?;
        if !self.declarations.contains_key(target) {
            return Err(ModelError::UnknownSubModel {
                model: model.to_string(),
                attr: attr.to_string(),
            });
        }

        let spec = FieldSpec::from(self.resolve(target)?);
        match reference.get("nullable").and_then(Value::as_bool) {
            Some(true) => Ok(spec.nullable()),
            _ => Ok(spec),
        }
    }
}

impl ModelRegistry {
    /// Builds every declared model with the built-in rules.
    pub fn from_json(declarations: &Value) -> ModelResult<Self> {
        Self::from_json_with_rules(declarations, RuleRegistry::builtin())
    }

    /// Builds every declared model, validating named rules against `rules`.
    pub fn from_json_with_rules(declarations: &Value, rules: Arc<RuleRegistry>) -> ModelResult<Self> {
        let declarations = declarations.as_object().ok_or_else(|| {
            ModelError::invalid_argument("model declarations must be a JSON object")
        })?;

        let mut resolver = Resolver {
            declarations,
            slots: declarations
                .keys()
                .map(|name| (name.clone(), Slot::Pending))
                .collect(),
            rules,
        };

        let mut models = Vec::with_capacity(declarations.len());
        for name in declarations.keys() {
            let model = resolver.resolve(name)?;
            models.push((name.clone(), model));
        }

        tracing::debug!(count = models.len(), "loaded model declarations");
        Ok(Self { models })
    }

    pub fn parse(content: &str) -> Result<Self> {
        let declarations: Value =
            serde_json::from_str(content).context("Failed to parse model declarations")?;
        Ok(Self::from_json(&declarations)?)
    }

    /// Load declarations from a JSON file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model declarations from {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ModelType>> {
        self.models
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, model)| model)
    }

    /// Like [`ModelRegistry::get`], with an error naming the known models.
    pub fn require(&self, name: &str) -> Result<&Arc<ModelType>> {
        self.get(name).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown model '{}' (declared: {})",
                name,
                self.names().collect::<Vec<_>>().join(", ")
            )
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<ModelType>)> {
        self.models.iter().map(|(n, model)| (n.as_str(), model))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_model_core::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_shared_sub_model_is_built_once() {
        let registry = ModelRegistry::from_json(&json!({
            "Order": {"billing": {"model": "Address"}, "shipping": {"model": "Address"}},
            "Address": {"city": "string"}
        }))
        .unwrap();

        let order = registry.get("Order").unwrap();
        let schema = order.schema().unwrap();
        let billing = match &schema.get("billing").unwrap().directive {
            Directive::SubModel(model) => Arc::clone(model),
            other => panic!("unexpected directive {:?}", other),
        };
        assert!(Arc::ptr_eq(&billing, registry.get("Address").unwrap()));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Order", "Address"]);
    }

    #[test]
    fn test_cycles_are_rejected() {
        let err = ModelRegistry::from_json(&json!({
            "A": {"b": {"model": "B"}},
            "B": {"a": {"model": "A"}}
        }))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("refers back to itself"));
    }

    #[test]
    fn test_undeclared_reference() {
        let err = ModelRegistry::from_json(&json!({"A": {"b": {"model": "Missing"}}})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownSubModel);
    }

    #[test]
    fn test_non_object_root() {
        let err = ModelRegistry::from_json(&json!(["A"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
