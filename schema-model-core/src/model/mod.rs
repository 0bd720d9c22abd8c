//! Model types and their instances.
//!
//! # Core Concepts
//!
//! - [`ModelType`]: a named type with an optional [`Schema`], a list of
//!   computed fields, and the rule registry its named directives resolve
//!   against. Types are shared as `Arc<ModelType>`; a sub-model directive
//!   holds the `Arc` of the nested type, so schemas form a tree and cannot
//!   be cyclic.
//! - [`Instance`]: validated data materialized from plain JSON. Owns its
//!   fields; nested sub-models are freshly built instances, never aliases of
//!   the input.
//! - Computed fields: read-only values derived from an instance, listed next
//!   to stored fields in [`Instance::keys`] and in serialized output.

mod instance;
mod materialize;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::schema::{RuleRegistry, Schema};

pub use instance::{parse_date, FieldValue, Instance};

/// Getter for a computed field.
pub type ComputedFn = dyn Fn(&Instance) -> Value + Send + Sync;

/// A read-only field derived from an instance's stored values.
#[derive(Clone)]
pub struct ComputedField {
    name: String,
    getter: Arc<ComputedFn>,
}

impl ComputedField {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn evaluate(&self, instance: &Instance) -> Value {
        (self.getter)(instance)
    }
}

impl fmt::Debug for ComputedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedField")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A model type: name, optional schema, computed fields and rules.
#[derive(Debug)]
pub struct ModelType {
    name: String,
    schema: Option<Schema>,
    computed: Vec<ComputedField>,
    rules: Arc<RuleRegistry>,
}

impl ModelType {
    pub fn builder(name: impl Into<String>) -> ModelTypeBuilder {
        ModelTypeBuilder {
            name: name.into(),
            schema: None,
            computed: Vec::new(),
            rules: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema, or `None` for a schema-less type that accepts anything.
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn computed(&self) -> &[ComputedField] {
        &self.computed
    }

    pub fn computed_field(&self, name: &str) -> Option<&ComputedField> {
        self.computed.iter().find(|c| c.name == name)
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }
}

/// Builder for [`ModelType`].
pub struct ModelTypeBuilder {
    name: String,
    schema: Option<Schema>,
    computed: Vec<ComputedField>,
    rules: Option<Arc<RuleRegistry>>,
}

impl ModelTypeBuilder {
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Declares a computed field. A later declaration with the same name
    /// replaces the earlier one.
    pub fn computed<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&Instance) -> Value + Send + Sync + 'static,
    {
        let field = ComputedField {
            name: name.into(),
            getter: Arc::new(getter),
        };
        self.computed.retain(|c| c.name != field.name);
        self.computed.push(field);
        self
    }

    /// Rule registry used for named directives. Defaults to the built-ins.
    pub fn rules(mut self, rules: Arc<RuleRegistry>) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn build(self) -> Arc<ModelType> {
        Arc::new(ModelType {
            name: self.name,
            schema: self.schema,
            computed: self.computed,
            rules: self.rules.unwrap_or_else(RuleRegistry::builtin),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_defaults() {
        let model = ModelType::builder("Loose").build();
        assert_eq!(model.name(), "Loose");
        assert!(model.schema().is_none());
        assert!(model.computed().is_empty());
        assert!(model.rules().contains("isEmail"));
    }

    #[test]
    fn test_computed_redeclaration_replaces() {
        let model = ModelType::builder("User")
            .computed("label", |_| json!("first"))
            .computed("label", |_| json!("second"))
            .build();
        assert_eq!(model.computed().len(), 1);
        let instance = model.construct(&json!({})).unwrap();
        assert_eq!(instance.get("label"), Some(json!("second")));
    }

    #[test]
    fn test_custom_rules() {
        let mut rules = RuleRegistry::new();
        rules.register("isShout", |s, _| s.ends_with('!'));
        let model = ModelType::builder("Shout")
            .schema(Schema::new().field("text", "isShout"))
            .rules(Arc::new(rules))
            .build();
        assert!(model.construct(&json!({"text": "hey!"})).is_ok());
        assert!(model.construct(&json!({"text": "hey"})).is_err());
        assert!(!model.rules().contains("isEmail"));
    }
}
