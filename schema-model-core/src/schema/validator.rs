//! Field validation against a model's schema.
//!
//! Checks run in a fixed order and the first matching case decides:
//! 1. schema-less model: accept
//! 2. undeclared attribute: `UnknownAttribute`
//! 3. `null`: accepted only for `any` or nullable fields
//! 4. `any`: accept
//! 5. sub-model: accept objects and arrays, deferring to sub-model construction
//! 6. `date`: RFC 3339 / `YYYY-MM-DD` string
//! 7. primitive: exact JSON type
//! 8. named rule: registry lookup, then the rule itself

use serde_json::Value;

use super::rules::RuleRegistry;
use super::types::{Directive, FieldSpec};
use crate::error::{json_type_name, ModelError, ModelResult};
use crate::model::{parse_date, ModelType};

/// Validates `value` for attribute `attr` of `model`.
pub fn validate(model: &ModelType, attr: &str, value: &Value) -> ModelResult<()> {
    let Some(schema) = model.schema() else {
        return Ok(());
    };

    // Undeclared attributes are rejected before the null check, so a null
    // value does not slip an unknown attribute past the schema.
    let spec = schema
        .get(attr)
        .ok_or_else(|| ModelError::UnknownAttribute {
            model: model.name().to_string(),
            attr: attr.to_string(),
        })?;

    validate_field(model.name(), model.rules(), attr, spec, value)
}

/// Validates a value against a single field definition.
///
/// Kept separate from [`validate`] so a directive can be checked without a
/// model around it.
pub fn validate_field(
    model: &str,
    rules: &RuleRegistry,
    attr: &str,
    spec: &FieldSpec,
    value: &Value,
) -> ModelResult<()> {
    let mismatch = |expected: &str| ModelError::TypeMismatch {
        model: model.to_string(),
        attr: attr.to_string(),
        expected: expected.to_string(),
        actual: json_type_name(value).to_string(),
    };

    if value.is_null() {
        if spec.accepts_null() {
            return Ok(());
        }
        return Err(mismatch(&format!("non-null {}", spec.directive.describe())));
    }

    match &spec.directive {
        Directive::Any => Ok(()),

        Directive::SubModel(_) => {
            if value.is_object() || value.is_array() {
                Ok(())
            } else {
                Err(mismatch("object"))
            }
        }

        Directive::Date => match value.as_str() {
            Some(s) if parse_date(s).is_some() => Ok(()),
            _ => Err(mismatch("date")),
        },

        Directive::Primitive(kind) => {
            if kind.matches(value) {
                Ok(())
            } else {
                Err(mismatch(kind.as_str()))
            }
        }

        Directive::Rule { name, args } => {
            if !rules.contains(name) {
                return Err(ModelError::UnknownValidator {
                    model: model.to_string(),
                    attr: attr.to_string(),
                    rule: name.clone(),
                });
            }

            let Some(s) = value.as_str() else {
                return Err(mismatch("string"));
            };

            if rules.check(name, s, args) == Some(true) {
                Ok(())
            } else {
                tracing::debug!(model, attr, rule = %name, "rule rejected value");
                Err(ModelError::Validation {
                    model: model.to_string(),
                    attr: attr.to_string(),
                    rule: name.clone(),
                    args: args.clone(),
                })
            }
        }
    }
}
