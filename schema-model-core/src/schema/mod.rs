//! Schema declarations and validation.
//!
//! A model's schema is optional: a model without one accepts any attribute
//! and any value. With a schema, every attribute must be declared and every
//! value must satisfy its field's [`Directive`].

mod rules;
mod types;
mod validator;

pub use rules::{RuleFn, RuleRegistry};
pub use types::{Directive, FieldSpec, PrimitiveKind, Schema};
pub use validator::{validate, validate_field};
