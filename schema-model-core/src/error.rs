//! Error taxonomy for validation, materialization and data sources.
//!
//! Every error is raised synchronously at the point of failure and surfaces
//! unchanged to the caller of `create`/`construct`/`set_value`. Construction is
//! all-or-nothing: no partially built instance is ever returned.

use serde_json::Value;
use thiserror::Error;

/// Errors raised by models, instances and data sources.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Malformed call: missing data, wrong shape, array where object expected.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Input field has no matching schema entry.
    #[error("in model '{model}', property '{attr}' does not exist")]
    UnknownAttribute { model: String, attr: String },

    /// Object-valued field has no declared sub-model type.
    #[error("in model '{model}', sub-model '{attr}' does not exist")]
    UnknownSubModel { model: String, attr: String },

    /// The value's JSON type disagrees with the schema directive.
    #[error("in model '{model}', property '{attr}' must be {expected}, got {actual}")]
    TypeMismatch {
        model: String,
        attr: String,
        expected: String,
        actual: String,
    },

    /// Named rule not found in the rule registry.
    #[error("in model '{model}', property '{attr}': validator '{rule}' does not exist")]
    UnknownValidator {
        model: String,
        attr: String,
        rule: String,
    },

    /// Named rule was invoked and rejected the value.
    #[error("in model '{model}', property '{attr}' is invalid '{rule}'{}", rules_suffix(.args))]
    Validation {
        model: String,
        attr: String,
        rule: String,
        args: Vec<Value>,
    },

    /// A data source extension point was invoked without being overridden.
    #[error("method {method}() not implemented yet")]
    NotImplemented { method: &'static str },

    /// An element of a collection failed to materialize.
    #[error("collection element {index}: {source}")]
    Collection {
        index: usize,
        #[source]
        source: Box<ModelError>,
    },

    /// Transport or backend failure reported by a data source.
    #[error("data source error: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

fn rules_suffix(args: &[Value]) -> String {
    if args.is_empty() {
        String::new()
    } else {
        format!(". Rules: {}", Value::Array(args.to_vec()))
    }
}

/// Flat classification of a [`ModelError`], looking through collection wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    UnknownAttribute,
    UnknownSubModel,
    TypeMismatch,
    UnknownValidator,
    Validation,
    NotImplemented,
    Source,
}

impl ModelError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn from_source(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Source(Box::new(err))
    }

    /// Returns the kind of the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::UnknownAttribute { .. } => ErrorKind::UnknownAttribute,
            Self::UnknownSubModel { .. } => ErrorKind::UnknownSubModel,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::UnknownValidator { .. } => ErrorKind::UnknownValidator,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotImplemented { .. } => ErrorKind::NotImplemented,
            Self::Collection { source, .. } => source.kind(),
            Self::Source(_) => ErrorKind::Source,
        }
    }

    /// Wraps an element error with its position in the input array.
    pub(crate) fn at_index(self, index: usize) -> Self {
        Self::Collection {
            index,
            source: Box::new(self),
        }
    }
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Returns the JSON type name of a value for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
