//! Schema type definitions.
//!
//! A schema maps attribute names to a [`FieldSpec`]: a [`Directive`] that
//! governs acceptable values plus a nullability flag.
//!
//! Directive strings use a small vocabulary:
//! - `any`: no validation
//! - `boolean` / `number` / `string`: exact JSON type match
//! - `date`: RFC 3339 or `YYYY-MM-DD` string
//! - anything else: a named rule, e.g. `isEmail`
//!
//! A trailing `?` (`"string?"`) marks the field nullable.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::model::ModelType;

/// JSON primitive kinds that a field can be pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Boolean,
    Number,
    String,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
        }
    }

    /// Returns true if `value` has exactly this JSON type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Boolean => value.is_boolean(),
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
        }
    }
}

impl FromStr for PrimitiveKind {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        match s {
            "boolean" => Ok(Self::Boolean),
            "number" => Ok(Self::Number),
            "string" => Ok(Self::String),
            other => Err(ModelError::invalid_argument(format!(
                "'{}' is not a primitive type",
                other
            ))),
        }
    }
}

/// The rule governing one attribute's acceptable values.
#[derive(Clone)]
pub enum Directive {
    /// Accepts anything, including nested objects and arrays kept as raw JSON.
    Any,
    Primitive(PrimitiveKind),
    /// Date-like string, materialized as a `DateTime`.
    Date,
    /// Nested object (or array of objects) built as instances of another type.
    SubModel(Arc<ModelType>),
    /// Named rule from the model's rule registry, with extra arguments.
    Rule { name: String, args: Vec<Value> },
}

impl Directive {
    /// Resolves a directive name. Unrecognised names are rule identifiers.
    pub fn parse(name: &str) -> Self {
        match name {
            "any" => Self::Any,
            "date" => Self::Date,
            other => match other.parse::<PrimitiveKind>() {
                Ok(kind) => Self::Primitive(kind),
                Err(_) => Self::Rule {
                    name: other.to_string(),
                    args: Vec::new(),
                },
            },
        }
    }

    /// Builds a named rule directive with arguments.
    pub fn rule(name: impl Into<String>, args: impl IntoIterator<Item = Value>) -> Self {
        Self::Rule {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Short description used in error messages and listings.
    pub fn describe(&self) -> String {
        match self {
            Self::Any => "any".to_string(),
            Self::Primitive(kind) => kind.as_str().to_string(),
            Self::Date => "date".to_string(),
            Self::SubModel(model) => format!("model {}", model.name()),
            Self::Rule { name, args } if args.is_empty() => name.clone(),
            Self::Rule { name, args } => format!("{} {}", name, Value::Array(args.clone())),
        }
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubModel(model) => f.debug_tuple("SubModel").field(&model.name()).finish(),
            Self::Any => write!(f, "Any"),
            Self::Primitive(kind) => f.debug_tuple("Primitive").field(kind).finish(),
            Self::Date => write!(f, "Date"),
            Self::Rule { name, args } => f
                .debug_struct("Rule")
                .field("name", name)
                .field("args", args)
                .finish(),
        }
    }
}

/// Field definition: a directive plus whether `null` is accepted.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub directive: Directive,
    pub nullable: bool,
}

impl FieldSpec {
    pub fn new(directive: Directive) -> Self {
        Self {
            directive,
            nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Returns true if `null` passes validation for this field.
    pub fn accepts_null(&self) -> bool {
        self.nullable || matches!(self.directive, Directive::Any)
    }

    /// Parses the JSON form of a directive: `"name"`, `"name?"` or
    /// `["ruleName", arg1, arg2, ...]`.
    ///
    /// Sub-model references cannot be expressed here; they need a registry
    /// to resolve the model name.
    pub fn from_json(value: &Value) -> ModelResult<Self> {
        match value {
            Value::String(s) => Ok(Self::from(s.as_str())),
            Value::Array(items) => {
                let (head, args) = items.split_first().ok_or_else(|| {
                    ModelError::invalid_argument("directive array must name a rule")
                })?;
                let name = head.as_str().ok_or_else(|| {
                    ModelError::invalid_argument(format!(
                        "directive array must start with a rule name, got {}",
                        head
                    ))
                })?;
                let spec = Self::from(name);
                // ["string"] is the same as "string"
                if args.is_empty() {
                    return Ok(spec);
                }
                match spec.directive {
                    Directive::Rule { name, .. } => Ok(Self {
                        directive: Directive::Rule {
                            name,
                            args: args.to_vec(),
                        },
                        nullable: spec.nullable,
                    }),
                    other => Err(ModelError::invalid_argument(format!(
                        "directive '{}' does not take arguments",
                        other.describe()
                    ))),
                }
            }
            other => Err(ModelError::invalid_argument(format!(
                "unsupported directive {}",
                other
            ))),
        }
    }
}

impl From<&str> for FieldSpec {
    fn from(name: &str) -> Self {
        match name.strip_suffix('?') {
            Some(base) => Self::new(Directive::parse(base)).nullable(),
            None => Self::new(Directive::parse(name)),
        }
    }
}

impl From<Directive> for FieldSpec {
    fn from(directive: Directive) -> Self {
        Self::new(directive)
    }
}

impl From<PrimitiveKind> for FieldSpec {
    fn from(kind: PrimitiveKind) -> Self {
        Self::new(Directive::Primitive(kind))
    }
}

impl From<Arc<ModelType>> for FieldSpec {
    fn from(model: Arc<ModelType>) -> Self {
        Self::new(Directive::SubModel(model))
    }
}

impl From<&Arc<ModelType>> for FieldSpec {
    fn from(model: &Arc<ModelType>) -> Self {
        Self::new(Directive::SubModel(Arc::clone(model)))
    }
}

/// Ordered mapping from attribute name to field definition.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(String, FieldSpec)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field, replacing any earlier declaration of the same name.
    pub fn field(mut self, name: impl Into<String>, spec: impl Into<FieldSpec>) -> Self {
        self.insert(name, spec);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: impl Into<FieldSpec>) {
        let name = name.into();
        let spec = spec.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = spec,
            None => self.fields.push((name, spec)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| spec)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(n, spec)| (n.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
