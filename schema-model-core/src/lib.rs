//! Schema-validated client-side models.
//!
//! Plain JSON goes in; validated [`Instance`]s come out, with nested
//! sub-models materialized as child instances and computed fields exposed next
//! to stored ones. Results can be wrapped in a [`Reactive`] handle for UI
//! layers, and a [`ModelSource`] supplies fetch/save/delete against a backend.
//!
//! ```
//! use schema_model_core::{ModelType, Schema};
//! use serde_json::json;
//!
//! let address = ModelType::builder("Address")
//!     .schema(Schema::new().field("city", "string"))
//!     .build();
//! let user = ModelType::builder("User")
//!     .schema(
//!         Schema::new()
//!             .field("name", "string")
//!             .field("email", "isEmail")
//!             .field("address", &address),
//!     )
//!     .build();
//!
//! let ann = user
//!     .construct(&json!({"name": "Ann", "email": "ann@example.com", "address": {"city": "X"}}))
//!     .unwrap();
//! let city = ann.field("address").and_then(|a| a.as_model()).unwrap();
//! assert_eq!(city.get("city"), Some(json!("X")));
//! ```

pub mod error;
pub mod model;
pub mod reactive;
pub mod schema;
pub mod source;

pub use error::{ErrorKind, ModelError, ModelResult};
pub use model::{ComputedField, FieldValue, Instance, ModelType, ModelTypeBuilder};
pub use reactive::Reactive;
pub use schema::{Directive, FieldSpec, PrimitiveKind, RuleRegistry, Schema};
pub use source::{fetch_and_refresh, Fetched, MemorySource, ModelSource};
