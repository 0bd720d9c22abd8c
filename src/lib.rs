//! Schema-validated client-side models backed by REST data sources.
//!
//! The model machinery lives in [`schema_model_core`] and is re-exported here.
//! This crate adds the HTTP side: [`client::ApiClient`], the
//! [`http::HttpSource`] data source, [`config::ClientConfig`], and
//! [`registry::ModelRegistry`] for declaring models in JSON.

pub mod client;
pub mod config;
pub mod http;
pub mod registry;

pub use schema_model_core::*;

pub use client::{ApiClient, ClientError};
pub use config::ClientConfig;
pub use http::HttpSource;
pub use registry::ModelRegistry;
