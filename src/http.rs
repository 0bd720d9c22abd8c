//! REST-backed [`ModelSource`].

use std::sync::Arc;

use reqwest::Method;
use schema_model_core::{Instance, ModelError, ModelResult, ModelSource, ModelType};
use serde_json::Value;

use crate::client::ApiClient;

/// Source for one resource collection of a REST backend.
///
/// Records live at `{base}/{resource}` and `{base}/{resource}/{id}`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    model: Arc<ModelType>,
    client: ApiClient,
    resource: String,
}

impl HttpSource {
    pub fn new(model: Arc<ModelType>, client: ApiClient, resource: impl Into<String>) -> Self {
        let resource: String = resource.into();
        Self {
            model,
            client,
            resource: resource.trim_matches('/').to_string(),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    fn collection_segments(&self) -> Vec<&str> {
        self.resource.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Path segments of one record. The id is always a single segment.
    fn record_segments<'a>(&'a self, id: &'a str) -> Vec<&'a str> {
        let mut segments = self.collection_segments();
        segments.push(id);
        segments
    }

    /// Renders an id as it appears in a record URL.
    fn id_segment(&self, id: &Value) -> ModelResult<String> {
        let segment = match id {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            other => {
                return Err(ModelError::invalid_argument(format!(
                    "'{}' ids must be strings or numbers, got {}",
                    self.model.name(),
                    other
                )))
            }
        };
        if matches!(segment.as_str(), "" | "." | "..") {
            return Err(ModelError::invalid_argument(format!(
                "'{}' id {:?} cannot name a record",
                self.model.name(),
                segment
            )));
        }
        Ok(segment)
    }

    fn require_id(&self, instance: &Instance, action: &str) -> ModelResult<String> {
        let id = instance.id().ok_or_else(|| {
            ModelError::invalid_argument(format!(
                "cannot {} a '{}' without an id",
                action,
                self.model.name()
            ))
        })?;
        self.id_segment(id)
    }
}

impl ModelSource for HttpSource {
    fn model(&self) -> &Arc<ModelType> {
        &self.model
    }

    async fn fetch_raw(&self, id: &Value) -> ModelResult<Value> {
        let id = self.id_segment(id)?;
        Ok(self.client.get(&self.record_segments(&id)).await?)
    }

    async fn fetch_collection_raw(&self) -> ModelResult<Value> {
        Ok(self.client.get(&self.collection_segments()).await?)
    }

    async fn save(&self, instance: &Instance) -> ModelResult<Instance> {
        let body = instance.to_stored_value();
        let response = match instance.id() {
            Some(_) => {
                let id = self.require_id(instance, "save")?;
                self.client
                    .send(Method::PUT, &self.record_segments(&id), &body)
                    .await?
            }
            None => {
                self.client
                    .send(Method::POST, &self.collection_segments(), &body)
                    .await?
            }
        };

        match response {
            Some(saved) => {
                tracing::debug!(model = %self.model.name(), "saved record returned by backend");
                self.model.construct(&saved)
            }
            None => Ok(instance.clone()),
        }
    }

    async fn delete(&self, instance: &Instance) -> ModelResult<()> {
        let id = self.require_id(instance, "delete")?;
        self.client.delete(&self.record_segments(&id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> HttpSource {
        let model = ModelType::builder("User").build();
        HttpSource::new(model, ApiClient::new("http://localhost:1", None), "/users/")
    }

    #[test]
    fn test_ids_stay_in_one_segment() {
        let source = source();
        assert_eq!(source.resource(), "users");
        assert_eq!(source.collection_segments(), vec!["users"]);

        let id = source.id_segment(&json!(7)).unwrap();
        assert_eq!(source.record_segments(&id), vec!["users", "7"]);

        let id = source.id_segment(&json!("a/b?x=1")).unwrap();
        let url = source.client.endpoint(&source.record_segments(&id)).unwrap();
        assert_eq!(url.path(), "/users/a%2Fb%3Fx=1");
        assert!(url.query().is_none());

        let id = source.id_segment(&json!("../admin")).unwrap();
        let url = source.client.endpoint(&source.record_segments(&id)).unwrap();
        assert_eq!(url.path(), "/users/..%2Fadmin");
    }

    #[test]
    fn test_ids_that_cannot_name_a_record() {
        let source = source();
        for id in [json!(".."), json!("."), json!(""), json!(true), json!({"id": 1})] {
            let err = source.id_segment(&id).unwrap_err();
            assert_eq!(err.kind(), schema_model_core::ErrorKind::InvalidArgument, "for {}", id);
        }
    }

    #[tokio::test]
    async fn test_delete_without_id_is_rejected() {
        let source = source();
        let draft = source.model().construct(&json!({"name": "Ann"})).unwrap();
        let err = source.delete(&draft).await.unwrap_err();
        assert_eq!(err.kind(), schema_model_core::ErrorKind::InvalidArgument);
    }
}
