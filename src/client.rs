//! HTTP client for REST backends.
//!
//! Thin wrapper over `reqwest` that joins resource paths onto a base URL,
//! attaches the optional bearer token, and maps HTTP failures onto
//! [`ClientError`].

use std::time::Duration;

use reqwest::{Client, Method, StatusCode, Url};
use schema_model_core::ModelError;
use serde_json::Value;
use thiserror::Error;

use crate::config::ClientConfig;

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: API key required or invalid")]
    Unauthorized,

    #[error("Server error: {0}")]
    Server(String),

    #[error("Invalid response body: {0}")]
    InvalidBody(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<ClientError> for ModelError {
    fn from(e: ClientError) -> Self {
        ModelError::from_source(e)
    }
}

/// HTTP client for a REST backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl ApiClient {
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    /// Create with explicit configuration.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join path segments onto the base URL. Each segment is
    /// percent-encoded, so `/`, `?` and `#` stay inside it.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Build a request with optional auth header.
    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Handle response, converting HTTP errors to ClientError.
    /// An empty success body (e.g. 204 No Content) yields `None`.
    async fn handle_response(&self, response: reqwest::Response) -> Result<Option<Value>, ClientError> {
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            if body.trim().is_empty() {
                return Ok(None);
            }
            serde_json::from_str(&body)
                .map(Some)
                .map_err(|e| ClientError::InvalidBody(e.to_string()))
        } else {
            let body = response.text().await.unwrap_or_default();
            match status {
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(body)),
                StatusCode::BAD_REQUEST => Err(ClientError::BadRequest(body)),
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                _ => Err(ClientError::Server(format!("{}: {}", status, body))),
            }
        }
    }

    /// GET a JSON document. An empty body is an error.
    pub async fn get(&self, segments: &[&str]) -> Result<Value, ClientError> {
        let url = self.endpoint(segments)?;
        tracing::debug!("GET {}", url);
        let response = self.request(Method::GET, url).send().await?;
        self.handle_response(response)
            .await?
            .ok_or_else(|| ClientError::InvalidBody("empty response".to_string()))
    }

    /// Send a JSON body with the given method.
    pub async fn send(
        &self,
        method: Method,
        segments: &[&str],
        body: &Value,
    ) -> Result<Option<Value>, ClientError> {
        let url = self.endpoint(segments)?;
        tracing::debug!("{} {}", method, url);
        let response = self.request(method, url).json(body).send().await?;
        self.handle_response(response).await
    }

    /// DELETE a resource.
    pub async fn delete(&self, segments: &[&str]) -> Result<(), ClientError> {
        let url = self.endpoint(segments)?;
        tracing::debug!("DELETE {}", url);
        let response = self.request(Method::DELETE, url).send().await?;
        self.handle_response(response).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:1/api/", None);
        assert_eq!(client.base_url(), "http://localhost:1/api");
    }

    #[test]
    fn test_endpoint_encodes_each_segment() {
        let client = ApiClient::new("http://localhost:1/api/v1/", None);
        let url = client.endpoint(&["users", "a/b?x=1#top"]).unwrap();
        assert_eq!(url.path(), "/api/v1/users/a%2Fb%3Fx=1%23top");
        assert!(url.query().is_none());

        let err = ApiClient::new("not a url", None).endpoint(&["users"]).unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl(_)));
    }

    #[test]
    fn test_client_error_becomes_source_error() {
        let err: ModelError = ClientError::Unauthorized.into();
        assert_eq!(err.kind(), schema_model_core::ErrorKind::Source);
        assert!(err.to_string().contains("Unauthorized"));
    }
}
