//! HTTP object store
//!
//! Objects live at `{endpoint}/{key}`: `HEAD` checks existence, `PUT` uploads,
//! and the same URL serves the object publicly unless another base is given.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

use crate::naming::join_url;
use crate::storage::{ObjectStore, StorageError, StorageResult};

/// Object store speaking plain HTTP
pub struct HttpObjectStore {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> StorageResult<Self> {
        let endpoint = endpoint.into();
        // Fail early on an unusable endpoint
        join_url(&endpoint, "key")?;

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Full URL of an object
    pub fn object_url(&self, key: &str) -> StorageResult<String> {
        join_url(&self.endpoint, key)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    #[instrument(skip(self), fields(store = "http"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let url = self.object_url(key)?;
        let response = self.authorize(self.client.head(&url)).send().await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(StorageError::BackendError(format!(
                "HEAD {} returned {}",
                url, status
            ))),
        }
    }

    #[instrument(skip(self, data), fields(store = "http", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        let url = self.object_url(key)?;
        let response = self
            .authorize(self.client.put(&url))
            .header(CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::BackendError(format!(
                "PUT {} returned {}",
                url, status
            )));
        }

        debug!(url = %url, "Object stored");
        Ok(())
    }

    fn public_url(&self, key: &str, base: Option<&str>) -> Option<String> {
        join_url(base.unwrap_or(&self.endpoint), key).ok()
    }

    fn name(&self) -> &str {
        "http"
    }
}
