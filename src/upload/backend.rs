//! Backend Client
//!
//! The three HTTP exchanges of an upload:
//!
//! - `GET {endpoint}?key={name}` → `{ "presigned_url": ... }`
//! - `PUT {presigned_url}` with the raw file bytes
//! - `POST {endpoint}` with `{ "link": ... }` → `{ "output_link": ... }`
//!
//! [`UploadBackend`] is the seam the controller drives. [`HttpBackend`] is the
//! reqwest implementation.

use crate::config::Config;
use crate::models::{
    OutputLink, PresignedUrlResponse, ProcessRequest, ProcessResponse, SelectedFile,
};
use crate::types::{AppResult, StepFailure};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

#[async_trait]
pub trait UploadBackend: Send + Sync {
    /// Ask the backend for a write URL for an object named `key`
    async fn presigned_url(&self, key: &str) -> Result<String, StepFailure>;

    /// Store the file bytes at the presigned URL
    async fn upload(&self, presigned_url: &str, file: &SelectedFile) -> Result<(), StepFailure>;

    /// Tell the backend where the object landed and get the output link back
    async fn process(&self, object_url: &str) -> Result<OutputLink, StepFailure>;
}

/// reqwest-backed client for the upload endpoint
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    endpoint: String,
}

impl HttpBackend {
    /// Create a client for `endpoint`. Without a timeout the client default applies.
    pub fn new(endpoint: impl Into<String>, timeout: Option<std::time::Duration>) -> AppResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(config.endpoint.clone(), config.request_timeout())
    }

    /// Underlying HTTP client, shared with output downloads
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl UploadBackend for HttpBackend {
    async fn presigned_url(&self, key: &str) -> Result<String, StepFailure> {
        debug!(key = %key, "Requesting presigned URL");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("key", key)])
            .send()
            .await
            .map_err(StepFailure::Transport)?;

        let body: PresignedUrlResponse = read_json(ensure_success(response).await?).await?;
        Ok(body.presigned_url)
    }

    async fn upload(&self, presigned_url: &str, file: &SelectedFile) -> Result<(), StepFailure> {
        debug!(file = %file.name, bytes = file.len(), "Uploading to presigned URL");

        let response = self
            .client
            .put(presigned_url)
            .header(CONTENT_TYPE, file.content_type.as_str())
            .body(file.bytes.clone())
            .send()
            .await
            .map_err(StepFailure::Transport)?;

        // Body is ignored
        ensure_success(response).await?;
        Ok(())
    }

    async fn process(&self, object_url: &str) -> Result<OutputLink, StepFailure> {
        debug!(link = %object_url, "Requesting processing");

        // .json() sets Content-Type: application/json
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ProcessRequest { link: object_url })
            .send()
            .await
            .map_err(StepFailure::Transport)?;

        let body: ProcessResponse = read_json(ensure_success(response).await?).await?;
        Ok(body.output_link)
    }
}

/// Turn any non-2xx response into [`StepFailure::Status`]
async fn ensure_success(response: Response) -> Result<Response, StepFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(StepFailure::Status { status, body })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, StepFailure> {
    let bytes = response.bytes().await.map_err(StepFailure::Transport)?;
    serde_json::from_slice(&bytes).map_err(|e| StepFailure::Decode(e.to_string()))
}
