//! Client for uploading multipart bodies over HTTP.

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tracing::debug;

use crate::{
    body::Body, composer::MultipartComposer, error::MultipartError, models::ComposerConfig,
};

/// Uploads [`MultipartComposer`] bodies with an exact `Content-Length`.
#[derive(Debug, Clone)]
pub struct MultipartClient {
    client: reqwest::Client,
    config: ComposerConfig,
    upload_url: Option<String>,
}

impl MultipartClient {
    /// Creates a new client with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ComposerConfig::default())
    }

    /// Creates a new client streaming bodies according to `config`.
    pub fn with_config(config: ComposerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            upload_url: None,
        }
    }

    /// Replaces the underlying HTTP client.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Creates a new client from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `MULTIPART_UPLOAD_URL` - The default upload endpoint
    /// * `MULTIPART_BOUNDARY`, `MULTIPART_CHUNK_SIZE` - See [`ComposerConfig::from_env`]
    ///
    /// # Errors
    ///
    /// Returns an error if the upload URL is not set or the configuration is invalid.
    pub fn from_env() -> Result<Self, MultipartError> {
        let upload_url = std::env::var("MULTIPART_UPLOAD_URL")?;
        let mut client = Self::with_config(ComposerConfig::from_env()?);
        client.upload_url = Some(upload_url);
        Ok(client)
    }

    /// The configuration used to build and stream bodies.
    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// The default upload endpoint, if one was configured.
    pub fn upload_url(&self) -> Option<&str> {
        self.upload_url.as_deref()
    }

    /// Posts `composer` to `url`.
    ///
    /// The content type and length are taken from the composer before anything is
    /// sent; the body is then streamed part by part.
    ///
    /// # Errors
    ///
    /// Returns [`MultipartError::LengthUnknown`] if the body length cannot be computed,
    /// or an error if the request fails or the server answers with a non-success status.
    pub async fn post(
        &self,
        url: &str,
        composer: MultipartComposer,
    ) -> Result<reqwest::Response, MultipartError> {
        let content_length = composer.content_length()?;
        let content_type = composer.content_type().to_string();
        debug!(url, content_length, %content_type, "posting multipart body");

        let body = reqwest::Body::wrap_stream(composer.into_stream(&self.config));
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, content_length)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(MultipartError::new(format!(
                "Request failed with status {}: {}",
                status, error_body
            )));
        }

        Ok(response)
    }

    /// Posts `composer` to `url` and parses the JSON response.
    pub async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        composer: MultipartComposer,
    ) -> Result<T, MultipartError> {
        let text = self.post(url, composer).await?.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Posts `composer` to the configured upload URL.
    pub async fn upload(
        &self,
        composer: MultipartComposer,
    ) -> Result<reqwest::Response, MultipartError> {
        let url = self
            .upload_url
            .as_deref()
            .ok_or_else(|| MultipartError::new("No upload URL configured"))?;
        self.post(url, composer).await
    }
}

impl Default for MultipartClient {
    fn default() -> Self {
        Self::new()
    }
}
