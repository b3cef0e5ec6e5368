//! Screenshot upload client.
//!
//! Validation happens before any I/O: size first, then declared type, then
//! (optionally) the file's leading bytes. The network goes through the
//! [`HttpTransport`] trait so tests can count calls without a server.

use crate::config::AssetConfig;
use crate::error::UploadError;
use crate::file::{ImageFormat, LocalFile};
use async_trait::async_trait;
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Transport ───────────────────────────────────────────────────────────

/// Status and text body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError(err.to_string())
    }
}

/// Minimal HTTP surface used by the clients.
///
/// Futures are not `Send`: the editor runs on a single-threaded event loop.
#[async_trait(?Send)]
pub trait HttpTransport {
    /// POST a multipart form holding one file field.
    async fn post_multipart(
        &self,
        url: &Url,
        field: &str,
        file: &LocalFile,
    ) -> Result<HttpResponse, TransportError>;

    /// POST a JSON body, optionally with a bearer token.
    async fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, TransportError>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

async fn into_response(response: reqwest::Response) -> Result<HttpResponse, TransportError> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(HttpResponse { status, body })
}

#[async_trait(?Send)]
impl HttpTransport for ReqwestTransport {
    async fn post_multipart(
        &self,
        url: &Url,
        field: &str,
        file: &LocalFile,
    ) -> Result<HttpResponse, TransportError> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime)?;
        let form = Form::new().part(field.to_string(), part);
        let response = self.client.post(url.clone()).multipart(form).send().await?;
        into_response(response).await
    }

    async fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.post(url.clone()).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        into_response(request.send().await?).await
    }
}

// ─── Upload client ───────────────────────────────────────────────────────

/// Where an uploaded file can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub url: String,
}

/// Validates and uploads image files.
#[async_trait(?Send)]
pub trait AssetUploader {
    /// Check a file against the upload policy without any I/O.
    fn validate(&self, file: &LocalFile) -> Result<(), UploadError>;

    /// Validate, then upload. Never retries.
    async fn upload(&self, file: &LocalFile) -> Result<UploadResult, UploadError>;
}

pub struct UploadClient<T = ReqwestTransport> {
    config: AssetConfig,
    transport: T,
}

impl<T: HttpTransport> UploadClient<T> {
    pub fn new(config: AssetConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &AssetConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

fn failed(status: Option<u16>, body: impl Into<String>) -> UploadError {
    UploadError::UploadFailed {
        status,
        body: body.into(),
    }
}

#[async_trait(?Send)]
impl<T: HttpTransport> AssetUploader for UploadClient<T> {
    fn validate(&self, file: &LocalFile) -> Result<(), UploadError> {
        let limit = self.config.max_upload_bytes;
        if file.size() > limit {
            return Err(UploadError::FileTooLarge {
                size: file.size(),
                limit,
            });
        }
        if !file.is_image() {
            return Err(UploadError::UnsupportedType {
                mime: file.mime.clone(),
            });
        }
        if self.config.sniff_content
            && let Some(declared) = ImageFormat::from_mime(&file.mime)
            && ImageFormat::sniff(&file.bytes) != Some(declared)
        {
            log::debug!("{}: content does not match {}", file.name, file.mime);
            return Err(UploadError::UnsupportedType {
                mime: file.mime.clone(),
            });
        }
        Ok(())
    }

    async fn upload(&self, file: &LocalFile) -> Result<UploadResult, UploadError> {
        self.validate(file)?;

        let url = self
            .config
            .endpoint(&self.config.upload_path)
            .ok_or_else(|| failed(None, format!("invalid base url `{}`", self.config.base_url)))?;
        log::debug!("uploading {} ({} bytes) to {url}", file.name, file.size());

        let response = self
            .transport
            .post_multipart(&url, "file", file)
            .await
            .map_err(|e| failed(None, e.to_string()))?;
        if !response.is_success() {
            log::warn!("upload of {} rejected with {}", file.name, response.status);
            return Err(failed(Some(response.status), response.body));
        }

        let result: UploadResult = serde_json::from_str(&response.body)
            .map_err(|e| failed(Some(response.status), format!("malformed upload response: {e}")))?;
        let url = self
            .config
            .absolute_url(&result.url)
            .ok_or_else(|| failed(Some(response.status), format!("unusable url `{}`", result.url)))?;
        Ok(UploadResult { url })
    }
}
