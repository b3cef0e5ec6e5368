//! Client configuration for the asset and generation endpoints.

use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Endpoint and policy settings shared by the upload and generation
/// clients. Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Origin (and optional prefix) of the reporting API.
    pub base_url: String,
    pub upload_path: String,
    pub generate_path: String,
    pub max_upload_bytes: u64,
    /// Bearer token for the generation endpoint.
    pub api_token: Option<String>,
    /// Reject files whose leading bytes contradict their declared image type.
    pub sniff_content: bool,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            upload_path: "/uploads/screenshot".to_string(),
            generate_path: "/ai/generate".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            api_token: None,
            sniff_content: true,
        }
    }
}

impl AssetConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Absolute URL of an API path, keeping any prefix of `base_url`.
    pub fn endpoint(&self, path: &str) -> Option<Url> {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}")).ok()
    }

    /// Make a URL returned by the API absolute. Absolute URLs pass through;
    /// paths resolve against the base URL's origin.
    pub fn absolute_url(&self, url: &str) -> Option<String> {
        if let Ok(absolute) = Url::parse(url) {
            return Some(absolute.to_string());
        }
        let base = Url::parse(&self.base_url).ok()?;
        base.join(url).ok().map(|u| u.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn endpoint_keeps_prefix() {
        let config = AssetConfig::default().with_base_url("https://api.example.com/v1/");
        assert_eq!(
            config.endpoint("/uploads/screenshot").map(String::from),
            Some("https://api.example.com/v1/uploads/screenshot".to_string())
        );
    }

    #[test]
    fn relative_urls_become_absolute() {
        let config = AssetConfig::default().with_base_url("https://api.example.com");
        assert_eq!(
            config.absolute_url("/uploads/ab12.png").as_deref(),
            Some("https://api.example.com/uploads/ab12.png")
        );
        assert_eq!(
            config.absolute_url("https://cdn.example.com/x.png").as_deref(),
            Some("https://cdn.example.com/x.png")
        );
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: AssetConfig =
            serde_json::from_str(r#"{"base_url":"https://r.example.com","api_token":"t"}"#).unwrap();
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.upload_path, "/uploads/screenshot");
        assert!(config.sniff_content);
        assert_eq!(config.api_token.as_deref(), Some("t"));
    }
}
