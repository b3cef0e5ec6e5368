//! AI-assist text generation client.

use crate::client::{HttpTransport, ReqwestTransport};
use crate::config::AssetConfig;
use crate::error::GenerateError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the assistant should do with the selected text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum AssistKind {
    #[default]
    FixGrammar,
    Rewrite,
    Expand,
    Translate { target_language: String },
}

impl AssistKind {
    /// Wire name of the generation type.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssistKind::FixGrammar => "fix_grammar",
            AssistKind::Rewrite => "rewrite",
            AssistKind::Expand => "expand",
            AssistKind::Translate { .. } => "translate",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssistKind::FixGrammar => "Fix grammar",
            AssistKind::Rewrite => "Rewrite",
            AssistKind::Expand => "Expand",
            AssistKind::Translate { .. } => "Translate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub kind: AssistKind,
    pub text: String,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_language: Option<&'a str>,
}

impl GenerationRequest {
    pub fn new(kind: AssistKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// JSON body: `{type, text[, target_language]}`.
    pub fn to_json(&self) -> serde_json::Value {
        let target_language = match &self.kind {
            AssistKind::Translate { target_language } => Some(target_language.as_str()),
            _ => None,
        };
        let wire = WireRequest {
            kind: self.kind.as_str(),
            text: &self.text,
            target_language,
        };
        serde_json::to_value(wire).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub result: String,
    #[serde(default)]
    pub credits_used: u32,
    #[serde(default)]
    pub remaining_credits: u32,
}

#[derive(Deserialize)]
struct PaymentRequired {
    detail: String,
}

#[async_trait(?Send)]
pub trait TextGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerateError>;
}

pub struct GenerationClient<T = ReqwestTransport> {
    config: AssetConfig,
    transport: T,
}

impl<T: HttpTransport> GenerationClient<T> {
    pub fn new(config: AssetConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

fn failed(status: Option<u16>, body: impl Into<String>) -> GenerateError {
    GenerateError::Failed {
        status,
        body: body.into(),
    }
}

#[async_trait(?Send)]
impl<T: HttpTransport> TextGenerator for GenerationClient<T> {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerateError> {
        let url = self
            .config
            .endpoint(&self.config.generate_path)
            .ok_or_else(|| failed(None, format!("invalid base url `{}`", self.config.base_url)))?;
        log::debug!("requesting {} for {} chars", request.kind.as_str(), request.text.chars().count());

        let response = self
            .transport
            .post_json(&url, &request.to_json(), self.config.api_token.as_deref())
            .await
            .map_err(|e| failed(None, e.to_string()))?;

        if response.status == 402 {
            let detail = serde_json::from_str::<PaymentRequired>(&response.body)
                .map(|p| p.detail)
                .unwrap_or(response.body);
            return Err(GenerateError::InsufficientCredits { detail });
        }
        if !response.is_success() {
            return Err(failed(Some(response.status), response.body));
        }
        serde_json::from_str(&response.body)
            .map_err(|e| failed(Some(response.status), format!("malformed generation response: {e}")))
    }
}
