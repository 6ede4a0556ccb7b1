//! Code generation gateway backed by the Anthropic Messages API.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::extract;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

const SYSTEM_PROMPT: &str = "You are a senior software engineer who writes complete, runnable programs. \
Answer with at most two sentences of explanation followed by exactly one fenced code block \
tagged with its language (for example ```python). Put the whole program in that one block.";

const IMAGE_PROMPT: &str = "Look at this image. If it shows code, reproduce it as a complete, fixed, runnable program. \
If it shows a task, UI or diagram, write a program that implements it.";

/// Code produced by the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub code: String,
    /// Normalized language name; `"unknown"` when it could not be told.
    pub language: String,
    /// The model's full reply.
    pub raw: String,
}

impl GenerationResult {
    /// Split a model reply into code and language.
    pub fn from_model_text(raw: String) -> Result<Self, GenerationError> {
        let (code, language) = extract::extract_code(&raw).ok_or(GenerationError::Empty)?;
        Ok(Self { code, language, raw })
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation service credential not configured")]
    MissingCredential,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("generation timed out")]
    Timeout,

    #[error("API error: {0}")]
    Api(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("empty response")]
    Empty,
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GenerationError::Timeout
        } else {
            GenerationError::Http(e.to_string())
        }
    }
}

/// Image bytes downloaded from the transport.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub data: Vec<u8>,
    pub media_type: String,
}

/// External service that turns prompts or images into code.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, GenerationError>;

    async fn generate_from_image(
        &self,
        image: ImageInput,
        caption: Option<&str>,
    ) -> Result<GenerationResult, GenerationError>;
}

/// Settings for [`AnthropicGateway`].
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

pub struct AnthropicGateway {
    settings: GatewaySettings,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'static str,
    messages: Vec<ApiMessage>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: String,
    data: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicGateway {
    pub fn new(settings: GatewaySettings) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { settings, http })
    }

    async fn complete(&self, content: Vec<ContentBlock>) -> Result<String, GenerationError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::MissingCredential)?;

        let request = ApiRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            system: SYSTEM_PROMPT,
            messages: vec![ApiMessage { role: "user", content }],
        };

        let response = self
            .http
            .post(API_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        let text: String = api_response
            .content
            .into_iter()
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("\n");

        debug!("Generation reply: {} chars", text.len());
        if text.trim().is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(text)
    }
}

#[async_trait]
impl GenerationGateway for AnthropicGateway {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, GenerationError> {
        info!("🧠 Generating code ({} chars of prompt)", prompt.len());
        let raw = self
            .complete(vec![ContentBlock::Text { text: prompt.to_string() }])
            .await?;
        GenerationResult::from_model_text(raw)
    }

    async fn generate_from_image(
        &self,
        image: ImageInput,
        caption: Option<&str>,
    ) -> Result<GenerationResult, GenerationError> {
        info!("🧠 Generating code from image ({} bytes)", image.data.len());
        let instruction = match caption {
            Some(c) => format!("{IMAGE_PROMPT}\n\nUser request: {c}"),
            None => IMAGE_PROMPT.to_string(),
        };
        let raw = self
            .complete(vec![
                ContentBlock::Image {
                    source: ImageSource {
                        kind: "base64",
                        media_type: image.media_type,
                        data: base64::engine::general_purpose::STANDARD.encode(&image.data),
                    },
                },
                ContentBlock::Text { text: instruction },
            ])
            .await?;
        GenerationResult::from_model_text(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_from_model_text() {
        let result =
            GenerationResult::from_model_text("Sure:\n```python\nprint('hello')\n```".into())
                .unwrap();
        assert_eq!(result.code, "print('hello')");
        assert_eq!(result.language, "python");
        assert!(result.raw.starts_with("Sure:"));
    }

    #[test]
    fn test_result_from_empty_text() {
        assert!(matches!(
            GenerationResult::from_model_text("  ".into()),
            Err(GenerationError::Empty)
        ));
    }

    #[test]
    fn test_image_block_serialization() {
        let block = ContentBlock::Image {
            source: ImageSource {
                kind: "base64",
                media_type: "image/png".into(),
                data: "AAAA".into(),
            },
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "image");
        assert_eq!(value["source"]["type"], "base64");
        assert_eq!(value["source"]["media_type"], "image/png");
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_network() {
        let gateway = AnthropicGateway::new(GatewaySettings {
            api_key: None,
            model: DEFAULT_MODEL.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert!(matches!(
            gateway.generate("hello").await,
            Err(GenerationError::MissingCredential)
        ));
    }
}
