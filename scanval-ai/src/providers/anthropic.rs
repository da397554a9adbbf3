//! Anthropic messages API client
//!
//! # API Reference
//! - Endpoint: `POST https://api.anthropic.com/v1/messages`
//! - Auth: `x-api-key` header plus `anthropic-version`

use super::{check_status, http_client, ProviderSettings, TEMPERATURE};
use crate::throttle::Throttle;
use crate::types::{AnalysisPrompt, AnalysisProvider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";

pub struct AnthropicClient {
    name: String,
    http_client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    throttle: Throttle,
}

impl AnthropicClient {
    pub fn new(settings: ProviderSettings, throttle: Throttle) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: http_client(settings.timeout)?,
            endpoint: settings.endpoint.unwrap_or_else(|| ANTHROPIC_ENDPOINT.to_string()),
            model: settings.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            name: settings.name,
            api_key: settings.api_key,
            max_tokens: settings.max_output_tokens,
            throttle,
        })
    }
}

#[async_trait]
impl AnalysisProvider for AnthropicClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &AnalysisPrompt) -> Result<String, ProviderError> {
        self.throttle.ready().await;

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: TEMPERATURE,
            system: &prompt.system,
            messages: [UserMessage {
                role: "user",
                content: &prompt.user,
            }],
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let body: MessagesResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Malformed messages response: {}", e)))?;

        debug!(
            provider = %self.name,
            stop_reason = body.stop_reason.as_deref().unwrap_or("unknown"),
            "Message received"
        );

        text_from_response(body)
    }
}

/// Concatenate the text blocks of a response
fn text_from_response(body: MessagesResponse) -> Result<String, ProviderError> {
    let text: String = body
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();

    if text.trim().is_empty() {
        Err(ProviderError::EmptyResponse)
    } else {
        Ok(text)
    }
}

// ============================================================================
// Messages API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}
