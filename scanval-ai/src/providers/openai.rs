//! OpenAI-compatible chat completions client
//!
//! Also used for DeepSeek, Mistral and local servers that speak the same
//! request/response format.
//!
//! # API Reference
//! - Endpoint: `POST https://api.openai.com/v1/chat/completions`
//! - Auth: `Authorization: Bearer <key>`

use super::{check_status, http_client, ProviderSettings, TEMPERATURE};
use crate::throttle::Throttle;
use crate::types::{AnalysisPrompt, AnalysisProvider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAiClient {
    name: String,
    http_client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    throttle: Throttle,
}

impl OpenAiClient {
    pub fn new(settings: ProviderSettings, throttle: Throttle) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: http_client(settings.timeout)?,
            endpoint: settings.endpoint.unwrap_or_else(|| OPENAI_ENDPOINT.to_string()),
            model: settings.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            name: settings.name,
            api_key: settings.api_key,
            max_tokens: settings.max_output_tokens,
            throttle,
        })
    }
}

#[async_trait]
impl AnalysisProvider for OpenAiClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &AnalysisPrompt) -> Result<String, ProviderError> {
        self.throttle.ready().await;

        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: TEMPERATURE,
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let body: ChatResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Malformed chat completion: {}", e)))?;

        debug!(provider = %self.name, choices = body.choices.len(), "Chat completion received");

        text_from_response(body)
    }
}

fn text_from_response(body: ChatResponse) -> Result<String, ProviderError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(ProviderError::EmptyResponse)
}

// ============================================================================
// Chat Completions Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}
