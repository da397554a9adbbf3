//! Gemini generateContent client
//!
//! # API Reference
//! - Endpoint: `POST https://generativelanguage.googleapis.com/v1beta/models/<model>:generateContent`
//! - Auth: `x-goog-api-key` header

use super::{check_status, http_client, ProviderSettings, TEMPERATURE};
use crate::throttle::Throttle;
use crate::types::{AnalysisPrompt, AnalysisProvider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

pub struct GeminiClient {
    name: String,
    http_client: Client,
    endpoint: String,
    api_key: String,
    max_tokens: u32,
    throttle: Throttle,
}

impl GeminiClient {
    pub fn new(settings: ProviderSettings, throttle: Throttle) -> Result<Self, ProviderError> {
        let model = settings.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Ok(Self {
            http_client: http_client(settings.timeout)?,
            endpoint: settings
                .endpoint
                .unwrap_or_else(|| format!("{}/{}:generateContent", GEMINI_BASE_URL, model)),
            name: settings.name,
            api_key: settings.api_key,
            max_tokens: settings.max_output_tokens,
            throttle,
        })
    }
}

#[async_trait]
impl AnalysisProvider for GeminiClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &AnalysisPrompt) -> Result<String, ProviderError> {
        self.throttle.ready().await;

        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: &prompt.system }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: &prompt.user }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_tokens,
                temperature: TEMPERATURE,
            },
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let body: GenerateResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Malformed generateContent response: {}", e)))?;

        debug!(provider = %self.name, candidates = body.candidates.len(), "Generation received");

        text_from_response(body)
    }
}

/// Text parts of the first candidate
fn text_from_response(body: GenerateResponse) -> Result<String, ProviderError> {
    let text: String = body
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(ProviderError::EmptyResponse)
    } else {
        Ok(text)
    }
}

// ============================================================================
// generateContent Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}
