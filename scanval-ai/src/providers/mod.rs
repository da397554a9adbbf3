//! Analysis Providers
//!
//! Adapters over generative text services plus the [`AnalysisPool`] that runs
//! them. Adapters only move text; every response goes through the same
//! normalization path (`crate::normalize::parse_opinion`) inside the pool.
//!
//! # Provider kinds
//! - **openai** - chat completions (OpenAI, DeepSeek, Mistral and compatible services)
//! - **anthropic** - messages API
//! - **gemini** - generateContent API

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod prompt;

use crate::config::{ProviderConfig, ProviderKind, ServiceConfig};
use crate::normalize;
use crate::throttle::Throttle;
use crate::types::{AnalysisOpinion, AnalysisProvider, ParseOutcome, ProductFacts, ProviderError};
use futures::future::join_all;
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Connection details shared by every provider kind
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Stable provider name
    pub name: String,
    /// Full endpoint URL; kind default when `None`
    pub endpoint: Option<String>,
    pub api_key: String,
    /// Model identifier; kind default when `None`
    pub model: Option<String>,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

/// Sampling temperature sent to every provider
pub(crate) const TEMPERATURE: f32 = 0.2;

pub(crate) fn http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(crate::sources::USER_AGENT)
        .build()
        .map_err(|e| ProviderError::Config(format!("Failed to create HTTP client: {}", e)))
}

pub(crate) async fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        status: status.as_u16(),
        message: normalize::response::excerpt(&body, 200),
    })
}

/// Build configured providers
///
/// Disabled providers and providers without a credential are skipped.
pub fn build_providers(config: &ServiceConfig) -> Vec<Arc<dyn AnalysisProvider>> {
    let mut providers: Vec<Arc<dyn AnalysisProvider>> = Vec::new();

    for provider in config.providers.iter().filter(|p| p.enabled) {
        let api_key = match provider.resolved_credential() {
            Some(key) => key,
            None => {
                info!(provider = %provider.name, "Analysis provider skipped (no credential)");
                continue;
            }
        };

        match build_provider(provider, api_key, config) {
            Ok(adapter) => {
                info!(provider = %provider.name, kind = ?provider.kind, "Analysis provider enabled");
                providers.push(adapter);
            }
            Err(e) => {
                warn!(provider = %provider.name, error = %e, "Analysis provider not available");
            }
        }
    }

    providers
}

fn build_provider(
    provider: &ProviderConfig,
    api_key: String,
    config: &ServiceConfig,
) -> Result<Arc<dyn AnalysisProvider>, ProviderError> {
    let settings = ProviderSettings {
        name: provider.name.clone(),
        endpoint: provider.endpoint.clone(),
        api_key,
        model: provider.model.clone(),
        max_output_tokens: config.analysis.max_output_tokens,
        timeout: config.provider_timeout(),
    };
    let throttle = Throttle::per_second(provider.requests_per_second);

    Ok(match provider.kind {
        ProviderKind::OpenAi => Arc::new(openai::OpenAiClient::new(settings, throttle)?),
        ProviderKind::Anthropic => Arc::new(anthropic::AnthropicClient::new(settings, throttle)?),
        ProviderKind::Gemini => Arc::new(gemini::GeminiClient::new(settings, throttle)?),
    })
}

/// Result of one provider call after normalization
#[derive(Debug)]
pub struct ProviderOutcome {
    pub provider: String,
    pub outcome: ParseOutcome,
    pub elapsed_ms: u64,
}

/// Surviving opinions from one analysis round
#[derive(Debug, Clone, Default)]
pub struct AnalysisRound {
    /// Opinions in provider configuration order
    pub opinions: Vec<AnalysisOpinion>,
    pub attempted: usize,
    pub failed: usize,
}

/// Runs every provider concurrently against the same facts
pub struct AnalysisPool {
    providers: Vec<Arc<dyn AnalysisProvider>>,
    call_timeout: Duration,
}

impl AnalysisPool {
    pub fn new(providers: Vec<Arc<dyn AnalysisProvider>>, call_timeout: Duration) -> Self {
        Self {
            providers,
            call_timeout,
        }
    }

    /// Number of configured providers
    pub fn count(&self) -> usize {
        self.providers.len()
    }

    /// Call every provider and normalize each response
    ///
    /// Errors, timeouts and unparsable text all become `ParseOutcome::Failed`.
    pub async fn analyze_all(&self, facts: &ProductFacts) -> Vec<ProviderOutcome> {
        let prompt = prompt::build_prompt(facts);
        let timeout = self.call_timeout;

        let futures = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            let prompt = &prompt;
            async move {
                let start = Instant::now();
                let result = match tokio::time::timeout(timeout, provider.complete(prompt)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout),
                };
                let elapsed_ms = start.elapsed().as_millis() as u64;

                let outcome = match result {
                    Ok(raw) => normalize::parse_opinion(&raw),
                    Err(e) => ParseOutcome::Failed {
                        error: e.to_string(),
                        raw_excerpt: None,
                    },
                };

                match &outcome {
                    ParseOutcome::Parsed(opinion) => debug!(
                        provider = provider.name(),
                        decision = %opinion.decision,
                        value = opinion.estimated_value,
                        elapsed_ms,
                        "Analysis provider answered"
                    ),
                    ParseOutcome::Failed { error, raw_excerpt } => warn!(
                        provider = provider.name(),
                        error = %error,
                        raw = raw_excerpt.as_deref().unwrap_or(""),
                        elapsed_ms,
                        "Analysis provider dropped"
                    ),
                }

                ProviderOutcome {
                    provider: provider.name().to_string(),
                    outcome,
                    elapsed_ms,
                }
            }
        });

        join_all(futures).await
    }

    /// Call every provider and keep only the successful opinions
    pub async fn analyze(&self, facts: &ProductFacts) -> AnalysisRound {
        let outcomes = self.analyze_all(facts).await;
        let attempted = outcomes.len();

        let (succeeded, failed): (Vec<_>, Vec<_>) =
            outcomes.into_iter().partition(|o| o.outcome.is_success());

        AnalysisRound {
            opinions: succeeded
                .into_iter()
                .filter_map(|o| o.outcome.into_opinion())
                .collect(),
            attempted,
            failed: failed.len(),
        }
    }
}
