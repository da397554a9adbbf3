//! Test Helper Utilities
//!
//! Scriptable identification sources and analysis providers, plus shortcuts for
//! wiring them into an orchestrator.

#![allow(dead_code)]

use async_trait::async_trait;
use scanval_ai::consensus::ConsensusBuilder;
use scanval_ai::orchestrator::Orchestrator;
use scanval_ai::providers::AnalysisPool;
use scanval_ai::sources::IdentificationCoordinator;
use scanval_ai::types::{
    AnalysisPrompt, AnalysisProvider, ProductFacts, ProviderError, SourceError, SourceFetcher,
};
use scanval_common::ResponseCache;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Source timeout used by the helpers
pub const FETCH_TIMEOUT: Duration = Duration::from_millis(200);
/// Provider timeout used by the helpers
pub const PROVIDER_TIMEOUT: Duration = Duration::from_millis(200);

// ============================================================================
// Identification sources
// ============================================================================

enum SourceBehavior {
    Answer(ProductFacts),
    Fail,
}

pub struct MockSource {
    name: &'static str,
    behavior: SourceBehavior,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl MockSource {
    /// Source that answers with `title`
    pub fn answering(name: &'static str, title: &str) -> Self {
        Self {
            name,
            behavior: SourceBehavior::Answer(ProductFacts::new(title, "unused", name)),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Source that has no record
    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            behavior: SourceBehavior::Fail,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delay the answer
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Shared call counter
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl SourceFetcher for MockSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, identifier_code: &str) -> Result<ProductFacts, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match &self.behavior {
            SourceBehavior::Answer(facts) => Ok(facts.clone()),
            SourceBehavior::Fail => Err(SourceError::NotFound(identifier_code.to_string())),
        }
    }
}

// ============================================================================
// Analysis providers
// ============================================================================

enum ProviderBehavior {
    Reply(String),
    Fail,
}

pub struct MockProvider {
    name: String,
    behavior: ProviderBehavior,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Provider that returns `text` verbatim
    pub fn replying(name: &str, text: &str) -> Self {
        Self {
            name: name.to_string(),
            behavior: ProviderBehavior::Reply(text.to_string()),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Provider that returns a clean opinion document
    pub fn voting(name: &str, item_name: &str, decision: &str, value: f64) -> Self {
        let text = serde_json::json!({
            "itemName": item_name,
            "estimatedValue": value,
            "decision": decision,
            "valuationFactors": ["Demand", "Condition", "Rarity", "Comparable sales", "Fees"],
            "summaryReasoning": format!("{} at about ${:.2}", decision, value),
            "confidence": 0.8,
            "category": "electronics",
        })
        .to_string();
        Self::replying(name, &text)
    }

    /// Provider whose call fails
    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            behavior: ProviderBehavior::Fail,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl AnalysisProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, _prompt: &AnalysisPrompt) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match &self.behavior {
            ProviderBehavior::Reply(text) => Ok(text.clone()),
            ProviderBehavior::Fail => Err(ProviderError::Api {
                status: 503,
                message: "Service unavailable".to_string(),
            }),
        }
    }
}

// ============================================================================
// Wiring
// ============================================================================

/// Orchestrator over mocks, without a cache
pub fn orchestrator(sources: Vec<MockSource>, providers: Vec<MockProvider>) -> Orchestrator {
    Orchestrator::new(
        coordinator(sources),
        pool(providers),
        ConsensusBuilder::new(),
    )
}

/// Orchestrator over mocks with an identification cache
pub fn cached_orchestrator(
    sources: Vec<MockSource>,
    providers: Vec<MockProvider>,
    cache: Arc<ResponseCache<String, ProductFacts>>,
) -> Orchestrator {
    Orchestrator::new(
        coordinator(sources).with_cache(cache),
        pool(providers),
        ConsensusBuilder::new(),
    )
}

fn coordinator(sources: Vec<MockSource>) -> IdentificationCoordinator {
    let fetchers: Vec<Arc<dyn SourceFetcher>> = sources
        .into_iter()
        .map(|s| Arc::new(s) as Arc<dyn SourceFetcher>)
        .collect();
    IdentificationCoordinator::new(fetchers, FETCH_TIMEOUT)
}

fn pool(providers: Vec<MockProvider>) -> AnalysisPool {
    let providers: Vec<Arc<dyn AnalysisProvider>> = providers
        .into_iter()
        .map(|p| Arc::new(p) as Arc<dyn AnalysisProvider>)
        .collect();
    AnalysisPool::new(providers, PROVIDER_TIMEOUT)
}
