//! Core Types and Trait Definitions for scanval-ai
//!
//! Defines the data model shared by the pipeline stages and the two adapter seams:
//! - **Identification:** [`SourceFetcher`] (product lookup by scanned code)
//! - **Analysis:** [`AnalysisProvider`] (generative valuation opinion)
//!
//! Everything flowing downstream of an adapter is typed; raw provider text is
//! turned into a [`ParseOutcome`] before anything else looks at it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of valuation factors every opinion carries
pub const VALUATION_FACTOR_COUNT: usize = 5;

/// Source name used for synthesized placeholder facts
pub const PLACEHOLDER_SOURCE: &str = "placeholder";

// ============================================================================
// Identification
// ============================================================================

/// Descriptive facts about a scanned item
///
/// Produced by one identification source, or synthesized when none answered.
/// Read-only input to every analysis provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductFacts {
    pub title: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    /// Always the caller-supplied code, whichever source answered
    pub identifier_code: String,
    pub price: Option<f64>,
    pub description: Option<String>,
    /// Source that produced these facts
    pub source_name: String,
}

impl ProductFacts {
    /// Minimal facts with only a title, as returned by a source adapter
    pub fn new(title: impl Into<String>, identifier_code: &str, source_name: &str) -> Self {
        Self {
            title: title.into(),
            brand: None,
            category: None,
            identifier_code: identifier_code.to_string(),
            price: None,
            description: None,
            source_name: source_name.to_string(),
        }
    }

    /// Placeholder used when every identification source failed
    pub fn placeholder(identifier_code: &str) -> Self {
        Self::new(
            format!("Product {}", identifier_code),
            identifier_code,
            PLACEHOLDER_SOURCE,
        )
    }

    /// Whether these facts are good enough to analyze
    pub fn is_usable(&self) -> bool {
        !self.title.trim().is_empty()
    }

    pub fn is_placeholder(&self) -> bool {
        self.source_name == PLACEHOLDER_SOURCE
    }
}

/// Identification source adapter
///
/// One read-only lookup per call, no internal retries. Implementations apply
/// their own request timeout; the coordinator adds a hard ceiling on top.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Stable adapter name for logging and provenance
    fn name(&self) -> &'static str;

    /// Look up a scanned code
    ///
    /// # Errors
    /// Returns `SourceError` for any failure, including "no match"
    async fn fetch(&self, identifier_code: &str) -> Result<ProductFacts, SourceError>;
}

/// Identification source failure
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded its timeout
    #[error("Request timed out")]
    Timeout,

    /// Source returned a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Source has no record for the code
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Credential could not be obtained
    #[error("Credential error: {0}")]
    Credential(String),

    /// Adapter misconfigured (e.g. HTTP client could not be built)
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Drops the request URL, which can carry a credential in its query
impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_timeout() {
            SourceError::Timeout
        } else if e.is_decode() {
            SourceError::Parse(e.to_string())
        } else {
            SourceError::Network(e.to_string())
        }
    }
}

// ============================================================================
// Analysis
// ============================================================================

/// Buy/sell recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Buy,
    Sell,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Buy => "BUY",
            Decision::Sell => "SELL",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider's normalized valuation judgment
///
/// Only built by the normalization layer, which guarantees exactly
/// [`VALUATION_FACTOR_COUNT`] factors and confidence within 0.0-0.95.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOpinion {
    pub item_name: String,
    /// Estimated resale value (≥ 0)
    pub estimated_value: f64,
    pub decision: Decision,
    pub valuation_factors: Vec<String>,
    pub summary_reasoning: String,
    /// Confidence (0.0-1.0)
    pub confidence: f64,
    pub category: Option<String>,
}

/// Result of normalizing one provider response
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// Response normalized into a complete opinion
    Parsed(AnalysisOpinion),
    /// Response unusable; keeps a bounded prefix of the raw text for diagnostics
    Failed {
        error: String,
        raw_excerpt: Option<String>,
    },
}

impl ParseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ParseOutcome::Parsed(_))
    }

    pub fn opinion(&self) -> Option<&AnalysisOpinion> {
        match self {
            ParseOutcome::Parsed(opinion) => Some(opinion),
            ParseOutcome::Failed { .. } => None,
        }
    }

    pub fn into_opinion(self) -> Option<AnalysisOpinion> {
        match self {
            ParseOutcome::Parsed(opinion) => Some(opinion),
            ParseOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ParseOutcome::Parsed(_) => None,
            ParseOutcome::Failed { error, .. } => Some(error),
        }
    }
}

/// Provider-neutral prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPrompt {
    /// Instructions describing the expected response document
    pub system: String,
    /// Item description built from product facts
    pub user: String,
}

/// Analysis provider adapter
///
/// Issues one generation call and returns the raw text. Normalization of the
/// text happens in the analysis pool, uniformly for every provider.
#[async_trait::async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Stable provider name for logging
    fn name(&self) -> &str;

    /// Send the prompt and return the generated text
    ///
    /// # Errors
    /// Returns `ProviderError` if the call fails or yields no text
    async fn complete(&self, prompt: &AnalysisPrompt) -> Result<String, ProviderError>;
}

/// Analysis provider failure
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded its timeout
    #[error("Request timed out")]
    Timeout,

    /// Provider returned a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Provider answered without any generated text
    #[error("Empty response")]
    EmptyResponse,

    /// Response envelope could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Adapter misconfigured
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Drops the request URL, which can carry a credential in its query
impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_decode() {
            ProviderError::Parse(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

// ============================================================================
// Consensus
// ============================================================================

/// Confidence tier of a consensus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceTier::High => write!(f, "high"),
            ConfidenceTier::Medium => write!(f, "medium"),
            ConfidenceTier::Low => write!(f, "low"),
        }
    }
}

/// Aggregate recommendation from all surviving opinions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusResult {
    pub item_name: String,
    pub estimated_value: f64,
    pub decision: Decision,
    pub confidence: ConfidenceTier,
    pub analysis_count: usize,
    pub buy_votes: usize,
    /// "<buy votes>/<total votes>"
    pub consensus_ratio: String,
    pub reasoning: String,
}

impl ConsensusResult {
    /// Estimated value formatted with two decimals ("12.00")
    pub fn estimated_value_display(&self) -> String {
        format!("{:.2}", self.estimated_value)
    }
}
