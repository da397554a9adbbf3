//! Valuation pipeline
//!
//! identification → analysis → consensus, run once per request.
//!
//! The only caller-visible error is [`RequestInvalid`]; every upstream failure
//! degrades into the returned result (placeholder facts, fewer opinions, a low
//! confidence tier) rather than an error.

use crate::consensus::ConsensusBuilder;
use crate::providers::AnalysisPool;
use crate::sources::IdentificationCoordinator;
use crate::types::{ConsensusResult, ProductFacts};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// One valuation request
///
/// Surrounding whitespace is not part of either field: a whitespace-only value
/// counts as missing, and the code is passed on trimmed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default, alias = "identifierCode")]
    pub identifier_code: String,
    #[serde(default, alias = "callerId")]
    pub caller_id: String,
}

impl AnalysisRequest {
    pub fn new(identifier_code: impl Into<String>, caller_id: impl Into<String>) -> Self {
        Self {
            identifier_code: identifier_code.into(),
            caller_id: caller_id.into(),
        }
    }

    /// Identifier code as used for lookups and reported in the facts
    pub fn code(&self) -> &str {
        self.identifier_code.trim()
    }

    /// Reject requests missing a required field
    pub fn validate(&self) -> Result<(), RequestInvalid> {
        if self.code().is_empty() {
            return Err(RequestInvalid::MissingField("identifier_code"));
        }
        if self.caller_id.trim().is_empty() {
            return Err(RequestInvalid::MissingField("caller_id"));
        }
        Ok(())
    }
}

/// Malformed request, rejected before any external call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestInvalid {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// Per-run counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    pub sources_attempted: usize,
    pub sources_failed: usize,
    /// `None` when the placeholder was used
    pub source_used: Option<String>,
    pub identification_cached: bool,
    pub providers_attempted: usize,
    pub providers_succeeded: usize,
    pub providers_failed: usize,
    pub elapsed_ms: u64,
}

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub result: ConsensusResult,
    pub product: ProductFacts,
    pub statistics: RunStatistics,
}

pub struct Orchestrator {
    coordinator: IdentificationCoordinator,
    pool: AnalysisPool,
    builder: ConsensusBuilder,
}

impl Orchestrator {
    pub fn new(coordinator: IdentificationCoordinator, pool: AnalysisPool, builder: ConsensusBuilder) -> Self {
        Self {
            coordinator,
            pool,
            builder,
        }
    }

    pub fn source_count(&self) -> usize {
        self.coordinator.count()
    }

    pub fn provider_count(&self) -> usize {
        self.pool.count()
    }

    /// Run the full pipeline for one request
    ///
    /// # Errors
    /// `RequestInvalid` if a required field is missing; nothing external is
    /// called in that case.
    pub async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisReport, RequestInvalid> {
        request.validate()?;

        let run_id = Uuid::new_v4();
        let start = Instant::now();
        let code = request.code();

        info!(
            run_id = %run_id,
            caller = %request.caller_id,
            code = %code,
            "Valuation run started"
        );

        let identification = self.coordinator.identify(code).await;
        let round = self.pool.analyze(&identification.facts).await;
        let result = self.builder.build(&round.opinions, &identification.facts.title);

        let statistics = RunStatistics {
            sources_attempted: identification.attempted,
            sources_failed: identification.failed,
            source_used: identification.source_used,
            identification_cached: identification.from_cache,
            providers_attempted: round.attempted,
            providers_succeeded: round.opinions.len(),
            providers_failed: round.failed,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            run_id = %run_id,
            source = statistics.source_used.as_deref().unwrap_or("placeholder"),
            sources_failed = statistics.sources_failed,
            providers_succeeded = statistics.providers_succeeded,
            providers_failed = statistics.providers_failed,
            decision = %result.decision,
            confidence = %result.confidence,
            ratio = %result.consensus_ratio,
            elapsed_ms = statistics.elapsed_ms,
            "Valuation run complete"
        );

        Ok(AnalysisReport {
            run_id,
            result,
            product: identification.facts,
            statistics,
        })
    }
}
