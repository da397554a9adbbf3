//! Valuation endpoint
//!
//! `POST /api/analyze` runs one identification → analysis → consensus pass.
//! The response is always a consensus (possibly degraded); only a malformed
//! request yields an error envelope.

use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::orchestrator::{AnalysisReport, AnalysisRequest, RunStatistics};
use crate::types::{ConfidenceTier, Decision, ProductFacts};
use crate::AppState;

/// Consensus as returned to callers
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub run_id: Uuid,
    pub item_name: String,
    /// Two decimals, e.g. "12.00"
    pub estimated_value: String,
    pub decision: Decision,
    pub confidence: ConfidenceTier,
    pub analysis_count: usize,
    pub consensus_ratio: String,
    pub reasoning: String,
    pub product: ProductFacts,
    pub statistics: RunStatistics,
}

impl From<AnalysisReport> for AnalyzeResponse {
    fn from(report: AnalysisReport) -> Self {
        let estimated_value = report.result.estimated_value_display();
        let result = report.result;
        Self {
            run_id: report.run_id,
            item_name: result.item_name,
            estimated_value,
            decision: result.decision,
            confidence: result.confidence,
            analysis_count: result.analysis_count,
            consensus_ratio: result.consensus_ratio,
            reasoning: result.reasoning,
            product: report.product,
            statistics: report.statistics,
        }
    }
}

/// POST /api/analyze
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let outcome = match payload {
        Ok(Json(request)) => state.orchestrator.run(&request).await.map_err(ApiError::from),
        Err(rejection) => Err(ApiError::from(rejection)),
    };

    match outcome {
        Ok(report) => Ok(Json(AnalyzeResponse::from(report))),
        Err(e) => {
            warn!(error = %e, "Rejected valuation request");
            *state.last_error.write().await = Some(e.to_string());
            Err(e)
        }
    }
}

/// Build valuation routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/api/analyze", post(analyze))
}
