//! scanval-ai library interface
//!
//! Resale valuation service: identifies a scanned item, asks several
//! generative analysis providers for an opinion, and reduces the opinions to
//! one buy/sell recommendation.
//!
//! Exposes public APIs for integration testing.

pub mod api;
pub mod config;
pub mod consensus;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod providers;
pub mod sources;
pub mod throttle;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use config::ServiceConfig;
use consensus::ConsensusBuilder;
use orchestrator::Orchestrator;
use providers::AnalysisPool;
use scanval_common::ResponseCache;
use sources::IdentificationCoordinator;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last rejected request, for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Wire adapters, cache and consensus from configuration
pub fn build_orchestrator(config: &ServiceConfig) -> Orchestrator {
    let cache = Arc::new(ResponseCache::new(config.identification.cache_capacity));
    let coordinator = IdentificationCoordinator::new(sources::build_fetchers(config), config.fetch_timeout())
        .with_cache(cache);
    let pool = AnalysisPool::new(providers::build_providers(config), config.provider_timeout());

    Orchestrator::new(coordinator, pool, ConsensusBuilder::new())
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::analyze_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
