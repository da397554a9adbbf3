//! scanval-ai - Resale Valuation Service
//!
//! **Module Identity:**
//! - Name: scanval-ai
//! - Default port: 5780
//!
//! Serves `POST /api/analyze` and `GET /health`, or with `--analyze <CODE>`
//! runs a single valuation and prints the result as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scanval_ai::api::analyze::AnalyzeResponse;
use scanval_ai::config::ServiceConfig;
use scanval_ai::orchestrator::AnalysisRequest;
use scanval_ai::AppState;

/// Command-line arguments for scanval-ai
#[derive(Parser, Debug)]
#[command(name = "scanval-ai")]
#[command(about = "Resale scan valuation service")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "SCANVAL_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind (overrides config)
    #[arg(long, env = "SCANVAL_HOST")]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "SCANVAL_PORT")]
    port: Option<u16>,

    /// Value one scanned code, print JSON and exit
    #[arg(long, value_name = "CODE")]
    analyze: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scanval_ai=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting scanval-ai");
    info!(
        "Version: {} ({}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("SCANVAL_GIT_HASH"),
        env!("SCANVAL_BUILD_PROFILE")
    );

    let mut config = ServiceConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let orchestrator = Arc::new(scanval_ai::build_orchestrator(&config));
    info!(
        sources = orchestrator.source_count(),
        providers = orchestrator.provider_count(),
        "Adapters configured"
    );
    if orchestrator.provider_count() == 0 {
        warn!("No analysis provider has a credential; every result will be a low-confidence fallback");
    }

    if let Some(code) = args.analyze {
        let report = orchestrator
            .run(&AnalysisRequest::new(code, "cli"))
            .await
            .context("Invalid request")?;
        let output = serde_json::to_string_pretty(&AnalyzeResponse::from(report))
            .context("Failed to serialize result")?;
        println!("{}", output);
        return Ok(());
    }

    let app = scanval_ai::build_router(AppState::new(orchestrator));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
