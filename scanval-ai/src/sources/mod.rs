//! Identification Sources
//!
//! Uniform adapters over external product-identification services. Each
//! implements [`SourceFetcher`] and issues exactly one read-only lookup per call.
//!
//! # Sources (default priority order)
//! 1. **barcode_lookup** - Barcode Lookup API (credential required)
//! 2. **upcitemdb** - UPCitemdb (trial endpoint without credential)
//! 3. **ebay_browse** - eBay Browse API by GTIN (OAuth client credentials)
//! 4. **open_food_facts** - Open Food Facts (no credential)
//!
//! Adapters whose required credential is missing are skipped at build time and
//! never counted as failures.

pub mod barcode_lookup;
pub mod coordinator;
pub mod ebay_browse;
pub mod open_food_facts;
pub mod upcitemdb;

pub use coordinator::{Identification, IdentificationCoordinator, SourceOutcome};

use crate::config::{ServiceConfig, SourceConfig};
use crate::throttle::Throttle;
use crate::types::{SourceError, SourceFetcher};
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// User-Agent sent to identification sources
pub const USER_AGENT: &str = concat!("scanval-ai/", env!("CARGO_PKG_VERSION"));

/// Build an HTTP client with the adapter's request timeout
pub(crate) fn http_client(timeout: Duration) -> Result<Client, SourceError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| SourceError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Map a non-success response onto `SourceError`
pub(crate) async fn check_status(response: Response, source: &str) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound(format!("{} has no record", source)));
    }
    let body = response.text().await.unwrap_or_default();
    Err(SourceError::Api {
        status: status.as_u16(),
        message: crate::normalize::response::excerpt(&body, 200),
    })
}

/// Trimmed non-empty text
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse a price string such as "12.99" or "$12.99"
pub(crate) fn parse_price(raw: &str) -> Option<f64> {
    raw.trim()
        .trim_start_matches('$')
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p >= 0.0)
}

/// Build configured source adapters in priority order
///
/// Disabled adapters, unknown names, and adapters missing a required
/// credential are skipped with a log line.
pub fn build_fetchers(config: &ServiceConfig) -> Vec<Arc<dyn SourceFetcher>> {
    let timeout = config.fetch_timeout();
    let mut fetchers: Vec<Arc<dyn SourceFetcher>> = Vec::new();

    for source in config.sources.iter().filter(|s| s.enabled) {
        match build_fetcher(source, timeout) {
            Ok(Some(fetcher)) => {
                info!(source = %source.name, "Identification source enabled");
                fetchers.push(fetcher);
            }
            Ok(None) => {
                info!(source = %source.name, "Identification source skipped (no credential)");
            }
            Err(e) => {
                warn!(source = %source.name, error = %e, "Identification source not available");
            }
        }
    }

    fetchers
}

fn build_fetcher(
    source: &SourceConfig,
    timeout: Duration,
) -> Result<Option<Arc<dyn SourceFetcher>>, SourceError> {
    let credential = source.resolved_credential();
    let endpoint = source.endpoint.clone();
    let throttle = Throttle::per_second(source.requests_per_second);

    let fetcher: Arc<dyn SourceFetcher> = match source.name.as_str() {
        "barcode_lookup" => match credential {
            Some(key) => Arc::new(barcode_lookup::BarcodeLookupClient::new(endpoint, key, timeout, throttle)?),
            None => return Ok(None),
        },
        "upcitemdb" => Arc::new(upcitemdb::UpcItemDbClient::new(endpoint, credential, timeout, throttle)?),
        "ebay_browse" => match credential {
            Some(credential) => Arc::new(ebay_browse::EbayBrowseClient::new(endpoint, &credential, timeout, throttle)?),
            None => return Ok(None),
        },
        "open_food_facts" => Arc::new(open_food_facts::OpenFoodFactsClient::new(endpoint, timeout, throttle)?),
        other => {
            return Err(SourceError::Config(format!("Unknown identification source: {}", other)));
        }
    };

    Ok(Some(fetcher))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("12.99"), Some(12.99));
        assert_eq!(parse_price(" $1,024.50 "), Some(1024.5));
        assert_eq!(parse_price("free"), None);
        assert_eq!(parse_price("-3"), None);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  x ".to_string())).as_deref(), Some("x"));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    #[serial]
    fn test_sources_without_credentials_are_skipped() {
        for name in ["barcode_lookup", "upcitemdb", "ebay_browse", "open_food_facts"] {
            std::env::remove_var(scanval_common::config::credential_env_var(name));
        }

        let fetchers = build_fetchers(&ServiceConfig::default());
        let names: Vec<&str> = fetchers.iter().map(|f| f.name()).collect();

        // Keyless sources remain, in configured priority order
        assert_eq!(names, vec!["upcitemdb", "open_food_facts"]);
    }

    #[test]
    #[serial]
    fn test_credentialed_source_enabled_from_env() {
        std::env::set_var("SCANVAL_BARCODE_LOOKUP_API_KEY", "test-key");
        let fetchers = build_fetchers(&ServiceConfig::default());
        std::env::remove_var("SCANVAL_BARCODE_LOOKUP_API_KEY");

        assert_eq!(fetchers[0].name(), "barcode_lookup");
    }

    #[test]
    fn test_unknown_and_disabled_sources_ignored() {
        let mut config = ServiceConfig::default();
        config.sources = vec![
            SourceConfig {
                name: "mystery".to_string(),
                endpoint: None,
                credential: None,
                enabled: true,
                requests_per_second: None,
            },
            SourceConfig {
                name: "open_food_facts".to_string(),
                endpoint: None,
                credential: None,
                enabled: false,
                requests_per_second: None,
            },
        ];
        assert!(build_fetchers(&config).is_empty());
    }
}
