//! UPCitemdb Client
//!
//! Looks up UPC/EAN codes against UPCitemdb.
//!
//! # API Reference
//! - Trial endpoint (no key, ~100 requests/day): `/prod/trial/lookup?upc=<code>`
//! - Paid endpoint: `/prod/v1/lookup?upc=<code>` with `user_key` + `key_type` headers
//! - Documentation: https://www.upcitemdb.com/wp/docs/main/development/

use super::{check_status, http_client, non_blank};
use crate::throttle::Throttle;
use crate::types::{ProductFacts, SourceError, SourceFetcher};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const UPCITEMDB_BASE_URL: &str = "https://api.upcitemdb.com";
const TRIAL_PATH: &str = "/prod/trial/lookup";
const PAID_PATH: &str = "/prod/v1/lookup";

pub struct UpcItemDbClient {
    http_client: Client,
    base_url: String,
    /// Paid key; the trial endpoint is used without one
    api_key: Option<String>,
    throttle: Throttle,
}

impl UpcItemDbClient {
    pub fn new(
        base_url: Option<String>,
        api_key: Option<String>,
        timeout: Duration,
        throttle: Throttle,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            http_client: http_client(timeout)?,
            base_url: base_url.unwrap_or_else(|| UPCITEMDB_BASE_URL.to_string()),
            api_key,
            throttle,
        })
    }

    fn lookup_url(&self) -> String {
        let path = if self.api_key.is_some() { PAID_PATH } else { TRIAL_PATH };
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl SourceFetcher for UpcItemDbClient {
    fn name(&self) -> &'static str {
        "upcitemdb"
    }

    async fn fetch(&self, identifier_code: &str) -> Result<ProductFacts, SourceError> {
        self.throttle.ready().await;

        let mut request = self
            .http_client
            .get(self.lookup_url())
            .query(&[("upc", identifier_code)]);
        if let Some(key) = &self.api_key {
            request = request.header("user_key", key).header("key_type", "3scale");
        }

        let response = check_status(request.send().await?, self.name()).await?;
        let body: UpcItemDbResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse UPCitemdb response: {}", e)))?;

        debug!(
            code = %identifier_code,
            status = %body.code,
            items = body.items.len(),
            "UPCitemdb lookup complete"
        );

        facts_from_response(body, identifier_code)
    }
}

fn facts_from_response(body: UpcItemDbResponse, code: &str) -> Result<ProductFacts, SourceError> {
    if body.code != "OK" {
        return Err(SourceError::Api {
            status: 200,
            message: format!("UPCitemdb returned code {}", body.code),
        });
    }

    let item = body
        .items
        .into_iter()
        .find(|item| item.title.as_deref().map_or(false, |t| !t.trim().is_empty()))
        .ok_or_else(|| SourceError::NotFound(format!("UPCitemdb has no item for {}", code)))?;

    let price = item
        .lowest_recorded_price
        .filter(|p| *p > 0.0)
        .or_else(|| item.offers.iter().filter_map(|o| o.price).find(|p| *p > 0.0));

    Ok(ProductFacts {
        title: item.title.unwrap_or_default().trim().to_string(),
        brand: non_blank(item.brand),
        // "Media > Music & Sound Recordings > Music Cassette Tapes" → last segment
        category: non_blank(item.category)
            .and_then(|c| c.rsplit('>').next().map(|s| s.trim().to_string())),
        identifier_code: code.to_string(),
        price,
        description: non_blank(item.description),
        source_name: "upcitemdb".to_string(),
    })
}

// ============================================================================
// UPCitemdb API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct UpcItemDbResponse {
    code: String,
    #[serde(default)]
    items: Vec<UpcItem>,
}

#[derive(Debug, Deserialize)]
struct UpcItem {
    title: Option<String>,
    brand: Option<String>,
    category: Option<String>,
    description: Option<String>,
    lowest_recorded_price: Option<f64>,
    #[serde(default)]
    offers: Vec<UpcOffer>,
}

#[derive(Debug, Deserialize)]
struct UpcOffer {
    price: Option<f64>,
}
