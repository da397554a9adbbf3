//! Barcode Lookup Client
//!
//! Queries the Barcode Lookup product database.
//!
//! # API Reference
//! - Endpoint: `https://api.barcodelookup.com/v3/products?barcode=<code>&formatted=y&key=<key>`
//! - Requires an API key; the adapter is skipped when none is configured

use super::{check_status, http_client, non_blank, parse_price};
use crate::throttle::Throttle;
use crate::types::{ProductFacts, SourceError, SourceFetcher};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const BARCODE_LOOKUP_BASE_URL: &str = "https://api.barcodelookup.com";

pub struct BarcodeLookupClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    throttle: Throttle,
}

impl BarcodeLookupClient {
    pub fn new(
        base_url: Option<String>,
        api_key: String,
        timeout: Duration,
        throttle: Throttle,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            http_client: http_client(timeout)?,
            base_url: base_url.unwrap_or_else(|| BARCODE_LOOKUP_BASE_URL.to_string()),
            api_key,
            throttle,
        })
    }
}

#[async_trait]
impl SourceFetcher for BarcodeLookupClient {
    fn name(&self) -> &'static str {
        "barcode_lookup"
    }

    async fn fetch(&self, identifier_code: &str) -> Result<ProductFacts, SourceError> {
        self.throttle.ready().await;

        let url = format!("{}/v3/products", self.base_url.trim_end_matches('/'));
        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("barcode", identifier_code),
                ("formatted", "y"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let body: BarcodeLookupResponse = check_status(response, self.name())
            .await?
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse Barcode Lookup response: {}", e.without_url())))?;

        debug!(
            code = %identifier_code,
            products = body.products.len(),
            "Barcode Lookup query complete"
        );

        facts_from_response(body, identifier_code)
    }
}

fn facts_from_response(body: BarcodeLookupResponse, code: &str) -> Result<ProductFacts, SourceError> {
    let product = body
        .products
        .into_iter()
        .find(|p| {
            p.title.as_deref().map_or(false, |t| !t.trim().is_empty())
                || p.product_name.as_deref().map_or(false, |t| !t.trim().is_empty())
        })
        .ok_or_else(|| SourceError::NotFound(format!("Barcode Lookup has no product for {}", code)))?;

    let title = non_blank(product.title)
        .or_else(|| non_blank(product.product_name))
        .unwrap_or_default();

    let price = product
        .stores
        .iter()
        .filter_map(|s| s.price.as_deref().and_then(parse_price))
        .find(|p| *p > 0.0);

    Ok(ProductFacts {
        title,
        brand: non_blank(product.brand).or_else(|| non_blank(product.manufacturer)),
        category: non_blank(product.category)
            .and_then(|c| c.rsplit('>').next().map(|s| s.trim().to_string())),
        identifier_code: code.to_string(),
        price,
        description: non_blank(product.description),
        source_name: "barcode_lookup".to_string(),
    })
}

// ============================================================================
// Barcode Lookup API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct BarcodeLookupResponse {
    #[serde(default)]
    products: Vec<BarcodeProduct>,
}

#[derive(Debug, Deserialize)]
struct BarcodeProduct {
    title: Option<String>,
    product_name: Option<String>,
    brand: Option<String>,
    manufacturer: Option<String>,
    category: Option<String>,
    description: Option<String>,
    #[serde(default)]
    stores: Vec<BarcodeStore>,
}

#[derive(Debug, Deserialize)]
struct BarcodeStore {
    price: Option<String>,
}
