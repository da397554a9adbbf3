//! Open Food Facts Client
//!
//! Open product database for groceries and consumables. No credential needed.
//!
//! # API Reference
//! - Endpoint: `https://world.openfoodfacts.org/api/v2/product/<code>.json`
//! - `status: 0` in the body means the product is unknown

use super::{check_status, http_client, non_blank};
use crate::throttle::Throttle;
use crate::types::{ProductFacts, SourceError, SourceFetcher};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const OPEN_FOOD_FACTS_BASE_URL: &str = "https://world.openfoodfacts.org";

pub struct OpenFoodFactsClient {
    http_client: Client,
    base_url: String,
    throttle: Throttle,
}

impl OpenFoodFactsClient {
    pub fn new(base_url: Option<String>, timeout: Duration, throttle: Throttle) -> Result<Self, SourceError> {
        Ok(Self {
            http_client: http_client(timeout)?,
            base_url: base_url.unwrap_or_else(|| OPEN_FOOD_FACTS_BASE_URL.to_string()),
            throttle,
        })
    }
}

#[async_trait]
impl SourceFetcher for OpenFoodFactsClient {
    fn name(&self) -> &'static str {
        "open_food_facts"
    }

    async fn fetch(&self, identifier_code: &str) -> Result<ProductFacts, SourceError> {
        if !identifier_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(SourceError::NotFound("Open Food Facts only indexes numeric barcodes".to_string()));
        }

        self.throttle.ready().await;

        let url = format!(
            "{}/api/v2/product/{}.json",
            self.base_url.trim_end_matches('/'),
            identifier_code
        );
        let response = self
            .http_client
            .get(&url)
            .query(&[("fields", "product_name,generic_name,brands,categories")])
            .send()
            .await?;

        let body: OffResponse = check_status(response, self.name())
            .await?
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse Open Food Facts response: {}", e)))?;

        debug!(code = %identifier_code, status = body.status, "Open Food Facts lookup complete");

        facts_from_response(body, identifier_code)
    }
}

fn facts_from_response(body: OffResponse, code: &str) -> Result<ProductFacts, SourceError> {
    let product = match (body.status, body.product) {
        (1, Some(product)) => product,
        _ => return Err(SourceError::NotFound(format!("Open Food Facts has no product {}", code))),
    };

    let title = non_blank(product.product_name)
        .or_else(|| non_blank(product.generic_name.clone()))
        .ok_or_else(|| SourceError::NotFound(format!("Open Food Facts product {} has no name", code)))?;

    let first_of_list = |list: Option<String>| {
        non_blank(list).and_then(|l| l.split(',').next().map(|s| s.trim().to_string()))
    };

    Ok(ProductFacts {
        title,
        brand: first_of_list(product.brands),
        category: first_of_list(product.categories),
        identifier_code: code.to_string(),
        price: None,
        description: non_blank(product.generic_name),
        source_name: "open_food_facts".to_string(),
    })
}

// ============================================================================
// Open Food Facts API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct OffResponse {
    #[serde(default)]
    status: i64,
    product: Option<OffProduct>,
}

#[derive(Debug, Deserialize)]
struct OffProduct {
    product_name: Option<String>,
    generic_name: Option<String>,
    brands: Option<String>,
    categories: Option<String>,
}
