//! eBay Browse Client
//!
//! Searches active eBay listings by GTIN and maps the top results onto product
//! facts. Listing prices give a market reference the other sources lack.
//!
//! # Authentication
//! OAuth client-credentials grant. The configured credential has the form
//! `client_id:client_secret`; the application token is held in a
//! [`TokenHolder`] and refreshed on use when expired.
//!
//! # API Reference
//! - Token: `POST /identity/v1/oauth2/token`
//! - Search: `GET /buy/browse/v1/item_summary/search?gtin=<code>&limit=3`

use super::{check_status, http_client, non_blank, parse_price};
use crate::throttle::Throttle;
use crate::types::{ProductFacts, SourceError, SourceFetcher};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scanval_common::{IssuedToken, TokenHolder, TokenSource};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const EBAY_BASE_URL: &str = "https://api.ebay.com";
const TOKEN_PATH: &str = "/identity/v1/oauth2/token";
const SEARCH_PATH: &str = "/buy/browse/v1/item_summary/search";
const OAUTH_SCOPE: &str = "https://api.ebay.com/oauth/api_scope";
const MARKETPLACE_ID: &str = "EBAY_US";
const SEARCH_LIMIT: &str = "3";

/// Client-credentials token issuer
pub struct EbayTokenSource {
    http_client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

#[async_trait]
impl TokenSource for EbayTokenSource {
    async fn issue(&self) -> scanval_common::Result<IssuedToken> {
        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", OAUTH_SCOPE)])
            .send()
            .await
            .map_err(|e| scanval_common::Error::Credential(format!("eBay token request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(scanval_common::Error::Credential(format!(
                "eBay token endpoint returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| scanval_common::Error::Credential(format!("Malformed eBay token response: {}", e)))?;

        debug!(expires_in = token.expires_in, "Issued eBay application token");

        Ok(IssuedToken {
            access_token: token.access_token,
            valid_for: Duration::from_secs(token.expires_in),
        })
    }
}

pub struct EbayBrowseClient {
    http_client: Client,
    base_url: String,
    tokens: TokenHolder<EbayTokenSource>,
    throttle: Throttle,
}

impl EbayBrowseClient {
    /// Create a client from a `client_id:client_secret` credential
    pub fn new(
        base_url: Option<String>,
        credential: &str,
        timeout: Duration,
        throttle: Throttle,
    ) -> Result<Self, SourceError> {
        let (client_id, client_secret) = split_credential(credential)?;
        let base_url = base_url
            .unwrap_or_else(|| EBAY_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let http_client = http_client(timeout)?;

        let token_source = EbayTokenSource {
            http_client: http_client.clone(),
            token_url: format!("{}{}", base_url, TOKEN_PATH),
            client_id,
            client_secret,
        };

        Ok(Self {
            http_client,
            base_url,
            tokens: TokenHolder::new(token_source),
            throttle,
        })
    }
}

fn split_credential(credential: &str) -> Result<(String, String), SourceError> {
    match credential.split_once(':') {
        Some((id, secret)) if !id.trim().is_empty() && !secret.trim().is_empty() => {
            Ok((id.trim().to_string(), secret.trim().to_string()))
        }
        _ => Err(SourceError::Config(
            "eBay credential must be client_id:client_secret".to_string(),
        )),
    }
}

#[async_trait]
impl SourceFetcher for EbayBrowseClient {
    fn name(&self) -> &'static str {
        "ebay_browse"
    }

    async fn fetch(&self, identifier_code: &str) -> Result<ProductFacts, SourceError> {
        let token = self
            .tokens
            .token()
            .await
            .map_err(|e| SourceError::Credential(e.to_string()))?;

        self.throttle.ready().await;

        let response = self
            .http_client
            .get(format!("{}{}", self.base_url, SEARCH_PATH))
            .query(&[("gtin", identifier_code), ("limit", SEARCH_LIMIT)])
            .bearer_auth(token)
            .header("X-EBAY-C-MARKETPLACE-ID", MARKETPLACE_ID)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            // Next lookup starts with a fresh token; this one fails as-is
            warn!("eBay rejected application token, invalidating");
            self.tokens.invalidate().await;
            return Err(SourceError::Credential("eBay token rejected".to_string()));
        }

        let body: SearchResponse = check_status(response, self.name())
            .await?
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse eBay search response: {}", e)))?;

        debug!(
            code = %identifier_code,
            listings = body.item_summaries.len(),
            "eBay Browse search complete"
        );

        facts_from_response(body, identifier_code)
    }
}

fn facts_from_response(body: SearchResponse, code: &str) -> Result<ProductFacts, SourceError> {
    let first = body
        .item_summaries
        .iter()
        .find(|s| s.title.as_deref().map_or(false, |t| !t.trim().is_empty()))
        .ok_or_else(|| SourceError::NotFound(format!("No eBay listings for {}", code)))?;

    let mut prices: Vec<f64> = body
        .item_summaries
        .iter()
        .filter_map(|s| s.price.as_ref())
        .filter_map(|p| parse_price(&p.value))
        .filter(|p| *p > 0.0)
        .collect();
    prices.sort_by(|a, b| a.total_cmp(b));

    let category = first
        .categories
        .first()
        .and_then(|c| non_blank(c.category_name.clone()));

    Ok(ProductFacts {
        title: first.title.clone().unwrap_or_default().trim().to_string(),
        brand: None,
        category,
        identifier_code: code.to_string(),
        price: median(&prices),
        description: non_blank(first.short_description.clone()),
        source_name: "ebay_browse".to_string(),
    })
}

/// Median of sorted values
fn median(sorted: &[f64]) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

// ============================================================================
// eBay API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    item_summaries: Vec<ItemSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemSummary {
    title: Option<String>,
    short_description: Option<String>,
    price: Option<ListingPrice>,
    #[serde(default)]
    categories: Vec<ListingCategory>,
}

#[derive(Debug, Deserialize)]
struct ListingPrice {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingCategory {
    category_name: Option<String>,
}
