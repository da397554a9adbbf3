//! Adapter tests against fake upstream services
//!
//! Each test serves a minimal imitation of the external API from a local axum
//! server on 127.0.0.1:0 and points the adapter at it.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use scanval_ai::providers::anthropic::AnthropicClient;
use scanval_ai::providers::gemini::GeminiClient;
use scanval_ai::providers::openai::OpenAiClient;
use scanval_ai::providers::{AnalysisPool, ProviderSettings};
use scanval_ai::sources::barcode_lookup::BarcodeLookupClient;
use scanval_ai::sources::ebay_browse::EbayBrowseClient;
use scanval_ai::sources::open_food_facts::OpenFoodFactsClient;
use scanval_ai::sources::upcitemdb::UpcItemDbClient;
use scanval_ai::throttle::Throttle;
use scanval_ai::types::{
    AnalysisPrompt, AnalysisProvider, Decision, ProductFacts, ProviderError, SourceError, SourceFetcher,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(2);

async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn settings(name: &str, endpoint: String) -> ProviderSettings {
    ProviderSettings {
        name: name.to_string(),
        endpoint: Some(endpoint),
        api_key: "test-key".to_string(),
        model: Some("test-model".to_string()),
        max_output_tokens: 256,
        timeout: TIMEOUT,
    }
}

fn prompt() -> AnalysisPrompt {
    AnalysisPrompt {
        system: "Respond with JSON".to_string(),
        user: "Item: Lamp".to_string(),
    }
}

// ============================================================================
// Identification sources
// ============================================================================

#[tokio::test]
async fn upcitemdb_trial_lookup() {
    let router = Router::new().route(
        "/prod/trial/lookup",
        get(|Query(query): Query<HashMap<String, String>>| async move {
            Json(json!({
                "code": "OK",
                "total": 1,
                "items": [{
                    "ean": query.get("upc").cloned().unwrap_or_default(),
                    "title": "Texas Instruments TI-84 Plus",
                    "brand": "Texas Instruments",
                    "category": "Office Supplies > Calculators",
                    "lowest_recorded_price": 89.99
                }]
            }))
        }),
    );
    let base = spawn_upstream(router).await;

    let client = UpcItemDbClient::new(Some(base), None, TIMEOUT, Throttle::unlimited()).unwrap();
    let facts = client.fetch("033317189147").await.unwrap();

    assert_eq!(facts.title, "Texas Instruments TI-84 Plus");
    assert_eq!(facts.category.as_deref(), Some("Calculators"));
    assert_eq!(facts.price, Some(89.99));
    assert_eq!(facts.identifier_code, "033317189147");
}

#[tokio::test]
async fn upcitemdb_paid_lookup_sends_key_headers() {
    let router = Router::new().route(
        "/prod/v1/lookup",
        get(|headers: HeaderMap| async move {
            let authorized = headers.get("user_key").map_or(false, |v| v == "paid-key")
                && headers.get("key_type").map_or(false, |v| v == "3scale");
            if authorized {
                (StatusCode::OK, Json(json!({"code":"OK","items":[{"title":"Paid result"}]})))
            } else {
                (StatusCode::UNAUTHORIZED, Json(json!({"code":"INVALID_KEY"})))
            }
        }),
    );
    let base = spawn_upstream(router).await;

    let client =
        UpcItemDbClient::new(Some(base), Some("paid-key".to_string()), TIMEOUT, Throttle::unlimited()).unwrap();
    assert_eq!(client.fetch("1").await.unwrap().title, "Paid result");
}

#[tokio::test]
async fn upstream_server_error_is_api_error() {
    let router = Router::new().route(
        "/prod/trial/lookup",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded") }),
    );
    let base = spawn_upstream(router).await;

    let client = UpcItemDbClient::new(Some(base), None, TIMEOUT, Throttle::unlimited()).unwrap();
    match client.fetch("1").await {
        Err(SourceError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert!(message.contains("exploded"));
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn slow_upstream_hits_client_timeout() {
    let router = Router::new().route(
        "/prod/trial/lookup",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({"code": "OK", "items": []}))
        }),
    );
    let base = spawn_upstream(router).await;

    let client =
        UpcItemDbClient::new(Some(base), None, Duration::from_millis(100), Throttle::unlimited()).unwrap();
    let err = client.fetch("1").await.unwrap_err();

    assert!(matches!(err, SourceError::Timeout), "got {:?}", err);
    assert_eq!(err.to_string(), "Request timed out");
}

#[tokio::test]
async fn open_food_facts_product_and_unknown_code() {
    let router = Router::new()
        .route(
            "/api/v2/product/3017620422003.json",
            get(|| async {
                Json(json!({
                    "status": 1,
                    "product": {"product_name": "Nutella", "brands": "Ferrero", "categories": "Spreads"}
                }))
            }),
        )
        .route(
            "/api/v2/product/0000000000000.json",
            get(|| async { Json(json!({"status": 0, "status_verbose": "product not found"})) }),
        );
    let base = spawn_upstream(router).await;

    let client = OpenFoodFactsClient::new(Some(base), TIMEOUT, Throttle::unlimited()).unwrap();
    assert_eq!(client.fetch("3017620422003").await.unwrap().brand.as_deref(), Some("Ferrero"));
    assert!(matches!(client.fetch("0000000000000").await, Err(SourceError::NotFound(_))));
}

#[derive(Default)]
struct EbayCounters {
    tokens: AtomicUsize,
    searches: AtomicUsize,
}

fn ebay_router(counters: Arc<EbayCounters>, reject_search: bool) -> Router {
    Router::new()
        .route(
            "/identity/v1/oauth2/token",
            post(
                |State(counters): State<Arc<EbayCounters>>,
                 headers: HeaderMap,
                 Form(form): Form<HashMap<String, String>>| async move {
                    let basic = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map_or(false, |v| v.starts_with("Basic "));
                    if !basic || form.get("grant_type").map(String::as_str) != Some("client_credentials") {
                        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid_client"})));
                    }
                    let n = counters.tokens.fetch_add(1, Ordering::SeqCst) + 1;
                    (
                        StatusCode::OK,
                        Json(json!({"access_token": format!("app-token-{}", n), "expires_in": 7200, "token_type": "Application Access Token"})),
                    )
                },
            ),
        )
        .route(
            "/buy/browse/v1/item_summary/search",
            get(
                move |State(counters): State<Arc<EbayCounters>>, headers: HeaderMap| async move {
                    counters.searches.fetch_add(1, Ordering::SeqCst);
                    let bearer = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map_or(false, |v| v.starts_with("Bearer app-token-"));
                    let marketplace = headers.get("x-ebay-c-marketplace-id").map_or(false, |v| v == "EBAY_US");
                    if reject_search || !bearer || !marketplace {
                        return (StatusCode::UNAUTHORIZED, Json(json!({"errors": []})));
                    }
                    (
                        StatusCode::OK,
                        Json(json!({
                            "total": 2,
                            "itemSummaries": [
                                {"title": "Apple AirPods Pro 2nd Gen", "price": {"value": "150.00", "currency": "USD"},
                                 "categories": [{"categoryId": "80077", "categoryName": "Headphones"}]},
                                {"title": "AirPods Pro 2", "price": {"value": "170.00", "currency": "USD"}}
                            ]
                        })),
                    )
                },
            ),
        )
        .with_state(counters)
}

#[tokio::test]
async fn ebay_token_reused_across_lookups() {
    let counters = Arc::new(EbayCounters::default());
    let base = spawn_upstream(ebay_router(Arc::clone(&counters), false)).await;

    let client = EbayBrowseClient::new(Some(base), "client-id:client-secret", TIMEOUT, Throttle::unlimited()).unwrap();
    let first = client.fetch("194253397168").await.unwrap();
    client.fetch("194253397168").await.unwrap();

    assert_eq!(first.title, "Apple AirPods Pro 2nd Gen");
    assert_eq!(first.price, Some(160.0));
    assert_eq!(first.category.as_deref(), Some("Headphones"));
    assert_eq!(counters.tokens.load(Ordering::SeqCst), 1);
    assert_eq!(counters.searches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn ebay_rejected_token_is_refreshed_on_next_lookup() {
    let counters = Arc::new(EbayCounters::default());
    let base = spawn_upstream(ebay_router(Arc::clone(&counters), true)).await;

    let client = EbayBrowseClient::new(Some(base), "client-id:client-secret", TIMEOUT, Throttle::unlimited()).unwrap();
    assert!(matches!(client.fetch("1").await, Err(SourceError::Credential(_))));
    assert!(matches!(client.fetch("1").await, Err(SourceError::Credential(_))));

    // One search per lookup, no retry; a new token for the second lookup
    assert_eq!(counters.searches.load(Ordering::SeqCst), 2);
    assert_eq!(counters.tokens.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Analysis providers
// ============================================================================

#[tokio::test]
async fn openai_compatible_completion() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            if headers.get("authorization").map_or(true, |v| v != "Bearer test-key") {
                return (StatusCode::UNAUTHORIZED, Json(json!({"error": {"message": "bad key"}})));
            }
            assert_eq!(body["model"], "test-model");
            assert_eq!(body["messages"][0]["role"], "system");
            assert_eq!(body["messages"][1]["content"], "Item: Lamp");
            (
                StatusCode::OK,
                Json(json!({
                    "choices": [{"index": 0, "message": {"role": "assistant",
                        "content": "```json\n{\"itemName\":\"Brass lamp\",\"estimatedValue\":40,\"decision\":\"BUY\"}\n```"}}]
                })),
            )
        }),
    );
    let base = spawn_upstream(router).await;

    let client = OpenAiClient::new(
        settings("deepseek", format!("{}/v1/chat/completions", base)),
        Throttle::unlimited(),
    )
    .unwrap();
    let text = client.complete(&prompt()).await.unwrap();
    assert!(text.contains("Brass lamp"));

    // Same provider through the pool yields a normalized opinion
    let pool = AnalysisPool::new(vec![Arc::new(client)], TIMEOUT);
    let round = pool.analyze(&ProductFacts::new("Lamp", "1", "test")).await;
    assert_eq!(round.opinions.len(), 1);
    assert_eq!(round.opinions[0].decision, Decision::Buy);
    assert_eq!(round.opinions[0].valuation_factors.len(), 5);
}

#[tokio::test]
async fn openai_error_status_is_api_error() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limited") }),
    );
    let base = spawn_upstream(router).await;

    let client = OpenAiClient::new(
        settings("openai", format!("{}/v1/chat/completions", base)),
        Throttle::unlimited(),
    )
    .unwrap();
    assert!(matches!(
        client.complete(&prompt()).await,
        Err(ProviderError::Api { status: 429, .. })
    ));
}

#[tokio::test]
async fn anthropic_messages() {
    let router = Router::new().route(
        "/v1/messages",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            let keyed = headers.get("x-api-key").map_or(false, |v| v == "test-key")
                && headers.get("anthropic-version").is_some();
            if !keyed {
                return (StatusCode::UNAUTHORIZED, Json(json!({"type": "error"})));
            }
            assert_eq!(body["system"], "Respond with JSON");
            (
                StatusCode::OK,
                Json(json!({
                    "type": "message",
                    "content": [{"type": "text", "text": "{\"itemName\":\"Brass lamp\",\"decision\":\"SKIP\"}"}],
                    "stop_reason": "end_turn"
                })),
            )
        }),
    );
    let base = spawn_upstream(router).await;

    let client = AnthropicClient::new(settings("anthropic", format!("{}/v1/messages", base)), Throttle::unlimited())
        .unwrap();
    let text = client.complete(&prompt()).await.unwrap();
    assert!(text.contains("SKIP"));
}

#[tokio::test]
async fn gemini_generate_content() {
    let router = Router::new().route(
        "/v1beta/models/test-model:generateContent",
        post(
            |Query(query): Query<HashMap<String, String>>, headers: HeaderMap, Json(body): Json<Value>| async move {
                assert!(!query.contains_key("key"));
                if headers.get("x-goog-api-key").map_or(true, |v| v != "test-key") {
                    return (StatusCode::FORBIDDEN, Json(json!({"error": {"code": 403}})));
                }
                assert_eq!(body["contents"][0]["parts"][0]["text"], "Item: Lamp");
                assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
                (
                    StatusCode::OK,
                    Json(json!({
                        "candidates": [{"content": {"role": "model",
                            "parts": [{"text": "{\"itemName\":\"Brass lamp\"}"}]}, "finishReason": "STOP"}]
                    })),
                )
            },
        ),
    );
    let base = spawn_upstream(router).await;

    let client = GeminiClient::new(
        settings("gemini", format!("{}/v1beta/models/test-model:generateContent", base)),
        Throttle::unlimited(),
    )
    .unwrap();
    assert_eq!(client.complete(&prompt()).await.unwrap(), "{\"itemName\":\"Brass lamp\"}");
}

#[tokio::test]
async fn unreachable_upstream_error_omits_credentials() {
    let mut gemini_settings = settings("gemini", "http://127.0.0.1:1/v1beta/models/m:generateContent".to_string());
    gemini_settings.api_key = "SECRET-KEY-123".to_string();
    let gemini = GeminiClient::new(gemini_settings, Throttle::unlimited()).unwrap();

    let err = gemini.complete(&prompt()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Network(_)), "got {:?}", err);
    assert!(!err.to_string().contains("SECRET-KEY-123"));

    let barcode = BarcodeLookupClient::new(
        Some("http://127.0.0.1:1".to_string()),
        "SECRET-KEY-456".to_string(),
        TIMEOUT,
        Throttle::unlimited(),
    )
    .unwrap();

    let err = barcode.fetch("012345678905").await.unwrap_err();
    assert!(matches!(err, SourceError::Network(_)), "got {:?}", err);
    assert!(!err.to_string().contains("SECRET-KEY-456"));
}
