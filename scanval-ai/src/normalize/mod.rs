//! Response normalization layer
//!
//! Shared by every analysis provider. Raw generated text goes through:
//!
//! 1. **response** - clean, extract, parse, repair
//! 2. **fields** - reconcile alternate field names onto canonical keys
//! 3. validation - `itemName` is the only hard requirement
//! 4. **decision** / **category** - closed-enumeration normalizers
//! 5. **confidence** - completeness estimate when the provider omitted one
//!
//! The result is always a [`ParseOutcome`]; an opinion is either complete
//! (defaults generated, factors padded to five) or dropped.

pub mod category;
pub mod confidence;
pub mod decision;
pub mod fields;
pub mod response;

use crate::types::{AnalysisOpinion, ParseOutcome, VALUATION_FACTOR_COUNT};
use confidence::CompletenessSignals;
use serde_json::{Map, Value};

pub use category::normalize_category;
pub use decision::{normalize_decision, parse_decision};

/// Characters of raw content kept on parse failure
pub const RAW_EXCERPT_LIMIT: usize = 500;

/// Longest valuation factor kept (characters)
const MAX_FACTOR_CHARS: usize = 120;

/// Filler factors, used in order, for opinions with fewer than five
const DEFAULT_FACTORS: [&str; VALUATION_FACTOR_COUNT] = [
    "Current market demand for comparable items",
    "Condition as typically found on the resale market",
    "Brand recognition and collectibility",
    "Recent sold prices of similar listings",
    "Resale fees and shipping costs",
];

/// Normalize one provider's raw response text
pub fn parse_opinion(raw: &str) -> ParseOutcome {
    let mut document = match response::parse_document(raw) {
        Ok(document) => document,
        Err(error) => return failed(error, raw),
    };

    fields::reconcile(&mut document);

    match build_opinion(&document) {
        Ok(opinion) => ParseOutcome::Parsed(opinion),
        Err(error) => failed(error, raw),
    }
}

fn failed(error: String, raw: &str) -> ParseOutcome {
    ParseOutcome::Failed {
        error,
        raw_excerpt: (!raw.is_empty()).then(|| response::excerpt(raw, RAW_EXCERPT_LIMIT)),
    }
}

/// Validate a reconciled document and fill in defaults
fn build_opinion(document: &Map<String, Value>) -> Result<AnalysisOpinion, String> {
    let text = |key: &str| document.get(key).and_then(fields::as_text);

    let item_name = text(fields::ITEM_NAME)
        .ok_or_else(|| "Missing required field itemName".to_string())?;

    let estimated_value = document
        .get(fields::ESTIMATED_VALUE)
        .and_then(fields::as_number)
        .map(|v| v.max(0.0))
        .unwrap_or(0.0);

    let (decision, decision_recognized) =
        normalize_decision(text(fields::DECISION).as_deref());

    let provided_factors: Vec<String> = document
        .get(fields::VALUATION_FACTORS)
        .map(fields::as_text_list)
        .unwrap_or_default()
        .into_iter()
        .map(|f| truncate_chars(&f, MAX_FACTOR_CHARS))
        .collect();

    let reasoning = text(fields::SUMMARY_REASONING);
    let category = normalize_category(text(fields::CATEGORY).as_deref());

    let confidence = document
        .get(fields::CONFIDENCE)
        .and_then(fields::as_number)
        .and_then(confidence::normalize_reported_confidence)
        .unwrap_or_else(|| {
            confidence::estimate_confidence(&CompletenessSignals {
                item_name: &item_name,
                estimated_value,
                provided_factors: provided_factors.len(),
                reasoning: reasoning.as_deref(),
                category,
                decision_recognized,
            })
        });

    let summary_reasoning = reasoning.unwrap_or_else(|| {
        format!(
            "{} recommended for {} at an estimated ${:.2}.",
            decision, item_name, estimated_value
        )
    });

    Ok(AnalysisOpinion {
        item_name,
        estimated_value,
        decision,
        valuation_factors: pad_factors(provided_factors),
        summary_reasoning,
        confidence,
        category: Some(category.to_string()),
    })
}

/// Exactly five factors: provided ones in order, then unused defaults
fn pad_factors(mut factors: Vec<String>) -> Vec<String> {
    factors.truncate(VALUATION_FACTOR_COUNT);
    for filler in DEFAULT_FACTORS {
        if factors.len() == VALUATION_FACTOR_COUNT {
            break;
        }
        if !factors.iter().any(|f| f == filler) {
            factors.push(filler.to_string());
        }
    }
    factors
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}
