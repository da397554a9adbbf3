//! Confidence Estimator
//!
//! Completeness-based confidence for opinions that did not report one.
//!
//! # Scoring Algorithm
//! - Base: 0.5
//! - Item name present and non-trivial: +0.1
//! - Positive estimated value: +0.15
//! - Valuation factors: ≥3 → +0.1, ≥5 → +0.15
//! - Reasoning longer than 50 characters: +0.1
//! - Category resolved beyond "general": +0.05
//! - Decision recognized: +0.05
//!
//! Result is clamped to 0.0-0.95.

use super::category::GENERAL;

/// Ceiling for any opinion confidence, estimated or reported
pub const MAX_CONFIDENCE: f64 = 0.95;

const BASE_CONFIDENCE: f64 = 0.5;
const NAME_BONUS: f64 = 0.1;
const VALUE_BONUS: f64 = 0.15;
const SOME_FACTORS_BONUS: f64 = 0.1;
const FULL_FACTORS_BONUS: f64 = 0.15;
const REASONING_BONUS: f64 = 0.1;
const CATEGORY_BONUS: f64 = 0.05;
const DECISION_BONUS: f64 = 0.05;

const MIN_REASONING_CHARS: usize = 50;

/// Names that carry no information about the item
const TRIVIAL_NAMES: &[&str] = &["unknown", "n/a", "na", "none", "item", "product", "unknown item"];

/// What the provider actually supplied, before defaults were generated
#[derive(Debug, Clone, Copy)]
pub struct CompletenessSignals<'a> {
    pub item_name: &'a str,
    pub estimated_value: f64,
    pub provided_factors: usize,
    /// Provider reasoning, `None` if a default had to be generated
    pub reasoning: Option<&'a str>,
    pub category: &'a str,
    pub decision_recognized: bool,
}

/// Estimate confidence from response completeness
pub fn estimate_confidence(signals: &CompletenessSignals<'_>) -> f64 {
    let mut score = BASE_CONFIDENCE;

    let name = signals.item_name.trim();
    if name.chars().count() >= 3 && !TRIVIAL_NAMES.contains(&name.to_lowercase().as_str()) {
        score += NAME_BONUS;
    }

    if signals.estimated_value > 0.0 {
        score += VALUE_BONUS;
    }

    if signals.provided_factors >= 5 {
        score += FULL_FACTORS_BONUS;
    } else if signals.provided_factors >= 3 {
        score += SOME_FACTORS_BONUS;
    }

    if signals
        .reasoning
        .map_or(false, |r| r.chars().count() > MIN_REASONING_CHARS)
    {
        score += REASONING_BONUS;
    }

    if signals.category != GENERAL {
        score += CATEGORY_BONUS;
    }

    if signals.decision_recognized {
        score += DECISION_BONUS;
    }

    score.clamp(0.0, MAX_CONFIDENCE)
}

/// Normalize a provider-reported confidence
///
/// Values above 1 are treated as a 0-100 scale.
pub fn normalize_reported_confidence(reported: f64) -> Option<f64> {
    if !reported.is_finite() {
        return None;
    }
    let scaled = if reported > 1.0 { reported / 100.0 } else { reported };
    Some(scaled.clamp(0.0, MAX_CONFIDENCE))
}
