//! Decision Normalizer
//!
//! Maps free-form recommendation text onto [`Decision`]. Exact synonym match
//! first, then substring containment with longer phrases tried before shorter
//! ones ("NOT WORTH IT" before "WORTH IT", "DON'T BUY" before "BUY").
//! Anything unrecognized is SELL.

use crate::types::Decision;

const DECISION_SYNONYMS: &[(&str, Decision)] = &[
    ("BUY", Decision::Buy),
    ("STRONG BUY", Decision::Buy),
    ("PURCHASE", Decision::Buy),
    ("HOLD", Decision::Buy),
    ("GOOD DEAL", Decision::Buy),
    ("GREAT DEAL", Decision::Buy),
    ("ACQUIRE", Decision::Buy),
    ("WORTH IT", Decision::Buy),
    ("YES", Decision::Buy),
    ("SELL", Decision::Sell),
    ("PASS", Decision::Sell),
    ("SKIP", Decision::Sell),
    ("AVOID", Decision::Sell),
    ("NOT WORTH IT", Decision::Sell),
    ("BAD DEAL", Decision::Sell),
    ("DON'T BUY", Decision::Sell),
    ("DONT BUY", Decision::Sell),
    ("DO NOT BUY", Decision::Sell),
    ("NOT A BUY", Decision::Sell),
    ("HOLD OFF", Decision::Sell),
    ("NO", Decision::Sell),
];

/// Shortest phrase considered for substring matching
const MIN_CONTAINMENT_LEN: usize = 3;

/// Parse a decision, returning `None` when the text is unrecognized
pub fn parse_decision(raw: &str) -> Option<Decision> {
    let key = raw.trim().to_uppercase();
    if key.is_empty() {
        return None;
    }

    if let Some((_, decision)) = DECISION_SYNONYMS.iter().find(|(phrase, _)| *phrase == key) {
        return Some(*decision);
    }

    let mut by_length: Vec<&(&str, Decision)> = DECISION_SYNONYMS
        .iter()
        .filter(|(phrase, _)| phrase.len() >= MIN_CONTAINMENT_LEN)
        .collect();
    by_length.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    by_length
        .into_iter()
        .find(|(phrase, _)| key.contains(phrase))
        .map(|(_, decision)| *decision)
}

/// Normalize an optional decision field
///
/// Returns the decision and whether it was recognized (SELL when not).
pub fn normalize_decision(raw: Option<&str>) -> (Decision, bool) {
    match raw.and_then(parse_decision) {
        Some(decision) => (decision, true),
        None => (Decision::Sell, false),
    }
}
