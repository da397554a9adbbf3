//! Field Reconciler
//!
//! Providers spell the same field many ways: `estimated_value`, `EstimatedValue`,
//! `price`, `recommendation` for `decision`, and so on. Before validation every
//! canonical field that is missing is filled from the first non-null alternate
//! in a fixed order. Alternate keys are left in place; unrecognized keys are kept.
//!
//! Key comparison ignores case and `_`, `-`, and space separators, so the alias
//! table only has to list distinct words.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

pub const ITEM_NAME: &str = "itemName";
pub const ESTIMATED_VALUE: &str = "estimatedValue";
pub const DECISION: &str = "decision";
pub const VALUATION_FACTORS: &str = "valuationFactors";
pub const SUMMARY_REASONING: &str = "summaryReasoning";
pub const CONFIDENCE: &str = "confidence";
pub const CATEGORY: &str = "category";

/// Canonical field → ordered alternates (the canonical name itself comes first)
const FIELD_ALIASES: &[(&str, &[&str])] = &[
    (
        ITEM_NAME,
        &["itemName", "name", "productName", "product", "title", "item", "itemTitle"],
    ),
    (
        ESTIMATED_VALUE,
        &[
            "estimatedValue",
            "value",
            "estimatedPrice",
            "marketValue",
            "resaleValue",
            "price",
            "estimate",
            "valuation",
        ],
    ),
    (
        DECISION,
        &["decision", "recommendation", "verdict", "action", "buyDecision", "advice"],
    ),
    (
        VALUATION_FACTORS,
        &[
            "valuationFactors",
            "factors",
            "keyFactors",
            "valueFactors",
            "reasons",
            "reasoning",
            "considerations",
        ],
    ),
    (
        SUMMARY_REASONING,
        &["summaryReasoning", "summary", "rationale", "explanation", "analysis", "justification"],
    ),
    (
        CONFIDENCE,
        &["confidence", "confidenceScore", "confidenceLevel", "certainty"],
    ),
    (
        CATEGORY,
        &["category", "itemCategory", "productCategory", "type", "itemType"],
    ),
];

/// Keys some providers wrap the whole document in
const ENVELOPE_KEYS: &[&str] = &["analysis", "result", "data", "response", "valuation", "opinion"];

/// Numbers inside free-form value strings ("$1,200 - $1,500", "-5")
///
/// A `-` is a sign only at the start or after whitespace, `$` or `(`, and only
/// when a digit (optionally after `$`) follows it directly; "10-20" and
/// "$10 - $20" stay ranges.
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:(?:^|[\s$(])(-)\$?)?(\d+(?:\.\d+)?)").unwrap());

fn compact(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

fn has_value(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).map_or(false, |v| !v.is_null())
}

/// Map alternate spellings onto canonical keys in place
pub fn reconcile(document: &mut Map<String, Value>) {
    unwrap_envelope(document);

    for (canonical, alternates) in FIELD_ALIASES {
        if has_value(document, canonical) {
            continue;
        }

        let found = alternates.iter().find_map(|alternate| {
            let wanted = compact(alternate);
            document
                .iter()
                .find(|(key, value)| !value.is_null() && compact(key) == wanted)
                .map(|(_, value)| value.clone())
        });

        if let Some(value) = found {
            document.insert((*canonical).to_string(), value);
        }
    }
}

/// Hoist the fields of a single wrapping object (`{"analysis": {...}}`)
fn unwrap_envelope(document: &mut Map<String, Value>) {
    if document.len() != 1 {
        return;
    }

    let key = match document.iter().next() {
        Some((key, Value::Object(_))) if ENVELOPE_KEYS.iter().any(|e| compact(e) == compact(key)) => {
            key.clone()
        }
        _ => return,
    };

    if let Some(Value::Object(inner)) = document.remove(&key) {
        *document = inner;
    }
}

/// Read a value as trimmed text
pub fn as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Read a value as a number
///
/// Accepts plain numbers and strings such as "$1,299.99", "85%", or a range
/// "10-20" (midpoint).
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let without_grouping = s.replace(',', "");
            let numbers: Vec<f64> = NUMBER
                .captures_iter(without_grouping.trim())
                .filter_map(|caps| {
                    let magnitude = caps.get(2)?.as_str().parse::<f64>().ok()?;
                    Some(if caps.get(1).is_some() { -magnitude } else { magnitude })
                })
                .take(2)
                .collect();
            match numbers.as_slice() {
                [single] => Some(*single),
                [low, high] if without_grouping.contains('-') || without_grouping.contains(" to ") => {
                    Some((low + high) / 2.0)
                }
                [first, _] => Some(*first),
                _ => None,
            }
        }
        Value::Object(map) => ["value", "amount", "mid", "average"]
            .iter()
            .find_map(|k| map.get(*k).and_then(as_number)),
        _ => None,
    }
}

/// Read a value as a list of short texts
///
/// Arrays of strings or objects, or a single string split on lines, semicolons,
/// and bullets.
pub fn as_text_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(item_text).collect(),
        Value::String(s) => s
            .split(|c| matches!(c, '\n' | ';' | '•'))
            .map(|part| part.trim().trim_start_matches(['-', '*']).trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn item_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => ["factor", "name", "description", "text", "reason"]
            .iter()
            .find_map(|k| map.get(*k).and_then(as_text)),
        other => as_text(other),
    }
}
