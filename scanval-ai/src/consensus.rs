//! Consensus Builder
//!
//! Reduces the surviving provider opinions of one run into a single
//! recommendation. Pure function of the opinion set: no randomness, and the
//! result does not depend on the order opinions arrive in.
//!
//! **Voting:** BUY wins only with a strict majority; a tie is SELL.
//! **Value:** mean of the positive estimates (zero means "no estimate").
//! **Tier:** `low` without opinions, `high` with at least three opinions that
//! agree strongly in either direction, `medium` otherwise.

use crate::types::{AnalysisOpinion, ConfidenceTier, ConsensusResult, Decision};
use std::collections::BTreeMap;

mod tiering {
    /// Opinions needed before a consensus can be rated high
    pub const MIN_HIGH_SAMPLE: usize = 3;
    /// Buy ratio at or above which agreement counts as strong
    pub const STRONG_BUY_RATIO: f64 = 0.8;
    /// Buy ratio at or below which agreement counts as strong
    pub const STRONG_SELL_RATIO: f64 = 0.2;
}

/// Builds a [`ConsensusResult`] from opinions
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsensusBuilder;

impl ConsensusBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate opinions into one result
    ///
    /// `fallback_name` names the item when no opinion survived.
    pub fn build(&self, opinions: &[AnalysisOpinion], fallback_name: &str) -> ConsensusResult {
        let total = opinions.len();
        if total == 0 {
            return no_opinions(fallback_name);
        }

        let buy_votes = opinions.iter().filter(|o| o.decision == Decision::Buy).count();
        let decision = if buy_votes * 2 > total {
            Decision::Buy
        } else {
            Decision::Sell
        };
        let estimated_value = mean_positive(opinions.iter().map(|o| o.estimated_value));
        let item_name = most_common_name(opinions).unwrap_or_else(|| fallback_name.to_string());

        ConsensusResult {
            reasoning: format!(
                "{} of {} {} recommended BUY; average estimated value ${:.2}.",
                buy_votes,
                total,
                if total == 1 { "analysis" } else { "analyses" },
                estimated_value
            ),
            item_name,
            estimated_value,
            decision,
            confidence: tier(buy_votes, total),
            analysis_count: total,
            buy_votes,
            consensus_ratio: format!("{}/{}", buy_votes, total),
        }
    }
}

fn no_opinions(fallback_name: &str) -> ConsensusResult {
    ConsensusResult {
        item_name: fallback_name.to_string(),
        estimated_value: 0.0,
        decision: Decision::Sell,
        confidence: ConfidenceTier::Low,
        analysis_count: 0,
        buy_votes: 0,
        consensus_ratio: "0/0".to_string(),
        reasoning: "No analysis provider could be reached, so no valuation is available. \
                    Defaulting to SELL."
            .to_string(),
    }
}

/// Confidence tier from the buy ratio and sample size
pub fn tier(buy_votes: usize, total: usize) -> ConfidenceTier {
    if total == 0 {
        return ConfidenceTier::Low;
    }
    let ratio = buy_votes as f64 / total as f64;
    let strong = ratio >= tiering::STRONG_BUY_RATIO || ratio <= tiering::STRONG_SELL_RATIO;
    if total >= tiering::MIN_HIGH_SAMPLE && strong {
        ConfidenceTier::High
    } else {
        ConfidenceTier::Medium
    }
}

/// Mean of the positive values, 0 when there are none
///
/// Values are summed in sorted order so the result is identical for every
/// permutation of the input.
fn mean_positive(values: impl Iterator<Item = f64>) -> f64 {
    let mut positive: Vec<f64> = values.filter(|v| v.is_finite() && *v > 0.0).collect();
    if positive.is_empty() {
        return 0.0;
    }
    positive.sort_by(|a, b| a.total_cmp(b));
    positive.iter().sum::<f64>() / positive.len() as f64
}

/// Most frequent item name, compared case-insensitively
///
/// Ties go to the lexicographically smallest name; the spelling returned is
/// the smallest variant seen for that name.
fn most_common_name(opinions: &[AnalysisOpinion]) -> Option<String> {
    let mut counts: BTreeMap<String, (usize, &str)> = BTreeMap::new();
    for opinion in opinions {
        let name = opinion.item_name.trim();
        if name.is_empty() {
            continue;
        }
        let entry = counts.entry(name.to_lowercase()).or_insert((0, name));
        entry.0 += 1;
        if name < entry.1 {
            entry.1 = name;
        }
    }

    // BTreeMap iterates in ascending key order, so the first maximum wins ties
    let mut best: Option<(usize, &str)> = None;
    for (count, spelling) in counts.values() {
        if best.map_or(true, |(best_count, _)| *count > best_count) {
            best = Some((*count, *spelling));
        }
    }
    best.map(|(_, spelling)| spelling.to_string())
}
