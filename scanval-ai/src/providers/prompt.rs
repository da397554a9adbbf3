//! Provider-neutral prompt construction

use crate::normalize::category::CATEGORIES;
use crate::types::{AnalysisPrompt, ProductFacts, VALUATION_FACTOR_COUNT};
use std::fmt::Write;

/// Build the valuation prompt for one item
pub fn build_prompt(facts: &ProductFacts) -> AnalysisPrompt {
    AnalysisPrompt {
        system: system_instructions(),
        user: describe_item(facts),
    }
}

fn system_instructions() -> String {
    format!(
        "You are a resale market analyst. Estimate what the described item would sell for \
         on the secondary market and say whether buying it to resell is worthwhile.\n\
         Respond with a single JSON object and nothing else, using these keys:\n\
         \"itemName\" (string), \"estimatedValue\" (number, USD), \"decision\" (\"BUY\" or \"SELL\"), \
         \"valuationFactors\" (array of exactly {} short strings), \"summaryReasoning\" (string), \
         \"confidence\" (number from 0 to 1), \"category\" (one of: {}).",
        VALUATION_FACTOR_COUNT,
        CATEGORIES.join(", ")
    )
}

fn describe_item(facts: &ProductFacts) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Item: {}", facts.title);
    if let Some(brand) = &facts.brand {
        let _ = writeln!(text, "Brand: {}", brand);
    }
    if let Some(category) = &facts.category {
        let _ = writeln!(text, "Category: {}", category);
    }
    let _ = writeln!(text, "Code: {}", facts.identifier_code);
    if let Some(price) = facts.price {
        let _ = writeln!(text, "Reference price: ${:.2}", price);
    }
    if let Some(description) = &facts.description {
        let _ = writeln!(text, "Description: {}", description);
    }
    if facts.is_placeholder() {
        text.push_str("No catalog record was found; infer what you can from the code.\n");
    }
    text
}
